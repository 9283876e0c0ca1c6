//! # Filter Strategies
//!
//! Each strategy reads its own `filter[<name>]` parameter and is a no-op
//! when the parameter is absent. Strategies backed by a search service fail
//! closed: a failing search makes the query match nothing.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::warn;

use super::expression::parse_expression;
use super::{FilterContext, FilterStrategy};
use crate::document::QueryError;
use crate::model::{Backend, BackendError, Condition, EntryId, ModelMeta, ModelQuery, SearchParams};

fn keyed_filter<'a>(
    value: &'a Value,
    name: &str,
    model: &ModelMeta,
) -> Result<&'a Map<String, Value>, QueryError> {
    let fields = value.as_object().ok_or_else(|| {
        QueryError::new(
            format!("filter[{}]", name),
            format!("Expected filter[{}][<field>]=<value>", name),
        )
    })?;

    // Unknown fields are a client error, not a search outage
    if let Some(field) = fields.keys().find(|field| !model.has_field(field)) {
        return Err(QueryError::new(
            format!("filter[{}]", name),
            format!("Field '{}' does not exist in model {}", field, model.name),
        ));
    }

    Ok(fields)
}

fn string_filter<'a>(value: &'a Value, name: &str) -> Result<&'a str, QueryError> {
    value.as_str().ok_or_else(|| {
        QueryError::new(
            format!("filter[{}]", name),
            format!("Expected filter[{}]=<value>", name),
        )
    })
}

/// Run a backend search, forcing an empty result when it fails
fn search_fail_closed<B: Backend + ?Sized>(
    strategy: &str,
    ctx: &FilterContext<'_, B>,
    query: &mut ModelQuery,
    params: SearchParams,
) {
    if let Err(error) = ctx.backend.apply_search(query, &params) {
        warn!(
            strategy,
            model = %ctx.model.name,
            error = %error,
            "Search failed, returning no results"
        );
        query.add_condition(Condition::Never);
    }
}

/// `filter[exact][<field>]=<value>`: field equals value (or any of a list)
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactFilterStrategy;

impl<B: Backend + ?Sized> FilterStrategy<B> for ExactFilterStrategy {
    fn apply_filter(&self, ctx: &FilterContext<'_, B>, query: &mut ModelQuery) -> Result<(), QueryError> {
        let value = match ctx.document_query.filter("exact") {
            Some(value) => value,
            None => return Ok(()),
        };

        let fields = keyed_filter(value, "exact", ctx.model)?;
        search_fail_closed(
            "exact",
            ctx,
            query,
            SearchParams {
                filter: Some(fields.clone()),
                ..Default::default()
            },
        );
        Ok(())
    }
}

/// `filter[match][<field>]=<value>`: field contains value
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchFilterStrategy;

impl<B: Backend + ?Sized> FilterStrategy<B> for MatchFilterStrategy {
    fn apply_filter(&self, ctx: &FilterContext<'_, B>, query: &mut ModelQuery) -> Result<(), QueryError> {
        let value = match ctx.document_query.filter("match") {
            Some(value) => value,
            None => return Ok(()),
        };

        let fields = keyed_filter(value, "match", ctx.model)?;
        search_fail_closed(
            "match",
            ctx,
            query,
            SearchParams {
                matches: Some(fields.clone()),
                ..Default::default()
            },
        );
        Ok(())
    }
}

/// `filter[expression]={field} OP value AND ...`
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionFilterStrategy;

impl<B: Backend + ?Sized> FilterStrategy<B> for ExpressionFilterStrategy {
    fn apply_filter(&self, ctx: &FilterContext<'_, B>, query: &mut ModelQuery) -> Result<(), QueryError> {
        let value = match ctx.document_query.filter("expression") {
            Some(value) => value,
            None => return Ok(()),
        };

        let expression = string_filter(value, "expression")?;
        let clauses = parse_expression(expression, ctx.model)
            .map_err(|message| QueryError::new("filter[expression]", message))?;

        query.add_condition(Condition::Expression(clauses));
        Ok(())
    }
}

/// `filter[query]=<text>`: free-text search through the backend
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryFilterStrategy;

impl<B: Backend + ?Sized> FilterStrategy<B> for QueryFilterStrategy {
    fn apply_filter(&self, ctx: &FilterContext<'_, B>, query: &mut ModelQuery) -> Result<(), QueryError> {
        let value = match ctx.document_query.filter("query") {
            Some(value) => value,
            None => return Ok(()),
        };

        let text = string_filter(value, "query")?;
        if text.trim().is_empty() {
            return Ok(());
        }

        search_fail_closed(
            "query",
            ctx,
            query,
            SearchParams {
                query: Some(text.to_string()),
                ..Default::default()
            },
        );
        Ok(())
    }
}

/// Request sent to an external search index
///
/// `limit: None` asks for every match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub limit: Option<usize>,
    pub offset: usize,
}

/// External full-text search index returning matching entry ids
pub trait SearchIndex: Send + Sync {
    fn search(&self, model: &ModelMeta, request: &SearchRequest) -> Result<Vec<EntryId>, BackendError>;
}

/// `filter[search]=<text>`: ids from an external search index
///
/// The index is asked for the full id set. Paging and the total count stay
/// with the model query, which pages the restricted collection itself.
pub struct IndexFilterStrategy {
    index: Arc<dyn SearchIndex>,
}

impl IndexFilterStrategy {
    pub fn new(index: Arc<dyn SearchIndex>) -> Self {
        Self { index }
    }
}

impl<B: Backend + ?Sized> FilterStrategy<B> for IndexFilterStrategy {
    fn apply_filter(&self, ctx: &FilterContext<'_, B>, query: &mut ModelQuery) -> Result<(), QueryError> {
        let value = match ctx.document_query.filter("search") {
            Some(value) => value,
            None => return Ok(()),
        };

        let request = SearchRequest {
            query: string_filter(value, "search")?.to_string(),
            limit: None,
            offset: 0,
        };

        match self.index.search(ctx.model, &request) {
            Ok(ids) => query.add_condition(Condition::IdIn(ids)),
            Err(error) => {
                warn!(
                    strategy = "search",
                    model = %ctx.model.name,
                    error = %error,
                    "Search index failed, returning no results"
                );
                query.add_condition(Condition::Never);
            }
        }

        Ok(())
    }
}
