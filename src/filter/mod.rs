//! # Filter Pipeline
//!
//! Named filter strategies, each turning one `filter[<name>]` query
//! parameter into conditions on a model query. A model may restrict and
//! order the strategies it accepts; otherwise the configured default
//! order applies.

pub mod expression;
pub mod strategies;

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ConfigError;
use crate::document::{DocumentQuery, QueryError};
use crate::model::{Backend, ModelMeta, ModelQuery};

pub use expression::{FilterExpr, FilterOperator};
pub use strategies::{
    ExactFilterStrategy, ExpressionFilterStrategy, IndexFilterStrategy, MatchFilterStrategy,
    QueryFilterStrategy, SearchIndex, SearchRequest,
};

/// Everything a strategy may look at
pub struct FilterContext<'a, B: Backend + ?Sized> {
    pub document_query: &'a DocumentQuery,
    pub model: &'a ModelMeta,
    pub backend: &'a B,
}

/// Turns a filter parameter into query conditions
pub trait FilterStrategy<B: Backend + ?Sized>: Send + Sync {
    fn apply_filter(&self, ctx: &FilterContext<'_, B>, query: &mut ModelQuery) -> Result<(), QueryError>;
}

/// Named strategies available to models
pub struct FilterCatalog<B: Backend + ?Sized> {
    strategies: HashMap<String, Arc<dyn FilterStrategy<B>>>,
}

impl<B: Backend + ?Sized> Default for FilterCatalog<B> {
    fn default() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }
}

impl<B: Backend + ?Sized> FilterCatalog<B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with `exact`, `match`, `expression` and `query`
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        catalog.register("exact", Arc::new(ExactFilterStrategy));
        catalog.register("match", Arc::new(MatchFilterStrategy));
        catalog.register("expression", Arc::new(ExpressionFilterStrategy));
        catalog.register("query", Arc::new(QueryFilterStrategy));
        catalog
    }

    /// Register or replace a strategy
    pub fn register(&mut self, name: impl Into<String>, strategy: Arc<dyn FilterStrategy<B>>) {
        self.strategies.insert(name.into(), strategy);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    /// Resolve the pipeline of a model
    ///
    /// The model's own strategy list wins over `defaults`. Every name must be
    /// registered.
    pub fn pipeline(&self, model: &ModelMeta, defaults: &[String]) -> Result<FilterPipeline<B>, ConfigError> {
        let names = model.options.filters.as_deref().unwrap_or(defaults);

        let mut strategies = Vec::with_capacity(names.len());
        for name in names {
            let strategy = self
                .strategies
                .get(name)
                .ok_or_else(|| ConfigError::UnknownFilterStrategy {
                    model: model.name.clone(),
                    name: name.clone(),
                })?;
            strategies.push((name.clone(), Arc::clone(strategy)));
        }

        Ok(FilterPipeline { strategies })
    }
}

/// Ordered strategies of one model
pub struct FilterPipeline<B: Backend + ?Sized> {
    strategies: Vec<(String, Arc<dyn FilterStrategy<B>>)>,
}

impl<B: Backend + ?Sized> Clone for FilterPipeline<B> {
    fn clone(&self) -> Self {
        Self {
            strategies: self.strategies.clone(),
        }
    }
}

impl<B: Backend + ?Sized> FilterPipeline<B> {
    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Apply every strategy in order
    pub fn apply(&self, ctx: &FilterContext<'_, B>, query: &mut ModelQuery) -> Result<(), QueryError> {
        for (_, strategy) in &self.strategies {
            strategy.apply_filter(ctx, query)?;
        }
        Ok(())
    }
}
