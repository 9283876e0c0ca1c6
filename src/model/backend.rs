//! # Backend Contract
//!
//! The narrow interface through which the JSON:API layer reads and mutates
//! the backing store. The store owns entries and their persistence; this
//! crate only asks for reads, writes and query execution.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::errors::BackendResult;
use super::types::{EntryId, ModelMeta};
use crate::document::query::Direction;
use crate::filter::FilterExpr;

/// Value of a field as seen through the accessor
#[derive(Debug, Clone, PartialEq)]
pub enum Property<E> {
    /// Scalar or blob attribute value
    Value(Value),
    /// To-one relation, `None` when empty
    One(Option<E>),
    /// To-many relation, in source order
    Many(Vec<E>),
}

/// Uniform get/set access to entry fields
///
/// Implemented once per backing store instead of synthesizing accessors
/// per field name.
pub trait PropertyAccessor {
    /// Opaque backing record
    type Entry: Clone;

    /// Id of the entry, `None` while it has not been persisted
    fn entry_id(&self, entry: &Self::Entry) -> Option<EntryId>;

    fn get_property(
        &self,
        model: &ModelMeta,
        entry: &Self::Entry,
        field: &str,
    ) -> BackendResult<Property<Self::Entry>>;

    fn set_property(
        &self,
        model: &ModelMeta,
        entry: &mut Self::Entry,
        field: &str,
        value: Property<Self::Entry>,
    ) -> BackendResult<()>;

    /// Add an entry to a to-many relation, ignoring members already present
    fn add_to(
        &self,
        model: &ModelMeta,
        entry: &mut Self::Entry,
        field: &str,
        related: Self::Entry,
    ) -> BackendResult<()> {
        let mut members = match self.get_property(model, entry, field)? {
            Property::Many(members) => members,
            _ => Vec::new(),
        };

        let related_id = self.entry_id(&related);
        if related_id.is_some() && members.iter().any(|m| self.entry_id(m) == related_id) {
            return Ok(());
        }

        members.push(related);
        self.set_property(model, entry, field, Property::Many(members))
    }

    /// Remove an entry from a to-many relation
    fn remove_from(
        &self,
        model: &ModelMeta,
        entry: &mut Self::Entry,
        field: &str,
        related: &Self::Entry,
    ) -> BackendResult<()> {
        let members = match self.get_property(model, entry, field)? {
            Property::Many(members) => members,
            _ => return Ok(()),
        };

        let related_id = self.entry_id(related);
        let remaining = members
            .into_iter()
            .filter(|m| self.entry_id(m) != related_id)
            .collect();

        self.set_property(model, entry, field, Property::Many(remaining))
    }
}

/// The backing store
pub trait Backend: PropertyAccessor + Send + Sync {
    /// All known models, scanned when the type registry is built
    fn models(&self) -> Vec<Arc<ModelMeta>>;

    fn model(&self, name: &str) -> Option<Arc<ModelMeta>>;

    fn get_entry(&self, model: &ModelMeta, id: &EntryId) -> BackendResult<Option<Self::Entry>>;

    /// A new, unpersisted entry with default values
    fn create_entry(&self, model: &ModelMeta) -> BackendResult<Self::Entry>;

    /// Persist an entry, assigning its id when new
    ///
    /// Field validation failures are reported as `BackendError::Validation`.
    fn save(&self, model: &ModelMeta, entry: &mut Self::Entry) -> BackendResult<()>;

    fn delete(&self, model: &ModelMeta, entry: &Self::Entry) -> BackendResult<()>;

    fn execute(&self, query: &ModelQuery) -> BackendResult<Vec<Self::Entry>>;

    /// Number of rows matching the conditions, ignoring limit and offset
    fn count(&self, query: &ModelQuery) -> BackendResult<usize>;

    /// Translate search parameters into conditions on the query
    fn apply_search(&self, query: &mut ModelQuery, search: &SearchParams) -> BackendResult<()>;

    /// Display label of an entry for option lists
    ///
    /// Defaults to the first non-empty textual property, then the id.
    fn entry_label(&self, model: &ModelMeta, entry: &Self::Entry) -> BackendResult<String> {
        let textual = model
            .fields
            .iter()
            .filter(|field| !field.is_synthetic() && field.value_type().map(|t| t.is_textual()).unwrap_or(false));

        for field in textual {
            if let Property::Value(Value::String(label)) = self.get_property(model, entry, &field.name)? {
                if !label.is_empty() {
                    return Ok(label);
                }
            }
        }

        Ok(self.entry_id(entry).map(|id| id.to_string()).unwrap_or_default())
    }
}

/// A condition added to a model query
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals one of the values
    Exact { field: String, values: Vec<Value> },
    /// Field contains the pattern, case insensitive
    Match { field: String, pattern: String },
    /// Free-text search over the entry
    Text(String),
    /// All expressions hold
    Expression(Vec<FilterExpr>),
    /// Entry id is one of the ids
    IdIn(Vec<EntryId>),
    /// Matches nothing
    Never,
}

/// Ordering clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Query on a single model, built by the core and executed by the backend
#[derive(Debug, Clone, PartialEq)]
pub struct ModelQuery {
    model: String,
    conditions: Vec<Condition>,
    order_by: Vec<OrderBy>,
    limit: Option<usize>,
    offset: usize,
}

impl ModelQuery {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            conditions: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: 0,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn add_condition(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn add_order_by(&mut self, field: impl Into<String>, direction: Direction) {
        self.order_by.push(OrderBy {
            field: field.into(),
            direction,
        });
    }

    pub fn set_limit(&mut self, limit: usize, offset: usize) {
        self.limit = Some(limit);
        self.offset = offset;
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn order_by(&self) -> &[OrderBy] {
        &self.order_by
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Parameters handed to the backend's search support
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchParams {
    /// Free-text query
    pub query: Option<String>,
    /// Exact field values
    pub filter: Option<Map<String, Value>>,
    /// Partial field values
    pub matches: Option<Map<String, Value>>,
}
