//! # Model Metadata Types
//!
//! Describes the backing models: their fields, relations and the options
//! the JSON:API layer reads from them.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of a backing entry
///
/// Backends may use numeric or string keys; both are carried as their
/// string form so they can be compared with ids coming from URLs and bodies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Read an id from a JSON member, accepting strings and numbers
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntryId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Storage type of a property field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Text,
    Integer,
    Float,
    Boolean,
    Date,
    Datetime,
    Time,
    File,
    Image,
    Json,
}

impl ValueType {
    /// Date and time types rendered as Unix timestamps
    pub fn is_temporal(&self) -> bool {
        matches!(self, ValueType::Date | ValueType::Datetime | ValueType::Time)
    }

    /// Types holding a path to a stored file
    pub fn is_file(&self) -> bool {
        matches!(self, ValueType::File | ValueType::Image)
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, ValueType::String | ValueType::Text)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Text => "text",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::Boolean => "boolean",
            ValueType::Date => "date",
            ValueType::Datetime => "datetime",
            ValueType::Time => "time",
            ValueType::File => "file",
            ValueType::Image => "image",
            ValueType::Json => "json",
        }
    }
}

/// Number of entries on the other side of a relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// Belongs-to or has-one
    ToOne,
    /// Has-many
    ToMany,
}

/// Kind of a model field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    /// Scalar or blob attribute
    Property {
        #[serde(rename = "type")]
        value_type: ValueType,
    },

    /// Link to entries of another model
    Relation {
        /// Internal name of the related model
        model: String,
        cardinality: Cardinality,
    },
}

/// Adapter-relevant field options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOptions {
    /// Never rendered as an attribute or relationship
    #[serde(default)]
    pub omit: bool,

    /// Rejected by the backend when empty on save
    #[serde(default)]
    pub required: bool,
}

/// Field definition of a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,

    #[serde(flatten)]
    pub kind: FieldKind,

    #[serde(default)]
    pub options: FieldOptions,
}

impl FieldDescriptor {
    pub fn property(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Property { value_type },
            options: FieldOptions::default(),
        }
    }

    pub fn to_one(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self::relation(name, model, Cardinality::ToOne)
    }

    pub fn to_many(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self::relation(name, model, Cardinality::ToMany)
    }

    fn relation(name: impl Into<String>, model: impl Into<String>, cardinality: Cardinality) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Relation {
                model: model.into(),
                cardinality,
            },
            options: FieldOptions::default(),
        }
    }

    pub fn omitted(mut self) -> Self {
        self.options.omit = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.options.required = true;
        self
    }

    pub fn is_property(&self) -> bool {
        matches!(self.kind, FieldKind::Property { .. })
    }

    /// Value type of a property field
    pub fn value_type(&self) -> Option<ValueType> {
        match &self.kind {
            FieldKind::Property { value_type } => Some(*value_type),
            FieldKind::Relation { .. } => None,
        }
    }

    /// Related model and cardinality of a relation field
    pub fn relation_target(&self) -> Option<(&str, Cardinality)> {
        match &self.kind {
            FieldKind::Relation { model, cardinality } => Some((model.as_str(), *cardinality)),
            FieldKind::Property { .. } => None,
        }
    }

    /// Synthetic fields never rendered as attributes
    pub fn is_synthetic(&self) -> bool {
        self.name == "id" || self.name == "type"
    }
}

/// Model-level options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOptions {
    /// External resource type; models without one are not exposed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    /// Ordered filter strategy names, overriding the configured default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<String>>,
}

/// Metadata of a backing model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMeta {
    /// Internal model identifier
    pub name: String,

    /// Fields in declaration order
    pub fields: Vec<FieldDescriptor>,

    #[serde(default)]
    pub options: ModelOptions,
}

impl ModelMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            options: ModelOptions::default(),
        }
    }

    /// Expose this model under the given resource type
    pub fn with_type(mut self, resource_type: impl Into<String>) -> Self {
        self.options.resource_type = Some(resource_type.into());
        self
    }

    pub fn with_filters<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.filters = Some(filters.into_iter().map(Into::into).collect());
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        name == "id" || self.get_field(name).is_some()
    }
}
