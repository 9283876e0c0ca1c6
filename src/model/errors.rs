//! # Backend Errors
//!
//! Errors reported by the backing store through the backend contract.

use std::fmt;

use thiserror::Error;

/// Result type for backend calls
pub type BackendResult<T> = Result<T, BackendError>;

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Machine readable code, e.g. "required"
    pub code: String,
    /// Human readable message
    pub message: String,
    /// Optional extended description
    pub detail: Option<String>,
}

impl FieldError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn required(field: &str) -> Self {
        Self::new("required", format!("Field '{}' is required", field))
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {}", self.message, detail),
            None => f.write_str(&self.message),
        }
    }
}

/// Field-level failures rejected by a save, in field order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationFailure {
    errors: Vec<(String, Vec<FieldError>)>,
}

impl ValidationFailure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error for a field, grouping errors of the same field
    pub fn add(&mut self, field: impl Into<String>, error: FieldError) {
        let field = field.into();
        match self.errors.iter_mut().find(|(name, _)| *name == field) {
            Some((_, errors)) => errors.push(error),
            None => self.errors.push((field, vec![error])),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of failing fields
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> impl Iterator<Item = (&str, &[FieldError])> {
        self.errors.iter().map(|(f, e)| (f.as_str(), e.as_slice()))
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.errors.iter().map(|(name, _)| name.as_str()).collect();
        write!(f, "validation failed for: {}", fields.join(", "))
    }
}

/// Errors returned by the backing store
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// Model is not known to the backend
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// Field is not declared on the model
    #[error("Unknown field '{field}' on model '{model}'")]
    UnknownField { model: String, field: String },

    /// Save rejected by field validation
    #[error("{0}")]
    Validation(ValidationFailure),

    /// Query could not be executed
    #[error("Query failed: {0}")]
    Query(String),

    /// External search call failed
    #[error("Search failed: {0}")]
    Search(String),

    /// Storage-level failure
    #[error("Storage error: {0}")]
    Storage(String),
}
