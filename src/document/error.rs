//! # Error Objects
//!
//! JSON:API error objects with a JSON pointer into the request body or the
//! name of the offending query parameter.

use axum::http::StatusCode;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Location of the cause of an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorSource {
    /// JSON pointer into the request document
    Pointer(String),
    /// Name of a query parameter
    Parameter(String),
}

impl Serialize for ErrorSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            ErrorSource::Pointer(pointer) => map.serialize_entry("pointer", pointer)?,
            ErrorSource::Parameter(parameter) => map.serialize_entry("parameter", parameter)?,
        }
        map.end()
    }
}

/// A JSON:API error object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    #[serde(serialize_with = "serialize_status")]
    pub status: StatusCode,

    pub code: String,

    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
}

fn serialize_status<S: Serializer>(status: &StatusCode, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(status.as_str())
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            title: title.into(),
            detail: None,
            source: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Point at a member of the request body; replaces any parameter source
    pub fn with_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.source = Some(ErrorSource::Pointer(pointer.into()));
        self
    }

    /// Point at a query parameter; replaces any pointer source
    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.source = Some(ErrorSource::Parameter(parameter.into()));
        self
    }

    pub fn bad_request(code: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, title)
    }

    pub fn not_found(code: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, title)
    }

    pub fn conflict(code: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, code, title)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", "Internal error").with_detail(detail)
    }

    /// Unknown resource type
    pub fn type_not_found(resource_type: &str) -> Self {
        Self::not_found("resource.invalid", "Resource type does not exist")
            .with_detail(format!("Resource type '{}' does not exist", resource_type))
    }

    /// Missing entry
    pub fn resource_not_found(resource_type: &str, id: &str) -> Self {
        Self::not_found("resource.found", "Resource does not exist").with_detail(format!(
            "Resource with type '{}' and id '{}' does not exist",
            resource_type, id
        ))
    }

    /// Unknown relationship of a type
    pub fn relationship_not_found(resource_type: &str, relationship: &str) -> Self {
        Self::bad_request("input.relationship", "Could not set relationship").with_detail(format!(
            "Relationship '{}' does not exist for type '{}'",
            relationship, resource_type
        ))
    }

    /// Sort field unknown to the type
    pub fn sort_field_not_found(resource_type: &str, field: &str) -> Self {
        Self::bad_request("index.order", "Order field does not exist")
            .with_detail(format!("Field '{}' does not exist for type '{}'", field, resource_type))
            .with_parameter("sort")
    }
}
