//! # JSON:API Errors
//!
//! Crate-level error taxonomy. Every variant maps to an HTTP status and to
//! a JSON:API error object.

use axum::http::StatusCode;
use thiserror::Error;

use crate::config::ConfigError;
use crate::document::{ApiError, QueryError};
use crate::model::{BackendError, ValidationFailure};

/// Result type for service operations
pub type JsonApiResult<T> = Result<T, JsonApiError>;

/// Service errors
#[derive(Debug, Clone, Error)]
pub enum JsonApiError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// Unknown type, missing entry or missing relationship target
    #[error("{}", .0.title)]
    NotFound(ApiError),

    /// Malformed query, body or unknown member
    #[error("{}", .0.title)]
    BadRequest(ApiError),

    /// Type or id of the body does not match the URL
    #[error("{}", .0.title)]
    Conflict(ApiError),

    #[error("{}", .0.title)]
    UnsupportedMediaType(ApiError),

    #[error("{}", .0.title)]
    NotAcceptable(ApiError),

    /// Field values rejected by the backend
    #[error("{0}")]
    Validation(ValidationFailure),

    // ==================
    // Server Errors (5xx)
    // ==================
    /// Search backend failure outside of a filter strategy
    #[error("Search failed: {0}")]
    Upstream(String),

    #[error("{0}")]
    Backend(BackendError),

    #[error("{0}")]
    Configuration(#[from] ConfigError),
}

impl JsonApiError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            JsonApiError::NotFound(_) => StatusCode::NOT_FOUND,
            JsonApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            JsonApiError::Conflict(_) => StatusCode::CONFLICT,
            JsonApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            JsonApiError::NotAcceptable(_) => StatusCode::NOT_ACCEPTABLE,
            JsonApiError::Validation(_) => StatusCode::BAD_REQUEST,

            JsonApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            JsonApiError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
            JsonApiError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl From<ApiError> for JsonApiError {
    fn from(error: ApiError) -> Self {
        match error.status {
            StatusCode::NOT_FOUND => JsonApiError::NotFound(error),
            StatusCode::CONFLICT => JsonApiError::Conflict(error),
            StatusCode::UNSUPPORTED_MEDIA_TYPE => JsonApiError::UnsupportedMediaType(error),
            StatusCode::NOT_ACCEPTABLE => JsonApiError::NotAcceptable(error),
            _ => JsonApiError::BadRequest(error),
        }
    }
}

impl From<QueryError> for JsonApiError {
    fn from(error: QueryError) -> Self {
        JsonApiError::BadRequest(
            ApiError::bad_request("index.input", "Invalid query parameter")
                .with_detail(error.message)
                .with_parameter(error.parameter),
        )
    }
}

impl From<BackendError> for JsonApiError {
    fn from(error: BackendError) -> Self {
        match error {
            BackendError::Validation(failure) => JsonApiError::Validation(failure),
            BackendError::Search(message) => JsonApiError::Upstream(message),
            other => JsonApiError::Backend(other),
        }
    }
}

impl From<JsonApiError> for ApiError {
    fn from(error: JsonApiError) -> Self {
        let status = error.status_code();
        match error {
            JsonApiError::NotFound(e)
            | JsonApiError::BadRequest(e)
            | JsonApiError::Conflict(e)
            | JsonApiError::UnsupportedMediaType(e)
            | JsonApiError::NotAcceptable(e) => e,
            JsonApiError::Validation(failure) => {
                ApiError::new(status, "validation", "Validation failed").with_detail(failure.to_string())
            }
            JsonApiError::Upstream(message) => {
                ApiError::new(status, "upstream", "Upstream service failed").with_detail(message)
            }
            other => ApiError::internal(other.to_string()),
        }
    }
}
