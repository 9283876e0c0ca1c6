//! # JSON:API Responses
//!
//! Status, `Location` header and document of a service operation, ready to
//! be returned from an axum handler.

use axum::http::header::{CONTENT_TYPE, LOCATION};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::document::{ApiError, JsonApiDocument, MEDIA_TYPE};

/// Outcome of a service operation
#[derive(Debug, Clone, PartialEq)]
pub struct JsonApiResponse {
    status: StatusCode,
    location: Option<String>,
    document: Option<JsonApiDocument>,
}

impl JsonApiResponse {
    /// Response carrying a document, with the document's status
    pub fn from_document(document: JsonApiDocument) -> Self {
        Self {
            status: document.status(),
            location: None,
            document: Some(document),
        }
    }

    pub fn from_error(error: ApiError) -> Self {
        Self::from_document(JsonApiDocument::from_error(error))
    }

    /// `204 No Content`
    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            location: None,
            document: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn document(&self) -> Option<&JsonApiDocument> {
        self.document.as_ref()
    }

    pub fn into_document(self) -> Option<JsonApiDocument> {
        self.document
    }
}

impl From<JsonApiDocument> for JsonApiResponse {
    fn from(document: JsonApiDocument) -> Self {
        Self::from_document(document)
    }
}

impl IntoResponse for JsonApiResponse {
    fn into_response(self) -> Response {
        let body = match &self.document {
            Some(document) if self.status != StatusCode::NO_CONTENT => match serde_json::to_vec(document) {
                Ok(body) => Some(body),
                Err(e) => {
                    return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
                }
            },
            _ => None,
        };

        let mut response = match body {
            Some(body) => (self.status, body).into_response(),
            None => self.status.into_response(),
        };

        let headers = response.headers_mut();
        if self.status != StatusCode::NO_CONTENT {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(MEDIA_TYPE));
        }
        if let Some(location) = self.location.and_then(|l| HeaderValue::from_str(&l).ok()) {
            headers.insert(LOCATION, location);
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PrimaryData;

    #[test]
    fn test_document_response_headers() {
        let mut document = JsonApiDocument::new();
        document.set_status(StatusCode::CREATED);
        document.set_data(PrimaryData::Resource(None));

        let response = JsonApiResponse::from_document(document)
            .with_location("/api/v1/posts/1")
            .into_response();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[CONTENT_TYPE], MEDIA_TYPE);
        assert_eq!(response.headers()[LOCATION], "/api/v1/posts/1");
    }

    #[test]
    fn test_no_content_has_no_body_type() {
        let response = JsonApiResponse::no_content().into_response();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_error_response_status() {
        let response = JsonApiResponse::from_error(ApiError::type_not_found("nope"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.document().unwrap().has_errors());
    }
}
