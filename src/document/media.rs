//! # Content Negotiation
//!
//! Requests and responses use the single JSON:API media type. A request
//! body with that media type plus any parameter is rejected.

use axum::http::StatusCode;

use super::error::ApiError;

/// The JSON:API media type
pub const MEDIA_TYPE: &str = "application/vnd.api+json";

/// Validate the `Content-Type` of a request carrying a body
pub fn check_content_type(content_type: Option<&str>) -> Result<(), ApiError> {
    let unsupported = || {
        ApiError::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "media.type",
            "Unsupported media type",
        )
        .with_detail(format!("Requests must use the '{}' media type without parameters", MEDIA_TYPE))
    };

    let content_type = content_type.ok_or_else(unsupported)?;
    let (media_type, parameters) = split_media_type(content_type);

    if !media_type.eq_ignore_ascii_case(MEDIA_TYPE) || parameters {
        return Err(unsupported());
    }

    Ok(())
}

/// Validate the `Accept` header
///
/// Fails only when the JSON:API media type is listed and every instance of
/// it carries parameters.
pub fn check_accept(accept: Option<&str>) -> Result<(), ApiError> {
    let accept = match accept {
        Some(accept) => accept,
        None => return Ok(()),
    };

    let instances: Vec<bool> = accept
        .split(',')
        .map(split_media_type)
        .filter(|(media_type, _)| media_type.eq_ignore_ascii_case(MEDIA_TYPE))
        .map(|(_, parameters)| parameters)
        .collect();

    if !instances.is_empty() && instances.iter().all(|parameters| *parameters) {
        return Err(ApiError::new(
            StatusCode::NOT_ACCEPTABLE,
            "media.accept",
            "Not acceptable",
        )
        .with_detail(format!("'{}' is only served without parameters", MEDIA_TYPE)));
    }

    Ok(())
}

/// Split a media range into its type and whether it has parameters
fn split_media_type(value: &str) -> (&str, bool) {
    let mut parts = value.split(';');
    let media_type = parts.next().unwrap_or("").trim();
    let parameters = parts.any(|p| !p.trim().is_empty());
    (media_type, parameters)
}
