//! # JSON:API Service Layer
//!
//! The service ties the registry, query parser, filter pipeline, adapters
//! and mutation engine together behind one entry point per endpoint.
//!
//! # Supported Operations
//!
//! - index, detail, related, relationship
//! - save (create, update, bulk create), delete
//! - save_relationship (replace, add, remove)
//! - model and field metadata reads
//! - content negotiation

mod errors;
mod metadata;
mod response;
mod service;

pub use errors::{JsonApiError, JsonApiResult};
pub use response::JsonApiResponse;
pub use service::{JsonApi, JsonApiBuilder};
