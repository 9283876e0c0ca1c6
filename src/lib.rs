//! jsonapi-orm - JSON:API documents over a generic entry backend
//!
//! Maps backing entries with typed fields and relations to JSON:API
//! documents, and submitted payloads back to entry mutations.

pub mod adapter;
pub mod api;
pub mod config;
pub mod document;
pub mod filter;
pub mod model;
pub mod mutation;
pub mod registry;

pub use api::{JsonApi, JsonApiBuilder, JsonApiError, JsonApiResponse, JsonApiResult};
pub use config::{ConfigError, JsonApiConfig};
pub use document::{ApiError, JsonApiDocument, MEDIA_TYPE};
pub use model::{Backend, BackendError, EntryId, MemoryBackend, ModelMeta, PropertyAccessor};
pub use mutation::RelationshipVerb;
