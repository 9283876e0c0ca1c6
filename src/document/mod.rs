//! # JSON:API Document Model
//!
//! Query parsing, resource and error objects, link generation, content
//! negotiation and the top-level document.

pub mod assembler;
pub mod error;
pub mod links;
pub mod media;
pub mod query;
pub mod resource;

pub use assembler::{Included, JsonApiDocument, PrimaryData};
pub use error::{ApiError, ErrorSource};
pub use links::LinkBuilder;
pub use media::{check_accept, check_content_type, MEDIA_TYPE};
pub use query::{Direction, DocumentQuery, QueryError, SortField};
pub use resource::{Linkage, Links, Relationship, RelationshipData, Resource};
