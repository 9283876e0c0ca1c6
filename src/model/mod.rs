//! # Backing Model
//!
//! Model metadata, the backend contract consumed by the JSON:API layer and
//! an in-memory reference backend.

pub mod backend;
pub mod errors;
pub mod memory;
pub mod types;

pub use backend::{Backend, Condition, ModelQuery, OrderBy, Property, PropertyAccessor, SearchParams};
pub use errors::{BackendError, BackendResult, FieldError, ValidationFailure};
pub use memory::{MemoryBackend, MemoryEntry};
pub use types::{
    Cardinality, EntryId, FieldDescriptor, FieldKind, FieldOptions, ModelMeta, ModelOptions, ValueType,
};
