//! # Mutation Engine
//!
//! Structural validation of incoming payloads, field and relationship
//! assignment, value processors and validation error translation.

pub mod engine;
pub mod processor;

pub use engine::{translate_validation, MutationEngine, RelationshipVerb};
pub use processor::{FieldValueProcessor, FileFieldProcessor, ProcessorError, ProcessorResult};
