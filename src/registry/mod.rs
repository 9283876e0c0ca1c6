//! # Resource Type Registry
//!
//! Bidirectional mapping between external resource types and internal
//! model names. Built lazily by scanning the backend's models for a
//! declared resource type, cached process-wide, and dropped on an external
//! invalidation signal. Unknown names resolve to `None`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::model::Backend;

/// Snapshot of the type mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeMapping {
    type_to_model: HashMap<String, String>,
    model_to_type: HashMap<String, String>,
}

impl TypeMapping {
    /// Scan all models for a declared resource type
    ///
    /// A type declared by more than one model stays bound to the first one.
    pub fn build<B: Backend + ?Sized>(backend: &B) -> Self {
        let mut mapping = Self::default();

        for model in backend.models() {
            let resource_type = match &model.options.resource_type {
                Some(resource_type) if !resource_type.is_empty() => resource_type,
                _ => continue,
            };

            if let Some(existing) = mapping.type_to_model.get(resource_type) {
                warn!(
                    resource_type = %resource_type,
                    model = %model.name,
                    existing = %existing,
                    "Resource type declared twice, keeping first model"
                );
                continue;
            }

            mapping
                .type_to_model
                .insert(resource_type.clone(), model.name.clone());
            mapping
                .model_to_type
                .insert(model.name.clone(), resource_type.clone());
        }

        mapping
    }

    pub fn model(&self, resource_type: &str) -> Option<&str> {
        self.type_to_model.get(resource_type).map(String::as_str)
    }

    pub fn resource_type(&self, model: &str) -> Option<&str> {
        self.model_to_type.get(model).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.type_to_model.len()
    }

    pub fn is_empty(&self) -> bool {
        self.type_to_model.is_empty()
    }
}

/// Cached registry
///
/// Readers always get a complete snapshot; a rebuild after invalidation
/// replaces it atomically.
#[derive(Debug, Default)]
pub struct ResourceTypeRegistry {
    mapping: RwLock<Option<Arc<TypeMapping>>>,
}

impl ResourceTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mapping, building it when absent
    pub fn mapping<B: Backend + ?Sized>(&self, backend: &B) -> Arc<TypeMapping> {
        if let Ok(guard) = self.mapping.read() {
            if let Some(mapping) = guard.as_ref() {
                return Arc::clone(mapping);
            }
        }

        let mapping = Arc::new(TypeMapping::build(backend));
        debug!(types = mapping.len(), "Resource type registry built");

        if let Ok(mut guard) = self.mapping.write() {
            *guard = Some(Arc::clone(&mapping));
        }

        mapping
    }

    /// Model name of a resource type
    pub fn resolve_model<B: Backend + ?Sized>(&self, backend: &B, resource_type: &str) -> Option<String> {
        self.mapping(backend).model(resource_type).map(str::to_string)
    }

    /// Resource type of a model
    pub fn resolve_type<B: Backend + ?Sized>(&self, backend: &B, model: &str) -> Option<String> {
        self.mapping(backend).resource_type(model).map(str::to_string)
    }

    /// Drop the cached mapping; the next lookup rebuilds it
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.mapping.write() {
            *guard = None;
        }
    }

    pub fn is_cached(&self) -> bool {
        self.mapping.read().map(|guard| guard.is_some()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MemoryBackend, ModelMeta};

    fn backend() -> MemoryBackend {
        MemoryBackend::new()
            .with_model(ModelMeta::new("Post").with_type("posts"))
            .with_model(ModelMeta::new("User").with_type("users"))
            .with_model(ModelMeta::new("Secret"))
            .with_model(ModelMeta::new("Article").with_type("posts"))
    }

    #[test]
    fn test_resolve_both_directions() {
        let backend = backend();
        let registry = ResourceTypeRegistry::new();

        assert_eq!(registry.resolve_model(&backend, "posts").as_deref(), Some("Post"));
        assert_eq!(registry.resolve_type(&backend, "User").as_deref(), Some("users"));
    }

    #[test]
    fn test_unknown_names_are_not_found() {
        let backend = backend();
        let registry = ResourceTypeRegistry::new();

        assert_eq!(registry.resolve_model(&backend, "secrets"), None);
        assert_eq!(registry.resolve_type(&backend, "Secret"), None);
    }

    #[test]
    fn test_duplicate_type_keeps_bijection() {
        let mapping = TypeMapping::build(&backend());

        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.model("posts"), Some("Post"));
        assert_eq!(mapping.resource_type("Article"), None);
    }

    #[test]
    fn test_invalidate_rebuilds() {
        let first = backend();
        let registry = ResourceTypeRegistry::new();
        assert!(!registry.is_cached());
        assert!(registry.resolve_model(&first, "users").is_some());
        assert!(registry.is_cached());

        // cached mapping survives a changed model set until invalidated
        let second = MemoryBackend::new().with_model(ModelMeta::new("Post").with_type("posts"));
        assert!(registry.resolve_model(&second, "users").is_some());

        registry.invalidate();
        assert!(!registry.is_cached());
        assert_eq!(registry.resolve_model(&second, "users"), None);
        assert_eq!(registry.resolve_model(&second, "posts").as_deref(), Some("Post"));
    }
}
