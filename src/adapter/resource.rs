//! # Entry Resource Adapter
//!
//! Renders backing entries into resource nodes. Attributes pass through the
//! value transform; relationships always carry `self`/`related` links and
//! only resolve their linkage when the relationship path was included.
//!
//! Descent into relationships is capped by a depth counter scoped to one
//! render call tree. A relationship that would exceed the cap is rendered
//! with links only, which guarantees termination on cyclic models.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::decorator::ResourceDecorator;
use super::transform::ValueTransform;
use crate::document::{
    DocumentQuery, Included, Linkage, LinkBuilder, Relationship, RelationshipData, Resource,
};
use crate::model::{
    Backend, BackendError, BackendResult, Cardinality, EntryId, FieldDescriptor, ModelMeta, Property,
};
use crate::registry::TypeMapping;

/// Per-type view of a model
#[derive(Debug, Clone, PartialEq)]
pub struct EntryResourceAdapter {
    model: Arc<ModelMeta>,
    resource_type: String,
}

impl EntryResourceAdapter {
    pub fn new(model: Arc<ModelMeta>, resource_type: impl Into<String>) -> Self {
        Self {
            model,
            resource_type: resource_type.into(),
        }
    }

    pub fn model(&self) -> &ModelMeta {
        &self.model
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Fields rendered for the query: no synthetic, omitted or unrequested
    /// fields
    pub fn visible_fields<'a>(
        &'a self,
        query: &'a DocumentQuery,
    ) -> impl Iterator<Item = &'a FieldDescriptor> + 'a {
        self.model.fields.iter().filter(move |field| {
            !field.is_synthetic()
                && !field.options.omit
                && query.is_field_requested(&self.resource_type, &field.name)
        })
    }

    /// Relation field by name
    pub fn relation(&self, name: &str) -> Option<(&FieldDescriptor, &str, Cardinality)> {
        let field = self.model.get_field(name)?;
        let (target, cardinality) = field.relation_target()?;
        Some((field, target, cardinality))
    }
}

/// Adapters by resource type, built on first use
#[derive(Debug, Default)]
pub struct AdapterCache {
    adapters: RwLock<HashMap<String, Arc<EntryResourceAdapter>>>,
}

impl AdapterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adapter of a resource type, `None` when the type is unknown
    pub fn get<B: Backend + ?Sized>(
        &self,
        backend: &B,
        mapping: &TypeMapping,
        resource_type: &str,
    ) -> Option<Arc<EntryResourceAdapter>> {
        if let Ok(adapters) = self.adapters.read() {
            if let Some(adapter) = adapters.get(resource_type) {
                return Some(Arc::clone(adapter));
            }
        }

        let model = backend.model(mapping.model(resource_type)?)?;
        let adapter = Arc::new(EntryResourceAdapter::new(model, resource_type));

        if let Ok(mut adapters) = self.adapters.write() {
            adapters.insert(resource_type.to_string(), Arc::clone(&adapter));
        }

        Some(adapter)
    }

    pub fn invalidate(&self) {
        if let Ok(mut adapters) = self.adapters.write() {
            adapters.clear();
        }
    }
}

/// One render call tree
pub struct Renderer<'a, B: Backend + ?Sized> {
    backend: &'a B,
    mapping: &'a TypeMapping,
    adapters: &'a AdapterCache,
    query: &'a DocumentQuery,
    links: &'a LinkBuilder,
    transform: &'a dyn ValueTransform,
    decorators: &'a [Arc<dyn ResourceDecorator<B>>],
    max_depth: usize,
    depth: usize,
}

impl<'a, B: Backend + ?Sized> Renderer<'a, B> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        backend: &'a B,
        mapping: &'a TypeMapping,
        adapters: &'a AdapterCache,
        query: &'a DocumentQuery,
        links: &'a LinkBuilder,
        transform: &'a dyn ValueTransform,
        max_depth: usize,
    ) -> Self {
        Self {
            backend,
            mapping,
            adapters,
            query,
            links,
            transform,
            decorators: &[],
            max_depth,
            depth: 0,
        }
    }

    pub fn with_decorators(mut self, decorators: &'a [Arc<dyn ResourceDecorator<B>>]) -> Self {
        self.decorators = decorators;
        self
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Adapter of the model a relation points at
    pub fn target_adapter(&self, target_model: &str) -> Option<Arc<EntryResourceAdapter>> {
        let resource_type = self.mapping.resource_type(target_model)?;
        self.adapters.get(self.backend, self.mapping, resource_type)
    }

    pub fn linkage(&self, adapter: &EntryResourceAdapter, entry: &B::Entry) -> BackendResult<Linkage> {
        let id = self.require_id(adapter, entry)?;
        Ok(Linkage::new(adapter.resource_type(), id.as_str()))
    }

    /// Render an entry; `None` renders as `null`
    ///
    /// `path` is the relationship path leading to the entry, empty for
    /// primary data. Related resources reached through included paths are
    /// added to `included`.
    pub fn render(
        &mut self,
        adapter: &EntryResourceAdapter,
        entry: Option<&B::Entry>,
        path: &str,
        included: &mut Included,
    ) -> BackendResult<Option<Resource>> {
        let entry = match entry {
            Some(entry) => entry,
            None => return Ok(None),
        };

        let model = adapter.model();
        let id = self.require_id(adapter, entry)?;
        let mut resource = Resource::new(adapter.resource_type(), id.as_str());
        resource.set_link("self", self.links.detail(adapter.resource_type(), &id));

        for field in adapter.visible_fields(self.query) {
            let (target, cardinality) = match field.relation_target() {
                Some(relation) => relation,
                None => {
                    let value = match self.backend.get_property(model, entry, &field.name)? {
                        Property::Value(value) => value,
                        _ => serde_json::Value::Null,
                    };
                    resource.set_attribute(field.name.clone(), self.transform.transform(field, value));
                    continue;
                }
            };

            let mut relationship = Relationship::with_links(
                self.links.relationship(adapter.resource_type(), &id, &field.name),
                self.links.related(adapter.resource_type(), &id, &field.name),
            );

            let field_path = if path.is_empty() {
                field.name.clone()
            } else {
                format!("{}.{}", path, field.name)
            };

            if self.query.is_included(&field_path) && self.depth < self.max_depth {
                if let Some(target_adapter) = self.target_adapter(target) {
                    self.depth += 1;
                    let data = self.render_relation(
                        adapter,
                        entry,
                        field,
                        cardinality,
                        &target_adapter,
                        &field_path,
                        included,
                    );
                    self.depth -= 1;
                    relationship.data = Some(data?);
                }
            }

            resource.relationships.insert(field.name.clone(), relationship);
        }

        for decorator in self.decorators {
            decorator.decorate(self.backend, model, entry, self.query, &mut resource)?;
        }

        Ok(Some(resource))
    }

    #[allow(clippy::too_many_arguments)]
    fn render_relation(
        &mut self,
        adapter: &EntryResourceAdapter,
        entry: &B::Entry,
        field: &FieldDescriptor,
        cardinality: Cardinality,
        target: &EntryResourceAdapter,
        path: &str,
        included: &mut Included,
    ) -> BackendResult<RelationshipData> {
        let related = self.backend.get_property(adapter.model(), entry, &field.name)?;

        match (cardinality, related) {
            (Cardinality::ToOne, Property::One(Some(related))) => {
                let linkage = self.include(target, &related, path, included)?;
                Ok(RelationshipData::One(Some(linkage)))
            }
            (Cardinality::ToOne, _) => Ok(RelationshipData::One(None)),
            (Cardinality::ToMany, Property::Many(members)) => {
                let mut linkages = Vec::with_capacity(members.len());
                for member in &members {
                    linkages.push(self.include(target, member, path, included)?);
                }
                Ok(RelationshipData::Many(linkages))
            }
            (Cardinality::ToMany, _) => Ok(RelationshipData::Many(Vec::new())),
        }
    }

    /// Linkage of a related entry, rendering it into `included` once
    ///
    /// The node is reserved before rendering so cycles stop at linkage.
    fn include(
        &mut self,
        target: &EntryResourceAdapter,
        related: &B::Entry,
        path: &str,
        included: &mut Included,
    ) -> BackendResult<Linkage> {
        let linkage = self.linkage(target, related)?;
        if !included.reserve(linkage.clone()) {
            return Ok(linkage);
        }

        if let Some(resource) = self.render(target, Some(related), path, included)? {
            included.push_reserved(resource);
        }

        Ok(linkage)
    }

    fn require_id(&self, adapter: &EntryResourceAdapter, entry: &B::Entry) -> BackendResult<EntryId> {
        self.backend.entry_id(entry).ok_or_else(|| {
            BackendError::Storage(format!(
                "Entry of model '{}' has no id",
                adapter.model().name
            ))
        })
    }
}
