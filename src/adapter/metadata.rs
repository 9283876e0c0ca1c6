//! # Model Metadata Resources
//!
//! Exposes the backend's model definitions as read-only resources:
//!
//! - `models`: one per model, id is the model name, related to its fields
//! - `model-fields`: one per field, id is `<model>-<field>`, related to the
//!   model a relation field points at
//!
//! Rendering follows the entry renderer: sparse fieldsets, include paths
//! with a depth cap and reserve-before-render deduplication.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::document::{DocumentQuery, Included, LinkBuilder, Linkage, Relationship, RelationshipData, Resource};
use crate::model::{Cardinality, EntryId, FieldDescriptor, ModelMeta};
use crate::registry::TypeMapping;

/// Resource type of model metadata
pub const MODEL_TYPE: &str = "models";

/// Resource type of field metadata
pub const FIELD_TYPE: &str = "model-fields";

/// The two metadata resource types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataKind {
    Model,
    Field,
}

impl MetadataKind {
    pub fn from_resource_type(resource_type: &str) -> Option<Self> {
        match resource_type {
            MODEL_TYPE => Some(MetadataKind::Model),
            FIELD_TYPE => Some(MetadataKind::Field),
            _ => None,
        }
    }

    pub fn resource_type(&self) -> &'static str {
        match self {
            MetadataKind::Model => MODEL_TYPE,
            MetadataKind::Field => FIELD_TYPE,
        }
    }
}

/// A model or one of its fields
#[derive(Debug, Clone, Copy)]
pub enum MetadataItem<'a> {
    Model(&'a ModelMeta),
    Field(&'a ModelMeta, &'a FieldDescriptor),
}

impl<'a> MetadataItem<'a> {
    pub fn kind(&self) -> MetadataKind {
        match self {
            MetadataItem::Model(_) => MetadataKind::Model,
            MetadataItem::Field(..) => MetadataKind::Field,
        }
    }

    pub fn id(&self) -> String {
        match self {
            MetadataItem::Model(model) => model.name.clone(),
            MetadataItem::Field(model, field) => format!("{}-{}", model.name, field.name),
        }
    }

    pub fn name(&self) -> &'a str {
        match *self {
            MetadataItem::Model(model) => &model.name,
            MetadataItem::Field(_, field) => &field.name,
        }
    }

    pub fn linkage(&self) -> Linkage {
        Linkage::new(self.kind().resource_type(), self.id())
    }
}

/// Items a metadata relationship points at
#[derive(Debug, Clone)]
pub enum RelatedItems<'a> {
    One(Option<MetadataItem<'a>>),
    Many(Vec<MetadataItem<'a>>),
}

/// Relationship names of a metadata resource type
pub fn relationship_names(kind: MetadataKind) -> &'static [&'static str] {
    match kind {
        MetadataKind::Model => &["fields"],
        MetadataKind::Field => &["model"],
    }
}

/// Snapshot of the backend's models, addressed as metadata items
#[derive(Debug, Clone)]
pub struct MetadataCatalog {
    models: Vec<Arc<ModelMeta>>,
}

impl MetadataCatalog {
    pub fn new(models: Vec<Arc<ModelMeta>>) -> Self {
        Self { models }
    }

    /// Every item of a kind, in model declaration order
    pub fn items(&self, kind: MetadataKind) -> Vec<MetadataItem<'_>> {
        let models = self.models.iter().map(|model| &**model);
        match kind {
            MetadataKind::Model => models.map(MetadataItem::Model).collect(),
            MetadataKind::Field => models
                .flat_map(|model| model.fields.iter().map(move |field| MetadataItem::Field(model, field)))
                .collect(),
        }
    }

    pub fn model(&self, name: &str) -> Option<&ModelMeta> {
        self.models.iter().find(|model| model.name == name).map(|model| &**model)
    }

    /// Item by resource id
    pub fn find(&self, kind: MetadataKind, id: &str) -> Option<MetadataItem<'_>> {
        match kind {
            MetadataKind::Model => self.model(id).map(MetadataItem::Model),
            MetadataKind::Field => self.models.iter().map(|model| &**model).find_map(|model| {
                let field_name = id.strip_prefix(model.name.as_str())?.strip_prefix('-')?;
                model
                    .fields
                    .iter()
                    .find(|field| field.name == field_name)
                    .map(|field| MetadataItem::Field(model, field))
            }),
        }
    }

    /// Targets of a relationship, `None` when the item has no such
    /// relationship
    pub fn related<'a>(&'a self, item: &MetadataItem<'a>, relationship: &str) -> Option<RelatedItems<'a>> {
        match (*item, relationship) {
            (MetadataItem::Model(model), "fields") => Some(RelatedItems::Many(
                model.fields.iter().map(|field| MetadataItem::Field(model, field)).collect(),
            )),
            (MetadataItem::Field(_, field), "model") => Some(RelatedItems::One(
                field
                    .relation_target()
                    .and_then(|(target, _)| self.model(target))
                    .map(MetadataItem::Model),
            )),
            _ => None,
        }
    }
}

/// Field type as listed in metadata: the value type of a property, or the
/// relation kind
pub fn field_type(field: &FieldDescriptor) -> &'static str {
    match (field.value_type(), field.relation_target()) {
        (Some(value_type), _) => value_type.as_str(),
        (None, Some((_, Cardinality::ToOne))) => "hasOne",
        (None, Some((_, Cardinality::ToMany))) => "hasMany",
        (None, None) => "unknown",
    }
}

/// One metadata render call tree
pub struct MetadataRenderer<'a> {
    catalog: &'a MetadataCatalog,
    mapping: &'a TypeMapping,
    query: &'a DocumentQuery,
    links: &'a LinkBuilder,
    max_depth: usize,
    depth: usize,
}

impl<'a> MetadataRenderer<'a> {
    pub fn new(
        catalog: &'a MetadataCatalog,
        mapping: &'a TypeMapping,
        query: &'a DocumentQuery,
        links: &'a LinkBuilder,
        max_depth: usize,
    ) -> Self {
        Self {
            catalog,
            mapping,
            query,
            links,
            max_depth,
            depth: 0,
        }
    }

    /// Render an item; related items on included paths go to `included`
    pub fn render(&mut self, item: &MetadataItem<'a>, path: &str, included: &mut Included) -> Resource {
        let resource_type = item.kind().resource_type();
        let id = EntryId::new(item.id());
        let mut resource = Resource::new(resource_type, id.as_str());
        resource.set_link("self", self.links.detail(resource_type, &id));

        for (name, value) in self.attributes(item) {
            if self.query.is_field_requested(resource_type, name) {
                resource.set_attribute(name, value);
            }
        }

        for name in relationship_names(item.kind()) {
            if !self.query.is_field_requested(resource_type, name) {
                continue;
            }

            let mut relationship = Relationship::with_links(
                self.links.relationship(resource_type, &id, name),
                self.links.related(resource_type, &id, name),
            );

            let field_path = if path.is_empty() {
                name.to_string()
            } else {
                format!("{}.{}", path, name)
            };

            if self.query.is_included(&field_path) && self.depth < self.max_depth {
                if let Some(related) = self.catalog.related(item, name) {
                    self.depth += 1;
                    relationship.data = Some(self.include_all(related, &field_path, included));
                    self.depth -= 1;
                }
            }

            resource.relationships.insert(name.to_string(), relationship);
        }

        resource
    }

    fn attributes(&self, item: &MetadataItem<'a>) -> Vec<(&'static str, Value)> {
        match item {
            MetadataItem::Model(model) => vec![
                ("name", json!(model.name)),
                ("resourceType", json!(self.mapping.resource_type(&model.name))),
                ("options", json!(model.options)),
            ],
            MetadataItem::Field(_, field) => vec![
                ("name", json!(field.name)),
                ("fieldType", json!(field_type(field))),
                ("options", json!(field.options)),
            ],
        }
    }

    fn include_all(&mut self, related: RelatedItems<'a>, path: &str, included: &mut Included) -> RelationshipData {
        match related {
            RelatedItems::One(item) => RelationshipData::One(item.map(|item| self.include(&item, path, included))),
            RelatedItems::Many(items) => {
                RelationshipData::Many(items.iter().map(|item| self.include(item, path, included)).collect())
            }
        }
    }

    /// Linkage of an item, rendering it into `included` once
    fn include(&mut self, item: &MetadataItem<'a>, path: &str, included: &mut Included) -> Linkage {
        let linkage = item.linkage();
        if included.reserve(linkage.clone()) {
            let resource = self.render(item, path, included);
            included.push_reserved(resource);
        }
        linkage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JsonApiConfig;
    use crate::model::{MemoryBackend, ValueType};

    fn catalog() -> (MetadataCatalog, TypeMapping) {
        let backend = MemoryBackend::new()
            .with_model(
                ModelMeta::new("Post")
                    .with_type("posts")
                    .field(FieldDescriptor::property("title", ValueType::String).required())
                    .field(FieldDescriptor::to_one("author", "User")),
            )
            .with_model(
                ModelMeta::new("User")
                    .with_type("users")
                    .field(FieldDescriptor::to_many("posts", "Post")),
            )
            .with_model(ModelMeta::new("Post-Draft").field(FieldDescriptor::property("notes", ValueType::Text)));

        let mapping = TypeMapping::build(&backend);
        (MetadataCatalog::new(crate::model::Backend::models(&backend)), mapping)
    }

    fn query(pairs: &[(&str, &str)]) -> DocumentQuery {
        let params: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DocumentQuery::parse(&params, &JsonApiConfig::default()).unwrap()
    }

    #[test]
    fn test_find_field_by_composite_id() {
        let (catalog, _) = catalog();

        let item = catalog.find(MetadataKind::Field, "Post-title").unwrap();
        assert_eq!(item.name(), "title");
        assert_eq!(item.id(), "Post-title");

        // model names may contain the separator
        let item = catalog.find(MetadataKind::Field, "Post-Draft-notes").unwrap();
        assert_eq!(item.name(), "notes");

        assert!(catalog.find(MetadataKind::Field, "Post-body").is_none());
        assert!(catalog.find(MetadataKind::Model, "Comment").is_none());
    }

    #[test]
    fn test_field_types() {
        let (catalog, _) = catalog();
        let types: Vec<&str> = catalog
            .items(MetadataKind::Field)
            .iter()
            .map(|item| match item {
                MetadataItem::Field(_, field) => field_type(field),
                MetadataItem::Model(_) => "",
            })
            .collect();

        assert_eq!(types, vec!["string", "hasOne", "hasMany", "text"]);
    }

    #[test]
    fn test_render_model_with_included_fields() {
        let (catalog, mapping) = catalog();
        let links = LinkBuilder::new("/api");
        let query = query(&[("include", "fields.model")]);
        let mut renderer = MetadataRenderer::new(&catalog, &mapping, &query, &links, 5);

        let post = catalog.find(MetadataKind::Model, "Post").unwrap();
        let mut included = Included::new();
        included.reserve(post.linkage());
        let resource = renderer.render(&post, "", &mut included);

        assert_eq!(resource.attributes["name"], json!("Post"));
        assert_eq!(resource.attributes["resourceType"], json!("posts"));
        assert_eq!(resource.links["self"], "/api/models/Post");
        assert_eq!(
            resource.relationships["fields"].data,
            Some(RelationshipData::Many(vec![
                Linkage::new(FIELD_TYPE, "Post-title"),
                Linkage::new(FIELD_TYPE, "Post-author"),
            ]))
        );

        // Post-author points back at users; Post itself is not repeated
        let keys: Vec<String> = included.iter().map(|r| format!("{}:{}", r.resource_type, r.id)).collect();
        assert_eq!(keys, vec!["model-fields:Post-title", "models:User", "model-fields:Post-author"]);
    }

    #[test]
    fn test_sparse_fieldset_and_links_only() {
        let (catalog, mapping) = catalog();
        let links = LinkBuilder::new("/api");
        let query = query(&[("fields[model-fields]", "fieldType,model")]);
        let mut renderer = MetadataRenderer::new(&catalog, &mapping, &query, &links, 5);

        let field = catalog.find(MetadataKind::Field, "Post-author").unwrap();
        let resource = renderer.render(&field, "", &mut Included::new());

        let attributes: Vec<&String> = resource.attributes.keys().collect();
        assert_eq!(attributes, vec!["fieldType"]);
        let model = &resource.relationships["model"];
        assert_eq!(model.links["related"], "/api/model-fields/Post-author/model");
        assert!(model.data.is_none());
    }
}
