//! # Mutation Engine
//!
//! Turns incoming resource objects into entry mutations. Structural and
//! input errors are collected as error objects with JSON pointers into the
//! request body; the caller only persists when no error was collected.

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::processor::FieldValueProcessor;
use crate::document::ApiError;
use crate::model::{
    Backend, BackendResult, Cardinality, EntryId, FieldDescriptor, ModelMeta, Property, ValidationFailure,
};
use crate::registry::TypeMapping;

/// How a relationship endpoint applies submitted linkage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipVerb {
    /// PATCH: replace the relation
    Replace,
    /// POST: add members to a to-many relation
    Add,
    /// DELETE: remove members from a to-many relation
    Remove,
}

/// JSON pointer to a member of the submitted resource
fn pointer(index: Option<usize>, member: &str) -> String {
    match index {
        Some(index) => format!("/data/{}{}", index, member),
        None => format!("/data{}", member),
    }
}

/// Map backend validation failures to error objects
///
/// Property fields point at `attributes`, everything else at
/// `relationships`.
pub fn translate_validation(failure: &ValidationFailure, model: &ModelMeta, index: Option<usize>) -> Vec<ApiError> {
    let mut errors = Vec::new();

    for (field, field_errors) in failure.errors() {
        let member = match model.get_field(field) {
            Some(descriptor) if descriptor.is_property() => "attributes",
            _ => "relationships",
        };
        let source = pointer(index, &format!("/{}/{}", member, field));

        for error in field_errors {
            errors.push(
                ApiError::bad_request(error.code.clone(), error.message.clone())
                    .with_detail(error.to_string())
                    .with_pointer(source.clone()),
            );
        }
    }

    errors
}

/// One mutation request
pub struct MutationEngine<'a, B: Backend + ?Sized> {
    backend: &'a B,
    mapping: &'a TypeMapping,
    processors: &'a [Arc<dyn FieldValueProcessor<B>>],
    errors: Vec<ApiError>,
}

impl<'a, B: Backend + ?Sized> MutationEngine<'a, B> {
    pub fn new(
        backend: &'a B,
        mapping: &'a TypeMapping,
        processors: &'a [Arc<dyn FieldValueProcessor<B>>],
    ) -> Self {
        Self {
            backend,
            mapping,
            processors,
            errors: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ApiError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ApiError> {
        self.errors
    }

    pub fn add_error(&mut self, error: ApiError) {
        self.errors.push(error);
    }

    /// Build or update an entry from a submitted resource object
    ///
    /// `id` is the id of the addressed entry, `None` when creating. `index`
    /// is the position in a bulk payload. Returns `None` when the resource
    /// was rejected before any field was assigned.
    pub fn entry_from_resource(
        &mut self,
        model: &ModelMeta,
        resource_type: &str,
        data: &Value,
        id: Option<&EntryId>,
        index: Option<usize>,
    ) -> BackendResult<Option<B::Entry>> {
        let data = match data.as_object() {
            Some(data) => data,
            None => {
                self.add_error(
                    ApiError::bad_request("input.data", "Invalid data submitted")
                        .with_detail("Resource object expected")
                        .with_pointer(pointer(index, "")),
                );
                return Ok(None);
            }
        };

        match data.get("type").and_then(Value::as_str) {
            None => {
                self.add_error(
                    ApiError::bad_request("input.type", "No type submitted")
                        .with_detail("Resource object has no type member")
                        .with_pointer(pointer(index, "/type")),
                );
                return Ok(None);
            }
            Some(submitted) if submitted != resource_type => {
                self.add_error(
                    ApiError::conflict("type.match", "Submitted type does not match the URL type")
                        .with_detail(format!("Expected type '{}', got '{}'", resource_type, submitted))
                        .with_pointer(pointer(index, "/type")),
                );
                return Ok(None);
            }
            Some(_) => {}
        }

        let submitted_id = data.get("id").filter(|id| !id.is_null());
        let mut entry = match id {
            Some(id) => match self.backend.get_entry(model, id)? {
                Some(entry) => entry,
                None => {
                    self.add_error(ApiError::resource_not_found(resource_type, id.as_str()));
                    return Ok(None);
                }
            },
            None => self.backend.create_entry(model)?,
        };

        match (id, submitted_id) {
            (None, Some(submitted)) => {
                self.add_error(
                    ApiError::bad_request("input.id", "Client generated ids are not supported")
                        .with_detail(format!("Id {} submitted for a new resource", submitted))
                        .with_pointer(pointer(index, "/id")),
                );
                return Ok(None);
            }
            (Some(path_id), Some(submitted)) => {
                let entry_id = self.backend.entry_id(&entry);
                let submitted = EntryId::from_json(submitted);
                if submitted.as_ref() != Some(path_id) || submitted != entry_id {
                    self.add_error(
                        ApiError::conflict("type.match", "Submitted id does not match the URL id")
                            .with_detail(format!("Expected id '{}'", path_id))
                            .with_pointer(pointer(index, "/id")),
                    );
                    return Ok(None);
                }
            }
            _ => {}
        }

        if let Some(attributes) = data.get("attributes") {
            match attributes.as_object() {
                Some(attributes) => self.assign_attributes(model, resource_type, &mut entry, attributes, index)?,
                None => self.add_error(
                    ApiError::bad_request("input.data", "Invalid data submitted")
                        .with_detail("Attributes must be an object")
                        .with_pointer(pointer(index, "/attributes")),
                ),
            }
        }

        if let Some(relationships) = data.get("relationships") {
            match relationships.as_object() {
                Some(relationships) => {
                    self.assign_relationships(model, resource_type, &mut entry, relationships, index)?
                }
                None => self.add_error(
                    ApiError::bad_request("input.data", "Invalid data submitted")
                        .with_detail("Relationships must be an object")
                        .with_pointer(pointer(index, "/relationships")),
                ),
            }
        }

        Ok(Some(entry))
    }

    fn assign_attributes(
        &mut self,
        model: &ModelMeta,
        resource_type: &str,
        entry: &mut B::Entry,
        attributes: &Map<String, Value>,
        index: Option<usize>,
    ) -> BackendResult<()> {
        for (name, value) in attributes {
            let field = match model.get_field(name) {
                Some(field) if field.is_property() && !field.is_synthetic() => field,
                _ => {
                    self.add_error(
                        ApiError::bad_request("input.attribute", "Could not set attribute")
                            .with_detail(format!("Attribute '{}' does not exist for type '{}'", name, resource_type))
                            .with_pointer(pointer(index, &format!("/attributes/{}", name))),
                    );
                    continue;
                }
            };

            let value = self.process_value(model, field, entry, value.clone(), index);
            self.backend
                .set_property(model, entry, name, Property::Value(value))?;
        }

        Ok(())
    }

    /// Run the processor chain; a failure records an error and yields `null`
    fn process_value(
        &mut self,
        model: &ModelMeta,
        field: &FieldDescriptor,
        entry: &B::Entry,
        mut value: Value,
        index: Option<usize>,
    ) -> Value {
        for processor in self.processors {
            match processor.process_input_value(self.backend, model, field, entry, value) {
                Ok(processed) => value = processed,
                Err(e) => {
                    warn!(model = %model.name, field = %field.name, error = %e, "Field value processor failed");
                    self.add_error(
                        ApiError::bad_request(
                            "input.attribute.processor",
                            format!("Attribute '{}' generated an error", field.name),
                        )
                        .with_detail(e.to_string())
                        .with_pointer(pointer(index, &format!("/attributes/{}", field.name))),
                    );
                    return Value::Null;
                }
            }
        }

        value
    }

    fn assign_relationships(
        &mut self,
        model: &ModelMeta,
        resource_type: &str,
        entry: &mut B::Entry,
        relationships: &Map<String, Value>,
        index: Option<usize>,
    ) -> BackendResult<()> {
        for (name, relationship) in relationships {
            let source = pointer(index, &format!("/relationships/{}", name));

            let (target, cardinality) = match model.get_field(name).and_then(FieldDescriptor::relation_target) {
                Some(relation) => relation,
                None => {
                    self.add_error(ApiError::relationship_not_found(resource_type, name).with_pointer(source));
                    continue;
                }
            };

            let data = match relationship.as_object().and_then(|r| r.get("data")) {
                Some(data) => data,
                None => {
                    self.add_error(
                        ApiError::bad_request("input.relationship.data", "Could not set relationship")
                            .with_detail(format!("Relationship '{}' has no data member", name))
                            .with_pointer(source),
                    );
                    continue;
                }
            };

            let value = match self.resolve_data(target, cardinality, data, &format!("{}/data", source))? {
                Some(value) => value,
                None => continue,
            };
            self.backend
                .set_property(model, entry, name, normalize(cardinality, value))?;
        }

        Ok(())
    }

    /// Resolve relationship data into entries
    ///
    /// `null` clears, an object resolves one entry and an array resolves each
    /// member; failing members are recorded and the others kept. Returns
    /// `None` when the data was rejected as a whole.
    pub fn resolve_data(
        &mut self,
        target: &str,
        cardinality: Cardinality,
        data: &Value,
        source: &str,
    ) -> BackendResult<Option<Property<B::Entry>>> {
        match data {
            Value::Null => Ok(Some(Property::One(None))),
            Value::Array(references) => {
                if cardinality == Cardinality::ToOne {
                    self.add_error(
                        ApiError::bad_request("input.data.array", "Invalid data submitted")
                            .with_detail("A to-one relationship can not be an array")
                            .with_pointer(source.to_string()),
                    );
                    return Ok(None);
                }

                let mut members = Vec::with_capacity(references.len());
                for (i, reference) in references.iter().enumerate() {
                    if let Some(member) = self.resolve_linkage(target, reference, &format!("{}/{}", source, i))? {
                        members.push(member);
                    }
                }
                Ok(Some(Property::Many(members)))
            }
            Value::Object(_) => match self.resolve_linkage(target, data, source)? {
                Some(entry) => Ok(Some(Property::One(Some(entry)))),
                None => Ok(None),
            },
            other => {
                self.add_error(
                    ApiError::bad_request("relationship", "Invalid relationship received")
                        .with_detail(other.to_string())
                        .with_pointer(source.to_string()),
                );
                Ok(None)
            }
        }
    }

    /// Resolve a `{type, id}` reference to an entry of the target model
    fn resolve_linkage(&mut self, target: &str, reference: &Value, source: &str) -> BackendResult<Option<B::Entry>> {
        let invalid = |code: &str, detail: String| {
            ApiError::bad_request(code, "Invalid relationship received")
                .with_detail(detail)
                .with_pointer(source.to_string())
        };

        let reference = match reference.as_object() {
            Some(reference) => reference,
            None => {
                self.add_error(invalid("relationship", reference.to_string()));
                return Ok(None);
            }
        };

        let resource_type = match reference.get("type").and_then(Value::as_str) {
            Some(resource_type) => resource_type,
            None => {
                self.add_error(invalid("relationship.type", "No type provided".to_string()));
                return Ok(None);
            }
        };

        let id = match reference.get("id").and_then(EntryId::from_json) {
            Some(id) => id,
            None => {
                self.add_error(invalid("relationship.id", "No id provided".to_string()));
                return Ok(None);
            }
        };

        let model_name = match self.mapping.model(resource_type) {
            Some(model_name) => model_name,
            None => {
                self.add_error(ApiError::type_not_found(resource_type).with_pointer(source.to_string()));
                return Ok(None);
            }
        };

        if model_name != target {
            self.add_error(
                ApiError::bad_request("input.data", "Invalid data submitted")
                    .with_detail(format!("Type '{}' does not match the relationship", resource_type))
                    .with_pointer(source.to_string()),
            );
            return Ok(None);
        }

        let model = match self.backend.model(model_name) {
            Some(model) => model,
            None => {
                self.add_error(ApiError::type_not_found(resource_type).with_pointer(source.to_string()));
                return Ok(None);
            }
        };

        match self.backend.get_entry(&model, &id)? {
            Some(entry) => Ok(Some(entry)),
            None => {
                self.add_error(
                    ApiError::new(StatusCode::NOT_FOUND, "relationship.found", "Resource does not exist")
                        .with_detail(format!(
                            "Resource with type '{}' and id '{}' does not exist",
                            resource_type, id
                        ))
                        .with_pointer(source.to_string()),
                );
                Ok(None)
            }
        }
    }

    /// Apply resolved relationship data with the verb of the request
    ///
    /// Add and remove only change to-many relations member by member; a
    /// to-one relation is always replaced.
    pub fn apply_relationship(
        &self,
        model: &ModelMeta,
        entry: &mut B::Entry,
        field: &str,
        cardinality: Cardinality,
        verb: RelationshipVerb,
        value: Property<B::Entry>,
    ) -> BackendResult<()> {
        let value = normalize(cardinality, value);

        let members = match (cardinality, verb, value) {
            (Cardinality::ToMany, RelationshipVerb::Add | RelationshipVerb::Remove, Property::Many(members)) => members,
            (_, _, value) => return self.backend.set_property(model, entry, field, value),
        };

        debug!(model = %model.name, field, ?verb, members = members.len(), "Updating to-many relationship");
        for member in members {
            match verb {
                RelationshipVerb::Remove => self.backend.remove_from(model, entry, field, &member)?,
                _ => self.backend.add_to(model, entry, field, member)?,
            }
        }

        Ok(())
    }
}

/// Shape resolved data after the cardinality of the field
fn normalize<E>(cardinality: Cardinality, value: Property<E>) -> Property<E> {
    match (cardinality, value) {
        (Cardinality::ToMany, Property::One(Some(entry))) => Property::Many(vec![entry]),
        (Cardinality::ToMany, Property::One(None)) => Property::Many(Vec::new()),
        (_, value) => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ErrorSource;
    use crate::model::{FieldError, MemoryBackend, MemoryEntry, ValueType};
    use crate::mutation::processor::{ProcessorError, ProcessorResult};
    use serde_json::json;

    fn backend() -> MemoryBackend {
        let backend = MemoryBackend::new()
            .with_model(
                ModelMeta::new("Post")
                    .with_type("posts")
                    .field(FieldDescriptor::property("title", ValueType::String))
                    .field(FieldDescriptor::to_one("author", "User"))
                    .field(FieldDescriptor::to_many("tags", "Tag")),
            )
            .with_model(ModelMeta::new("User").with_type("users"))
            .with_model(ModelMeta::new("Tag").with_type("tags"));

        backend.insert("User", json!({"id": "1"}));
        backend.insert("Tag", json!({"id": "a"}));
        backend.insert("Tag", json!({"id": "b"}));
        backend.insert("Post", json!({"id": "10", "title": "Old", "author": "1", "tags": ["a"]}));
        backend
    }

    fn build(
        backend: &MemoryBackend,
        data: Value,
        id: Option<&str>,
        index: Option<usize>,
    ) -> (Option<MemoryEntry>, Vec<ApiError>) {
        let mapping = TypeMapping::build(backend);
        let processors: Vec<Arc<dyn FieldValueProcessor<MemoryBackend>>> = Vec::new();
        let model = backend.model("Post").unwrap();
        let mut engine = MutationEngine::new(backend, &mapping, &processors);
        let id = id.map(EntryId::from);

        let entry = engine
            .entry_from_resource(&model, "posts", &data, id.as_ref(), index)
            .unwrap();
        (entry, engine.into_errors())
    }

    fn codes(errors: &[ApiError]) -> Vec<&str> {
        errors.iter().map(|e| e.code.as_str()).collect()
    }

    #[test]
    fn test_create_assigns_fields() {
        let backend = backend();
        let (entry, errors) = build(
            &backend,
            json!({
                "type": "posts",
                "attributes": {"title": "New"},
                "relationships": {
                    "author": {"data": {"type": "users", "id": "1"}},
                    "tags": {"data": [{"type": "tags", "id": "a"}, {"type": "tags", "id": "b"}]}
                }
            }),
            None,
            None,
        );

        assert!(errors.is_empty());
        let entry = entry.unwrap();
        assert_eq!(entry.value("title"), Some(&json!("New")));
        assert_eq!(entry.value("author"), Some(&json!("1")));
        assert_eq!(entry.value("tags"), Some(&json!(["a", "b"])));
    }

    #[test]
    fn test_type_checks() {
        let backend = backend();

        let (_, errors) = build(&backend, json!({"attributes": {}}), None, None);
        assert_eq!(codes(&errors), vec!["input.type"]);

        let (_, errors) = build(&backend, json!({"type": "users"}), None, None);
        assert_eq!(codes(&errors), vec!["type.match"]);
        assert_eq!(errors[0].status, StatusCode::CONFLICT);
    }

    #[test]
    fn test_client_id_rejected_on_create() {
        let backend = backend();
        let (entry, errors) = build(&backend, json!({"type": "posts", "id": "99"}), None, Some(2));

        assert!(entry.is_none());
        assert_eq!(codes(&errors), vec!["input.id"]);
        assert_eq!(errors[0].status, StatusCode::BAD_REQUEST);
        assert_eq!(errors[0].source, Some(ErrorSource::Pointer("/data/2/id".to_string())));
    }

    #[test]
    fn test_update_id_mismatch() {
        let backend = backend();

        let (_, errors) = build(&backend, json!({"type": "posts", "id": "11"}), Some("10"), None);
        assert_eq!(codes(&errors), vec!["type.match"]);

        let (entry, errors) = build(&backend, json!({"type": "posts", "id": "10"}), Some("10"), None);
        assert!(errors.is_empty());
        assert!(entry.is_some());

        let (_, errors) = build(&backend, json!({"type": "posts"}), Some("404"), None);
        assert_eq!(codes(&errors), vec!["resource.found"]);
    }

    #[test]
    fn test_unknown_members_are_reported_individually() {
        let backend = backend();
        let (entry, errors) = build(
            &backend,
            json!({
                "type": "posts",
                "attributes": {"nope": 1, "title": "Kept"},
                "relationships": {
                    "editor": {"data": null},
                    "author": {"links": {}},
                    "tags": {"data": [{"type": "tags", "id": "a"}, {"type": "tags", "id": "zzz"}, {"id": "b"}]}
                }
            }),
            None,
            None,
        );

        assert_eq!(
            codes(&errors),
            vec![
                "input.attribute",
                "input.relationship.data",
                "input.relationship",
                "relationship.found",
                "relationship.type",
            ]
        );
        assert_eq!(
            errors[0].source,
            Some(ErrorSource::Pointer("/data/attributes/nope".to_string()))
        );
        let entry = entry.unwrap();
        assert_eq!(entry.value("title"), Some(&json!("Kept")));
        assert_eq!(entry.value("tags"), Some(&json!(["a"])));
    }

    #[test]
    fn test_relationship_shapes() {
        let backend = backend();

        let (_, errors) = build(
            &backend,
            json!({"type": "posts", "relationships": {"author": {"data": [{"type": "users", "id": "1"}]}}}),
            None,
            None,
        );
        assert_eq!(codes(&errors), vec!["input.data.array"]);

        let (_, errors) = build(
            &backend,
            json!({"type": "posts", "relationships": {"author": {"data": {"type": "tags", "id": "a"}}}}),
            None,
            None,
        );
        assert_eq!(codes(&errors), vec!["input.data"]);

        let (entry, errors) = build(
            &backend,
            json!({"type": "posts", "relationships": {"author": {"data": null}, "tags": {"data": []}}}),
            Some("10"),
            None,
        );
        assert!(errors.is_empty());
        let entry = entry.unwrap();
        assert_eq!(entry.value("author"), Some(&Value::Null));
        assert_eq!(entry.value("tags"), Some(&json!([])));
    }

    struct Failing;

    impl FieldValueProcessor<MemoryBackend> for Failing {
        fn process_input_value(
            &self,
            _backend: &MemoryBackend,
            _model: &ModelMeta,
            _field: &FieldDescriptor,
            _entry: &MemoryEntry,
            _value: Value,
        ) -> ProcessorResult<Value> {
            Err(ProcessorError::Invalid("broken".to_string()))
        }
    }

    #[test]
    fn test_processor_failure_degrades_to_null() {
        let backend = backend();
        let mapping = TypeMapping::build(&backend);
        let processors: Vec<Arc<dyn FieldValueProcessor<MemoryBackend>>> = vec![Arc::new(Failing)];
        let model = backend.model("Post").unwrap();
        let mut engine = MutationEngine::new(&backend, &mapping, &processors);

        let entry = engine
            .entry_from_resource(&model, "posts", &json!({"type": "posts", "attributes": {"title": "x"}}), None, None)
            .unwrap()
            .unwrap();

        assert_eq!(entry.value("title"), Some(&Value::Null));
        assert_eq!(codes(engine.errors()), vec!["input.attribute.processor"]);
    }

    #[test]
    fn test_apply_relationship_verbs() {
        let backend = backend();
        let mapping = TypeMapping::build(&backend);
        let processors: Vec<Arc<dyn FieldValueProcessor<MemoryBackend>>> = Vec::new();
        let model = backend.model("Post").unwrap();
        let tag_model = backend.model("Tag").unwrap();
        let engine = MutationEngine::new(&backend, &mapping, &processors);
        let mut entry = backend.get_entry(&model, &EntryId::from("10")).unwrap().unwrap();
        let tag_b = backend.get_entry(&tag_model, &EntryId::from("b")).unwrap().unwrap();
        let tag_a = backend.get_entry(&tag_model, &EntryId::from("a")).unwrap().unwrap();

        engine
            .apply_relationship(&model, &mut entry, "tags", Cardinality::ToMany, RelationshipVerb::Add, Property::Many(vec![tag_b.clone()]))
            .unwrap();
        assert_eq!(entry.value("tags"), Some(&json!(["a", "b"])));

        engine
            .apply_relationship(&model, &mut entry, "tags", Cardinality::ToMany, RelationshipVerb::Remove, Property::One(Some(tag_a)))
            .unwrap();
        assert_eq!(entry.value("tags"), Some(&json!(["b"])));

        engine
            .apply_relationship(&model, &mut entry, "tags", Cardinality::ToMany, RelationshipVerb::Replace, Property::Many(Vec::new()))
            .unwrap();
        assert_eq!(entry.value("tags"), Some(&json!([])));
    }

    #[test]
    fn test_translate_validation() {
        let backend = backend();
        let model = backend.model("Post").unwrap();
        let mut failure = ValidationFailure::new();
        failure.add("title", FieldError::required("title"));
        failure.add("author", FieldError::new("invalid", "Author is invalid").with_detail("inactive"));

        let errors = translate_validation(&failure, &model, Some(1));
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].code, "required");
        assert_eq!(
            errors[0].source,
            Some(ErrorSource::Pointer("/data/1/attributes/title".to_string()))
        );
        assert_eq!(
            errors[1].source,
            Some(ErrorSource::Pointer("/data/1/relationships/author".to_string()))
        );
        assert_eq!(errors[1].detail.as_deref(), Some("Author is invalid: inactive"));
    }
}
