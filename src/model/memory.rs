//! # In-Memory Backend
//!
//! Reference implementation of the backend contract. Entries live in
//! per-model vectors behind a lock; relations are stored as ids and resolved
//! on read. Used by the test suites and as a model for real backends.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::{Map, Value};
use uuid::Uuid;

use super::backend::{Backend, Condition, ModelQuery, Property, PropertyAccessor, SearchParams};
use super::errors::{BackendError, BackendResult, FieldError, ValidationFailure};
use super::types::{Cardinality, EntryId, ModelMeta};
use crate::document::query::Direction;
use crate::filter::expression::{compare_json_values, loosely_equal};

/// Entry of the in-memory backend
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryEntry {
    model: String,
    id: Option<EntryId>,
    values: Map<String, Value>,
}

impl MemoryEntry {
    pub fn id(&self) -> Option<&EntryId> {
        self.id.as_ref()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Raw stored value; relations hold ids
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Stored values plus the id, as one flat object
    fn as_document(&self) -> Value {
        let mut doc = self.values.clone();
        if let Some(id) = &self.id {
            doc.insert("id".to_string(), Value::String(id.to_string()));
        }
        Value::Object(doc)
    }
}

/// In-memory backend
#[derive(Debug, Default)]
pub struct MemoryBackend {
    models: Vec<Arc<ModelMeta>>,
    data: RwLock<HashMap<String, Vec<MemoryEntry>>>,
    fail_search: AtomicBool,
    executed: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: ModelMeta) -> Self {
        self.models.push(Arc::new(model));
        self
    }

    /// Store an entry without validation, returning its new id
    pub fn insert(&self, model: &str, values: Value) -> BackendResult<EntryId> {
        let meta = self.meta(model)?;
        let values = match values {
            Value::Object(values) => values,
            _ => return Err(BackendError::Storage("Entry values must be an object".to_string())),
        };

        let id = match values.get("id").and_then(EntryId::from_json) {
            Some(id) => id,
            None => EntryId::new(Uuid::new_v4().to_string()),
        };

        let mut entry = MemoryEntry {
            model: meta.name.clone(),
            id: Some(id.clone()),
            values,
        };
        entry.values.remove("id");

        self.write()?.entry(meta.name.clone()).or_default().push(entry);
        Ok(id)
    }

    /// Current stored state of an entry
    pub fn stored(&self, model: &str, id: &EntryId) -> Option<MemoryEntry> {
        let data = self.data.read().ok()?;
        data.get(model)?.iter().find(|e| e.id.as_ref() == Some(id)).cloned()
    }

    /// Number of stored entries of a model
    pub fn len(&self, model: &str) -> usize {
        self.data
            .read()
            .map(|data| data.get(model).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Make every search call fail, simulating an unavailable search backend
    pub fn set_search_failure(&self, fail: bool) {
        self.fail_search.store(fail, Ordering::SeqCst);
    }

    /// Number of executed queries and counts
    pub fn executed_queries(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }

    fn meta(&self, model: &str) -> BackendResult<Arc<ModelMeta>> {
        self.models
            .iter()
            .find(|m| m.name == model)
            .cloned()
            .ok_or_else(|| BackendError::UnknownModel(model.to_string()))
    }

    fn write(&self) -> BackendResult<std::sync::RwLockWriteGuard<'_, HashMap<String, Vec<MemoryEntry>>>> {
        self.data
            .write()
            .map_err(|_| BackendError::Storage("Lock poisoned".to_string()))
    }

    fn read(&self) -> BackendResult<std::sync::RwLockReadGuard<'_, HashMap<String, Vec<MemoryEntry>>>> {
        self.data
            .read()
            .map_err(|_| BackendError::Storage("Lock poisoned".to_string()))
    }

    fn lookup(&self, model: &str, id: &EntryId) -> BackendResult<Option<MemoryEntry>> {
        let data = self.read()?;
        Ok(data
            .get(model)
            .and_then(|entries| entries.iter().find(|e| e.id.as_ref() == Some(id)))
            .cloned())
    }

    /// Apply query conditions
    fn matching(&self, query: &ModelQuery) -> BackendResult<Vec<MemoryEntry>> {
        let data = self.read()?;
        let entries = data.get(query.model()).cloned().unwrap_or_default();

        Ok(entries
            .into_iter()
            .filter(|entry| query.conditions().iter().all(|c| condition_matches(c, entry)))
            .collect())
    }

    fn validate(meta: &ModelMeta, entry: &MemoryEntry) -> ValidationFailure {
        let mut failure = ValidationFailure::new();

        for field in meta.fields.iter().filter(|f| f.options.required) {
            let empty = match entry.values.get(&field.name) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                Some(Value::Array(items)) => items.is_empty(),
                Some(_) => false,
            };

            if empty {
                failure.add(field.name.clone(), FieldError::required(&field.name));
            }
        }

        failure
    }
}

fn condition_matches(condition: &Condition, entry: &MemoryEntry) -> bool {
    let doc = entry.as_document();

    match condition {
        Condition::Exact { field, values } => {
            let field_value = doc.get(field).unwrap_or(&Value::Null);
            match field_value {
                Value::Array(members) => members
                    .iter()
                    .any(|member| values.iter().any(|v| loosely_equal(member, v))),
                _ => values.iter().any(|v| loosely_equal(field_value, v)),
            }
        }
        Condition::Match { field, pattern } => {
            let pattern = pattern.to_lowercase();
            match doc.get(field) {
                Some(Value::String(s)) => s.to_lowercase().contains(&pattern),
                Some(Value::Number(n)) => n.to_string().contains(&pattern),
                _ => false,
            }
        }
        Condition::Text(text) => {
            let text = text.to_lowercase();
            entry.values.values().any(|value| match value {
                Value::String(s) => s.to_lowercase().contains(&text),
                _ => false,
            })
        }
        Condition::Expression(clauses) => clauses.iter().all(|clause| clause.matches(&doc)),
        Condition::IdIn(ids) => entry.id.as_ref().map_or(false, |id| ids.contains(id)),
        Condition::Never => false,
    }
}

impl PropertyAccessor for MemoryBackend {
    type Entry = MemoryEntry;

    fn entry_id(&self, entry: &MemoryEntry) -> Option<EntryId> {
        entry.id.clone()
    }

    fn get_property(
        &self,
        model: &ModelMeta,
        entry: &MemoryEntry,
        field: &str,
    ) -> BackendResult<Property<MemoryEntry>> {
        if field == "id" {
            return Ok(Property::Value(
                entry.id.as_ref().map_or(Value::Null, |id| Value::String(id.to_string())),
            ));
        }

        let descriptor = model.get_field(field).ok_or_else(|| BackendError::UnknownField {
            model: model.name.clone(),
            field: field.to_string(),
        })?;
        let raw = entry.values.get(field).cloned().unwrap_or(Value::Null);

        match descriptor.relation_target() {
            None => Ok(Property::Value(raw)),
            Some((target, Cardinality::ToOne)) => {
                let related = match EntryId::from_json(&raw) {
                    Some(id) => self.lookup(target, &id)?,
                    None => None,
                };
                Ok(Property::One(related))
            }
            Some((target, Cardinality::ToMany)) => {
                let mut related = Vec::new();
                for id in raw.as_array().into_iter().flatten().filter_map(EntryId::from_json) {
                    if let Some(entry) = self.lookup(target, &id)? {
                        related.push(entry);
                    }
                }
                Ok(Property::Many(related))
            }
        }
    }

    fn set_property(
        &self,
        model: &ModelMeta,
        entry: &mut MemoryEntry,
        field: &str,
        value: Property<MemoryEntry>,
    ) -> BackendResult<()> {
        let descriptor = model.get_field(field).ok_or_else(|| BackendError::UnknownField {
            model: model.name.clone(),
            field: field.to_string(),
        })?;

        let id_of = |related: &MemoryEntry| -> BackendResult<Value> {
            related
                .id
                .as_ref()
                .map(|id| Value::String(id.to_string()))
                .ok_or_else(|| BackendError::Storage("Related entry is not persisted".to_string()))
        };

        let stored = match (descriptor.relation_target(), value) {
            (None, Property::Value(value)) => value,
            (Some((_, Cardinality::ToOne)), Property::One(related)) => match related {
                Some(related) => id_of(&related)?,
                None => Value::Null,
            },
            (Some((_, Cardinality::ToMany)), Property::Many(related)) => Value::Array(
                related
                    .iter()
                    .map(id_of)
                    .collect::<BackendResult<Vec<_>>>()?,
            ),
            (Some(_), Property::Value(Value::Null)) => Value::Null,
            _ => {
                return Err(BackendError::Storage(format!(
                    "Value does not fit field '{}' of model '{}'",
                    field, model.name
                )))
            }
        };

        entry.values.insert(field.to_string(), stored);
        Ok(())
    }
}

impl Backend for MemoryBackend {
    fn models(&self) -> Vec<Arc<ModelMeta>> {
        self.models.clone()
    }

    fn model(&self, name: &str) -> Option<Arc<ModelMeta>> {
        self.meta(name).ok()
    }

    fn get_entry(&self, model: &ModelMeta, id: &EntryId) -> BackendResult<Option<MemoryEntry>> {
        self.lookup(&model.name, id)
    }

    fn create_entry(&self, model: &ModelMeta) -> BackendResult<MemoryEntry> {
        Ok(MemoryEntry {
            model: model.name.clone(),
            id: None,
            values: Map::new(),
        })
    }

    fn save(&self, model: &ModelMeta, entry: &mut MemoryEntry) -> BackendResult<()> {
        let failure = Self::validate(model, entry);
        if !failure.is_empty() {
            return Err(BackendError::Validation(failure));
        }

        if entry.id.is_none() {
            entry.id = Some(EntryId::new(Uuid::new_v4().to_string()));
        }

        let mut data = self.write()?;
        let entries = data.entry(model.name.clone()).or_default();
        match entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry.clone(),
            None => entries.push(entry.clone()),
        }

        Ok(())
    }

    fn delete(&self, model: &ModelMeta, entry: &MemoryEntry) -> BackendResult<()> {
        let id = entry
            .id
            .as_ref()
            .ok_or_else(|| BackendError::Storage("Entry is not persisted".to_string()))?;

        let mut data = self.write()?;
        if let Some(entries) = data.get_mut(&model.name) {
            entries.retain(|e| e.id.as_ref() != Some(id));
        }

        Ok(())
    }

    fn execute(&self, query: &ModelQuery) -> BackendResult<Vec<MemoryEntry>> {
        self.executed.fetch_add(1, Ordering::SeqCst);
        let mut entries = self.matching(query)?;

        if !query.order_by().is_empty() {
            entries.sort_by(|a, b| {
                let (a, b) = (a.as_document(), b.as_document());
                for order in query.order_by() {
                    let a_val = a.get(&order.field).unwrap_or(&Value::Null);
                    let b_val = b.get(&order.field).unwrap_or(&Value::Null);

                    let cmp = compare_json_values(a_val, b_val).cmp(&0);
                    let cmp = match order.direction {
                        Direction::Asc => cmp,
                        Direction::Desc => cmp.reverse(),
                    };
                    if cmp != std::cmp::Ordering::Equal {
                        return cmp;
                    }
                }
                std::cmp::Ordering::Equal
            });
        }

        Ok(entries
            .into_iter()
            .skip(query.offset())
            .take(query.limit().unwrap_or(usize::MAX))
            .collect())
    }

    fn count(&self, query: &ModelQuery) -> BackendResult<usize> {
        self.executed.fetch_add(1, Ordering::SeqCst);
        Ok(self.matching(query)?.len())
    }

    fn apply_search(&self, query: &mut ModelQuery, search: &SearchParams) -> BackendResult<()> {
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(BackendError::Search("Search backend unavailable".to_string()));
        }

        let meta = self.meta(query.model())?;

        if let Some(text) = &search.query {
            query.add_condition(Condition::Text(text.clone()));
        }

        for (field, value) in search.filter.iter().flatten() {
            if !meta.has_field(field) {
                return Err(BackendError::UnknownField {
                    model: meta.name.clone(),
                    field: field.clone(),
                });
            }
            let values = match value {
                Value::Array(values) => values.clone(),
                other => vec![other.clone()],
            };
            query.add_condition(Condition::Exact {
                field: field.clone(),
                values,
            });
        }

        for (field, value) in search.matches.iter().flatten() {
            if !meta.has_field(field) {
                return Err(BackendError::UnknownField {
                    model: meta.name.clone(),
                    field: field.clone(),
                });
            }
            let pattern = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            query.add_condition(Condition::Match {
                field: field.clone(),
                pattern,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldDescriptor, ValueType};
    use serde_json::json;

    fn backend() -> MemoryBackend {
        MemoryBackend::new()
            .with_model(
                ModelMeta::new("Post")
                    .field(FieldDescriptor::property("title", ValueType::String).required())
                    .field(FieldDescriptor::property("rating", ValueType::Integer))
                    .field(FieldDescriptor::to_one("author", "User"))
                    .field(FieldDescriptor::to_many("tags", "Tag")),
            )
            .with_model(ModelMeta::new("User").field(FieldDescriptor::property("name", ValueType::String)))
            .with_model(ModelMeta::new("Tag").field(FieldDescriptor::property("name", ValueType::String)))
    }

    #[test]
    fn test_insert_and_resolve_relations() {
        let backend = backend();
        let user = backend.insert("User", json!({"name": "Ada"})).unwrap();
        let tag = backend.insert("Tag", json!({"id": "t1", "name": "rust"})).unwrap();
        let post = backend
            .insert("Post", json!({"title": "Hi", "author": user.as_str(), "tags": ["t1", "gone"]}))
            .unwrap();

        let meta = backend.model("Post").unwrap();
        let entry = backend.get_entry(&meta, &post).unwrap().unwrap();

        match backend.get_property(&meta, &entry, "author").unwrap() {
            Property::One(Some(author)) => assert_eq!(author.id(), Some(&user)),
            other => panic!("unexpected {:?}", other),
        }
        match backend.get_property(&meta, &entry, "tags").unwrap() {
            Property::Many(tags) => {
                assert_eq!(tags.len(), 1);
                assert_eq!(tags[0].id(), Some(&tag));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_save_validates_required_fields() {
        let backend = backend();
        let meta = backend.model("Post").unwrap();
        let mut entry = backend.create_entry(&meta).unwrap();

        match backend.save(&meta, &mut entry) {
            Err(BackendError::Validation(failure)) => assert_eq!(failure.len(), 1),
            other => panic!("unexpected {:?}", other),
        }
        assert!(entry.id().is_none());

        backend
            .set_property(&meta, &mut entry, "title", Property::Value(json!("Hello")))
            .unwrap();
        backend.save(&meta, &mut entry).unwrap();
        assert!(entry.id().is_some());
        assert_eq!(backend.len("Post"), 1);
    }

    #[test]
    fn test_default_add_and_remove() {
        let backend = backend();
        let t1 = backend.insert("Tag", json!({"name": "a"})).unwrap();
        let t2 = backend.insert("Tag", json!({"name": "b"})).unwrap();
        let post = backend.insert("Post", json!({"title": "x", "tags": [t1.as_str()]})).unwrap();

        let meta = backend.model("Post").unwrap();
        let tag_meta = backend.model("Tag").unwrap();
        let mut entry = backend.get_entry(&meta, &post).unwrap().unwrap();
        let tag1 = backend.get_entry(&tag_meta, &t1).unwrap().unwrap();
        let tag2 = backend.get_entry(&tag_meta, &t2).unwrap().unwrap();

        backend.add_to(&meta, &mut entry, "tags", tag2.clone()).unwrap();
        backend.add_to(&meta, &mut entry, "tags", tag2).unwrap();
        assert_eq!(entry.value("tags"), Some(&json!([t1.as_str(), t2.as_str()])));

        backend.remove_from(&meta, &mut entry, "tags", &tag1).unwrap();
        assert_eq!(entry.value("tags"), Some(&json!([t2.as_str()])));
    }

    #[test]
    fn test_query_conditions_order_and_page() {
        let backend = backend();
        for (title, rating) in [("b", 2), ("a", 5), ("c", 3), ("d", 1)] {
            backend.insert("Post", json!({"title": title, "rating": rating})).unwrap();
        }

        let mut query = ModelQuery::new("Post");
        query.add_condition(Condition::Expression(vec![crate::filter::FilterExpr::new(
            "rating",
            crate::filter::FilterOperator::Gte,
            json!(2),
        )]));
        query.add_order_by("rating", Direction::Desc);
        query.set_limit(2, 0);

        let titles: Vec<_> = backend
            .execute(&query)
            .unwrap()
            .iter()
            .map(|e| e.value("title").cloned().unwrap())
            .collect();
        assert_eq!(titles, vec![json!("a"), json!("c")]);
        assert_eq!(backend.count(&query).unwrap(), 3);
        assert_eq!(backend.executed_queries(), 2);
    }

    #[test]
    fn test_apply_search() {
        let backend = backend();
        backend.insert("Post", json!({"title": "Rust in depth", "rating": 4})).unwrap();
        backend.insert("Post", json!({"title": "Go basics", "rating": 4})).unwrap();

        let mut query = ModelQuery::new("Post");
        let mut filter = Map::new();
        filter.insert("rating".to_string(), json!(["4"]));
        backend
            .apply_search(
                &mut query,
                &SearchParams {
                    query: Some("rust".to_string()),
                    filter: Some(filter),
                    matches: None,
                },
            )
            .unwrap();
        assert_eq!(backend.execute(&query).unwrap().len(), 1);

        backend.set_search_failure(true);
        let mut failing = ModelQuery::new("Post");
        assert!(backend.apply_search(&mut failing, &SearchParams::default()).is_err());
    }
}
