//! Shared fixtures for integration tests
//!
//! A small blog: posts with an author and tags, users listing their posts
//! (which closes a relation cycle), documents carrying a file field and
//! assets whose value is either a stored file or an external URL.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use jsonapi_orm::adapter::{AssetUrlResolver, FileStore, FileStoreError, FileStoreResult};
use jsonapi_orm::filter::{IndexFilterStrategy, SearchIndex, SearchRequest};
use jsonapi_orm::model::{FieldDescriptor, ValueType};
use jsonapi_orm::{BackendError, EntryId, JsonApi, JsonApiResponse, MemoryBackend, ModelMeta};
use serde_json::{json, Value};

// =============================================================================
// Backend
// =============================================================================

pub fn blog_backend() -> MemoryBackend {
    let backend = MemoryBackend::new()
        .with_model(
            ModelMeta::new("Post")
                .with_type("posts")
                .field(FieldDescriptor::property("title", ValueType::String).required())
                .field(FieldDescriptor::property("body", ValueType::Text))
                .field(FieldDescriptor::property("rating", ValueType::Integer))
                .field(FieldDescriptor::property("published", ValueType::Boolean))
                .field(FieldDescriptor::property("secret", ValueType::String).omitted())
                .field(FieldDescriptor::to_one("author", "User"))
                .field(FieldDescriptor::to_many("tags", "Tag"))
                .field(FieldDescriptor::to_one("draft", "Draft")),
        )
        .with_model(
            ModelMeta::new("User")
                .with_type("users")
                .field(FieldDescriptor::property("name", ValueType::String).required())
                .field(FieldDescriptor::to_many("posts", "Post")),
        )
        .with_model(
            ModelMeta::new("Tag")
                .with_type("tags")
                .field(FieldDescriptor::property("name", ValueType::String).required()),
        )
        .with_model(ModelMeta::new("Draft").field(FieldDescriptor::property("notes", ValueType::Text)))
        .with_model(
            ModelMeta::new("Document")
                .with_type("documents")
                .with_filters(["search", "exact"])
                .field(FieldDescriptor::property("name", ValueType::String))
                .field(FieldDescriptor::property("file", ValueType::File)),
        )
        .with_model(
            ModelMeta::new("Asset")
                .with_type("assets")
                .field(FieldDescriptor::property("name", ValueType::String))
                .field(FieldDescriptor::property("value", ValueType::String)),
        );

    seed(&backend);
    backend
}

fn seed(backend: &MemoryBackend) {
    let rows = [
        ("User", json!({"id": "u1", "name": "Ada", "posts": ["p1", "p2"]})),
        ("User", json!({"id": "u2", "name": "Linus", "posts": ["p3"]})),
        ("Tag", json!({"id": "t1", "name": "rust"})),
        ("Tag", json!({"id": "t2", "name": "api"})),
        ("Draft", json!({"id": "d1", "notes": "unfinished"})),
        (
            "Post",
            json!({
                "id": "p1", "title": "Hello", "body": "First post", "rating": 5, "published": true,
                "secret": "hidden", "author": "u1", "tags": ["t1", "t2"], "draft": "d1"
            }),
        ),
        (
            "Post",
            json!({
                "id": "p2", "title": "World", "body": "Second post", "rating": 3, "published": false,
                "author": "u1", "tags": ["t1"]
            }),
        ),
        (
            "Post",
            json!({"id": "p3", "title": "Third", "body": "Rust and more", "rating": 4, "author": "u2", "tags": []}),
        ),
        ("Document", json!({"id": "f1", "name": "logo", "file": "files/logo.png"})),
        ("Document", json!({"id": "f2", "name": "notes", "file": "https://example.com/notes.txt"})),
        ("Asset", json!({"id": "a1", "name": "photo", "value": "files/photo.png"})),
        ("Asset", json!({"id": "a2", "name": "clip", "value": "https://video.example.com/v1"})),
    ];

    for (model, values) in rows {
        backend.insert(model, values).expect("Failed to seed entry");
    }
}

pub fn blog_api() -> JsonApi<MemoryBackend> {
    blog_api_with_index(StaticSearchIndex::default())
}

pub fn blog_api_with_index(index: StaticSearchIndex) -> JsonApi<MemoryBackend> {
    blog_api_with_shared_index(Arc::new(index))
}

pub fn blog_api_with_shared_index(index: Arc<dyn SearchIndex>) -> JsonApi<MemoryBackend> {
    JsonApi::builder(Arc::new(blog_backend()))
        .filter_strategy("search", Arc::new(IndexFilterStrategy::new(index)))
        .build()
        .expect("Failed to build service")
}

// =============================================================================
// External collaborators
// =============================================================================

/// File store keeping contents in memory
#[derive(Debug, Default)]
pub struct MemoryFileStore {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryFileStore {
    pub fn with_file(self, path: &str, data: &[u8]) -> Self {
        self.files.lock().unwrap().insert(path.to_string(), data.to_vec());
        self
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.files.lock().unwrap().len()
    }
}

impl FileStore for MemoryFileStore {
    fn read(&self, path: &str) -> FileStoreResult<Vec<u8>> {
        self.get(path).ok_or_else(|| FileStoreError::NotFound(path.to_string()))
    }

    fn write(&self, mime_type: &str, data: &[u8]) -> FileStoreResult<String> {
        let mut files = self.files.lock().unwrap();
        let extension = mime_type.rsplit('/').next().unwrap_or("bin");
        let path = format!("uploads/{}.{}", files.len() + 1, extension);
        files.insert(path.clone(), data.to_vec());
        Ok(path)
    }
}

/// Asset URLs under a CDN host, with two image styles
#[derive(Debug, Default)]
pub struct CdnResolver;

impl AssetUrlResolver for CdnResolver {
    fn url(&self, value: &str, style: Option<&str>) -> Option<String> {
        Some(match style {
            Some(style) => format!("https://cdn.example.com/{}/{}", style, value),
            None => format!("https://cdn.example.com/{}", value),
        })
    }

    fn image_styles(&self) -> Vec<String> {
        vec!["thumbnail".to_string(), "banner".to_string()]
    }
}

/// Search index answering every query with fixed ids, or failing
#[derive(Debug, Default)]
pub struct StaticSearchIndex {
    pub ids: Vec<&'static str>,
    pub fail: bool,
}

impl SearchIndex for StaticSearchIndex {
    fn search(&self, _model: &ModelMeta, _request: &SearchRequest) -> Result<Vec<EntryId>, BackendError> {
        if self.fail {
            return Err(BackendError::Search("index offline".to_string()));
        }
        Ok(self.ids.iter().map(|id| EntryId::new(*id)).collect())
    }
}

/// Search index matching every stored id, paging its own answer
#[derive(Debug, Default)]
pub struct PagingIndex {
    pub ids: Vec<&'static str>,
    pub requests: Mutex<Vec<SearchRequest>>,
}

impl SearchIndex for PagingIndex {
    fn search(&self, _model: &ModelMeta, request: &SearchRequest) -> Result<Vec<EntryId>, BackendError> {
        self.requests.lock().unwrap().push(request.clone());
        let limit = request.limit.unwrap_or(usize::MAX);
        Ok(self
            .ids
            .iter()
            .skip(request.offset)
            .take(limit)
            .map(|id| EntryId::new(*id))
            .collect())
    }
}

// =============================================================================
// Helpers
// =============================================================================

pub fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Serialized body of a response, `Value::Null` when there is none
pub fn body(response: &JsonApiResponse) -> Value {
    response
        .document()
        .map(|document| serde_json::to_value(document).expect("Failed to serialize document"))
        .unwrap_or(Value::Null)
}

/// Sorted ids of the primary collection
pub fn data_ids(body: &Value) -> Vec<String> {
    let mut ids: Vec<String> = body["data"]
        .as_array()
        .expect("Expected a collection")
        .iter()
        .map(|resource| resource["id"].as_str().unwrap_or_default().to_string())
        .collect();
    ids.sort();
    ids
}

/// `type:id` keys of the included resources, in document order
pub fn included_keys(body: &Value) -> Vec<String> {
    body["included"]
        .as_array()
        .map(|included| {
            included
                .iter()
                .map(|resource| format!("{}:{}", resource["type"].as_str().unwrap_or(""), resource["id"].as_str().unwrap_or("")))
                .collect()
        })
        .unwrap_or_default()
}

pub fn error_codes(body: &Value) -> Vec<String> {
    body["errors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .map(|error| error["code"].as_str().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default()
}
