//! # Document Assembler
//!
//! Aggregates primary data, included resources, links, meta and errors into
//! the top-level document. A document in error state never serializes
//! primary data or included resources.

use std::collections::HashSet;

use axum::http::StatusCode;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::error::ApiError;
use super::resource::{Linkage, Links, RelationshipData, Resource};

/// Primary data of a document
#[derive(Debug, Clone, PartialEq)]
pub enum PrimaryData {
    /// Single resource, `null` when absent
    Resource(Option<Resource>),
    /// Resource collection
    Collection(Vec<Resource>),
    /// Linkage of a relationship endpoint
    Relationship(RelationshipData),
}

impl Serialize for PrimaryData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PrimaryData::Resource(resource) => resource.serialize(serializer),
            PrimaryData::Collection(resources) => resources.serialize(serializer),
            PrimaryData::Relationship(data) => data.serialize(serializer),
        }
    }
}

/// Included resources, unique by (type, id)
///
/// The first occurrence of a node wins; later occurrences only contribute
/// linkage. Primary resources are reserved so they never appear here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Included {
    resources: Vec<Resource>,
    seen: HashSet<Linkage>,
}

impl Included {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a node as present elsewhere in the document
    ///
    /// Returns `false` when the node was already known.
    pub fn reserve(&mut self, linkage: Linkage) -> bool {
        self.seen.insert(linkage)
    }

    /// Add a node whose linkage was reserved before rendering it
    pub fn push_reserved(&mut self, resource: Resource) {
        self.seen.insert(resource.linkage());
        self.resources.push(resource);
    }

    /// Add a node unless one with the same (type, id) is known
    pub fn insert(&mut self, resource: Resource) -> bool {
        if !self.seen.insert(resource.linkage()) {
            return false;
        }
        self.resources.push(resource);
        true
    }

    pub fn contains(&self, linkage: &Linkage) -> bool {
        self.seen.contains(linkage)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }
}

/// Top-level JSON:API document
#[derive(Debug, Clone, PartialEq)]
pub struct JsonApiDocument {
    data: Option<PrimaryData>,
    included: Included,
    errors: Vec<ApiError>,
    links: Links,
    meta: Map<String, Value>,
    status: StatusCode,
}

impl Default for JsonApiDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonApiDocument {
    pub fn new() -> Self {
        Self {
            data: None,
            included: Included::new(),
            errors: Vec::new(),
            links: Links::new(),
            meta: Map::new(),
            status: StatusCode::OK,
        }
    }

    /// Document holding a single error
    pub fn from_error(error: ApiError) -> Self {
        let mut document = Self::new();
        document.add_error(error);
        document
    }

    pub fn set_data(&mut self, data: PrimaryData) {
        self.data = Some(data);
    }

    pub fn data(&self) -> Option<&PrimaryData> {
        self.data.as_ref()
    }

    pub fn included(&self) -> &Included {
        &self.included
    }

    pub fn included_mut(&mut self) -> &mut Included {
        &mut self.included
    }

    pub fn add_error(&mut self, error: ApiError) {
        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ApiError] {
        &self.errors
    }

    pub fn set_link(&mut self, name: impl Into<String>, href: impl Into<String>) {
        self.links.insert(name.into(), href.into());
    }

    pub fn link(&self, name: &str) -> Option<&str> {
        self.links.get(name).map(String::as_str)
    }

    pub fn set_meta(&mut self, name: impl Into<String>, value: Value) {
        self.meta.insert(name.into(), value);
    }

    pub fn meta(&self, name: &str) -> Option<&Value> {
        self.meta.get(name)
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Response status: the first error's status, or the one set by the
    /// producing operation
    pub fn status(&self) -> StatusCode {
        self.errors.first().map_or(self.status, |error| error.status)
    }

    /// Whether the document carries anything worth a response body
    pub fn has_content(&self) -> bool {
        self.data.is_some() || self.has_errors() || !self.meta.is_empty()
    }
}

impl Serialize for JsonApiDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;

        if self.has_errors() {
            map.serialize_entry("errors", &self.errors)?;
        } else {
            if let Some(data) = &self.data {
                map.serialize_entry("data", data)?;
            }
            if !self.included.is_empty() {
                map.serialize_entry("included", &self.included.resources)?;
            }
        }

        if !self.links.is_empty() {
            map.serialize_entry("links", &self.links)?;
        }
        if !self.meta.is_empty() {
            map.serialize_entry("meta", &self.meta)?;
        }

        map.end()
    }
}
