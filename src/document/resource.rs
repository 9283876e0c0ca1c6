//! # Resource Objects
//!
//! Output nodes of a document: resources, relationships and linkage.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

/// Named links, e.g. `self` and `related`
pub type Links = BTreeMap<String, String>;

/// Minimal `{type, id}` reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Linkage {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
}

impl Linkage {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }
}

/// Resource linkage of a relationship
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RelationshipData {
    /// To-one, `null` when empty
    One(Option<Linkage>),
    /// To-many, `[]` when empty
    Many(Vec<Linkage>),
}

/// Relationship object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Relationship {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub links: Links,

    /// Only present when the relationship was included
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<RelationshipData>,
}

impl Relationship {
    pub fn with_links(self_link: String, related_link: String) -> Self {
        let mut links = Links::new();
        links.insert("self".to_string(), self_link);
        links.insert("related".to_string(), related_link);
        Self { links, data: None }
    }

    pub fn is_linkage_resolved(&self) -> bool {
        self.data.is_some()
    }
}

/// A resource node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub resource_type: String,

    pub id: String,

    #[serde(skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, Relationship>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub links: Links,

    #[serde(skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
            attributes: Map::new(),
            relationships: BTreeMap::new(),
            links: Links::new(),
            meta: Map::new(),
        }
    }

    pub fn linkage(&self) -> Linkage {
        Linkage::new(self.resource_type.clone(), self.id.clone())
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: Value) {
        self.attributes.insert(name.into(), value);
    }

    pub fn set_link(&mut self, name: impl Into<String>, href: impl Into<String>) {
        self.links.insert(name.into(), href.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_serialization() {
        let mut resource = Resource::new("posts", "1");
        resource.set_attribute("title", json!("Hello"));
        resource.set_link("self", "/api/v1/posts/1");

        let mut author = Relationship::with_links(
            "/api/v1/posts/1/relationships/author".to_string(),
            "/api/v1/posts/1/author".to_string(),
        );
        author.data = Some(RelationshipData::One(Some(Linkage::new("users", "7"))));
        resource.relationships.insert("author".to_string(), author);

        let lazy = Relationship::with_links("s".to_string(), "r".to_string());
        resource.relationships.insert("tags".to_string(), lazy);

        let value = serde_json::to_value(&resource).unwrap();
        assert_eq!(value["type"], "posts");
        assert_eq!(value["attributes"]["title"], "Hello");
        assert_eq!(value["relationships"]["author"]["data"], json!({"type": "users", "id": "7"}));
        assert!(value["relationships"]["tags"].get("data").is_none());
        assert!(value.get("meta").is_none());
    }

    #[test]
    fn test_empty_relationship_data() {
        let one = Relationship {
            links: Links::new(),
            data: Some(RelationshipData::One(None)),
        };
        let many = Relationship {
            links: Links::new(),
            data: Some(RelationshipData::Many(Vec::new())),
        };

        assert_eq!(serde_json::to_value(&one).unwrap(), json!({"data": null}));
        assert_eq!(serde_json::to_value(&many).unwrap(), json!({"data": []}));
    }
}
