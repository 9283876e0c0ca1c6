//! # Link Builder
//!
//! Derives every link from the configured base path, the resource type and
//! the id alone.

use crate::model::EntryId;

/// Builds `self` and `related` links
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkBuilder {
    base_path: String,
}

impl LinkBuilder {
    pub fn new(base_path: impl Into<String>) -> Self {
        let base_path: String = base_path.into();
        Self {
            base_path: base_path.trim_end_matches('/').to_string(),
        }
    }

    /// `{base}/{type}`
    pub fn index(&self, resource_type: &str) -> String {
        format!("{}/{}", self.base_path, resource_type)
    }

    /// `{base}/{type}/{id}`
    pub fn detail(&self, resource_type: &str, id: &EntryId) -> String {
        format!("{}/{}/{}", self.base_path, resource_type, id)
    }

    /// `{base}/{type}/{id}/relationships/{relationship}`
    pub fn relationship(&self, resource_type: &str, id: &EntryId, relationship: &str) -> String {
        format!("{}/{}/{}/relationships/{}", self.base_path, resource_type, id, relationship)
    }

    /// `{base}/{type}/{id}/{relationship}`
    pub fn related(&self, resource_type: &str, id: &EntryId, relationship: &str) -> String {
        format!("{}/{}/{}/{}", self.base_path, resource_type, id, relationship)
    }

    /// Collection link filtered on the given ids
    pub fn id_filter<'a, I>(&self, resource_type: &str, ids: I) -> String
    where
        I: IntoIterator<Item = &'a EntryId>,
    {
        let filter: Vec<String> = ids
            .into_iter()
            .map(|id| format!("filter[exact][id][]={}", id))
            .collect();

        if filter.is_empty() {
            return self.index(resource_type);
        }

        format!("{}?{}", self.index(resource_type), filter.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links() {
        let links = LinkBuilder::new("/api/v1/");
        let id = EntryId::from("12");

        assert_eq!(links.index("posts"), "/api/v1/posts");
        assert_eq!(links.detail("posts", &id), "/api/v1/posts/12");
        assert_eq!(
            links.relationship("posts", &id, "tags"),
            "/api/v1/posts/12/relationships/tags"
        );
        assert_eq!(links.related("posts", &id, "tags"), "/api/v1/posts/12/tags");
    }

    #[test]
    fn test_id_filter() {
        let links = LinkBuilder::new("/api");
        let ids = vec![EntryId::from("1"), EntryId::from("3")];

        assert_eq!(
            links.id_filter("posts", &ids),
            "/api/posts?filter[exact][id][]=1&filter[exact][id][]=3"
        );
        assert_eq!(links.id_filter("posts", &Vec::<EntryId>::new()), "/api/posts");
    }
}
