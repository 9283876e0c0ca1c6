//! # Model Metadata Endpoints
//!
//! Read-only `models` and `model-fields` resources describing the
//! backend's models. They support sparse fieldsets, includes,
//! `filter[query]` on names, sorting by `name` and paging.

use serde_json::json;

use super::errors::JsonApiResult;
use super::response::JsonApiResponse;
use super::service::JsonApi;
use crate::adapter::metadata::{MetadataCatalog, MetadataItem, MetadataKind, MetadataRenderer, RelatedItems};
use crate::document::{
    ApiError, Direction, DocumentQuery, Included, JsonApiDocument, PrimaryData, QueryError, RelationshipData,
};
use crate::model::{Backend, EntryId};

impl<B: Backend> JsonApi<B> {
    /// Collection of model or field metadata
    pub fn metadata_index(&self, resource_type: &str, params: &[(String, String)], url: &str) -> JsonApiResponse {
        self.respond(self.try_metadata_index(resource_type, params, url))
    }

    fn try_metadata_index(
        &self,
        resource_type: &str,
        params: &[(String, String)],
        url: &str,
    ) -> JsonApiResult<JsonApiResponse> {
        let kind = metadata_kind(resource_type)?;
        let query = DocumentQuery::parse(params, self.config())?;
        let catalog = self.metadata_catalog();
        let mut items = catalog.items(kind);

        if let Some(value) = query.filter("query") {
            let text = value
                .as_str()
                .ok_or_else(|| QueryError::new("filter[query]", "Expected filter[query]=<value>"))?;
            let needle = text.trim().to_lowercase();
            items.retain(|item| item.name().to_lowercase().contains(&needle));
        }

        let mut document = JsonApiDocument::new();
        for sort in query.sort() {
            if sort.field != "name" {
                document.add_error(ApiError::sort_field_not_found(resource_type, &sort.field));
            }
        }
        if document.has_errors() {
            return Ok(JsonApiResponse::from_document(document));
        }

        // stable sorts, last key first
        for sort in query.sort().iter().rev() {
            items.sort_by(|a, b| match sort.direction {
                Direction::Asc => a.name().cmp(b.name()),
                Direction::Desc => b.name().cmp(a.name()),
            });
        }

        let total = items.len();
        let page: Vec<MetadataItem<'_>> = items.into_iter().skip(query.offset()).take(query.limit()).collect();

        let mapping = self.registry().mapping(self.backend());
        let mut renderer = MetadataRenderer::new(&catalog, &mapping, &query, self.links(), self.config().max_include_depth);
        let mut included = Included::new();
        for item in &page {
            included.reserve(item.linkage());
        }
        let resources = page
            .iter()
            .map(|item| renderer.render(item, "", &mut included))
            .collect();

        document.set_data(PrimaryData::Collection(resources));
        *document.included_mut() = included;
        document.set_meta("total", json!(total));
        document.set_link("self", url);

        Ok(JsonApiResponse::from_document(document))
    }

    /// Single model or field
    pub fn metadata_detail(
        &self,
        resource_type: &str,
        id: &str,
        params: &[(String, String)],
        url: &str,
    ) -> JsonApiResponse {
        self.respond(self.try_metadata_detail(resource_type, id, params, url))
    }

    fn try_metadata_detail(
        &self,
        resource_type: &str,
        id: &str,
        params: &[(String, String)],
        url: &str,
    ) -> JsonApiResult<JsonApiResponse> {
        let kind = metadata_kind(resource_type)?;
        let query = DocumentQuery::parse(params, self.config())?;
        let catalog = self.metadata_catalog();
        let item = metadata_item(&catalog, kind, resource_type, id)?;

        let mut document = JsonApiDocument::new();
        self.set_metadata_resource(&mut document, &catalog, &query, Some(item));
        document.set_link("self", url);

        Ok(JsonApiResponse::from_document(document))
    }

    /// Fields of a model, or the model a relation field points at
    pub fn metadata_related(
        &self,
        resource_type: &str,
        id: &str,
        relationship: &str,
        params: &[(String, String)],
        url: &str,
    ) -> JsonApiResponse {
        self.respond(self.try_metadata_related(resource_type, id, relationship, params, url))
    }

    fn try_metadata_related(
        &self,
        resource_type: &str,
        id: &str,
        relationship: &str,
        params: &[(String, String)],
        url: &str,
    ) -> JsonApiResult<JsonApiResponse> {
        let kind = metadata_kind(resource_type)?;
        let query = DocumentQuery::parse(params, self.config())?;
        let catalog = self.metadata_catalog();
        let item = metadata_item(&catalog, kind, resource_type, id)?;
        let related = catalog
            .related(&item, relationship)
            .ok_or_else(|| ApiError::relationship_not_found(resource_type, relationship))?;

        let mut document = JsonApiDocument::new();
        match related {
            RelatedItems::One(target) => self.set_metadata_resource(&mut document, &catalog, &query, target),
            RelatedItems::Many(targets) => {
                let mapping = self.registry().mapping(self.backend());
                let mut renderer =
                    MetadataRenderer::new(&catalog, &mapping, &query, self.links(), self.config().max_include_depth);
                let mut included = Included::new();
                for target in &targets {
                    included.reserve(target.linkage());
                }
                let resources = targets
                    .iter()
                    .map(|target| renderer.render(target, "", &mut included))
                    .collect();

                document.set_data(PrimaryData::Collection(resources));
                *document.included_mut() = included;
            }
        }
        document.set_link("self", url);

        Ok(JsonApiResponse::from_document(document))
    }

    /// Linkage of a metadata relationship
    pub fn metadata_relationship(&self, resource_type: &str, id: &str, relationship: &str, url: &str) -> JsonApiResponse {
        self.respond(self.try_metadata_relationship(resource_type, id, relationship, url))
    }

    fn try_metadata_relationship(
        &self,
        resource_type: &str,
        id: &str,
        relationship: &str,
        url: &str,
    ) -> JsonApiResult<JsonApiResponse> {
        let kind = metadata_kind(resource_type)?;
        let catalog = self.metadata_catalog();
        let item = metadata_item(&catalog, kind, resource_type, id)?;
        let related = catalog
            .related(&item, relationship)
            .ok_or_else(|| ApiError::relationship_not_found(resource_type, relationship))?;

        let data = match related {
            RelatedItems::One(target) => RelationshipData::One(target.map(|target| target.linkage())),
            RelatedItems::Many(targets) => RelationshipData::Many(targets.iter().map(MetadataItem::linkage).collect()),
        };

        let mut document = JsonApiDocument::new();
        document.set_data(PrimaryData::Relationship(data));
        document.set_link("self", url);
        document.set_link("related", self.links().related(resource_type, &EntryId::new(id), relationship));

        Ok(JsonApiResponse::from_document(document))
    }

    fn metadata_catalog(&self) -> MetadataCatalog {
        MetadataCatalog::new(self.backend().models())
    }

    fn set_metadata_resource(
        &self,
        document: &mut JsonApiDocument,
        catalog: &MetadataCatalog,
        query: &DocumentQuery,
        item: Option<MetadataItem<'_>>,
    ) {
        let mapping = self.registry().mapping(self.backend());
        let mut renderer = MetadataRenderer::new(catalog, &mapping, query, self.links(), self.config().max_include_depth);
        let mut included = Included::new();

        let resource = item.map(|item| {
            included.reserve(item.linkage());
            renderer.render(&item, "", &mut included)
        });

        document.set_data(PrimaryData::Resource(resource));
        *document.included_mut() = included;
    }
}

fn metadata_kind(resource_type: &str) -> Result<MetadataKind, ApiError> {
    MetadataKind::from_resource_type(resource_type).ok_or_else(|| ApiError::type_not_found(resource_type))
}

fn metadata_item<'a>(
    catalog: &'a MetadataCatalog,
    kind: MetadataKind,
    resource_type: &str,
    id: &str,
) -> Result<MetadataItem<'a>, ApiError> {
    catalog
        .find(kind, id)
        .ok_or_else(|| ApiError::resource_not_found(resource_type, id))
}
