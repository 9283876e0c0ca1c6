//! # JSON:API Service
//!
//! Entry points for collection, detail, related and relationship reads and
//! for entry and relationship mutations. Every operation returns a
//! [`JsonApiResponse`]; errors never escape as panics or raw errors.
//!
//! # Request flow
//!
//! 1. Resolve the resource type through the registry
//! 2. Parse the query, apply the filter pipeline, sort and page
//! 3. Execute through the backend unless the document is in error state
//! 4. Render entries and assemble the document

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::http::StatusCode;
use serde_json::{json, Map, Value};
use tracing::{debug, error, info};

use super::errors::{JsonApiError, JsonApiResult};
use super::response::JsonApiResponse;
use crate::adapter::{
    AdapterCache, EntryResourceAdapter, IdentityTransform, Renderer, ResourceDecorator, ValueTransform,
};
use crate::config::{ConfigError, JsonApiConfig};
use crate::document::{
    check_accept, check_content_type, ApiError, DocumentQuery, Included, JsonApiDocument, LinkBuilder, Linkage,
    PrimaryData, RelationshipData,
};
use crate::filter::{FilterCatalog, FilterContext, FilterPipeline, FilterStrategy};
use crate::model::{Backend, BackendError, Cardinality, EntryId, ModelMeta, ModelQuery, Property};
use crate::mutation::{translate_validation, FieldValueProcessor, MutationEngine, RelationshipVerb};
use crate::registry::{ResourceTypeRegistry, TypeMapping};

/// Builder for [`JsonApi`]
pub struct JsonApiBuilder<B: Backend> {
    backend: Arc<B>,
    config: JsonApiConfig,
    catalog: FilterCatalog<B>,
    processors: Vec<Arc<dyn FieldValueProcessor<B>>>,
    decorators: Vec<Arc<dyn ResourceDecorator<B>>>,
    transform: Arc<dyn ValueTransform>,
}

impl<B: Backend> JsonApiBuilder<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            config: JsonApiConfig::default(),
            catalog: FilterCatalog::with_defaults(),
            processors: Vec::new(),
            decorators: Vec::new(),
            transform: Arc::new(IdentityTransform),
        }
    }

    pub fn config(mut self, config: JsonApiConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a named filter strategy
    pub fn filter_strategy(mut self, name: impl Into<String>, strategy: Arc<dyn FilterStrategy<B>>) -> Self {
        self.catalog.register(name, strategy);
        self
    }

    /// Append a field value processor to the chain
    pub fn field_processor(mut self, processor: Arc<dyn FieldValueProcessor<B>>) -> Self {
        self.processors.push(processor);
        self
    }

    /// Append a hook run on every rendered entry resource
    pub fn resource_decorator(mut self, decorator: Arc<dyn ResourceDecorator<B>>) -> Self {
        self.decorators.push(decorator);
        self
    }

    pub fn value_transform(mut self, transform: Arc<dyn ValueTransform>) -> Self {
        self.transform = transform;
        self
    }

    /// Validate the configuration and resolve every model's filter pipeline
    pub fn build(self) -> Result<JsonApi<B>, ConfigError> {
        self.config.validate()?;

        let mut pipelines = HashMap::new();
        for model in self.backend.models() {
            let pipeline = self.catalog.pipeline(&model, &self.config.default_filters)?;
            pipelines.insert(model.name.clone(), pipeline);
        }

        Ok(JsonApi {
            links: LinkBuilder::new(self.config.base_path()),
            backend: self.backend,
            config: self.config,
            registry: ResourceTypeRegistry::new(),
            adapters: AdapterCache::new(),
            catalog: self.catalog,
            pipelines: RwLock::new(pipelines),
            processors: self.processors,
            decorators: self.decorators,
            transform: self.transform,
        })
    }
}

/// The JSON:API service over a backend
pub struct JsonApi<B: Backend> {
    backend: Arc<B>,
    config: JsonApiConfig,
    links: LinkBuilder,
    registry: ResourceTypeRegistry,
    adapters: AdapterCache,
    catalog: FilterCatalog<B>,
    pipelines: RwLock<HashMap<String, FilterPipeline<B>>>,
    processors: Vec<Arc<dyn FieldValueProcessor<B>>>,
    decorators: Vec<Arc<dyn ResourceDecorator<B>>>,
    transform: Arc<dyn ValueTransform>,
}

impl<B: Backend> JsonApi<B> {
    pub fn builder(backend: Arc<B>) -> JsonApiBuilder<B> {
        JsonApiBuilder::new(backend)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &JsonApiConfig {
        &self.config
    }

    pub fn links(&self) -> &LinkBuilder {
        &self.links
    }

    pub fn registry(&self) -> &ResourceTypeRegistry {
        &self.registry
    }

    /// Drop cached type mapping, adapters and pipelines
    pub fn invalidate(&self) {
        self.registry.invalidate();
        self.adapters.invalidate();
        if let Ok(mut pipelines) = self.pipelines.write() {
            pipelines.clear();
        }
        debug!("JSON:API caches invalidated");
    }

    /// Check request headers; `content_type` only for requests with a body
    pub fn negotiate(&self, content_type: Option<&str>, accept: Option<&str>) -> Result<(), JsonApiResponse> {
        let checked = content_type
            .map(|content_type| check_content_type(Some(content_type)))
            .unwrap_or(Ok(()))
            .and_then(|_| check_accept(accept));

        checked.map_err(JsonApiResponse::from_error)
    }

    // ==================
    // Reads
    // ==================

    /// Collection of a resource type
    pub fn index(&self, resource_type: &str, params: &[(String, String)], url: &str) -> JsonApiResponse {
        self.respond(self.try_index(resource_type, params, url))
    }

    fn try_index(&self, resource_type: &str, params: &[(String, String)], url: &str) -> JsonApiResult<JsonApiResponse> {
        let (mapping, adapter) = self.adapter(resource_type)?;
        let query = DocumentQuery::parse(params, &self.config)?;
        let model = adapter.model();

        let mut model_query = ModelQuery::new(model.name.clone());
        let ctx = FilterContext {
            document_query: &query,
            model,
            backend: &*self.backend,
        };
        self.pipeline(model)?.apply(&ctx, &mut model_query)?;

        let mut document = JsonApiDocument::new();
        for sort in query.sort() {
            if model.has_field(&sort.field) {
                model_query.add_order_by(sort.field.clone(), sort.direction);
            } else {
                document.add_error(ApiError::sort_field_not_found(resource_type, &sort.field));
            }
        }

        if document.has_errors() {
            return Ok(JsonApiResponse::from_document(document));
        }

        model_query.set_limit(query.limit(), query.offset());
        let total = self.backend.count(&model_query)?;
        let entries = self.backend.execute(&model_query)?;

        let mut included = Included::new();
        for entry in &entries {
            included.reserve(self.renderer(&mapping, &query).linkage(&adapter, entry)?);
        }

        let mut resources = Vec::with_capacity(entries.len());
        let mut renderer = self.renderer(&mapping, &query);
        for entry in &entries {
            if let Some(resource) = renderer.render(&adapter, Some(entry), "", &mut included)? {
                resources.push(resource);
            }
        }

        document.set_data(PrimaryData::Collection(resources));
        *document.included_mut() = included;
        document.set_meta("total", json!(total));
        if query.flag("list") {
            document.set_meta("list", self.option_list(model, &entries)?);
        }
        document.set_link("self", url);

        Ok(JsonApiResponse::from_document(document))
    }

    /// Single resource
    pub fn detail(&self, resource_type: &str, id: &str, params: &[(String, String)], url: &str) -> JsonApiResponse {
        self.respond(self.try_detail(resource_type, id, params, url))
    }

    fn try_detail(
        &self,
        resource_type: &str,
        id: &str,
        params: &[(String, String)],
        url: &str,
    ) -> JsonApiResult<JsonApiResponse> {
        let (mapping, adapter) = self.adapter(resource_type)?;
        let query = DocumentQuery::parse(params, &self.config)?;
        let entry = self.entry(&adapter, id)?;

        let mut document = JsonApiDocument::new();
        self.set_resource(&mut document, &mapping, &query, &adapter, Some(&entry))?;
        document.set_link("self", url);

        Ok(JsonApiResponse::from_document(document))
    }

    /// Resource(s) a relationship points at, as primary data
    pub fn related(
        &self,
        resource_type: &str,
        id: &str,
        relationship: &str,
        params: &[(String, String)],
        url: &str,
    ) -> JsonApiResponse {
        self.respond(self.try_related(resource_type, id, relationship, params, url))
    }

    fn try_related(
        &self,
        resource_type: &str,
        id: &str,
        relationship: &str,
        params: &[(String, String)],
        url: &str,
    ) -> JsonApiResult<JsonApiResponse> {
        let (mapping, adapter) = self.adapter(resource_type)?;
        let query = DocumentQuery::parse(params, &self.config)?;
        let entry = self.entry(&adapter, id)?;
        let (target, _) = self.relation(&mapping, &adapter, relationship)?;

        let mut document = JsonApiDocument::new();
        match self.backend.get_property(adapter.model(), &entry, relationship)? {
            Property::Many(members) => {
                let mut included = Included::new();
                for member in &members {
                    included.reserve(self.renderer(&mapping, &query).linkage(&target, member)?);
                }

                let mut renderer = self.renderer(&mapping, &query);
                let mut resources = Vec::with_capacity(members.len());
                for member in &members {
                    if let Some(resource) = renderer.render(&target, Some(member), "", &mut included)? {
                        resources.push(resource);
                    }
                }

                document.set_data(PrimaryData::Collection(resources));
                *document.included_mut() = included;
            }
            Property::One(related) => {
                self.set_resource(&mut document, &mapping, &query, &target, related.as_ref())?;
            }
            Property::Value(_) => self.set_resource(&mut document, &mapping, &query, &target, None)?,
        }
        document.set_link("self", url);

        Ok(JsonApiResponse::from_document(document))
    }

    /// Linkage of a relationship
    pub fn relationship(&self, resource_type: &str, id: &str, relationship: &str, url: &str) -> JsonApiResponse {
        self.respond(self.try_relationship(resource_type, id, relationship, url))
    }

    fn try_relationship(
        &self,
        resource_type: &str,
        id: &str,
        relationship: &str,
        url: &str,
    ) -> JsonApiResult<JsonApiResponse> {
        let (mapping, adapter) = self.adapter(resource_type)?;
        let entry = self.entry(&adapter, id)?;
        let (target, _) = self.relation(&mapping, &adapter, relationship)?;

        let linkage = |related: &B::Entry| -> JsonApiResult<Linkage> {
            let related_id = self.backend.entry_id(related).ok_or_else(|| {
                BackendError::Storage(format!("Entry of model '{}' has no id", target.model().name))
            })?;
            Ok(Linkage::new(target.resource_type(), related_id.as_str()))
        };

        let data = match self.backend.get_property(adapter.model(), &entry, relationship)? {
            Property::Many(members) => {
                RelationshipData::Many(members.iter().map(linkage).collect::<JsonApiResult<Vec<_>>>()?)
            }
            Property::One(related) => RelationshipData::One(related.as_ref().map(linkage).transpose()?),
            Property::Value(_) => RelationshipData::One(None),
        };

        let mut document = JsonApiDocument::new();
        document.set_data(PrimaryData::Relationship(data));
        document.set_link("self", url);
        document.set_link(
            "related",
            self.links.related(resource_type, &EntryId::new(id), relationship),
        );

        Ok(JsonApiResponse::from_document(document))
    }

    // ==================
    // Writes
    // ==================

    /// Create (no id), update (id) or bulk create (array data)
    pub fn save(
        &self,
        resource_type: &str,
        id: Option<&str>,
        body: &Value,
        params: &[(String, String)],
    ) -> JsonApiResponse {
        self.respond(self.try_save(resource_type, id, body, params))
    }

    fn try_save(
        &self,
        resource_type: &str,
        id: Option<&str>,
        body: &Value,
        params: &[(String, String)],
    ) -> JsonApiResult<JsonApiResponse> {
        let (mapping, adapter) = self.adapter(resource_type)?;
        let query = DocumentQuery::parse(params, &self.config)?;

        match body.get("data") {
            Some(Value::Array(items)) if id.is_none() => self.save_bulk(&mapping, &adapter, &query, items),
            Some(Value::Array(_)) => Err(ApiError::bad_request("input.data", "Invalid data submitted")
                .with_detail("Bulk operations only create resources")
                .with_pointer("/data")
                .into()),
            Some(data) if !data.is_null() => {
                let id = id.map(EntryId::new);
                self.save_single(&mapping, &adapter, &query, data, id.as_ref())
            }
            _ => Err(data_not_found()),
        }
    }

    fn save_single(
        &self,
        mapping: &TypeMapping,
        adapter: &EntryResourceAdapter,
        query: &DocumentQuery,
        data: &Value,
        id: Option<&EntryId>,
    ) -> JsonApiResult<JsonApiResponse> {
        let model = adapter.model();
        let mut engine = MutationEngine::new(&*self.backend, mapping, &self.processors);
        let entry = engine.entry_from_resource(model, adapter.resource_type(), data, id, None)?;

        let mut entry = match entry {
            Some(entry) if !engine.has_errors() => entry,
            _ => return Ok(Self::rejected(engine.into_errors())),
        };

        if let Err(failure) = self.persist(model, &mut entry, None)? {
            return Ok(Self::rejected(failure));
        }

        let saved_id = self.entry_id(model, &entry)?;
        let location = self.links.detail(adapter.resource_type(), &saved_id);

        let mut document = JsonApiDocument::new();
        self.set_resource(&mut document, mapping, query, adapter, Some(&entry))?;
        document.set_link("self", location.clone());

        if id.is_some() {
            return Ok(JsonApiResponse::from_document(document));
        }

        document.set_status(StatusCode::CREATED);
        Ok(JsonApiResponse::from_document(document).with_location(location))
    }

    /// Bulk create
    ///
    /// Nothing is saved when any submitted resource is malformed. Saving
    /// itself is not atomic: an entry rejected by the backend is reported
    /// and the others stay saved.
    fn save_bulk(
        &self,
        mapping: &TypeMapping,
        adapter: &EntryResourceAdapter,
        query: &DocumentQuery,
        items: &[Value],
    ) -> JsonApiResult<JsonApiResponse> {
        let model = adapter.model();
        let mut engine = MutationEngine::new(&*self.backend, mapping, &self.processors);

        let mut entries = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            if let Some(entry) = engine.entry_from_resource(model, adapter.resource_type(), item, None, Some(index))? {
                entries.push(entry);
            }
        }

        if engine.has_errors() {
            return Ok(Self::rejected(engine.into_errors()));
        }

        let mut document = JsonApiDocument::new();
        let mut saved = Vec::with_capacity(entries.len());
        for (index, mut entry) in entries.into_iter().enumerate() {
            match self.persist(model, &mut entry, Some(index))? {
                Ok(()) => saved.push(entry),
                Err(errors) => {
                    for error in errors {
                        document.add_error(error);
                    }
                }
            }
        }

        let ids = saved
            .iter()
            .map(|entry| self.entry_id(model, entry))
            .collect::<JsonApiResult<Vec<_>>>()?;
        let location = self.links.id_filter(adapter.resource_type(), &ids);
        document.set_link("self", location.clone());

        if document.has_errors() {
            return Ok(JsonApiResponse::from_document(document));
        }

        let mut included = Included::new();
        for id in &ids {
            included.reserve(Linkage::new(adapter.resource_type(), id.as_str()));
        }
        let mut renderer = self.renderer(mapping, query);
        let mut resources = Vec::with_capacity(saved.len());
        for entry in &saved {
            if let Some(resource) = renderer.render(adapter, Some(entry), "", &mut included)? {
                resources.push(resource);
            }
        }
        document.set_data(PrimaryData::Collection(resources));
        *document.included_mut() = included;

        Ok(JsonApiResponse::from_document(document).with_location(location))
    }

    /// Delete an entry
    pub fn delete(&self, resource_type: &str, id: &str) -> JsonApiResponse {
        self.respond(self.try_delete(resource_type, id))
    }

    fn try_delete(&self, resource_type: &str, id: &str) -> JsonApiResult<JsonApiResponse> {
        let (_, adapter) = self.adapter(resource_type)?;
        let entry = self.entry(&adapter, id)?;

        self.backend.delete(adapter.model(), &entry)?;
        info!(resource_type, id, "Resource deleted");

        Ok(JsonApiResponse::no_content())
    }

    /// Replace, add to or remove from a relationship
    pub fn save_relationship(
        &self,
        resource_type: &str,
        id: &str,
        relationship: &str,
        verb: RelationshipVerb,
        body: &Value,
    ) -> JsonApiResponse {
        self.respond(self.try_save_relationship(resource_type, id, relationship, verb, body))
    }

    fn try_save_relationship(
        &self,
        resource_type: &str,
        id: &str,
        relationship: &str,
        verb: RelationshipVerb,
        body: &Value,
    ) -> JsonApiResult<JsonApiResponse> {
        let (mapping, adapter) = self.adapter(resource_type)?;
        let model = adapter.model();
        let mut entry = self.entry(&adapter, id)?;
        let (target, cardinality) = self
            .relation(&mapping, &adapter, relationship)
            .map_err(|error| error.with_pointer(format!("/data/relationships/{}", relationship)))?;

        let data = body.get("data").ok_or_else(|| {
            ApiError::bad_request("input.relationship.data", "Invalid relationship data")
                .with_detail("No data member found in the submitted body")
                .with_pointer("/data")
        })?;

        let mut engine = MutationEngine::new(&*self.backend, &mapping, &self.processors);
        let value = engine.resolve_data(&target.model().name, cardinality, data, "/data")?;
        let value = match value {
            Some(value) if !engine.has_errors() => value,
            _ => return Ok(Self::rejected(engine.into_errors())),
        };

        engine.apply_relationship(model, &mut entry, relationship, cardinality, verb, value)?;

        if let Err(failure) = self.persist(model, &mut entry, None)? {
            return Ok(Self::rejected(failure));
        }

        Ok(JsonApiResponse::no_content())
    }

    // ==================
    // Helpers
    // ==================

    pub(super) fn respond(&self, result: JsonApiResult<JsonApiResponse>) -> JsonApiResponse {
        match result {
            Ok(response) => response,
            Err(e) => {
                if e.is_server_error() {
                    error!(error = %e, "JSON:API operation failed");
                }
                JsonApiResponse::from_error(e.into())
            }
        }
    }

    fn rejected(errors: Vec<ApiError>) -> JsonApiResponse {
        let mut document = JsonApiDocument::new();
        for error in errors {
            document.add_error(error);
        }
        JsonApiResponse::from_document(document)
    }

    /// Save an entry; backend validation failures become error objects
    fn persist(
        &self,
        model: &ModelMeta,
        entry: &mut B::Entry,
        index: Option<usize>,
    ) -> JsonApiResult<Result<(), Vec<ApiError>>> {
        match self.backend.save(model, entry) {
            Ok(()) => {
                info!(model = %model.name, id = ?self.backend.entry_id(entry), "Resource saved");
                Ok(Ok(()))
            }
            Err(BackendError::Validation(failure)) => {
                debug!(model = %model.name, ?index, %failure, "Resource rejected by validation");
                Ok(Err(translate_validation(&failure, model, index)))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn adapter(&self, resource_type: &str) -> JsonApiResult<(Arc<TypeMapping>, Arc<EntryResourceAdapter>)> {
        let mapping = self.registry.mapping(&*self.backend);
        let adapter = self
            .adapters
            .get(&*self.backend, &mapping, resource_type)
            .ok_or_else(|| ApiError::type_not_found(resource_type))?;
        Ok((mapping, adapter))
    }

    fn entry(&self, adapter: &EntryResourceAdapter, id: &str) -> JsonApiResult<B::Entry> {
        self.backend
            .get_entry(adapter.model(), &EntryId::new(id))?
            .ok_or_else(|| ApiError::resource_not_found(adapter.resource_type(), id).into())
    }

    fn entry_id(&self, model: &ModelMeta, entry: &B::Entry) -> JsonApiResult<EntryId> {
        self.backend.entry_id(entry).ok_or_else(|| {
            JsonApiError::Backend(BackendError::Storage(format!(
                "Saved entry of model '{}' has no id",
                model.name
            )))
        })
    }

    /// Adapter of the target of an exposed relationship
    ///
    /// The error carries no source; write paths point it at the payload.
    fn relation(
        &self,
        mapping: &TypeMapping,
        adapter: &EntryResourceAdapter,
        relationship: &str,
    ) -> Result<(Arc<EntryResourceAdapter>, Cardinality), ApiError> {
        let not_found = || ApiError::relationship_not_found(adapter.resource_type(), relationship);

        let (_, target, cardinality) = adapter.relation(relationship).ok_or_else(not_found)?;
        let target = mapping
            .resource_type(target)
            .and_then(|target_type| self.adapters.get(&*self.backend, mapping, target_type))
            .ok_or_else(not_found)?;

        Ok((target, cardinality))
    }

    /// Id to label map of the rendered page
    fn option_list(&self, model: &ModelMeta, entries: &[B::Entry]) -> JsonApiResult<Value> {
        let mut list = Map::new();
        for entry in entries {
            let id = self.entry_id(model, entry)?;
            list.insert(id.to_string(), Value::String(self.backend.entry_label(model, entry)?));
        }
        Ok(Value::Object(list))
    }

    fn pipeline(&self, model: &ModelMeta) -> JsonApiResult<FilterPipeline<B>> {
        if let Ok(pipelines) = self.pipelines.read() {
            if let Some(pipeline) = pipelines.get(&model.name) {
                return Ok(pipeline.clone());
            }
        }

        let pipeline = self.catalog.pipeline(model, &self.config.default_filters)?;
        if let Ok(mut pipelines) = self.pipelines.write() {
            pipelines.insert(model.name.clone(), pipeline.clone());
        }
        Ok(pipeline)
    }

    fn renderer<'a>(&'a self, mapping: &'a TypeMapping, query: &'a DocumentQuery) -> Renderer<'a, B> {
        Renderer::new(
            &*self.backend,
            mapping,
            &self.adapters,
            query,
            &self.links,
            &*self.transform,
            self.config.max_include_depth,
        )
        .with_decorators(&self.decorators)
    }

    /// Render a single primary resource into the document
    fn set_resource(
        &self,
        document: &mut JsonApiDocument,
        mapping: &TypeMapping,
        query: &DocumentQuery,
        adapter: &EntryResourceAdapter,
        entry: Option<&B::Entry>,
    ) -> JsonApiResult<()> {
        let mut renderer = self.renderer(mapping, query);
        let mut included = Included::new();
        if let Some(entry) = entry {
            included.reserve(renderer.linkage(adapter, entry)?);
        }

        let resource = renderer.render(adapter, entry, "", &mut included)?;
        document.set_data(PrimaryData::Resource(resource));
        *document.included_mut() = included;
        Ok(())
    }
}

fn data_not_found() -> JsonApiError {
    ApiError::bad_request("input.data", "Invalid data submitted")
        .with_detail("No data member found in the submitted body")
        .with_pointer("/data")
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldDescriptor, MemoryBackend, ValueType};

    fn api() -> JsonApi<MemoryBackend> {
        let backend = MemoryBackend::new().with_model(
            ModelMeta::new("Post")
                .with_type("posts")
                .field(FieldDescriptor::property("title", ValueType::String).required()),
        );
        backend.insert("Post", json!({"id": "1", "title": "First"})).unwrap();
        JsonApi::builder(Arc::new(backend)).build().unwrap()
    }

    #[test]
    fn test_unknown_strategy_fails_build() {
        let backend = MemoryBackend::new().with_model(ModelMeta::new("Post").with_filters(["geo"]));
        assert!(JsonApi::builder(Arc::new(backend)).build().is_err());
    }

    #[test]
    fn test_unknown_type() {
        let response = api().detail("nope", "1", &[], "/api/v1/nope/1");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.document().unwrap().errors()[0].code, "resource.invalid");
    }

    #[test]
    fn test_missing_entry() {
        let response = api().delete("posts", "2");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.document().unwrap().errors()[0].code, "resource.found");
    }

    #[test]
    fn test_invalid_query_parameter() {
        let params = vec![("page[limit]".to_string(), "0".to_string())];
        let response = api().index("posts", &params, "/api/v1/posts");

        let error = &response.document().unwrap().errors()[0];
        assert_eq!(error.code, "index.input");
        assert_eq!(error.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_missing_body_data() {
        let response = api().save("posts", None, &json!({"meta": {}}), &[]);

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.document().unwrap().errors()[0].code, "input.data");
    }

    #[test]
    fn test_negotiate() {
        let api = api();

        assert!(api.negotiate(None, None).is_ok());
        assert!(api.negotiate(Some("application/vnd.api+json"), Some("*/*")).is_ok());
        assert_eq!(
            api.negotiate(Some("application/vnd.api+json; charset=utf-8"), None)
                .unwrap_err()
                .status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            api.negotiate(None, Some("application/vnd.api+json; ext=bulk"))
                .unwrap_err()
                .status(),
            StatusCode::NOT_ACCEPTABLE
        );
    }

    #[test]
    fn test_invalidate_rebuilds_caches() {
        let api = api();
        assert_eq!(api.detail("posts", "1", &[], "/x").status(), StatusCode::OK);
        assert!(api.registry().is_cached());

        api.invalidate();
        assert!(!api.registry().is_cached());
        assert_eq!(api.index("posts", &[], "/x").status(), StatusCode::OK);
    }
}
