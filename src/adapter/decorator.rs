//! # Resource Decorators
//!
//! Hooks run on every rendered resource after its attributes and
//! relationships are set. Decorators see the raw entry, so they can add
//! meta or replace attribute values the generic transform cannot derive.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::warn;

use super::files::{is_url, mime_type_for_path, DataUri, FileStore};
use crate::document::{DocumentQuery, Resource};
use crate::model::{Backend, BackendResult, ModelMeta, Property};

/// Post-render resource hook
pub trait ResourceDecorator<B: Backend + ?Sized>: Send + Sync {
    fn decorate(
        &self,
        backend: &B,
        model: &ModelMeta,
        entry: &B::Entry,
        query: &DocumentQuery,
        resource: &mut Resource,
    ) -> BackendResult<()>;
}

/// Public URLs of stored asset values
pub trait AssetUrlResolver: Send + Sync {
    /// URL of a stored value, for an image style when one is given
    fn url(&self, value: &str, style: Option<&str>) -> Option<String>;

    /// Image style names, in the order they are listed
    fn image_styles(&self) -> Vec<String>;
}

/// Decorates the resources of an asset model
///
/// The value field may hold a stored file path or an external URL. Paths
/// are rendered as `data:` URIs; URLs stay as they are. With a resolver,
/// `?url=1` adds a `url` meta member and `?images=1` adds an `images` meta
/// object mapping each image style to its URL.
pub struct AssetResourceDecorator {
    model: String,
    field: String,
    files: Arc<dyn FileStore>,
    resolver: Option<Arc<dyn AssetUrlResolver>>,
}

impl AssetResourceDecorator {
    pub fn new(model: impl Into<String>, field: impl Into<String>, files: Arc<dyn FileStore>) -> Self {
        Self {
            model: model.into(),
            field: field.into(),
            files,
            resolver: None,
        }
    }

    pub fn with_url_resolver(mut self, resolver: Arc<dyn AssetUrlResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    fn encode(&self, path: &str) -> Value {
        match self.files.read(path) {
            Ok(data) => Value::String(DataUri::from_path(path, data).encode()),
            Err(e) => {
                warn!(model = %self.model, path, error = %e, "Could not encode asset value");
                Value::Null
            }
        }
    }

    fn images(&self, resolver: &dyn AssetUrlResolver, value: &str) -> Value {
        let mut images = Map::new();
        if is_url(value) || !mime_type_for_path(value).starts_with("image/") {
            return Value::Object(images);
        }

        for style in resolver.image_styles() {
            if let Some(url) = resolver.url(value, Some(&style)) {
                images.insert(style, Value::String(url));
            }
        }
        Value::Object(images)
    }
}

impl<B: Backend + ?Sized> ResourceDecorator<B> for AssetResourceDecorator {
    fn decorate(
        &self,
        backend: &B,
        model: &ModelMeta,
        entry: &B::Entry,
        query: &DocumentQuery,
        resource: &mut Resource,
    ) -> BackendResult<()> {
        if model.name != self.model {
            return Ok(());
        }

        let value = match backend.get_property(model, entry, &self.field)? {
            Property::Value(Value::String(value)) if !value.is_empty() => value,
            _ => return Ok(()),
        };

        // sparse fieldsets may have left the attribute out
        if resource.attributes.contains_key(&self.field) && !is_url(&value) && !DataUri::is_data_uri(&value) {
            let encoded = self.encode(&value);
            resource.set_attribute(self.field.clone(), encoded);
        }

        let resolver = match &self.resolver {
            Some(resolver) => resolver.as_ref(),
            None => return Ok(()),
        };

        if query.flag("url") {
            let url = if is_url(&value) {
                Some(value.clone())
            } else {
                resolver.url(&value, None)
            };
            resource.meta.insert("url".to_string(), url.map(Value::String).unwrap_or(Value::Null));
        }

        if query.flag("images") {
            resource.meta.insert("images".to_string(), self.images(resolver, &value));
        }

        Ok(())
    }
}
