//! # Field Value Processors
//!
//! Hooks applied to incoming attribute values before they are assigned to an
//! entry.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::adapter::{is_url, DataUri, FileStore, FileStoreError};
use crate::model::{Backend, BackendError, FieldDescriptor, ModelMeta, Property};

/// Result type for processors
pub type ProcessorResult<T> = Result<T, ProcessorError>;

/// Processor failures
#[derive(Debug, Clone, Error)]
pub enum ProcessorError {
    #[error("{0}")]
    File(#[from] FileStoreError),

    #[error("{0}")]
    Backend(#[from] BackendError),

    #[error("{0}")]
    Invalid(String),
}

/// Incoming attribute value hook
pub trait FieldValueProcessor<B: Backend + ?Sized>: Send + Sync {
    fn process_input_value(
        &self,
        backend: &B,
        model: &ModelMeta,
        field: &FieldDescriptor,
        entry: &B::Entry,
        value: Value,
    ) -> ProcessorResult<Value>;
}

/// Stores `data:` URIs submitted for file and image fields
///
/// A URI identical to the encoding of the current file keeps the current
/// path. The current path itself and URLs pass through. A current value
/// that is a URL counts as no current file.
pub struct FileFieldProcessor {
    files: Arc<dyn FileStore>,
    scope: Option<(String, String)>,
}

impl FileFieldProcessor {
    pub fn new(files: Arc<dyn FileStore>) -> Self {
        Self { files, scope: None }
    }

    /// Processor for a single field of a single model, whatever its value
    /// type, e.g. an asset value holding either a stored file or a URL
    pub fn for_field(files: Arc<dyn FileStore>, model: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            files,
            scope: Some((model.into(), field.into())),
        }
    }

    fn applies_to(&self, model: &ModelMeta, field: &FieldDescriptor) -> bool {
        match &self.scope {
            Some((model_name, field_name)) => model.name == *model_name && field.name == *field_name,
            None => field.value_type().map(|t| t.is_file()).unwrap_or(false),
        }
    }
}

impl<B: Backend + ?Sized> FieldValueProcessor<B> for FileFieldProcessor {
    fn process_input_value(
        &self,
        backend: &B,
        model: &ModelMeta,
        field: &FieldDescriptor,
        entry: &B::Entry,
        value: Value,
    ) -> ProcessorResult<Value> {
        let applies = self.applies_to(model, field);
        let incoming = match &value {
            Value::String(s) if applies && !s.is_empty() => s.as_str(),
            _ => return Ok(value),
        };

        if is_url(incoming) {
            return Ok(value);
        }

        let current = match backend.get_property(model, entry, &field.name)? {
            Property::Value(Value::String(path)) if !path.is_empty() && !is_url(&path) => Some(path),
            _ => None,
        };

        if !DataUri::is_data_uri(incoming) {
            if current.as_deref() == Some(incoming) {
                return Ok(value);
            }
            return Err(ProcessorError::Invalid(format!(
                "Value of '{}' is not a data URI",
                field.name
            )));
        }

        if let Some(current) = current {
            // unreadable current files are replaced
            if let Ok(data) = self.files.read(&current) {
                if DataUri::from_path(&current, data).encode() == incoming {
                    return Ok(Value::String(current));
                }
            }
        }

        let uri = DataUri::parse(incoming)?;
        let path = self.files.write(&uri.mime_type, &uri.data)?;
        Ok(Value::String(path))
    }
}
