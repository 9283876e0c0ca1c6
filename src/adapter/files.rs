//! # File Values
//!
//! External file store and `data:` URI encoding of file fields.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

/// Result type for file store operations
pub type FileStoreResult<T> = Result<T, FileStoreError>;

/// File store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileStoreError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Storage of file and image field contents, addressed by path
pub trait FileStore: Send + Sync {
    fn read(&self, path: &str) -> FileStoreResult<Vec<u8>>;

    /// Store new contents and return the path they were written to
    fn write(&self, mime_type: &str, data: &[u8]) -> FileStoreResult<String>;
}

/// A decoded `data:<mime>;base64,<payload>` URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl DataUri {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn is_data_uri(value: &str) -> bool {
        value.starts_with("data:")
    }

    /// Parse a base64 data URI
    pub fn parse(value: &str) -> FileStoreResult<Self> {
        let rest = value
            .strip_prefix("data:")
            .ok_or_else(|| FileStoreError::InvalidDataUri("missing data: scheme".to_string()))?;

        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| FileStoreError::InvalidDataUri("missing payload separator".to_string()))?;

        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| FileStoreError::InvalidDataUri("only base64 payloads are supported".to_string()))?;

        let data = STANDARD
            .decode(payload)
            .map_err(|e| FileStoreError::InvalidDataUri(e.to_string()))?;

        let mime_type = if mime_type.is_empty() {
            "application/octet-stream"
        } else {
            mime_type
        };

        Ok(Self::new(mime_type, data))
    }

    /// Encode the contents of a stored file
    pub fn from_path(path: &str, data: Vec<u8>) -> Self {
        Self::new(mime_type_for_path(path), data)
    }

    pub fn encode(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }
}

/// URLs are kept as-is in file fields
pub fn is_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Guess a mime type from the file extension
pub fn mime_type_for_path(path: &str) -> &'static str {
    let extension = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}
