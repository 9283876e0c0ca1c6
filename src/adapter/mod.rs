//! # Resource Adapter
//!
//! Entry and metadata rendering, outgoing value transforms, resource
//! decorators and file value encoding.

pub mod decorator;
pub mod files;
pub mod metadata;
pub mod resource;
pub mod transform;

pub use decorator::{AssetResourceDecorator, AssetUrlResolver, ResourceDecorator};
pub use files::{is_url, mime_type_for_path, DataUri, FileStore, FileStoreError, FileStoreResult};
pub use resource::{AdapterCache, EntryResourceAdapter, Renderer};
pub use transform::{IdentityTransform, StandardValueTransform, ValueTransform};
