//! Convenience re-exports.

pub use crate::client::StorageClient;
pub use crate::config::StorageConfig;
pub use crate::error::{Error, Result};
pub use crate::key::KeyPolicy;
pub use crate::store::{BlobStore, ListPage, ObjectStoreBackend};
