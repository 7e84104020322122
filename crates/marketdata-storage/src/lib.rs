#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for batch client operations.
///
/// Use this target for logging store, list, and load calls and their outcomes.
pub const TRACING_TARGET_CLIENT: &str = "marketdata_storage::client";

/// Tracing target for object store backend operations.
///
/// Use this target for logging individual put, get, and list-page requests.
pub const TRACING_TARGET_STORE: &str = "marketdata_storage::store";

/// Tracing target for bounded batch execution.
pub const TRACING_TARGET_BATCH: &str = "marketdata_storage::batch";

mod batch;
pub mod client;
pub mod codec;
mod config;
mod error;
pub mod key;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

#[doc(hidden)]
pub mod prelude;

pub use batch::default_concurrency;
pub use client::StorageClient;
pub use config::StorageConfig;
pub use error::{Error, Result};
pub use key::KeyPolicy;
pub use store::{BlobStore, ListPage, ObjectStoreBackend};
