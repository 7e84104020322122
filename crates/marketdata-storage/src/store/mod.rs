//! Object store boundary.
//!
//! [`BlobStore`] is the minimal contract the batch client consumes: whole-blob
//! put and get, plus one page of a prefix listing at a time.
//! [`ObjectStoreBackend`] implements it over any [`object_store::ObjectStore`].

mod backend;

use bytes::Bytes;

pub use backend::{DEFAULT_PAGE_SIZE, ObjectStoreBackend};

use crate::error::Result;

/// One page of a prefix listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Full object keys, in store listing order.
    pub keys: Vec<String>,
    /// Continuation token for the next page, if the listing was truncated.
    pub next_token: Option<String>,
}

impl ListPage {
    /// Whether more pages remain after this one.
    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.next_token.is_some()
    }
}

/// Key/value blob storage with paginated prefix listing.
///
/// Implementations are shared across batch workers and must be safe for
/// concurrent use.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Write `data` at `key`, replacing any existing blob.
    async fn put(&self, key: &str, data: Bytes) -> Result<()>;

    /// Read the whole blob at `key`.
    ///
    /// A missing key yields [`Error::NotFound`](crate::Error::NotFound).
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Fetch one page of keys under `prefix`, continuing after `token`.
    async fn list_page(&self, prefix: &str, token: Option<&str>) -> Result<ListPage>;
}
