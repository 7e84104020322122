//! Fault-injecting [`BlobStore`] for client tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use bytes::Bytes;
use object_store::memory::InMemory;

use crate::error::{Error, Result};
use crate::store::{BlobStore, ListPage, ObjectStoreBackend};

/// In-memory store that fails requests for selected keys and counts calls.
pub(crate) struct FlakyStore {
    inner: ObjectStoreBackend,
    failing: Mutex<HashSet<String>>,
    fail_listing: AtomicBool,
    pub puts: AtomicUsize,
    pub gets: AtomicUsize,
    pub pages: AtomicUsize,
}

impl FlakyStore {
    pub fn new(page_size: usize) -> Self {
        Self {
            inner: ObjectStoreBackend::new(InMemory::new()).with_page_size(page_size),
            failing: Mutex::new(HashSet::new()),
            fail_listing: AtomicBool::new(false),
            puts: AtomicUsize::new(0),
            gets: AtomicUsize::new(0),
            pages: AtomicUsize::new(0),
        }
    }

    /// Fail every subsequent put or get of `key`.
    pub fn fail_key(&self, key: &str) {
        self.failing.lock().unwrap().insert(key.to_string());
    }

    /// Fail every listing page after the first.
    pub fn fail_listing_after_first_page(&self) {
        self.fail_listing.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
            + self.gets.load(Ordering::SeqCst)
            + self.pages.load(Ordering::SeqCst)
    }

    fn check(&self, operation: &'static str, key: &str) -> Result<()> {
        if self.failing.lock().unwrap().contains(key) {
            return Err(simulated(operation, key));
        }
        Ok(())
    }
}

fn simulated(operation: &'static str, key: &str) -> Error {
    Error::backend(
        operation,
        key,
        object_store::Error::Generic {
            store: "flaky",
            source: "simulated transport failure".into(),
        },
    )
}

#[async_trait::async_trait]
impl BlobStore for FlakyStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.check("put", key)?;
        self.inner.put(key, data).await
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check("get", key)?;
        self.inner.get(key).await
    }

    async fn list_page(&self, prefix: &str, token: Option<&str>) -> Result<ListPage> {
        self.pages.fetch_add(1, Ordering::SeqCst);
        if token.is_some() && self.fail_listing.load(Ordering::SeqCst) {
            return Err(simulated("list", prefix));
        }
        self.inner.list_page(prefix, token).await
    }
}
