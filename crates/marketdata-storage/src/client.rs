//! Batch client for gzip-compressed JSON objects.
//!
//! [`StorageClient`] is a cheap, cloneable handle around a shared
//! [`BlobStore`]. Store and load calls fan out one task per object, bounded
//! by the client's concurrency limit, and wait for every task before
//! returning. The first failure observed is returned; partial progress is
//! neither rolled back nor reported.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::batch::{Batch, default_concurrency};
use crate::config::StorageConfig;
use crate::error::Result;
use crate::key::{self, KeyPolicy};
use crate::store::{BlobStore, ObjectStoreBackend};
use crate::{TRACING_TARGET_CLIENT, codec};

/// Cloneable batch store/list/load client for one bucket.
#[derive(Clone)]
pub struct StorageClient {
    bucket: String,
    store: Arc<dyn BlobStore>,
    concurrency: usize,
}

impl StorageClient {
    /// Wrap an existing store handle for `bucket`.
    pub fn new(bucket: impl Into<String>, store: impl BlobStore) -> Self {
        Self::from_arc(bucket, Arc::new(store))
    }

    /// Wrap an already shared store handle for `bucket`.
    pub fn from_arc(bucket: impl Into<String>, store: Arc<dyn BlobStore>) -> Self {
        Self {
            bucket: bucket.into(),
            store,
            concurrency: default_concurrency(),
        }
    }

    /// Connect to the S3 bucket described by `config`.
    ///
    /// The connection is created once here and shared by every later call.
    #[tracing::instrument(
        name = "client.connect",
        target = TRACING_TARGET_CLIENT,
        skip(config),
        fields(bucket = %config.s3_bucket)
    )]
    pub fn connect(config: &StorageConfig) -> Result<Self> {
        config.validate()?;
        let backend = ObjectStoreBackend::s3(config)?;
        let client =
            Self::new(config.s3_bucket.clone(), backend).with_concurrency(config.concurrency());

        tracing::info!(
            target: TRACING_TARGET_CLIENT,
            bucket = %client.bucket,
            concurrency = client.concurrency,
            "storage client connected"
        );
        Ok(client)
    }

    /// Set the maximum number of concurrent object requests per batch.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Bucket this client reads and writes.
    #[inline]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Maximum number of concurrent object requests per batch.
    #[inline]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Store every object under the key derived by the policy for `path`.
    ///
    /// Keys are derived for the whole batch before any upload starts, so an
    /// unsupported path or an object without a ticker writes nothing.
    /// Existing blobs at the derived keys are overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPath`](crate::Error::UnsupportedPath),
    /// [`Error::MissingSymbol`](crate::Error::MissingSymbol), or the first
    /// upload failure observed once all uploads have finished.
    #[tracing::instrument(
        name = "client.store",
        target = TRACING_TARGET_CLIENT,
        skip(self, objects),
        fields(bucket = %self.bucket, count)
    )]
    pub async fn store<I>(&self, path: &str, objects: I) -> Result<()>
    where
        I: IntoIterator<Item = Value>,
    {
        let policy = KeyPolicy::from_path(path)?;
        let items = objects
            .into_iter()
            .map(|object| policy.object_key(&object).map(|key| (key, object)))
            .collect::<Result<Vec<_>>>()?;
        tracing::Span::current().record("count", items.len());

        let mut batch = Batch::new(self.concurrency);
        for (key, object) in items {
            let store = Arc::clone(&self.store);
            batch.spawn(async move {
                let data = codec::encode(&key, &object)?;
                store.put(&key, data).await
            });
        }

        let dispatched = batch.len();
        batch.join(|()| {}).await?;

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            stored = dispatched,
            "batch stored"
        );
        Ok(())
    }

    /// List the file names of every object under `prefix`, in store order.
    ///
    /// Pages are requested one after another, each continuing from the token
    /// of the previous page.
    ///
    /// `prefix` is matched on whole `/` segments: `equity/bars` lists
    /// `equity/bars/AAPL.json.gz` but not `equity/barsx/AAPL.json.gz`, and a
    /// partial segment such as `equity/bars/raw/alpha` lists nothing.
    #[tracing::instrument(
        name = "client.list",
        target = TRACING_TARGET_CLIENT,
        skip(self),
        fields(bucket = %self.bucket, pages, count)
    )]
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut file_names = Vec::new();
        let mut token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.store.list_page(prefix, token.as_deref()).await?;
            pages += 1;

            file_names.extend(page.keys.iter().map(|k| key::file_name(k).to_string()));

            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        let span = tracing::Span::current();
        span.record("pages", pages);
        span.record("count", file_names.len());
        Ok(file_names)
    }

    /// Load `<prefix>/<file_name>` for every file name, keyed by file name.
    ///
    /// An empty `file_names` returns an empty map without touching the store.
    ///
    /// # Errors
    ///
    /// Returns the first fetch, decompression, or JSON failure observed once
    /// all fetches have finished. Objects loaded successfully are discarded.
    #[tracing::instrument(
        name = "client.load",
        target = TRACING_TARGET_CLIENT,
        skip(self, file_names),
        fields(bucket = %self.bucket, count)
    )]
    pub async fn load<I>(&self, prefix: &str, file_names: I) -> Result<HashMap<String, Value>>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut batch = Batch::new(self.concurrency);
        for file_name in file_names {
            let file_name: String = file_name.into();
            let key = key::join_key(prefix, &file_name);
            let store = Arc::clone(&self.store);
            batch.spawn(async move {
                let data = store.get(&key).await?;
                let value = codec::decode(&key, &data)?;
                Ok((file_name, value))
            });
        }

        let mut objects = HashMap::with_capacity(batch.len());
        tracing::Span::current().record("count", batch.len());

        batch
            .join(|(file_name, value)| {
                objects.insert(file_name, value);
            })
            .await?;
        Ok(objects)
    }
}

impl std::fmt::Debug for StorageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageClient")
            .field("bucket", &self.bucket)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}
