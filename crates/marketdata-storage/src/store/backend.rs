//! [`BlobStore`] backed by [`object_store::ObjectStore`].

use std::sync::Arc;

use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::{Attribute, ObjectMeta, ObjectStore, PutMode, PutOptions, PutPayload};

use super::{BlobStore, ListPage};
use crate::TRACING_TARGET_STORE;
use crate::config::StorageConfig;
use crate::error::{Error, Result};

/// Default number of keys per listing page, matching the S3 maximum.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Content type recorded on every uploaded blob.
const CONTENT_TYPE: &str = "application/gzip";

/// Cloneable handle to any [`ObjectStore`] backend (S3, in-memory, ...).
///
/// Keys are used verbatim: they are parsed, not percent-encoded, so a key
/// read back from a listing addresses the same blob.
///
/// Listing is paged by key: each page holds at most `page_size` keys in the
/// store's lexicographic order. A full page carries its last key as the
/// continuation token and the next page starts strictly after it, so a
/// listing that ends exactly on a page boundary finishes with an empty page.
#[derive(Clone, Debug)]
pub struct ObjectStoreBackend {
    store: Arc<dyn ObjectStore>,
    page_size: usize,
}

impl ObjectStoreBackend {
    /// Wrap a concrete [`ObjectStore`] implementation.
    pub fn new(store: impl ObjectStore) -> Self {
        Self::from_arc(Arc::new(store))
    }

    /// Wrap an already shared [`ObjectStore`].
    pub fn from_arc(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Connect to the S3-compatible bucket described by `config`.
    ///
    /// Credentials not set in `config` are resolved from the `AWS_*`
    /// environment variables.
    pub fn s3(config: &StorageConfig) -> Result<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(&config.s3_bucket)
            .with_region(config.region());

        if let Some(endpoint) = &config.s3_endpoint {
            builder = builder.with_endpoint(endpoint);
            if endpoint.starts_with("http://") {
                builder = builder.with_allow_http(true);
            }
        }

        if let Some(access_key) = &config.s3_access_key_id {
            builder = builder.with_access_key_id(access_key);
        }

        if let Some(secret_key) = &config.s3_secret_access_key {
            builder = builder.with_secret_access_key(secret_key);
        }

        if let Some(token) = &config.s3_session_token {
            builder = builder.with_token(token);
        }

        let store = builder
            .build()
            .map_err(|e| Error::backend("connect", config.s3_bucket.as_str(), e))?;

        tracing::debug!(
            target: TRACING_TARGET_STORE,
            bucket = %config.s3_bucket,
            region = config.region(),
            endpoint = ?config.s3_endpoint,
            "s3 backend created"
        );

        Ok(Self::new(store).with_page_size(config.page_size()))
    }

    /// Set the maximum number of keys returned per listing page.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Maximum number of keys returned per listing page.
    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }
}

#[async_trait::async_trait]
impl BlobStore for ObjectStoreBackend {
    #[tracing::instrument(
        name = "store.put",
        target = TRACING_TARGET_STORE,
        skip(self, data),
        fields(size = data.len())
    )]
    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let path = parse_path("put", key)?;
        let mut opts = PutOptions {
            mode: PutMode::Overwrite,
            ..Default::default()
        };
        opts.attributes
            .insert(Attribute::ContentType, CONTENT_TYPE.into());

        self.store
            .put_opts(&path, PutPayload::from(data), opts)
            .await
            .map_err(|e| Error::backend("put", key, e))?;
        Ok(())
    }

    #[tracing::instrument(name = "store.get", target = TRACING_TARGET_STORE, skip(self))]
    async fn get(&self, key: &str) -> Result<Bytes> {
        let path = parse_path("get", key)?;
        let result = self
            .store
            .get(&path)
            .await
            .map_err(|e| Error::backend("get", key, e))?;
        result.bytes().await.map_err(|e| Error::backend("get", key, e))
    }

    #[tracing::instrument(
        name = "store.list_page",
        target = TRACING_TARGET_STORE,
        skip(self),
        fields(page_size = self.page_size)
    )]
    async fn list_page(&self, prefix: &str, token: Option<&str>) -> Result<ListPage> {
        let prefix_path = match prefix {
            "" => None,
            prefix => Some(parse_path("list", prefix)?),
        };
        let stream = match token {
            None => self.store.list(prefix_path.as_ref()),
            Some(token) => {
                let offset = parse_path("list", token)?;
                self.store.list_with_offset(prefix_path.as_ref(), &offset)
            }
        };

        // No look-ahead past the page: the next entry may live in another
        // ListObjectsV2 response.
        let keys: Vec<String> = stream
            .take(self.page_size)
            .map_ok(|meta: ObjectMeta| meta.location.to_string())
            .try_collect()
            .await
            .map_err(|e| Error::backend("list", prefix, e))?;

        let next_token = if keys.len() == self.page_size {
            keys.last().cloned()
        } else {
            None
        };

        Ok(ListPage { keys, next_token })
    }
}

/// Parse `key` into a [`Path`] without percent-encoding any segment.
fn parse_path(operation: &'static str, key: &str) -> Result<Path> {
    Path::parse(key).map_err(|e| Error::backend(operation, key, e.into()))
}
