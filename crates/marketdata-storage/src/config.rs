//! Object store connection configuration.

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::batch::default_concurrency;
use crate::error::{Error, Result};
use crate::store::DEFAULT_PAGE_SIZE;

// Default values
const DEFAULT_REGION: &str = "us-east-1";

/// Configuration for the S3-compatible data bucket.
///
/// Credentials left unset fall back to the standard `AWS_*` environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct StorageConfig {
    /// Bucket holding the market data objects
    #[cfg_attr(
        feature = "config",
        arg(long = "s3-bucket", env = "S3_DATA_BUCKET_NAME")
    )]
    pub s3_bucket: String,

    /// AWS region (defaults to us-east-1)
    #[cfg_attr(feature = "config", arg(long = "s3-region", env = "AWS_REGION"))]
    #[serde(default)]
    pub s3_region: Option<String>,

    /// Endpoint URL for S3-compatible services (e.g. http://localhost:9000)
    #[cfg_attr(feature = "config", arg(long = "s3-endpoint", env = "S3_ENDPOINT"))]
    #[serde(default)]
    pub s3_endpoint: Option<String>,

    /// Access key ID for static credentials
    #[cfg_attr(
        feature = "config",
        arg(long = "s3-access-key-id", env = "AWS_ACCESS_KEY_ID")
    )]
    #[serde(default)]
    pub s3_access_key_id: Option<String>,

    /// Secret access key for static credentials
    #[cfg_attr(
        feature = "config",
        arg(long = "s3-secret-access-key", env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)
    )]
    #[serde(default)]
    pub s3_secret_access_key: Option<String>,

    /// Session token for temporary credentials
    #[cfg_attr(
        feature = "config",
        arg(long = "s3-session-token", env = "AWS_SESSION_TOKEN", hide_env_values = true)
    )]
    #[serde(default)]
    pub s3_session_token: Option<String>,

    /// Maximum number of concurrent object requests per batch
    #[cfg_attr(
        feature = "config",
        arg(long = "storage-concurrency", env = "STORAGE_CONCURRENCY")
    )]
    #[serde(default)]
    pub storage_concurrency: Option<usize>,

    /// Maximum number of keys fetched per listing page
    #[cfg_attr(
        feature = "config",
        arg(long = "storage-page-size", env = "STORAGE_PAGE_SIZE")
    )]
    #[serde(default)]
    pub storage_page_size: Option<usize>,
}

impl StorageConfig {
    /// Create a configuration for `bucket` with all other values defaulted.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            s3_bucket: bucket.into(),
            ..Default::default()
        }
    }

    /// Returns the region, using the default if not set.
    #[inline]
    pub fn region(&self) -> &str {
        self.s3_region.as_deref().unwrap_or(DEFAULT_REGION)
    }

    /// Returns the batch concurrency, using the default if not set.
    #[inline]
    pub fn concurrency(&self) -> usize {
        self.storage_concurrency.unwrap_or_else(default_concurrency)
    }

    /// Returns the listing page size, using the default if not set.
    #[inline]
    pub fn page_size(&self) -> usize {
        self.storage_page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    /// Set a custom endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.s3_endpoint = Some(endpoint.into());
        self
    }

    /// Set the region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.s3_region = Some(region.into());
        self
    }

    /// Set static credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.s3_access_key_id = Some(access_key_id.into());
        self.s3_secret_access_key = Some(secret_access_key.into());
        self
    }

    /// Set the batch concurrency.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.storage_concurrency = Some(concurrency);
        self
    }

    /// Set the listing page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.storage_page_size = Some(page_size);
        self
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.s3_bucket.trim().is_empty() {
            return Err(Error::invalid_config("bucket name must not be empty"));
        }

        if self.storage_concurrency == Some(0) {
            return Err(Error::invalid_config("concurrency must be at least 1"));
        }

        if self.storage_page_size == Some(0) {
            return Err(Error::invalid_config("page size must be at least 1"));
        }

        if let Some(endpoint) = &self.s3_endpoint
            && !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(Error::invalid_config(format!(
                "endpoint '{endpoint}' must start with http:// or https://"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let config = StorageConfig::new("market-data");
        assert_eq!(config.region(), DEFAULT_REGION);
        assert_eq!(config.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(config.concurrency(), default_concurrency());
        config.validate().unwrap();
    }

    #[test]
    fn builders_override_defaults() {
        let config = StorageConfig::new("market-data")
            .with_region("eu-west-1")
            .with_endpoint("http://localhost:9000")
            .with_concurrency(4)
            .with_page_size(50);
        assert_eq!(config.region(), "eu-west-1");
        assert_eq!(config.concurrency(), 4);
        assert_eq!(config.page_size(), 50);
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_bad_values() {
        let cases = [
            StorageConfig::new(""),
            StorageConfig::new("b").with_concurrency(0),
            StorageConfig::new("b").with_page_size(0),
            StorageConfig::new("b").with_endpoint("localhost:9000"),
        ];
        for config in cases {
            assert!(matches!(config.validate(), Err(Error::InvalidConfig { .. })));
        }
    }

    #[test]
    fn deserializes_with_only_bucket() {
        let config: StorageConfig = serde_json::from_str(r#"{"s3_bucket": "bars"}"#).unwrap();
        assert_eq!(config.s3_bucket, "bars");
        assert!(config.s3_endpoint.is_none());
    }
}
