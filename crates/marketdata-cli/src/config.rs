//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── storage: StorageConfig   # Bucket, region, endpoint, credentials, limits
//! └── command: Command         # store | list | load
//! ```
//!
//! Storage options can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.
//!
//! # Example
//!
//! ```bash
//! marketdata --s3-bucket market-data list equity/bars/raw/alphavantage
//!
//! # Or via environment variables
//! S3_DATA_BUCKET_NAME=market-data marketdata list equity/bars/raw/alphavantage
//! ```

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use marketdata_storage::StorageConfig;
use serde::{Deserialize, Serialize};

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "marketdata")]
#[command(about = "Store, list, and load gzip-compressed JSON market data")]
#[command(version)]
pub struct Cli {
    /// Object store connection and batch limits.
    #[command(flatten)]
    pub storage: StorageConfig,

    /// Operation to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Batch operations exposed on the command line.
#[derive(Debug, Clone, Subcommand, Serialize, Deserialize)]
pub enum Command {
    /// Store JSON objects read from files under keys derived from `--path`.
    Store {
        /// Destination path selecting the key policy.
        #[arg(long, default_value = "equity/bars/raw/alphavantage")]
        path: String,

        /// Files holding a JSON object or an array of JSON objects.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List file names stored under a prefix.
    List {
        /// Key prefix to list.
        prefix: String,
    },

    /// Load objects by file name and print them as a JSON map.
    Load {
        /// Key prefix the file names live under.
        prefix: String,

        /// File names to load.
        file_names: Vec<String>,

        /// Print compact JSON instead of pretty-printed JSON.
        #[arg(long)]
        compact: bool,
    },
}

impl Command {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Store { .. } => "store",
            Self::List { .. } => "list",
            Self::Load { .. } => "load",
        }
    }
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    ///
    /// This should be called before parsing CLI arguments so that clap's `env`
    /// feature can pick up values from .env files.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.storage
            .validate()
            .context("invalid storage configuration")?;
        Ok(())
    }

    /// Logs configuration at debug level (no sensitive information).
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?enabled_features(),
            "build information"
        );

        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            bucket = %self.storage.s3_bucket,
            region = self.storage.region(),
            endpoint = ?self.storage.s3_endpoint,
            static_credentials = self.storage.s3_access_key_id.is_some(),
            concurrency = self.storage.concurrency(),
            page_size = self.storage.page_size(),
            command = self.command.name(),
            "storage configuration"
        );
    }
}

/// Returns a list of enabled compile-time features.
fn enabled_features() -> Vec<&'static str> {
    [cfg!(feature = "dotenv").then_some("dotenv")]
        .into_iter()
        .flatten()
        .collect()
}
