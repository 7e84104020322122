//! Error types for batch storage operations.

use std::io;

/// Result type for all storage operations in this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Unified error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The destination path has no key derivation policy.
    #[error("unsupported destination path '{path}'")]
    UnsupportedPath { path: String },

    /// A stored object lacks the field its key is derived from.
    #[error("object is missing the ticker symbol field '{field}'")]
    MissingSymbol { field: String },

    /// No object exists at the requested key.
    #[error("object '{key}' not found")]
    NotFound { key: String },

    /// The object store rejected or failed a request.
    #[error("object store {operation} failed for '{key}': {source}")]
    Backend {
        operation: &'static str,
        key: String,
        #[source]
        source: object_store::Error,
    },

    /// JSON encoding or gzip compression failed.
    #[error("failed to encode object for '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: io::Error,
    },

    /// The fetched blob is not valid gzip.
    #[error("failed to decompress '{key}': {source}")]
    Decompress {
        key: String,
        #[source]
        source: io::Error,
    },

    /// The decompressed blob is not valid JSON.
    #[error("invalid JSON in '{key}': {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A batch worker panicked or could not be scheduled.
    #[error("batch task failed: {reason}")]
    Task { reason: String },

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    /// Create an invalid configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create a batch task error.
    pub fn task(reason: impl Into<String>) -> Self {
        Self::Task {
            reason: reason.into(),
        }
    }

    /// Convert an [`object_store::Error`] raised while performing `operation` on `key`.
    pub fn backend(operation: &'static str, key: impl Into<String>, err: object_store::Error) -> Self {
        let key = key.into();
        match err {
            object_store::Error::NotFound { .. } => Self::NotFound { key },
            source => Self::Backend {
                operation,
                key,
                source,
            },
        }
    }

    /// Returns `true` if the error reports a missing object.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::task(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_maps_not_found() {
        let err = Error::backend(
            "get",
            "equity/AAPL.json.gz",
            object_store::Error::NotFound {
                path: "equity/AAPL.json.gz".to_string(),
                source: "missing".into(),
            },
        );
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "object 'equity/AAPL.json.gz' not found");
    }

    #[test]
    fn backend_keeps_other_errors() {
        let err = Error::backend(
            "put",
            "equity/MSFT.json.gz",
            object_store::Error::Generic {
                store: "S3",
                source: "connection reset".into(),
            },
        );
        assert!(!err.is_not_found());
        assert!(matches!(err, Error::Backend { operation: "put", .. }));
    }
}
