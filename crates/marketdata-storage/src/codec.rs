//! Gzip-compressed JSON blob encoding.
//!
//! Every stored blob is the compact UTF-8 JSON text of a single value,
//! gzip-compressed at the default level.

use std::io::{Read, Write};

use bytes::Bytes;
use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use serde_json::Value;

use crate::error::{Error, Result};

/// Serialize `value` to JSON text and gzip it.
///
/// `key` only labels the error.
pub fn encode(key: &str, value: &Value) -> Result<Bytes> {
    let json = serde_json::to_vec(value).map_err(|e| Error::Encode {
        key: key.to_string(),
        source: e.into(),
    })?;

    let compress = |json: &[u8]| -> std::io::Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::with_capacity(json.len() / 2), Compression::default());
        encoder.write_all(json)?;
        encoder.finish()
    };

    compress(&json)
        .map(Bytes::from)
        .map_err(|source| Error::Encode {
            key: key.to_string(),
            source,
        })
}

/// Gunzip `data` and parse it as JSON text.
///
/// Concatenated gzip members are decoded as one stream.
pub fn decode(key: &str, data: &[u8]) -> Result<Value> {
    let mut json = Vec::new();
    MultiGzDecoder::new(data)
        .read_to_end(&mut json)
        .map_err(|source| Error::Decompress {
            key: key.to_string(),
            source,
        })?;

    serde_json::from_slice(&json).map_err(|source| Error::Json {
        key: key.to_string(),
        source,
    })
}
