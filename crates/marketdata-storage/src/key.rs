//! Object key derivation.
//!
//! Stored objects are keyed by a [`KeyPolicy`] chosen from the destination
//! path. Loaded objects are keyed by `<prefix>/<file_name>`.

use std::str::FromStr;

use serde_json::Value;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::{Error, Result};

/// Extension appended to every key derived by a [`KeyPolicy`].
pub const JSON_GZ_EXTENSION: &str = ".json.gz";

/// Key derivation policy selected by a destination path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Display, EnumString, EnumIter, IntoStaticStr)]
pub enum KeyPolicy {
    /// Raw daily equity bars as returned by Alpha Vantage, keyed by ticker.
    #[strum(serialize = "equity/bars/raw/alphavantage")]
    EquityBarsRaw,
}

impl KeyPolicy {
    /// Resolve the policy for a destination `path`, ignoring a trailing `/`.
    pub fn from_path(path: &str) -> Result<Self> {
        Self::from_str(path.trim_end_matches('/')).map_err(|_| Error::UnsupportedPath {
            path: path.to_string(),
        })
    }

    /// Destination path this policy writes under.
    #[inline]
    pub fn path(&self) -> &'static str {
        self.into()
    }

    /// JSON pointer to the ticker symbol inside each stored object.
    #[inline]
    pub fn symbol_pointer(&self) -> &'static str {
        match self {
            Self::EquityBarsRaw => "/Meta Data/2. Symbol",
        }
    }

    /// Derive `<path>/<symbol>.json.gz` for `object`.
    pub fn object_key(&self, object: &Value) -> Result<String> {
        let symbol = object
            .pointer(self.symbol_pointer())
            .and_then(Value::as_str)
            .filter(|symbol| !symbol.is_empty())
            .ok_or_else(|| Error::MissingSymbol {
                field: self.symbol_pointer().to_string(),
            })?;

        Ok(format!("{}/{symbol}{JSON_GZ_EXTENSION}", self.path()))
    }
}

/// Last `/`-separated segment of `key`.
pub fn file_name(key: &str) -> &str {
    key.rsplit_once('/').map_or(key, |(_, name)| name)
}

/// Join `prefix` and `file_name` with exactly one `/`.
pub fn join_key(prefix: &str, file_name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        file_name.to_string()
    } else {
        format!("{prefix}/{file_name}")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn path_round_trips_through_strum() {
        for policy in KeyPolicy::iter() {
            assert_eq!(policy.to_string(), policy.path());
            assert_eq!(KeyPolicy::from_path(policy.path()).unwrap(), policy);
        }
    }

    #[test]
    fn from_path_ignores_trailing_slash() {
        let policy = KeyPolicy::from_path("equity/bars/raw/alphavantage/").unwrap();
        assert_eq!(policy, KeyPolicy::EquityBarsRaw);
    }

    #[test]
    fn from_path_rejects_unknown() {
        let err = KeyPolicy::from_path("equity/bars/clean").unwrap_err();
        assert!(matches!(err, Error::UnsupportedPath { ref path } if path == "equity/bars/clean"));
    }

    #[test]
    fn object_key_uses_ticker() {
        let object = json!({"Meta Data": {"2. Symbol": "AAPL"}, "val": 1});
        let key = KeyPolicy::EquityBarsRaw.object_key(&object).unwrap();
        assert_eq!(key, "equity/bars/raw/alphavantage/AAPL.json.gz");
    }

    #[test]
    fn object_key_requires_string_symbol() {
        let missing = json!({"Meta Data": {"1. Information": "Daily Prices"}});
        let numeric = json!({"Meta Data": {"2. Symbol": 42}});
        let empty = json!({"Meta Data": {"2. Symbol": ""}});

        for object in [missing, numeric, empty] {
            let err = KeyPolicy::EquityBarsRaw.object_key(&object).unwrap_err();
            assert!(matches!(err, Error::MissingSymbol { .. }));
        }
    }

    #[test]
    fn file_name_takes_last_segment() {
        assert_eq!(file_name("equity/bars/raw/alphavantage/AAPL.json.gz"), "AAPL.json.gz");
        assert_eq!(file_name("AAPL.json.gz"), "AAPL.json.gz");
    }

    #[test]
    fn join_key_normalizes_slash() {
        assert_eq!(join_key("equity/bars", "MSFT.json.gz"), "equity/bars/MSFT.json.gz");
        assert_eq!(join_key("equity/bars/", "MSFT.json.gz"), "equity/bars/MSFT.json.gz");
        assert_eq!(join_key("", "MSFT.json.gz"), "MSFT.json.gz");
    }
}
