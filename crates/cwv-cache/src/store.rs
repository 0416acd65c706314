//! The cache store seam.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::{CacheError, Result};
use crate::key::CacheKey;

/// Serialization of an entry. One key can hold one entry per format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheFormat {
    /// Structured JSON payload.
    Json,
    /// Plain text (markdown) payload.
    Text,
}

impl CacheFormat {
    /// File extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "md",
        }
    }
}

/// Opaque storage location of an entry (a path for file stores).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheLocation(String);

impl CacheLocation {
    /// Wrap a location string.
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    /// Location as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read-before-write memoization store.
///
/// Reads return `Ok(None)` for an absent entry; only real storage failures
/// are errors.
pub trait CacheStore: Send + Sync {
    /// Read a JSON entry.
    fn read_json(&self, key: &CacheKey) -> Result<Option<Value>>;

    /// Read a text entry.
    fn read_text(&self, key: &CacheKey) -> Result<Option<String>>;

    /// Write a JSON entry, replacing any previous one.
    fn write_json(&self, key: &CacheKey, payload: &Value) -> Result<CacheLocation>;

    /// Write a text entry, replacing any previous one.
    fn write_text(&self, key: &CacheKey, payload: &str) -> Result<CacheLocation>;

    /// Where an entry lives (or would live).
    fn location(&self, key: &CacheKey, format: CacheFormat) -> CacheLocation;
}

/// Read a JSON entry and deserialize it.
///
/// An entry that does not match `T` is reported as corrupt.
pub fn read_as<T: DeserializeOwned>(store: &dyn CacheStore, key: &CacheKey) -> Result<Option<T>> {
    let Some(value) = store.read_json(key)? else {
        return Ok(None);
    };
    serde_json::from_value(value)
        .map(Some)
        .map_err(|source| CacheError::Corrupt {
            location: store.location(key, CacheFormat::Json).to_string(),
            source,
        })
}
