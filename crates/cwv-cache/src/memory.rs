//! In-memory cache store.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde_json::Value;

use crate::errors::Result;
use crate::key::CacheKey;
use crate::store::{CacheFormat, CacheLocation, CacheStore};

#[derive(Clone, Debug)]
enum Entry {
    Json(Value),
    Text(String),
}

/// Process-local store. Every write is also appended to a log.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<(CacheKey, CacheFormat), Entry>>,
    writes: Mutex<Vec<(CacheKey, CacheFormat)>>,
}

impl MemoryCacheStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys written so far, in write order.
    pub fn writes(&self) -> Vec<(CacheKey, CacheFormat)> {
        self.writes.lock().clone()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn put(&self, key: &CacheKey, format: CacheFormat, entry: Entry) -> CacheLocation {
        let _ = self.entries.lock().insert((key.clone(), format), entry);
        self.writes.lock().push((key.clone(), format));
        self.location(key, format)
    }
}

impl CacheStore for MemoryCacheStore {
    fn read_json(&self, key: &CacheKey) -> Result<Option<Value>> {
        Ok(match self.entries.lock().get(&(key.clone(), CacheFormat::Json)) {
            Some(Entry::Json(v)) => Some(v.clone()),
            _ => None,
        })
    }

    fn read_text(&self, key: &CacheKey) -> Result<Option<String>> {
        Ok(match self.entries.lock().get(&(key.clone(), CacheFormat::Text)) {
            Some(Entry::Text(s)) => Some(s.clone()),
            _ => None,
        })
    }

    fn write_json(&self, key: &CacheKey, payload: &Value) -> Result<CacheLocation> {
        Ok(self.put(key, CacheFormat::Json, Entry::Json(payload.clone())))
    }

    fn write_text(&self, key: &CacheKey, payload: &str) -> Result<CacheLocation> {
        Ok(self.put(key, CacheFormat::Text, Entry::Text(payload.to_string())))
    }

    fn location(&self, key: &CacheKey, format: CacheFormat) -> CacheLocation {
        CacheLocation::new(format!(
            "memory://{}/{}.{}",
            key.page_url,
            key.file_stem(),
            format.extension()
        ))
    }
}
