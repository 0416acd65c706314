//! Filesystem-backed cache store.
//!
//! Layout:
//!
//! ```text
//! {root}/{host-and-path-slug}-{sha256 prefix}/{device}.{stage}[-variant][@model].{json|md}
//! ```
//!
//! The digest suffix keeps pages apart whose slugs collide after
//! sanitization. Writes go to a temporary sibling first and are renamed into
//! place so a reader never sees a partial entry.

use std::path::{Path, PathBuf};

use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::errors::{CacheError, Result};
use crate::key::{CacheKey, sanitize};
use crate::store::{CacheFormat, CacheLocation, CacheStore};

const SLUG_MAX_LEN: usize = 80;
const DIGEST_PREFIX_LEN: usize = 12;

/// Cache store rooted at a directory.
#[derive(Clone, Debug)]
pub struct FileCacheStore {
    root: PathBuf,
}

impl FileCacheStore {
    /// Store rooted at `root`. The directory is created lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every entry of a page.
    pub fn page_dir(&self, page_url: &str) -> PathBuf {
        self.root.join(page_slug(page_url))
    }

    /// Full path of an entry.
    pub fn entry_path(&self, key: &CacheKey, format: CacheFormat) -> PathBuf {
        self.page_dir(&key.page_url)
            .join(format!("{}.{}", key.file_stem(), format.extension()))
    }

    fn read_raw(&self, key: &CacheKey, format: CacheFormat) -> Result<Option<String>> {
        let path = self.entry_path(key, format);
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                debug!(path = %path.display(), "cache hit");
                Ok(Some(content))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "cache miss");
                Ok(None)
            }
            Err(source) => Err(CacheError::Io { path, source }),
        }
    }

    fn write_raw(&self, key: &CacheKey, format: CacheFormat, content: &str) -> Result<CacheLocation> {
        let path = self.entry_path(key, format);
        let io_err = |source| CacheError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let tmp = path.with_extension(format!("{}.tmp", format.extension()));
        std::fs::write(&tmp, content).map_err(io_err)?;
        std::fs::rename(&tmp, &path).map_err(io_err)?;

        debug!(path = %path.display(), bytes = content.len(), "cache write");
        Ok(CacheLocation::new(path.display().to_string()))
    }
}

impl CacheStore for FileCacheStore {
    fn read_json(&self, key: &CacheKey) -> Result<Option<Value>> {
        let Some(content) = self.read_raw(key, CacheFormat::Json)? else {
            return Ok(None);
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| CacheError::Corrupt {
                location: self.location(key, CacheFormat::Json).to_string(),
                source,
            })
    }

    fn read_text(&self, key: &CacheKey) -> Result<Option<String>> {
        self.read_raw(key, CacheFormat::Text)
    }

    fn write_json(&self, key: &CacheKey, payload: &Value) -> Result<CacheLocation> {
        let content = serde_json::to_string_pretty(payload)?;
        self.write_raw(key, CacheFormat::Json, &content)
    }

    fn write_text(&self, key: &CacheKey, payload: &str) -> Result<CacheLocation> {
        self.write_raw(key, CacheFormat::Text, payload)
    }

    fn location(&self, key: &CacheKey, format: CacheFormat) -> CacheLocation {
        CacheLocation::new(self.entry_path(key, format).display().to_string())
    }
}

/// Directory name for a page: readable slug plus a digest of the full URL.
fn page_slug(page_url: &str) -> String {
    let readable = match url::Url::parse(page_url) {
        Ok(u) => format!("{}{}", u.host_str().unwrap_or_default(), u.path()),
        Err(_) => page_url.to_string(),
    };
    let mut slug = sanitize(readable.trim_end_matches('/'));
    if slug.len() > SLUG_MAX_LEN {
        slug.truncate(SLUG_MAX_LEN);
    }

    let mut hasher = Sha256::new();
    hasher.update(page_url.as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    format!("{slug}-{}", &digest[..DIGEST_PREFIX_LEN])
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
