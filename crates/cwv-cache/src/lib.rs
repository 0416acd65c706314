//! # cwv-cache
//!
//! Report cache: every expensive stage of a report run (raw collection
//! artifacts, rule findings, assembled prompts, final reports) is memoized
//! under a [`CacheKey`] of page URL, device, stage, and optional variant and
//! model.
//!
//! Entries are written once per successful computation and never
//! invalidated automatically.
//!
//! - [`FileCacheStore`]: one directory per page under a cache root
//! - [`MemoryCacheStore`]: in-process store that also records its writes

#![deny(unsafe_code)]

pub mod errors;
pub mod file;
pub mod key;
pub mod memory;
pub mod store;

pub use errors::{CacheError, Result};
pub use file::FileCacheStore;
pub use key::{CacheKey, CacheStage};
pub use memory::MemoryCacheStore;
pub use store::{CacheFormat, CacheLocation, CacheStore, read_as};
