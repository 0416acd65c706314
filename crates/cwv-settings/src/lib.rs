//! # cwv-settings
//!
//! Layered configuration for the CWV report agent.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`CwvSettings::default()`]
//! 2. **User file**: `~/.cwv/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `CWV_*` overrides (highest priority)
//!
//! Model token limits live here too: [`ModelSettings::resolve_budget`] is the
//! lookup the budget gate uses.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides, deep_merge, load_settings, load_settings_from_path,
    settings_path,
};
pub use types::*;

use std::sync::OnceLock;

static SETTINGS: OnceLock<CwvSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// Loaded on first access; falls back to compiled defaults (with a warning)
/// when the settings file cannot be read.
pub fn get_settings() -> &'static CwvSettings {
    SETTINGS.get_or_init(|| {
        load_settings().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            CwvSettings::default()
        })
    })
}

/// Initialize the global settings with a specific value.
///
/// Returns the value back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: CwvSettings) -> std::result::Result<(), CwvSettings> {
    SETTINGS.set(settings)
}
