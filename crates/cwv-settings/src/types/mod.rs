//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and implement
//! [`Default`] with production values. `#[serde(default)]` lets a partial
//! JSON file fill only the fields it names.

mod api;
mod models;

pub use api::*;
pub use models::*;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root settings type for the CWV report agent.
///
/// ```json
/// {
///   "models": { "default": "gemini-2.5-pro" },
///   "cache": { "dir": "/var/cache/cwv" }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CwvSettings {
    /// Settings schema version.
    pub version: String,
    /// Model selection and token limits.
    pub models: ModelSettings,
    /// Report cache location.
    pub cache: CacheSettings,
    /// Prompt assembly tuning.
    pub prompt: PromptSettings,
    /// HTTP backend settings.
    pub api: ApiSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for CwvSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            models: ModelSettings::default(),
            cache: CacheSettings::default(),
            prompt: PromptSettings::default(),
            api: ApiSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache
// ─────────────────────────────────────────────────────────────────────────────

/// Report cache settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheSettings {
    /// Cache root directory. A leading `~/` expands to `$HOME`.
    pub dir: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            dir: "~/.cwv/cache".to_string(),
        }
    }
}

impl CacheSettings {
    /// Cache root with `~/` expanded.
    pub fn resolved_dir(&self) -> PathBuf {
        expand_home(&self.dir)
    }
}

/// Expand a leading `~/` against `$HOME` (`/tmp` when unset).
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(rest)
        }
        None => PathBuf::from(path),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Prompt
// ─────────────────────────────────────────────────────────────────────────────

/// Prompt assembly settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PromptSettings {
    /// Character ceiling of the code-analysis section in the summarized tier.
    pub summarized_code_char_limit: usize,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            summarized_code_char_limit: 10_000,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Filter directive (`"warn"`, `"info"`, `"cwv_report=debug"`).
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let s: CwvSettings =
            serde_json::from_str(r#"{"prompt": {"summarizedCodeCharLimit": 500}}"#).unwrap();
        assert_eq!(s.prompt.summarized_code_char_limit, 500);
        assert_eq!(s.logging.level, "warn");
        assert_eq!(s.models.default, "gpt-4.1");
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(CwvSettings::default()).unwrap();
        assert_eq!(json["prompt"]["summarizedCodeCharLimit"], 10_000);
        assert_eq!(json["api"]["apiKeyEnv"], "OPENAI_API_KEY");
    }

    #[test]
    fn expand_home_leaves_absolute_paths() {
        assert_eq!(expand_home("/var/cache"), PathBuf::from("/var/cache"));
    }

    #[test]
    fn expand_home_expands_tilde() {
        let expanded = expand_home("~/.cwv/cache");
        assert!(expanded.ends_with(".cwv/cache"));
        assert!(!expanded.starts_with("~"));
    }
}
