//! Cache keys.

use std::fmt;

use cwv_core::DeviceType;
use serde::{Deserialize, Serialize};

/// Pipeline stage an entry belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStage {
    /// Real-user field data (CrUX).
    Crux,
    /// Lab audit (PageSpeed Insights).
    Psi,
    /// HTTP archive.
    Har,
    /// Browser performance entries.
    Perf,
    /// Rendered page markup.
    Html,
    /// In-page JS API data.
    JsApi,
    /// Fetched source code.
    Code,
    /// Rule engine findings.
    Rules,
    /// Assembled prompt.
    Prompt,
    /// Final report.
    Report,
}

impl CacheStage {
    /// File-name label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Crux => "crux",
            Self::Psi => "psi",
            Self::Har => "har",
            Self::Perf => "perf",
            Self::Html => "html",
            Self::JsApi => "jsapi",
            Self::Code => "code",
            Self::Rules => "rules",
            Self::Prompt => "prompt",
            Self::Report => "report",
        }
    }
}

impl fmt::Display for CacheStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of one cache entry.
///
/// `variant` distinguishes several entries of one stage (a prompt tier, a
/// summary). `model` scopes model-dependent stages such as the report.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheKey {
    /// Page URL.
    pub page_url: String,
    /// Device profile.
    pub device: DeviceType,
    /// Stage.
    pub stage: CacheStage,
    /// Optional variant label.
    pub variant: Option<String>,
    /// Optional model id.
    pub model: Option<String>,
}

impl CacheKey {
    /// Key for a stage of a page.
    pub fn new(page_url: impl Into<String>, device: DeviceType, stage: CacheStage) -> Self {
        Self {
            page_url: page_url.into(),
            device,
            stage,
            variant: None,
            model: None,
        }
    }

    /// Set the variant label.
    #[must_use]
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    /// Set the model id.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// File stem without extension: `{device}.{stage}[-{variant}][@{model}]`.
    ///
    /// `@` never survives [`sanitize`], so a variant cannot collide with a
    /// model suffix.
    pub fn file_stem(&self) -> String {
        let mut stem = format!("{}.{}", self.device, self.stage);
        let parts = [('-', &self.variant), ('@', &self.model)];
        for (sep, part) in parts {
            if let Some(part) = part.as_deref().filter(|p| !p.is_empty()) {
                stem.push(sep);
                stem.push_str(&sanitize(part));
            }
        }
        stem
    }
}

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
pub(crate) fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
