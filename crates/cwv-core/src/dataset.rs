//! Page dataset types.
//!
//! [`PageDataset`] is the single record that flows from collection through
//! rule evaluation into prompt assembly. Each source is a named optional
//! field so an absent source (e.g. no field data for a page) is explicit.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::messages::DeviceType;

// ─────────────────────────────────────────────────────────────────────────────
// SourceData
// ─────────────────────────────────────────────────────────────────────────────

/// A data source in both its full and its condensed representation.
///
/// The summary is expected to be smaller than the full payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceData {
    /// Complete payload as returned by the collector.
    pub full: Value,
    /// Condensed human-readable summary.
    pub summary: String,
}

impl SourceData {
    /// Create a source from its two representations.
    pub fn new(full: Value, summary: impl Into<String>) -> Self {
        Self {
            full,
            summary: summary.into(),
        }
    }

    /// Render the full payload as prompt text.
    ///
    /// String payloads are used verbatim; everything else is compact JSON.
    pub fn full_text(&self) -> String {
        value_text(&self.full)
    }
}

/// Render a JSON value as prompt text (strings verbatim, others as JSON).
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// NetworkTrace
// ─────────────────────────────────────────────────────────────────────────────

/// Output of the network-trace stage.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkTrace {
    /// HTTP archive and its summary.
    pub har: SourceData,
    /// Browser performance entries and their summary.
    pub performance: SourceData,
    /// Rendered page markup.
    pub full_html: String,
    /// Data captured from in-page JS APIs.
    pub js_api: Value,
}

impl NetworkTrace {
    /// Request URLs listed in the HAR (`log.entries[].request.url`).
    ///
    /// Entries without a string URL are skipped.
    pub fn request_urls(&self) -> Vec<String> {
        self.har.full["log"]["entries"]
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|e| e["request"]["url"].as_str())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Response headers of the first HAR entry, lower-cased by name.
    pub fn first_response_headers(&self) -> BTreeMap<String, String> {
        self.har.full["log"]["entries"][0]["response"]["headers"]
            .as_array()
            .map(|headers| {
                headers
                    .iter()
                    .filter_map(|h| {
                        let name = h["name"].as_str()?;
                        let value = h["value"].as_str().unwrap_or_default();
                        Some((name.to_lowercase(), value.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RulesOutcome
// ─────────────────────────────────────────────────────────────────────────────

/// Condensed findings from the rule engine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesOutcome {
    /// Findings summary text.
    pub summary: String,
    /// Whether the outcome was served from cache.
    pub from_cache: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// PageDataset
// ─────────────────────────────────────────────────────────────────────────────

/// Everything known about one page under one device profile.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDataset {
    /// Page URL.
    pub page_url: String,
    /// Device profile.
    pub device: DeviceType,
    /// Real-user field data; `None` when the page has no field data.
    pub field_data: Option<SourceData>,
    /// Lab audit results.
    pub lab_audit: Option<SourceData>,
    /// Network and performance trace.
    pub network: Option<NetworkTrace>,
    /// Fetched source code keyed by resource URL.
    pub code_files: BTreeMap<String, String>,
    /// Request URLs observed in the trace.
    pub request_urls: Vec<String>,
    /// Detected CMS identifier.
    pub cms: Option<String>,
    /// Rule engine findings.
    pub rules: Option<RulesOutcome>,
}

impl PageDataset {
    /// Create an empty dataset for a page.
    pub fn new(page_url: impl Into<String>, device: DeviceType) -> Self {
        Self {
            page_url: page_url.into(),
            device,
            ..Self::default()
        }
    }

    /// Rendered markup for the page.
    ///
    /// Prefers the rendered HTML from the trace and falls back to the
    /// fetched document source.
    pub fn rendered_markup(&self) -> Option<&str> {
        self.network
            .as_ref()
            .map(|n| n.full_html.as_str())
            .filter(|html| !html.is_empty())
            .or_else(|| self.code_files.get(&self.page_url).map(String::as_str))
    }

    /// Source code of every resource except the page document itself.
    pub fn code_resources(&self) -> impl Iterator<Item = (&String, &String)> {
        self.code_files
            .iter()
            .filter(|(url, _)| **url != self.page_url)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
