//! Rule summarizer.
//!
//! Hands the collected evidence to the external rule engine and memoizes the
//! findings summary under the `rules` cache stage.

use std::collections::BTreeMap;
use std::time::Instant;

use async_trait::async_trait;
use cwv_cache::{CacheKey, CacheStage, CacheStore};
use cwv_core::{
    ArtifactSize, CacheProvenance, DeviceType, EventSink, PageDataset, ReportEvent, RulesOutcome,
    Stage,
};
use cwv_tokens::estimate_text;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::collect::{CollectOptions, elapsed_ms};
use crate::errors::{ReportError, RuleEngineError};

/// Full representations of every source, borrowed from a [`PageDataset`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceBundle<'a> {
    /// Field data payload.
    pub crux: Option<&'a Value>,
    /// Lab audit payload.
    pub psi: Option<&'a Value>,
    /// HTTP archive.
    pub har: Option<&'a Value>,
    /// Performance entries.
    pub perf_entries: Option<&'a Value>,
    /// Source code by URL.
    pub resources: &'a BTreeMap<String, String>,
    /// Rendered markup.
    pub full_html: Option<&'a str>,
    /// In-page JS API data.
    pub js_api: Option<&'a Value>,
}

impl<'a> EvidenceBundle<'a> {
    /// Borrow the evidence out of a dataset.
    pub fn from_dataset(data: &'a PageDataset) -> Self {
        Self {
            crux: data.field_data.as_ref().map(|s| &s.full),
            psi: data.lab_audit.as_ref().map(|s| &s.full),
            har: data.network.as_ref().map(|n| &n.har.full),
            perf_entries: data.network.as_ref().map(|n| &n.performance.full),
            resources: &data.code_files,
            full_html: data.rendered_markup(),
            js_api: data.network.as_ref().map(|n| &n.js_api),
        }
    }
}

/// Rule engine contract.
#[async_trait]
pub trait RuleEngine: Send + Sync {
    /// Evaluate the rules against the evidence and summarize the findings.
    async fn evaluate(
        &self,
        page_url: &str,
        device: DeviceType,
        options: &CollectOptions,
        evidence: &EvidenceBundle<'_>,
    ) -> Result<RulesOutcome, RuleEngineError>;
}

/// Cache-first wrapper around a [`RuleEngine`].
pub struct RuleSummarizer<'a> {
    engine: &'a dyn RuleEngine,
    cache: &'a dyn CacheStore,
    sink: &'a dyn EventSink,
}

impl<'a> RuleSummarizer<'a> {
    /// Create a summarizer.
    pub fn new(
        engine: &'a dyn RuleEngine,
        cache: &'a dyn CacheStore,
        sink: &'a dyn EventSink,
    ) -> Self {
        Self {
            engine,
            cache,
            sink,
        }
    }

    /// Summarize the rule findings for a dataset.
    ///
    /// A cached summary is returned without invoking the engine unless
    /// `options.skip_cache` is set. Fresh summaries are written back.
    pub async fn summarize(
        &self,
        page_url: &str,
        device: DeviceType,
        options: &CollectOptions,
        data: &PageDataset,
    ) -> Result<RulesOutcome, ReportError> {
        let started = Instant::now();
        let key = CacheKey::new(page_url, device, CacheStage::Rules);

        if !options.skip_cache {
            if let Some(summary) = self.cache.read_text(&key)? {
                debug!(page_url, %device, "rules summary served from cache");
                let outcome = RulesOutcome {
                    summary,
                    from_cache: true,
                };
                self.completed(&outcome, started);
                return Ok(outcome);
            }
        }

        let evidence = EvidenceBundle::from_dataset(data);
        let outcome = self
            .engine
            .evaluate(page_url, device, options, &evidence)
            .await?;
        let location = self.cache.write_text(&key, &outcome.summary)?;
        info!(page_url, %device, %location, "rules summary stored");

        self.completed(&outcome, started);
        Ok(outcome)
    }

    fn completed(&self, outcome: &RulesOutcome, started: Instant) {
        self.sink.emit(ReportEvent::StageCompleted {
            stage: Stage::Rules,
            duration_ms: elapsed_ms(started),
            provenance: CacheProvenance::from_flag(outcome.from_cache),
            artifacts: vec![ArtifactSize::new("rules", estimate_text(&outcome.summary))],
        });
    }
}
