//! Collector facade.
//!
//! Calls the four collectors in a fixed order (field data, lab audit,
//! network trace, source code) and folds their results into one
//! [`PageDataset`]. The code stage depends on the request URLs found in the
//! trace. A field-data payload whose `error.code` is 404 means the page has
//! no real-user data: the section is left empty and the run continues.
//!
//! The facade never retries; that is each collector's business.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use cwv_core::{
    ArtifactSize, CacheProvenance, DeviceType, EventSink, NetworkTrace, PageDataset, ReportEvent,
    SourceData, Stage,
};
use cwv_tokens::{estimate, estimate_text, estimate_value};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::CollectError;

/// HTTP-style code a field-data source uses for "no data for this page".
pub const NO_DATA_CODE: i64 = 404;

// ─────────────────────────────────────────────────────────────────────────────
// Collector contracts
// ─────────────────────────────────────────────────────────────────────────────

/// Options forwarded to every collector.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectOptions {
    /// Ignore cached artifacts and collect afresh.
    pub skip_cache: bool,
}

/// Output of a single-payload collector.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceResult {
    /// Complete payload.
    pub full: Value,
    /// Condensed summary.
    pub summary: String,
    /// Whether the payload came from cache.
    pub from_cache: bool,
}

/// Output of the network-trace collector.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TraceResult {
    /// HAR, performance entries, rendered HTML, JS API data.
    pub trace: NetworkTrace,
    /// Whether the trace came from cache.
    pub from_cache: bool,
}

/// Fetch statistics of the source-code collector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeStats {
    /// Resources requested.
    pub total: u32,
    /// Resources served from cache.
    pub from_cache: u32,
    /// Resources that failed to fetch.
    pub failed: u32,
}

impl CodeStats {
    /// Cache provenance of the whole code stage.
    pub fn provenance(&self) -> CacheProvenance {
        if self.total > 0 && self.from_cache >= self.total {
            CacheProvenance::Hit
        } else if self.from_cache > 0 {
            CacheProvenance::Partial {
                cached: self.from_cache,
                total: self.total,
            }
        } else {
            CacheProvenance::Miss
        }
    }
}

/// Output of the source-code collector.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CodeResult {
    /// Source code keyed by resource URL.
    pub code_files: BTreeMap<String, String>,
    /// Fetch statistics.
    pub stats: CodeStats,
}

/// Real-user field data (CrUX).
#[async_trait]
pub trait FieldDataCollector: Send + Sync {
    /// Collect field data for a page.
    async fn collect(
        &self,
        page_url: &str,
        device: DeviceType,
        options: &CollectOptions,
    ) -> Result<SourceResult, CollectError>;
}

/// Lab audit (PageSpeed Insights).
#[async_trait]
pub trait LabAuditCollector: Send + Sync {
    /// Collect a lab audit for a page.
    async fn collect(
        &self,
        page_url: &str,
        device: DeviceType,
        options: &CollectOptions,
    ) -> Result<SourceResult, CollectError>;
}

/// Network and performance trace.
#[async_trait]
pub trait NetworkTraceCollector: Send + Sync {
    /// Capture a trace of a page load.
    async fn collect(
        &self,
        page_url: &str,
        device: DeviceType,
        options: &CollectOptions,
    ) -> Result<TraceResult, CollectError>;
}

/// Source code of the resources a page requests.
#[async_trait]
pub trait SourceCodeCollector: Send + Sync {
    /// Fetch the code behind `request_urls`.
    async fn collect(
        &self,
        page_url: &str,
        device: DeviceType,
        request_urls: &[String],
        options: &CollectOptions,
    ) -> Result<CodeResult, CollectError>;
}

/// The four collectors a report run consumes.
#[derive(Clone)]
pub struct CollectorSet {
    /// Field data collector.
    pub field_data: Arc<dyn FieldDataCollector>,
    /// Lab audit collector.
    pub lab_audit: Arc<dyn LabAuditCollector>,
    /// Network trace collector.
    pub network_trace: Arc<dyn NetworkTraceCollector>,
    /// Source code collector.
    pub source_code: Arc<dyn SourceCodeCollector>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Facade
// ─────────────────────────────────────────────────────────────────────────────

/// Runs the collectors in sequence and assembles a [`PageDataset`].
pub struct CollectorFacade<'a> {
    collectors: &'a CollectorSet,
    sink: &'a dyn EventSink,
}

impl<'a> CollectorFacade<'a> {
    /// Create a facade over a collector set.
    pub fn new(collectors: &'a CollectorSet, sink: &'a dyn EventSink) -> Self {
        Self { collectors, sink }
    }

    /// Collect every source for a page.
    ///
    /// Fails on the first collector error; a "no data" field-data result is
    /// not an error.
    pub async fn collect(
        &self,
        page_url: &str,
        device: DeviceType,
        options: &CollectOptions,
    ) -> Result<PageDataset, CollectError> {
        let started = Instant::now();
        self.sink.emit(ReportEvent::CollectionStarted);

        let mut data = PageDataset::new(page_url, device);
        data.field_data = self.field_data(page_url, device, options).await?;
        data.lab_audit = Some(self.lab_audit(page_url, device, options).await?);

        let trace = self.network_trace(page_url, device, options).await?;
        data.request_urls = trace.request_urls();
        data.network = Some(trace);

        data.code_files = self
            .source_code(page_url, device, &data.request_urls, options)
            .await?;

        let duration_ms = elapsed_ms(started);
        info!(page_url, %device, duration_ms, "data collection completed");
        self.sink
            .emit(ReportEvent::CollectionCompleted { duration_ms });
        Ok(data)
    }

    async fn field_data(
        &self,
        page_url: &str,
        device: DeviceType,
        options: &CollectOptions,
    ) -> Result<Option<SourceData>, CollectError> {
        let started = Instant::now();
        let result = self
            .collectors
            .field_data
            .collect(page_url, device, options)
            .await?;

        match payload_error(&result.full) {
            Some(PayloadError::NoData) => {
                warn!(page_url, %device, "no field data for this page");
                self.sink.emit(ReportEvent::NoData {
                    stage: Stage::FieldData,
                });
                Ok(None)
            }
            Some(PayloadError::Other(message)) => {
                warn!(page_url, %device, %message, "field data collector reported an error");
                self.sink.emit(ReportEvent::StageFailed {
                    stage: Stage::FieldData,
                    message,
                });
                Ok(None)
            }
            None => {
                self.completed(
                    Stage::FieldData,
                    started,
                    CacheProvenance::from_flag(result.from_cache),
                    vec![ArtifactSize::new("crux", estimate_value(&result.full))],
                );
                Ok(Some(SourceData::new(result.full, result.summary)))
            }
        }
    }

    async fn lab_audit(
        &self,
        page_url: &str,
        device: DeviceType,
        options: &CollectOptions,
    ) -> Result<SourceData, CollectError> {
        let started = Instant::now();
        let result = self
            .collectors
            .lab_audit
            .collect(page_url, device, options)
            .await?;
        self.completed(
            Stage::LabAudit,
            started,
            CacheProvenance::from_flag(result.from_cache),
            vec![ArtifactSize::new("psi", estimate_value(&result.full))],
        );
        Ok(SourceData::new(result.full, result.summary))
    }

    async fn network_trace(
        &self,
        page_url: &str,
        device: DeviceType,
        options: &CollectOptions,
    ) -> Result<NetworkTrace, CollectError> {
        let started = Instant::now();
        let TraceResult { trace, from_cache } = self
            .collectors
            .network_trace
            .collect(page_url, device, options)
            .await?;
        self.completed(
            Stage::NetworkTrace,
            started,
            CacheProvenance::from_flag(from_cache),
            vec![
                ArtifactSize::new("har", estimate_value(&trace.har.full)),
                ArtifactSize::new("perfEntries", estimate_value(&trace.performance.full)),
                ArtifactSize::new("fullHtml", estimate_text(&trace.full_html)),
                ArtifactSize::new("jsApi", estimate_value(&trace.js_api)),
            ],
        );
        Ok(trace)
    }

    async fn source_code(
        &self,
        page_url: &str,
        device: DeviceType,
        request_urls: &[String],
        options: &CollectOptions,
    ) -> Result<BTreeMap<String, String>, CollectError> {
        let started = Instant::now();
        let CodeResult { code_files, stats } = self
            .collectors
            .source_code
            .collect(page_url, device, request_urls, options)
            .await?;

        if stats.failed > 0 {
            warn!(
                page_url,
                failed = stats.failed,
                total = stats.total,
                "some resources could not be fetched"
            );
        }
        self.sink.emit(ReportEvent::ResourcesCollected {
            total: stats.total,
            from_cache: stats.from_cache,
            failed: stats.failed,
        });
        self.completed(
            Stage::SourceCode,
            started,
            stats.provenance(),
            vec![ArtifactSize::new("code", estimate(&code_files))],
        );
        Ok(code_files)
    }

    fn completed(
        &self,
        stage: Stage,
        started: Instant,
        provenance: CacheProvenance,
        artifacts: Vec<ArtifactSize>,
    ) {
        self.sink.emit(ReportEvent::StageCompleted {
            stage,
            duration_ms: elapsed_ms(started),
            provenance,
            artifacts,
        });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
enum PayloadError {
    NoData,
    Other(String),
}

/// Inspect a field-data payload for an embedded `error` object.
fn payload_error(full: &Value) -> Option<PayloadError> {
    let error = full.get("error").filter(|e| !e.is_null())?;
    if error.get("code").and_then(Value::as_i64) == Some(NO_DATA_CODE) {
        return Some(PayloadError::NoData);
    }
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .map_or_else(|| error.to_string(), String::from);
    Some(PayloadError::Other(message))
}

#[allow(clippy::cast_possible_truncation)]
pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
