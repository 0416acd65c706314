//! Collectors backed by pre-collected artifacts in the report cache.
//!
//! External collection tooling writes each raw artifact under its stage
//! (JSON) and a condensed summary under the same stage with the `summary`
//! variant (text). Source code is stored per resource, with the resource URL
//! as the variant. These collectors only read; every hit is `from_cache`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use cwv_cache::{CacheKey, CacheStage, CacheStore};
use cwv_core::{DeviceType, NetworkTrace, SourceData, Stage};
use cwv_report::{
    CodeResult, CodeStats, CollectError, CollectOptions, CollectorSet, FieldDataCollector,
    LabAuditCollector, NetworkTraceCollector, SourceCodeCollector, SourceResult, TraceResult,
};
use serde_json::{Value, json};
use tracing::debug;

/// Variant label of summary artifacts.
pub const SUMMARY_VARIANT: &str = "summary";

/// Reads every collector artifact from one cache store.
pub struct ArtifactCollectors {
    cache: Arc<dyn CacheStore>,
}

impl ArtifactCollectors {
    /// Wrap a cache store.
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self { cache }
    }

    /// A collector set whose four members all read from `cache`.
    pub fn collector_set(cache: Arc<dyn CacheStore>) -> CollectorSet {
        let collectors = Arc::new(Self::new(cache));
        CollectorSet {
            field_data: collectors.clone(),
            lab_audit: collectors.clone(),
            network_trace: collectors.clone(),
            source_code: collectors,
        }
    }

    fn json(
        &self,
        page_url: &str,
        device: DeviceType,
        stage: CacheStage,
    ) -> Result<Option<Value>, CollectError> {
        Ok(self
            .cache
            .read_json(&CacheKey::new(page_url, device, stage))?)
    }

    fn summary(
        &self,
        page_url: &str,
        device: DeviceType,
        stage: CacheStage,
    ) -> Result<Option<String>, CollectError> {
        let key = CacheKey::new(page_url, device, stage).with_variant(SUMMARY_VARIANT);
        Ok(self.cache.read_text(&key)?)
    }

    /// Full payload plus summary, both required.
    fn source(
        &self,
        page_url: &str,
        device: DeviceType,
        stage: CacheStage,
        owner: Stage,
    ) -> Result<SourceData, CollectError> {
        let full = self
            .json(page_url, device, stage)?
            .ok_or_else(|| missing(owner, stage, page_url))?;
        let summary = self
            .summary(page_url, device, stage)?
            .ok_or_else(|| missing(owner, stage, &format!("{page_url} ({SUMMARY_VARIANT})")))?;
        Ok(SourceData::new(full, summary))
    }
}

fn missing(owner: Stage, stage: CacheStage, what: &str) -> CollectError {
    CollectError::Missing {
        stage: owner,
        what: format!("{stage} artifact for {what}"),
    }
}

#[async_trait]
impl FieldDataCollector for ArtifactCollectors {
    async fn collect(
        &self,
        page_url: &str,
        device: DeviceType,
        _options: &CollectOptions,
    ) -> Result<SourceResult, CollectError> {
        let Some(full) = self.json(page_url, device, CacheStage::Crux)? else {
            debug!(page_url, %device, "no field data artifact");
            return Ok(SourceResult {
                full: json!({"error": {"code": 404, "message": "no field data artifact"}}),
                summary: String::new(),
                from_cache: true,
            });
        };
        let summary = self
            .summary(page_url, device, CacheStage::Crux)?
            .unwrap_or_default();
        Ok(SourceResult {
            full,
            summary,
            from_cache: true,
        })
    }
}

#[async_trait]
impl LabAuditCollector for ArtifactCollectors {
    async fn collect(
        &self,
        page_url: &str,
        device: DeviceType,
        _options: &CollectOptions,
    ) -> Result<SourceResult, CollectError> {
        let SourceData { full, summary } =
            self.source(page_url, device, CacheStage::Psi, Stage::LabAudit)?;
        Ok(SourceResult {
            full,
            summary,
            from_cache: true,
        })
    }
}

#[async_trait]
impl NetworkTraceCollector for ArtifactCollectors {
    async fn collect(
        &self,
        page_url: &str,
        device: DeviceType,
        _options: &CollectOptions,
    ) -> Result<TraceResult, CollectError> {
        let stage = Stage::NetworkTrace;
        let har = self.source(page_url, device, CacheStage::Har, stage)?;
        let performance = self.source(page_url, device, CacheStage::Perf, stage)?;
        let full_html = self
            .cache
            .read_text(&CacheKey::new(page_url, device, CacheStage::Html))?
            .ok_or_else(|| missing(stage, CacheStage::Html, page_url))?;
        let js_api = self
            .json(page_url, device, CacheStage::JsApi)?
            .unwrap_or(Value::Null);

        Ok(TraceResult {
            trace: NetworkTrace {
                har,
                performance,
                full_html,
                js_api,
            },
            from_cache: true,
        })
    }
}

#[async_trait]
impl SourceCodeCollector for ArtifactCollectors {
    async fn collect(
        &self,
        page_url: &str,
        device: DeviceType,
        request_urls: &[String],
        _options: &CollectOptions,
    ) -> Result<CodeResult, CollectError> {
        let mut code_files = BTreeMap::new();
        let mut stats = CodeStats::default();

        for url in request_urls {
            stats.total += 1;
            let key = CacheKey::new(page_url, device, CacheStage::Code).with_variant(url.as_str());
            match self.cache.read_text(&key)? {
                Some(code) => {
                    stats.from_cache += 1;
                    let _ = code_files.insert(url.clone(), code);
                }
                None => stats.failed += 1,
            }
        }

        debug!(
            page_url,
            total = stats.total,
            cached = stats.from_cache,
            failed = stats.failed,
            "code artifacts read"
        );
        Ok(CodeResult { code_files, stats })
    }
}
