//! Shared test doubles for the report pipeline.

#![allow(dead_code, missing_docs)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use cwv_cache::{CacheFormat, CacheKey, CacheLocation, CacheStage, CacheStore, MemoryCacheStore};
use cwv_core::{
    DeviceType, Message, NetworkTrace, RecordingSink, ReportEvent, RulesOutcome,
    SourceData, Stage, TokenBudget,
};
use cwv_llm::{BackendError, BackendResult, LlmBackend, LlmResponse};
use cwv_report::{
    CodeResult, CodeStats, CollectError, CollectOptions, CollectorSet, EvidenceBundle,
    FieldDataCollector, LabAuditCollector, NetworkTraceCollector, ReportGenerator,
    RuleEngine, RuleEngineError, SourceCodeCollector, SourceResult, TraceResult,
};
use cwv_settings::ModelSettings;
use parking_lot::Mutex;
use serde_json::{Value, json};

pub const PAGE: &str = "https://www.example.com/";
pub const MODEL: &str = "test-model";

/// 100k input / 4k output: full-tier ceiling is 86 400 tokens.
pub const BUDGET: TokenBudget = TokenBudget::new(100_000, 4_000);

// ─────────────────────────────────────────────────────────────────────────────
// Collectors
// ─────────────────────────────────────────────────────────────────────────────

/// One struct standing in for all four collectors.
pub struct StubCollectors {
    pub field: Value,
    pub lab: Value,
    pub har: Value,
    pub html: String,
    pub code: BTreeMap<String, String>,
    pub fail_lab: bool,
    pub calls: Mutex<Vec<Stage>>,
}

impl StubCollectors {
    /// A small page: a few KB of data in total.
    pub fn small() -> Self {
        let mut code = BTreeMap::new();
        let _ = code.insert(format!("{PAGE}app.js"), "console.log('app');\n".repeat(20));
        Self {
            field: json!({"record": {"metrics": {"largest_contentful_paint": {"percentiles": {"p75": 3100}}}}}),
            lab: json!({"lighthouseResult": {"audits": {"largest-contentful-paint": {"numericValue": 2900}}}}),
            har: json!({"log": {"entries": [
                {
                    "request": {"url": PAGE},
                    "response": {"headers": [{"name": "server", "value": "nginx"}]}
                },
                {"request": {"url": format!("{PAGE}app.js")}, "response": {"headers": []}}
            ]}}),
            html: "<html><head><script src=\"/scripts/aem.js\"></script></head></html>".into(),
            code,
            fail_lab: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A page whose full HAR alone is about 150 000 tokens.
    pub fn huge() -> Self {
        let mut stub = Self::small();
        let padding = "x".repeat(600_000);
        stub.har = json!({"log": {"entries": [
            {"request": {"url": PAGE}, "response": {"headers": [], "content": {"text": padding}}}
        ]}});
        stub
    }

    pub fn with_field(mut self, field: Value) -> Self {
        self.field = field;
        self
    }

    pub fn failing_lab(mut self) -> Self {
        self.fail_lab = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn set(self: &Arc<Self>) -> CollectorSet {
        CollectorSet {
            field_data: self.clone(),
            lab_audit: self.clone(),
            network_trace: self.clone(),
            source_code: self.clone(),
        }
    }
}

#[async_trait]
impl FieldDataCollector for StubCollectors {
    async fn collect(
        &self,
        _page_url: &str,
        _device: DeviceType,
        _options: &CollectOptions,
    ) -> Result<SourceResult, CollectError> {
        self.calls.lock().push(Stage::FieldData);
        Ok(SourceResult {
            full: self.field.clone(),
            summary: "LCP p75 3.1s (poor)".into(),
            from_cache: false,
        })
    }
}

#[async_trait]
impl LabAuditCollector for StubCollectors {
    async fn collect(
        &self,
        _page_url: &str,
        _device: DeviceType,
        _options: &CollectOptions,
    ) -> Result<SourceResult, CollectError> {
        self.calls.lock().push(Stage::LabAudit);
        if self.fail_lab {
            return Err(CollectError::failed(Stage::LabAudit, "lighthouse timed out"));
        }
        Ok(SourceResult {
            full: self.lab.clone(),
            summary: "LCP 2.9s".into(),
            from_cache: true,
        })
    }
}

#[async_trait]
impl NetworkTraceCollector for StubCollectors {
    async fn collect(
        &self,
        _page_url: &str,
        _device: DeviceType,
        _options: &CollectOptions,
    ) -> Result<TraceResult, CollectError> {
        self.calls.lock().push(Stage::NetworkTrace);
        Ok(TraceResult {
            trace: NetworkTrace {
                har: SourceData::new(self.har.clone(), "2 requests, 1 render-blocking"),
                performance: SourceData::new(json!([{"entryType": "largest-contentful-paint", "startTime": 2900}]), "LCP at 2.9s"),
                full_html: self.html.clone(),
                js_api: json!({"fonts": []}),
            },
            from_cache: false,
        })
    }
}

#[async_trait]
impl SourceCodeCollector for StubCollectors {
    async fn collect(
        &self,
        _page_url: &str,
        _device: DeviceType,
        request_urls: &[String],
        _options: &CollectOptions,
    ) -> Result<CodeResult, CollectError> {
        self.calls.lock().push(Stage::SourceCode);
        let code_files: BTreeMap<_, _> = self
            .code
            .iter()
            .filter(|(url, _)| request_urls.contains(url))
            .map(|(url, code)| (url.clone(), code.clone()))
            .collect();
        #[allow(clippy::cast_possible_truncation)]
        let total = request_urls.len() as u32;
        Ok(CodeResult {
            stats: CodeStats {
                total,
                from_cache: 0,
                failed: total - code_files.len() as u32,
            },
            code_files,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rule engine
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct StubRules {
    pub calls: Mutex<u32>,
}

#[async_trait]
impl RuleEngine for StubRules {
    async fn evaluate(
        &self,
        _page_url: &str,
        _device: DeviceType,
        _options: &CollectOptions,
        evidence: &EvidenceBundle<'_>,
    ) -> Result<RulesOutcome, RuleEngineError> {
        *self.calls.lock() += 1;
        Ok(RulesOutcome {
            summary: format!("{} resources checked, 1 render-blocking script", evidence.resources.len()),
            from_cache: false,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend
// ─────────────────────────────────────────────────────────────────────────────

/// Replays scripted outcomes in order, then answers with a default report.
pub struct ScriptedBackend {
    script: Mutex<VecDeque<BackendResult<LlmResponse>>>,
    pub requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedBackend {
    pub fn ok() -> Self {
        Self::with_script(Vec::new())
    }

    pub fn with_script(script: Vec<BackendResult<LlmResponse>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn request(&self, n: usize) -> Vec<Message> {
        self.requests.lock()[n].clone()
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    fn model(&self) -> &str {
        MODEL
    }

    async fn invoke(&self, messages: &[Message]) -> BackendResult<LlmResponse> {
        self.requests.lock().push(messages.to_vec());
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(LlmResponse::new("# CWV Report\n\nLCP is poor.", MODEL)))
    }
}

pub fn context_overflow() -> BackendError {
    BackendError::Api {
        status: 400,
        message: "This model's maximum context length is 100000 tokens".into(),
        code: Some("context_length_exceeded".into()),
        retryable: false,
    }
}

pub fn auth_rejected() -> BackendError {
    BackendError::Auth {
        status: Some(401),
        message: "Incorrect API key provided".into(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache
// ─────────────────────────────────────────────────────────────────────────────

/// Memory store that refuses report writes.
#[derive(Default)]
pub struct ReadOnlyReports {
    pub inner: MemoryCacheStore,
}

impl CacheStore for ReadOnlyReports {
    fn read_json(&self, key: &CacheKey) -> cwv_cache::Result<Option<Value>> {
        self.inner.read_json(key)
    }

    fn read_text(&self, key: &CacheKey) -> cwv_cache::Result<Option<String>> {
        self.inner.read_text(key)
    }

    fn write_json(&self, key: &CacheKey, payload: &Value) -> cwv_cache::Result<CacheLocation> {
        if key.stage == CacheStage::Report {
            return Err(denied(key));
        }
        self.inner.write_json(key, payload)
    }

    fn write_text(&self, key: &CacheKey, payload: &str) -> cwv_cache::Result<CacheLocation> {
        if key.stage == CacheStage::Report {
            return Err(denied(key));
        }
        self.inner.write_text(key, payload)
    }

    fn location(&self, key: &CacheKey, format: CacheFormat) -> CacheLocation {
        self.inner.location(key, format)
    }
}

fn denied(key: &CacheKey) -> cwv_cache::CacheError {
    cwv_cache::CacheError::Io {
        path: key.file_stem().into(),
        source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
    }
}

pub fn report_writes(cache: &MemoryCacheStore) -> usize {
    cache
        .writes()
        .iter()
        .filter(|(key, _)| key.stage == CacheStage::Report)
        .count()
}

// ─────────────────────────────────────────────────────────────────────────────
// Harness
// ─────────────────────────────────────────────────────────────────────────────

pub struct Harness {
    pub collectors: Arc<StubCollectors>,
    pub rules: Arc<StubRules>,
    pub backend: Arc<ScriptedBackend>,
    pub sink: Arc<RecordingSink>,
}

impl Harness {
    pub fn new(collectors: StubCollectors, backend: ScriptedBackend) -> Self {
        Self {
            collectors: Arc::new(collectors),
            rules: Arc::new(StubRules::default()),
            backend: Arc::new(backend),
            sink: Arc::new(RecordingSink::new()),
        }
    }

    pub fn generator(&self, cache: Arc<dyn CacheStore>) -> ReportGenerator {
        let mut models = ModelSettings::default();
        let _ = models.limits.insert(MODEL.into(), BUDGET);
        ReportGenerator::new(
            self.collectors.set(),
            self.rules.clone(),
            self.backend.clone(),
            cache,
        )
        .with_models(models)
        .with_sink(self.sink.clone())
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.sink.events()
    }

    pub fn count_events(&self, matches: impl Fn(&ReportEvent) -> bool) -> usize {
        self.events().iter().filter(|e| matches(e)).count()
    }
}
