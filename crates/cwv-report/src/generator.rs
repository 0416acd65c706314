//! Top-level report generator.
//!
//! One [`ReportGenerator::generate`] call is one sequential run:
//! cached report probe, collection, rules, CMS detection, then the
//! invocation state machine. Collection happens before any LLM call so a
//! broken collector never costs a request.

use std::sync::Arc;

use cwv_cache::{
    CacheError, CacheFormat, CacheKey, CacheLocation, CacheStage, CacheStore, read_as,
};
use cwv_core::{DeviceType, EventSink, ReportEvent, Tier, TracingSink};
use cwv_llm::{LlmBackend, LlmResponse};
use cwv_settings::{ModelSettings, PromptSettings};
use tracing::{debug, info, warn};

use crate::cms::detect_cms;
use crate::collect::{CollectOptions, CollectorFacade, CollectorSet};
use crate::errors::ReportError;
use crate::invocation::{InvocationAttempt, InvocationMachine};
use crate::prompt::{DefaultTemplates, PromptAssembler, PromptTemplates};
use crate::rules::{RuleEngine, RuleSummarizer};

/// What to report on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportRequest {
    /// Page URL.
    pub page_url: String,
    /// Device profile.
    pub device: DeviceType,
    /// Ignore every cached artifact, including a previous report.
    pub skip_cache: bool,
}

impl ReportRequest {
    /// Request a report, using the cache.
    pub fn new(page_url: impl Into<String>, device: DeviceType) -> Self {
        Self {
            page_url: page_url.into(),
            device,
            skip_cache: false,
        }
    }

    /// Force a fresh run.
    #[must_use]
    pub fn skip_cache(mut self, skip_cache: bool) -> Self {
        self.skip_cache = skip_cache;
        self
    }
}

/// A report and how it was obtained.
#[derive(Clone, Debug)]
pub struct GeneratedReport {
    /// Backend response (fresh or cached).
    pub response: LlmResponse,
    /// Whether the response came from the report cache.
    pub from_cache: bool,
    /// Tier that produced a fresh response; `None` for a cached one.
    pub tier: Option<Tier>,
    /// Cache location of the report.
    pub location: Option<CacheLocation>,
    /// Backend requests made during this run.
    pub attempts: Vec<InvocationAttempt>,
}

impl GeneratedReport {
    /// Report text.
    pub fn content(&self) -> &str {
        &self.response.content
    }
}

/// Wires collectors, rule engine, templates, backend and cache together.
pub struct ReportGenerator {
    collectors: CollectorSet,
    rules: Arc<dyn RuleEngine>,
    templates: Arc<dyn PromptTemplates>,
    backend: Arc<dyn LlmBackend>,
    cache: Arc<dyn CacheStore>,
    sink: Arc<dyn EventSink>,
    models: ModelSettings,
    prompt: PromptSettings,
}

impl ReportGenerator {
    /// Create a generator with built-in templates, default settings, and a
    /// sink that mirrors events into the log.
    pub fn new(
        collectors: CollectorSet,
        rules: Arc<dyn RuleEngine>,
        backend: Arc<dyn LlmBackend>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            collectors,
            rules,
            templates: Arc::new(DefaultTemplates),
            backend,
            cache,
            sink: Arc::new(TracingSink),
            models: ModelSettings::default(),
            prompt: PromptSettings::default(),
        }
    }

    /// Replace the prompt templates.
    #[must_use]
    pub fn with_templates(mut self, templates: Arc<dyn PromptTemplates>) -> Self {
        self.templates = templates;
        self
    }

    /// Replace the event sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replace the model limit table.
    #[must_use]
    pub fn with_models(mut self, models: ModelSettings) -> Self {
        self.models = models;
        self
    }

    /// Replace the prompt settings.
    #[must_use]
    pub fn with_prompt_settings(mut self, prompt: PromptSettings) -> Self {
        self.prompt = prompt;
        self
    }

    /// Model reports are generated with.
    pub fn model(&self) -> &str {
        self.backend.model()
    }

    /// Generate (or fetch) the report for a page.
    pub async fn generate(&self, request: &ReportRequest) -> Result<GeneratedReport, ReportError> {
        let ReportRequest {
            page_url,
            device,
            skip_cache,
        } = request;
        let (page_url, device) = (page_url.as_str(), *device);
        let model = self.backend.model();
        let sink: &dyn EventSink = self.sink.as_ref();
        let cache: &dyn CacheStore = self.cache.as_ref();

        info!(page_url, %device, model, "starting report generation");
        sink.emit(ReportEvent::RunStarted {
            page_url: page_url.to_string(),
            device,
            model: model.to_string(),
        });

        if !*skip_cache {
            if let Some(cached) = self.cached_report(page_url, device)? {
                return Ok(cached);
            }
        }

        let options = CollectOptions {
            skip_cache: *skip_cache,
        };
        let mut data = CollectorFacade::new(&self.collectors, sink)
            .collect(page_url, device, &options)
            .await?;

        let rules = RuleSummarizer::new(self.rules.as_ref(), cache, sink)
            .summarize(page_url, device, &options, &data)
            .await?;
        data.rules = Some(rules);

        let headers = data
            .network
            .as_ref()
            .map(cwv_core::NetworkTrace::first_response_headers)
            .unwrap_or_default();
        let cms = detect_cms(&headers, data.rendered_markup().unwrap_or_default());
        info!(%cms, "cms detected");
        sink.emit(ReportEvent::CmsDetected {
            cms: cms.to_string(),
        });
        data.cms = Some(cms.to_string());

        let budget = self.models.resolve_budget(model);
        let assembler = PromptAssembler::new(
            self.templates.as_ref(),
            self.prompt.summarized_code_char_limit,
        );
        let invocation =
            InvocationMachine::new(&assembler, self.backend.as_ref(), cache, sink, budget)
                .run(&data)
                .await?;

        Ok(GeneratedReport {
            response: invocation.response,
            from_cache: false,
            tier: Some(invocation.tier),
            location: invocation.location,
            attempts: invocation.attempts,
        })
    }

    fn cached_report(
        &self,
        page_url: &str,
        device: DeviceType,
    ) -> Result<Option<GeneratedReport>, ReportError> {
        let key = CacheKey::new(page_url, device, CacheStage::Report).with_model(self.model());
        let cache = self.cache.as_ref();

        let cached = match read_as::<LlmResponse>(cache, &key) {
            Ok(cached) => cached,
            // An unreadable entry is regenerated; the new report overwrites it.
            Err(CacheError::Corrupt { location, source }) => {
                warn!(%location, error = %source, "ignoring corrupt cached report");
                None
            }
            Err(e) => return Err(e.into()),
        };
        let Some(response) = cached else {
            debug!(page_url, %device, "no cached report");
            self.sink.emit(ReportEvent::ReportCacheMiss);
            return Ok(None);
        };

        let location = cache.location(&key, CacheFormat::Text);
        info!(%location, "report already exists");
        self.sink.emit(ReportEvent::ReportCacheHit {
            location: location.to_string(),
        });
        Ok(Some(GeneratedReport {
            response,
            from_cache: true,
            tier: None,
            location: Some(location),
            attempts: Vec::new(),
        }))
    }
}
