//! Structured logging with `tracing`.
//!
//! - [`init_subscriber`] installs a compact stderr subscriber
//! - [`init_json_subscriber`] installs a JSON-lines stderr subscriber
//! - [`TracingSink`] mirrors [`ReportEvent`]s into the log stream
//!
//! `RUST_LOG` overrides the configured level when set.

use crate::events::{CacheProvenance, EventSink, ReportEvent};

/// Initialize the global tracing subscriber with human-readable stderr output.
///
/// Call once at startup. Subsequent calls are no-ops.
///
/// # Arguments
///
/// * `level` - Minimum level or filter directive, e.g. `"warn"` or `"cwv_report=debug"`.
pub fn init_subscriber(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    let _ = subscriber.try_init();
}

/// Initialize the global tracing subscriber with JSON-lines stderr output.
pub fn init_json_subscriber(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .json();

    let _ = subscriber.try_init();
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingSink
// ─────────────────────────────────────────────────────────────────────────────

/// Event sink that writes each event as a `tracing` record.
///
/// Failures log at `warn`, everything else at `info` or `debug`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    #[allow(clippy::too_many_lines)]
    fn emit(&self, event: ReportEvent) {
        match event {
            ReportEvent::RunStarted {
                page_url,
                device,
                model,
            } => tracing::info!(%page_url, %device, %model, "report run started"),
            ReportEvent::ReportCacheHit { location } => {
                tracing::info!(%location, "using cached report");
            }
            ReportEvent::ReportCacheMiss => tracing::debug!("no cached report"),
            ReportEvent::CollectionStarted => tracing::debug!("collecting page data"),
            ReportEvent::StageCompleted {
                stage,
                duration_ms,
                provenance,
                artifacts,
            } => {
                let tokens: u64 = artifacts.iter().map(|a| a.tokens).sum();
                let cached = !matches!(provenance, CacheProvenance::Miss);
                tracing::info!(
                    stage = stage.label(),
                    duration_ms,
                    cached,
                    tokens,
                    "stage completed"
                );
            }
            ReportEvent::NoData { stage } => {
                tracing::info!(stage = stage.label(), "no data available");
            }
            ReportEvent::StageFailed { stage, message } => {
                tracing::warn!(stage = stage.label(), %message, "stage returned an error");
            }
            ReportEvent::ResourcesCollected {
                total,
                from_cache,
                failed,
            } => tracing::debug!(total, from_cache, failed, "resources collected"),
            ReportEvent::CollectionCompleted { duration_ms } => {
                tracing::info!(duration_ms, "collection completed");
            }
            ReportEvent::CmsDetected { cms } => tracing::info!(%cms, "cms detected"),
            ReportEvent::PromptAssembled {
                tier,
                sections,
                total_tokens,
            } => {
                for s in &sections {
                    tracing::debug!(%tier, section = %s.section, tokens = s.tokens, "section size");
                }
                tracing::info!(%tier, total_tokens, "prompt assembled");
            }
            ReportEvent::BudgetChecked {
                tier,
                total_tokens,
                ceiling,
                input_limit,
                output_limit,
                usage_percent,
                admissible,
            } => tracing::info!(
                %tier,
                total_tokens,
                ceiling,
                input_limit,
                output_limit,
                usage_percent = format_args!("{usage_percent:.1}"),
                admissible,
                "budget checked"
            ),
            ReportEvent::Downgraded { from, to, reason } => {
                tracing::warn!(%from, %to, ?reason, "downgrading prompt tier");
            }
            ReportEvent::LlmRequestStarted {
                model,
                tier,
                attempt,
            } => tracing::info!(%model, %tier, attempt, "sending prompt"),
            ReportEvent::LlmResponseReceived {
                model,
                tier,
                duration_ms,
            } => tracing::info!(%model, %tier, duration_ms, "response received"),
            ReportEvent::LlmFailed {
                tier,
                kind,
                message,
            } => tracing::warn!(%tier, %kind, %message, "llm call failed"),
            ReportEvent::ReportCached { location } => {
                tracing::info!(%location, "report cached");
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
