//! Console presentation of the report event stream.

use std::io::Write;

use cwv_core::{CacheProvenance, EventSink, ReportEvent};
use cwv_tokens::format_tokens;
use parking_lot::Mutex;

/// How events are written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresenterMode {
    /// One readable line per event.
    Human,
    /// One JSON object per event.
    JsonLines,
}

/// Writes events to a stream (stderr in the binary).
pub struct ConsolePresenter<W: Write + Send> {
    out: Mutex<W>,
    mode: PresenterMode,
}

impl<W: Write + Send> ConsolePresenter<W> {
    /// Present events on `out`.
    pub fn new(out: W, mode: PresenterMode) -> Self {
        Self {
            out: Mutex::new(out),
            mode,
        }
    }

    /// Give the writer back.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write + Send> EventSink for ConsolePresenter<W> {
    fn emit(&self, event: ReportEvent) {
        let line = match self.mode {
            PresenterMode::Human => render(&event),
            PresenterMode::JsonLines => serde_json::to_string(&event).ok(),
        };
        if let Some(line) = line {
            let _ = writeln!(self.out.lock(), "{line}");
        }
    }
}

/// Human-readable line for an event; `None` for events not worth a line.
fn render(event: &ReportEvent) -> Option<String> {
    let line = match event {
        ReportEvent::RunStarted {
            page_url,
            device,
            model,
        } => format!("Generating report for {page_url} ({device}, {model})"),
        ReportEvent::ReportCacheHit { location } => format!("Report already exists at {location}"),
        ReportEvent::ReportCacheMiss => return None,
        ReportEvent::CollectionStarted => "Collecting page data...".to_string(),
        ReportEvent::StageCompleted {
            stage,
            duration_ms,
            provenance,
            artifacts,
        } => {
            let source = match provenance {
                CacheProvenance::Hit => "cached".to_string(),
                CacheProvenance::Miss => "fresh".to_string(),
                CacheProvenance::Partial { cached, total } => format!("{cached}/{total} cached"),
            };
            let sizes = artifacts
                .iter()
                .map(|a| format!("{} ~{}", a.name, format_tokens(a.tokens)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("  {stage}: {source} in {duration_ms}ms [{sizes}]")
        }
        ReportEvent::NoData { stage } => format!("  {stage}: no data for this page"),
        ReportEvent::StageFailed { stage, message } => format!("  {stage}: error: {message}"),
        ReportEvent::ResourcesCollected {
            total,
            from_cache,
            failed,
        } => format!("  resources: {total} requested, {from_cache} cached, {failed} failed"),
        ReportEvent::CollectionCompleted { duration_ms } => {
            format!("Collection completed in {duration_ms}ms")
        }
        ReportEvent::CmsDetected { cms } => format!("CMS: {cms}"),
        ReportEvent::PromptAssembled {
            tier,
            sections,
            total_tokens,
        } => {
            let mut text = format!("Prompt ({tier}): {} tokens", format_tokens(*total_tokens));
            for s in sections {
                text.push_str(&format!("\n  - {}: {}", s.section.label(*tier), format_tokens(s.tokens)));
            }
            text
        }
        ReportEvent::BudgetChecked {
            input_limit,
            output_limit,
            usage_percent,
            admissible,
            ..
        } => format!(
            "Budget: input {}, output {}, usage {usage_percent:.1}% of input{}",
            format_tokens(*input_limit),
            format_tokens(*output_limit),
            if *admissible { "" } else { " (over budget)" }
        ),
        ReportEvent::Downgraded { from, to, reason } => {
            format!("Switching from {from} to {to} prompt ({reason:?})")
        }
        ReportEvent::LlmRequestStarted {
            model,
            tier,
            attempt,
        } => format!("Sending {tier} prompt to {model} (attempt {attempt})"),
        ReportEvent::LlmResponseReceived { duration_ms, .. } => {
            #[allow(clippy::cast_precision_loss)]
            let secs = *duration_ms as f64 / 1000.0;
            format!("Response received in {secs:.1}s")
        }
        ReportEvent::LlmFailed {
            tier,
            kind,
            message,
        } => format!("Request failed on {tier} prompt ({kind}): {message}"),
        ReportEvent::ReportCached { location } => format!("Report written to {location}"),
    };
    Some(line)
}
