//! Report progress events.
//!
//! A report run narrates its progress as a stream of [`ReportEvent`]s
//! (stage, duration, cache provenance, token estimates). The orchestrator
//! only emits; presentation is left to whoever consumes the [`EventSink`].
//!
//! Events are transient and never persisted.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::errors::FailureKind;
use crate::messages::{DeviceType, Tier};
use crate::plan::SectionTokens;

// ─────────────────────────────────────────────────────────────────────────────
// Event payload types
// ─────────────────────────────────────────────────────────────────────────────

/// Pipeline stage that produced an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Real-user field data collection.
    FieldData,
    /// Lab audit collection.
    LabAudit,
    /// Network and performance trace collection.
    NetworkTrace,
    /// Source code collection.
    SourceCode,
    /// Rule engine evaluation.
    Rules,
}

impl Stage {
    /// Human-facing name of the stage.
    pub fn label(&self) -> &'static str {
        match self {
            Self::FieldData => "CrUX",
            Self::LabAudit => "PSI",
            Self::NetworkTrace => "HAR",
            Self::SourceCode => "code",
            Self::Rules => "rules",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a stage's output came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CacheProvenance {
    /// Computed fresh.
    Miss,
    /// Served entirely from cache.
    Hit,
    /// Partly served from cache.
    Partial {
        /// Items served from cache.
        cached: u32,
        /// Total items.
        total: u32,
    },
}

impl CacheProvenance {
    /// Provenance from a plain cache flag.
    pub fn from_flag(from_cache: bool) -> Self {
        if from_cache { Self::Hit } else { Self::Miss }
    }
}

/// Estimated size of one artifact produced by a stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSize {
    /// Artifact name (e.g. `"har"`, `"perfEntries"`).
    pub name: String,
    /// Estimated tokens.
    pub tokens: u64,
}

impl ArtifactSize {
    /// Create an artifact size record.
    pub fn new(name: impl Into<String>, tokens: u64) -> Self {
        Self {
            name: name.into(),
            tokens,
        }
    }
}

/// Why a run moved from the full to the summarized tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DowngradeReason {
    /// The full plan did not fit the model's budget.
    BudgetExceeded,
    /// The backend rejected the full plan as too long.
    ContextOverflow,
}

// ─────────────────────────────────────────────────────────────────────────────
// ReportEvent
// ─────────────────────────────────────────────────────────────────────────────

/// A single progress event of a report run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportEvent {
    /// A run started.
    RunStarted {
        /// Page URL.
        page_url: String,
        /// Device profile.
        device: DeviceType,
        /// Model identifier.
        model: String,
    },
    /// A previously generated report was found.
    ReportCacheHit {
        /// Storage location of the cached report.
        location: String,
    },
    /// No previous report exists.
    ReportCacheMiss,
    /// Data collection started.
    CollectionStarted,
    /// A stage finished.
    StageCompleted {
        /// Stage.
        stage: Stage,
        /// Wall time in milliseconds.
        duration_ms: u64,
        /// Cache provenance of the output.
        provenance: CacheProvenance,
        /// Estimated sizes of the produced artifacts.
        artifacts: Vec<ArtifactSize>,
    },
    /// A source legitimately had no data.
    NoData {
        /// Stage.
        stage: Stage,
    },
    /// A source reported an error payload; its section is left empty.
    StageFailed {
        /// Stage.
        stage: Stage,
        /// Error description.
        message: String,
    },
    /// Source-code fetch statistics.
    ResourcesCollected {
        /// Resources requested.
        total: u32,
        /// Resources served from cache.
        from_cache: u32,
        /// Resources that failed to fetch.
        failed: u32,
    },
    /// All collection finished.
    CollectionCompleted {
        /// Wall time in milliseconds.
        duration_ms: u64,
    },
    /// CMS detection result.
    CmsDetected {
        /// CMS identifier.
        cms: String,
    },
    /// A prompt plan was assembled and measured.
    PromptAssembled {
        /// Tier.
        tier: Tier,
        /// Per-section token counts.
        sections: Vec<SectionTokens>,
        /// Sum of all sections.
        total_tokens: u64,
    },
    /// The budget gate evaluated a plan.
    BudgetChecked {
        /// Tier.
        tier: Tier,
        /// Plan total.
        total_tokens: u64,
        /// Highest admissible total.
        ceiling: u64,
        /// Model input limit.
        input_limit: u64,
        /// Model output limit.
        output_limit: u64,
        /// Plan total as a percentage of the input limit.
        usage_percent: f64,
        /// Whether the plan fits.
        admissible: bool,
    },
    /// The run moved down a tier.
    Downgraded {
        /// Tier left.
        from: Tier,
        /// Tier entered.
        to: Tier,
        /// Cause.
        reason: DowngradeReason,
    },
    /// A request was sent to the LLM backend.
    LlmRequestStarted {
        /// Model identifier.
        model: String,
        /// Tier sent.
        tier: Tier,
        /// 1-based attempt number within the run.
        attempt: u32,
    },
    /// The backend answered.
    LlmResponseReceived {
        /// Model identifier.
        model: String,
        /// Tier sent.
        tier: Tier,
        /// Wall time in milliseconds.
        duration_ms: u64,
    },
    /// The backend call failed.
    LlmFailed {
        /// Tier sent.
        tier: Tier,
        /// Classified failure.
        kind: FailureKind,
        /// Error description.
        message: String,
    },
    /// The final report was persisted.
    ReportCached {
        /// Storage location.
        location: String,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Sinks
// ─────────────────────────────────────────────────────────────────────────────

/// Consumer of report events.
pub trait EventSink: Send + Sync {
    /// Deliver one event. Must not block.
    fn emit(&self, event: ReportEvent);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: ReportEvent) {
        (**self).emit(event);
    }
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: ReportEvent) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingSink {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events.
    pub fn events(&self) -> Vec<ReportEvent> {
        self.events.lock().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: ReportEvent) {
        self.events.lock().push(event);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn event_serializes_with_type_tag() {
        let json = serde_json::to_value(ReportEvent::NoData {
            stage: Stage::FieldData,
        })
        .unwrap();
        assert_eq!(json["type"], "no_data");
        assert_eq!(json["stage"], "field_data");
    }

    #[test]
    fn provenance_partial_round_trip() {
        let p = CacheProvenance::Partial {
            cached: 3,
            total: 5,
        };
        let json = serde_json::to_string(&p).unwrap();
        let back: CacheProvenance = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn provenance_from_flag() {
        assert_eq!(CacheProvenance::from_flag(true), CacheProvenance::Hit);
        assert_eq!(CacheProvenance::from_flag(false), CacheProvenance::Miss);
    }

    #[test]
    fn recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        sink.emit(ReportEvent::ReportCacheMiss);
        sink.emit(ReportEvent::CollectionStarted);
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_matches!(events[0], ReportEvent::ReportCacheMiss);
        assert_matches!(events[1], ReportEvent::CollectionStarted);
    }

    #[test]
    fn arc_sink_forwards() {
        let sink = Arc::new(RecordingSink::new());
        let shared: Arc<dyn EventSink> = sink.clone();
        shared.emit(ReportEvent::ReportCacheMiss);
        assert_eq!(sink.events().len(), 1);
    }
}
