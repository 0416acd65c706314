//! Report error types.
//!
//! [`ReportError`] is the terminal outcome of a failed run. Backend failures
//! carry the classified [`FailureKind`] and keep the original error as the
//! source, so callers can tell a throttled run from a broken configuration.

use cwv_cache::CacheError;
use cwv_core::{FailureKind, Stage, Tier};
use cwv_llm::BackendError;
use thiserror::Error;

/// A collector failed outright (as opposed to reporting "no data").
#[derive(Debug, Error)]
pub enum CollectError {
    /// The collector reported a failure.
    #[error("{stage} collection failed: {message}")]
    Failed {
        /// Stage that failed.
        stage: Stage,
        /// Error description.
        message: String,
    },
    /// A pre-collected artifact was not found.
    #[error("{stage} artifact missing: {what}")]
    Missing {
        /// Stage the artifact belongs to.
        stage: Stage,
        /// Artifact description.
        what: String,
    },
    /// Reading a cached artifact failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl CollectError {
    /// Shorthand for [`CollectError::Failed`].
    pub fn failed(stage: Stage, message: impl Into<String>) -> Self {
        Self::Failed {
            stage,
            message: message.into(),
        }
    }
}

/// The rule engine failed.
#[derive(Debug, Error)]
#[error("rule engine failed: {message}")]
pub struct RuleEngineError {
    /// Error description.
    pub message: String,
}

impl RuleEngineError {
    /// Create a rule engine error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Why a report run ended without a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The LLM backend call failed terminally.
    #[error("LLM call failed on the {tier} tier ({kind}): {source}")]
    Backend {
        /// Classified failure.
        kind: FailureKind,
        /// Tier of the failing attempt.
        tier: Tier,
        /// Backend error as reported.
        #[source]
        source: BackendError,
    },
    /// Data collection failed.
    #[error(transparent)]
    Collection(#[from] CollectError),
    /// Rule evaluation failed.
    #[error(transparent)]
    RuleEngine(#[from] RuleEngineError),
    /// The report cache failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl ReportError {
    /// Failure kind of a backend failure.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Backend { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Whether the run ended because the backend throttled it.
    pub fn is_rate_limited(&self) -> bool {
        self.failure_kind() == Some(FailureKind::RateLimited)
    }

    /// Whether a later run could succeed without any configuration change.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Backend { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Backend-suggested delay before retrying the run, if known.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::Backend { source, .. } => source.retry_after_ms(),
            _ => None,
        }
    }
}
