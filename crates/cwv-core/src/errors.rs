//! Error classification.
//!
//! Backends report failures as HTTP statuses, provider error codes, or bare
//! messages. [`ErrorCategory`] is the shared vocabulary for all three:
//! [`ErrorCategory::from_status`] maps a status code and
//! [`ErrorCategory::from_message`] matches known message patterns.
//! [`FailureKind`] is the coarser taxonomy the report run acts on.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Error category for classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Invalid or expired credentials.
    Authentication,
    /// Insufficient permissions.
    Authorization,
    /// Rate limit exceeded.
    RateLimit,
    /// Prompt exceeded the model's context window.
    ContextLength,
    /// Network connectivity issues.
    Network,
    /// Server-side errors (5xx).
    Server,
    /// Malformed request (4xx).
    InvalidRequest,
    /// Unrecognized error.
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::RateLimit => write!(f, "rate_limit"),
            Self::ContextLength => write!(f, "context_length"),
            Self::Network => write!(f, "network"),
            Self::Server => write!(f, "server"),
            Self::InvalidRequest => write!(f, "invalid_request"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl ErrorCategory {
    /// Classify an HTTP status code.
    ///
    /// 400 and 413 are the statuses backends use to reject oversized prompts.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 413 => Self::ContextLength,
            401 => Self::Authentication,
            403 => Self::Authorization,
            429 => Self::RateLimit,
            402 | 404..=412 | 414..=428 | 430..=499 => Self::InvalidRequest,
            500..=599 => Self::Server,
            _ => Self::Unknown,
        }
    }

    /// Classify a raw error message (or provider error code).
    ///
    /// Returns `None` when no known pattern matches.
    pub fn from_message(message: &str) -> Option<Self> {
        let lower = message.to_lowercase();
        patterns()
            .iter()
            .find(|p| (p.check)(&lower))
            .map(|p| p.category)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FailureKind
// ─────────────────────────────────────────────────────────────────────────────

/// How a failed LLM call is handled by a report run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Prompt too large; recoverable once by downgrading the tier.
    ContextOverflow,
    /// Credentials rejected; a configuration problem.
    AuthInvalid,
    /// Throttled; the caller should retry later out-of-band.
    RateLimited,
    /// Anything else.
    Unknown,
}

impl FailureKind {
    /// Map an error category onto the run's failure taxonomy.
    pub fn from_category(category: ErrorCategory) -> Self {
        match category {
            ErrorCategory::ContextLength => Self::ContextOverflow,
            ErrorCategory::Authentication | ErrorCategory::Authorization => Self::AuthInvalid,
            ErrorCategory::RateLimit => Self::RateLimited,
            ErrorCategory::Network
            | ErrorCategory::Server
            | ErrorCategory::InvalidRequest
            | ErrorCategory::Unknown => Self::Unknown,
        }
    }

    /// String label for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContextOverflow => "context_overflow",
            Self::AuthInvalid => "auth_invalid",
            Self::RateLimited => "rate_limited",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pattern matching
// ─────────────────────────────────────────────────────────────────────────────

struct ErrorPattern {
    check: fn(&str) -> bool,
    category: ErrorCategory,
}

/// Known message patterns, checked in order against the lower-cased message.
fn patterns() -> &'static [ErrorPattern] {
    static PATTERNS: &[ErrorPattern] = &[
        // Context length
        ErrorPattern {
            check: |s| s.contains("context_length_exceeded") || s.contains("context length"),
            category: ErrorCategory::ContextLength,
        },
        ErrorPattern {
            check: |s| s.contains("maximum context") || s.contains("context window"),
            category: ErrorCategory::ContextLength,
        },
        ErrorPattern {
            check: |s| s.contains("too many tokens") || s.contains("prompt is too long"),
            category: ErrorCategory::ContextLength,
        },
        // Authentication
        ErrorPattern {
            check: |s| s.contains("invalid") && s.contains("api key"),
            category: ErrorCategory::Authentication,
        },
        ErrorPattern {
            check: |s| s.contains("authentication_error") || s.contains("unauthorized"),
            category: ErrorCategory::Authentication,
        },
        // Authorization
        ErrorPattern {
            check: |s| s.contains("permission_denied") || s.contains("forbidden"),
            category: ErrorCategory::Authorization,
        },
        // Rate limiting
        ErrorPattern {
            check: |s| s.contains("rate") && s.contains("limit"),
            category: ErrorCategory::RateLimit,
        },
        ErrorPattern {
            check: |s| s.contains("too many requests") || s.contains("resource_exhausted"),
            category: ErrorCategory::RateLimit,
        },
        // Network
        ErrorPattern {
            check: |s| {
                s.contains("econnrefused") || s.contains("etimedout") || s.contains("enotfound")
            },
            category: ErrorCategory::Network,
        },
    ];
    PATTERNS
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
