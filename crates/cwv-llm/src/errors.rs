//! Backend error type.

use thiserror::Error;

/// Errors returned by an [`LlmBackend`](crate::LlmBackend).
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport failure (connect, timeout, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Credentials missing or rejected.
    #[error("auth error: {message}")]
    Auth {
        /// HTTP status, when the rejection came from the server.
        status: Option<u16>,
        /// Error description.
        message: String,
    },

    /// Throttled by the backend.
    #[error("rate limited: retry after {retry_after_ms}ms: {message}")]
    RateLimited {
        /// Suggested retry delay in milliseconds (0 when unknown).
        retry_after_ms: u64,
        /// Error description.
        message: String,
    },

    /// Backend returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
        /// Provider error code (e.g. `"context_length_exceeded"`).
        code: Option<String>,
        /// Whether the call could succeed if repeated later.
        retryable: bool,
    },

    /// Anything else.
    #[error("{message}")]
    Other {
        /// Error description.
        message: String,
    },
}

impl BackendError {
    /// HTTP status associated with the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Auth { status, .. } => *status,
            Self::RateLimited { .. } => Some(429),
            Self::Api { status, .. } => Some(*status),
            Self::Json(_) | Self::Other { .. } => None,
        }
    }

    /// Provider error code, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Whether a later repeat of the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status()
                        .is_some_and(|s| s.as_u16() == 429 || s.is_server_error())
            }
            Self::RateLimited { .. } => true,
            Self::Api { retryable, .. } => *retryable,
            Self::Json(_) | Self::Auth { .. } | Self::Other { .. } => false,
        }
    }

    /// Suggested retry delay in milliseconds, if known.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_ms, .. } if *retry_after_ms > 0 => {
                Some(*retry_after_ms)
            }
            _ => None,
        }
    }

    /// Shorthand for [`BackendError::Other`].
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

/// Result type for backend calls.
pub type BackendResult<T> = std::result::Result<T, BackendError>;
