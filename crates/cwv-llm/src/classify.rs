//! Failure classification.
//!
//! | Backend outcome | Kind |
//! |---|---|
//! | status 400/413, code `context_length_exceeded`, context-length message | `ContextOverflow` |
//! | `Auth`, status 401/403 | `AuthInvalid` |
//! | `RateLimited`, status 429 | `RateLimited` |
//! | anything else | `Unknown` |
//!
//! Provider codes are checked first, then the message, then the status, so a
//! 400 that says "invalid API key" is an auth failure rather than an overflow.

use cwv_core::{ErrorCategory, FailureKind};

use crate::errors::BackendError;

/// Classify a backend failure.
pub fn classify(err: &BackendError) -> FailureKind {
    FailureKind::from_category(category(err))
}

fn category(err: &BackendError) -> ErrorCategory {
    match err {
        BackendError::Auth { .. } => ErrorCategory::Authentication,
        BackendError::RateLimited { .. } => ErrorCategory::RateLimit,
        BackendError::Api {
            status,
            message,
            code,
            ..
        } => code
            .as_deref()
            .and_then(ErrorCategory::from_message)
            .or_else(|| ErrorCategory::from_message(message))
            .unwrap_or_else(|| ErrorCategory::from_status(*status)),
        BackendError::Http(e) => match e.status() {
            Some(s) => ErrorCategory::from_status(s.as_u16()),
            None => ErrorCategory::Network,
        },
        BackendError::Other { message } => {
            ErrorCategory::from_message(message).unwrap_or(ErrorCategory::Unknown)
        }
        BackendError::Json(_) => ErrorCategory::Unknown,
    }
}
