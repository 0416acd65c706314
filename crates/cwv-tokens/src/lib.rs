//! # cwv-tokens
//!
//! Token estimation for prompt payloads.
//!
//! Every payload (plain text, JSON values, serializable structs, prompt
//! messages) is measured with the same deterministic chars/4 approximation,
//! rounded up. The estimate is shared by progress reporting and by the
//! budget gate, so both always agree on a plan's size.

#![deny(unsafe_code)]

pub mod estimator;
pub mod format;

pub use estimator::{
    CHARS_PER_TOKEN, MESSAGE_OVERHEAD_TOKENS, estimate, estimate_message, estimate_text,
    estimate_value,
};
pub use format::format_tokens;
