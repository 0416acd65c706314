//! Token estimation.
//!
//! ## Formula
//!
//! - Text: `tokens = ceil(bytes / 4)`
//! - JSON values: strings as text, everything else as compact JSON text
//! - Messages: content tokens plus a fixed per-message framing overhead
//!
//! Byte length is used rather than char count so multi-byte text is never
//! undercounted.

use cwv_core::Message;
use serde::Serialize;
use serde_json::Value;

/// Bytes per token in the approximation.
pub const CHARS_PER_TOKEN: usize = 4;

/// Tokens added per message for role and separator framing.
pub const MESSAGE_OVERHEAD_TOKENS: u64 = 4;

fn chars_to_tokens(chars: usize) -> u64 {
    chars.div_ceil(CHARS_PER_TOKEN) as u64
}

// ─────────────────────────────────────────────────────────────────────────────
// Payload estimation
// ─────────────────────────────────────────────────────────────────────────────

/// Estimate tokens for plain text.
#[must_use]
pub fn estimate_text(text: &str) -> u64 {
    chars_to_tokens(text.len())
}

/// Estimate tokens for a JSON value.
///
/// Strings are measured verbatim (no quotes), `null` is free, and any other
/// value is measured as its compact JSON serialization.
#[must_use]
pub fn estimate_value(value: &Value) -> u64 {
    match value {
        Value::Null => 0,
        Value::String(s) => estimate_text(s),
        other => chars_to_tokens(other.to_string().len()),
    }
}

/// Estimate tokens for any serializable payload.
///
/// Payloads that fail to serialize count as zero.
#[must_use]
pub fn estimate<T: Serialize + ?Sized>(payload: &T) -> u64 {
    serde_json::to_value(payload).map_or(0, |v| estimate_value(&v))
}

// ─────────────────────────────────────────────────────────────────────────────
// Message estimation
// ─────────────────────────────────────────────────────────────────────────────

/// Estimate tokens for a single prompt message.
#[must_use]
pub fn estimate_message(message: &Message) -> u64 {
    estimate_text(&message.content) + MESSAGE_OVERHEAD_TOKENS
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
