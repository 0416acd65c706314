//! `Retry-After` header parsing.

/// Parse a `Retry-After` header value.
///
/// Supports integer seconds (`"120"`) and HTTP dates
/// (`"Wed, 21 Oct 2015 07:28:00 GMT"`). Dates in the past yield 0.
/// Returns the delay in milliseconds.
#[must_use]
pub fn parse_retry_after_header(value: &str) -> Option<u64> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(seconds.saturating_mul(1000));
    }

    let date = chrono::DateTime::parse_from_rfc2822(value).ok()?;
    let delay_ms = date
        .signed_duration_since(chrono::Utc::now())
        .num_milliseconds();
    Some(u64::try_from(delay_ms).unwrap_or(0))
}
