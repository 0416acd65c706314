//! Human-facing token counts.

/// Format a token count with a `K`/`M` suffix.
///
/// Whole multiples drop the decimal: `2_000_000` → `"2M"`, `1_500` → `"1.5K"`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_tokens(n: u64) -> String {
    let scaled = |divisor: f64, suffix: &str| {
        let v = n as f64 / divisor;
        if (v - v.round()).abs() < 0.05 {
            format!("{v:.0}{suffix}")
        } else {
            format!("{v:.1}{suffix}")
        }
    };
    if n >= 1_000_000 {
        scaled(1_000_000.0, "M")
    } else if n >= 1_000 {
        scaled(1_000.0, "K")
    } else {
        n.to_string()
    }
}
