/// Render fractional seconds as `m:ss`, truncating rather than rounding.
///
/// Negative or non-finite input is treated as zero.
pub fn format_timestamp(total_seconds: f64) -> String {
    let total = if total_seconds.is_finite() && total_seconds > 0.0 {
        total_seconds
    } else {
        0.0
    };
    let minutes = (total / 60.0).floor() as u64;
    let seconds = (total % 60.0).floor() as u64;
    format!("{minutes}:{seconds:02}")
}

/// Parse a timed-text attribute value, falling back to zero when absent or unparsable
pub fn parse_seconds(raw: Option<&str>) -> f64 {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(0.0)
}
