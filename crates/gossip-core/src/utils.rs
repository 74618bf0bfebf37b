use chrono::Utc;

// ============== Timestamp Helpers ==============

/// RFC3339 timestamp in UTC (for logs/telemetry).
pub fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}

/// Filesystem-safe UTC timestamp.
pub fn iso_timestamp_compact() -> String {
    Utc::now().format("%Y%m%dT%H%M%SZ").to_string()
}

// ============== Text Helpers ==============

/// Trim surrounding whitespace and cap the length in characters.
pub fn sanitize(text: &str, limit: usize) -> String {
    text.trim().chars().take(limit).collect::<String>().trim_end().to_string()
}

pub fn truncate_text(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out = s.chars().take(max_chars).collect::<String>();
    out.push_str("...");
    out
}
