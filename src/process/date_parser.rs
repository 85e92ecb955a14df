use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Parse an ISO-like date string → calendar date.
///
/// Accepts `"YYYY-MM-DD"` optionally followed by a `T` or space separated time
/// part, with or without a `Z`/offset suffix. The time part is dropped.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    // minimal length + separators check
    let b = s.as_bytes();
    if b.len() < 10 || b[4] != b'-' || b[7] != b'-' || !s.is_char_boundary(10) {
        return None;
    }
    if s.len() == 10 {
        return NaiveDate::parse_from_str(s, "%Y-%m-%d").ok();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    // trailing garbage after a valid date, e.g. "2023-10-13T00:00"
    match b[10] {
        b'T' | b' ' => NaiveDate::parse_from_str(&s[..10], "%Y-%m-%d").ok(),
        _ => None,
    }
}
