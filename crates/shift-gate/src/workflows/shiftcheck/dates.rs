use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;

/// Calendar date with no time-of-day or timezone component, canonically a
/// zero-padded `YYYY-MM-DD` string. Ordering is lexical, which matches
/// chronological order because the representation is fixed-width.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Ymd(String);

impl Ymd {
    pub fn from_parts(year: i32, month: u32, day: u32) -> Self {
        Self(format!("{year:04}-{month:02}-{day:02}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ymd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lenient date-token capture used on exclusion payload fragments: an ISO
/// prefix (only the first 10 characters count), a `DD.MM.YYYY` prefix, or a
/// generic calendar parse. Digit tokens are captured literally, never
/// range-checked, and no timezone math is applied.
pub fn ymd_token(raw: &str) -> Option<Ymd> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    iso_prefix(text)
        .or_else(|| dotted_prefix(text))
        .or_else(|| flexible_date(text))
}

/// Anchored grammar for the inbound `date` parameter: `YYYY-MM-DD`,
/// `DD.MM.YYYY` with an optional ` HH:mm:ss` suffix, or the generic fallback.
pub fn parse_request_date(raw: &str) -> Option<Ymd> {
    let text = raw.trim();
    if text.len() == 10 {
        if let Some(date) = iso_prefix(text) {
            return Some(date);
        }
        if let Some(date) = dotted_prefix(text) {
            return Some(date);
        }
    }
    if text.len() > 10 {
        if let Some(date) = dotted_prefix(text) {
            if time_suffix(&text[10..]) {
                return Some(date);
            }
        }
    }
    flexible_date(text)
}

fn all_digits(bytes: &[u8]) -> bool {
    !bytes.is_empty() && bytes.iter().all(u8::is_ascii_digit)
}

pub(crate) fn iso_prefix(text: &str) -> Option<Ymd> {
    let bytes = text.as_bytes();
    if bytes.len() >= 10
        && all_digits(&bytes[0..4])
        && bytes[4] == b'-'
        && all_digits(&bytes[5..7])
        && bytes[7] == b'-'
        && all_digits(&bytes[8..10])
    {
        return Some(Ymd(text[..10].to_string()));
    }
    None
}

fn dotted_prefix(text: &str) -> Option<Ymd> {
    let bytes = text.as_bytes();
    if bytes.len() >= 10
        && all_digits(&bytes[0..2])
        && bytes[2] == b'.'
        && all_digits(&bytes[3..5])
        && bytes[5] == b'.'
        && all_digits(&bytes[6..10])
    {
        return Some(Ymd(format!(
            "{}-{}-{}",
            &text[6..10],
            &text[3..5],
            &text[0..2]
        )));
    }
    None
}

fn time_suffix(rest: &str) -> bool {
    let trimmed = rest.trim_start();
    if trimmed.len() == rest.len() {
        return false;
    }
    let bytes = trimmed.as_bytes();
    bytes.len() == 8
        && all_digits(&bytes[0..2])
        && bytes[2] == b':'
        && all_digits(&bytes[3..5])
        && bytes[5] == b':'
        && all_digits(&bytes[6..8])
}

/// Last-resort parse; extracts the literal calendar components of whatever
/// chrono recognizes, without converting between time zones.
fn flexible_date(text: &str) -> Option<Ymd> {
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(from_naive(date));
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(text) {
        return Some(from_naive(stamp.date_naive()));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(stamp) = NaiveDateTime::parse_from_str(text, format) {
            return Some(from_naive(stamp.date()));
        }
    }
    None
}

fn from_naive(date: NaiveDate) -> Ymd {
    Ymd::from_parts(date.year(), date.month(), date.day())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_and_dotted_request_dates_normalize_to_the_same_day() {
        let iso = parse_request_date("2025-10-03").expect("iso date parses");
        let dotted = parse_request_date("03.10.2025 00:00:00").expect("dotted datetime parses");
        assert_eq!(iso, dotted);
        assert_eq!(iso.as_str(), "2025-10-03");
    }

    #[test]
    fn dotted_request_date_without_time_parses() {
        let date = parse_request_date("03.10.2025").expect("dotted date parses");
        assert_eq!(date.as_str(), "2025-10-03");
    }

    #[test]
    fn dotted_request_date_requires_separating_whitespace_before_time() {
        assert!(parse_request_date("03.10.202500:00:00").is_none());
    }

    #[test]
    fn request_date_falls_back_to_generic_parse() {
        let date = parse_request_date("2025-10-03T12:30:00Z").expect("rfc3339 parses");
        assert_eq!(date.as_str(), "2025-10-03");
        let date = parse_request_date("2025-10-03 12:30:00").expect("space datetime parses");
        assert_eq!(date.as_str(), "2025-10-03");
    }

    #[test]
    fn request_date_rejects_garbage() {
        assert!(parse_request_date("not-a-date").is_none());
        assert!(parse_request_date("").is_none());
        assert!(parse_request_date("2025/10/03").is_none());
    }

    #[test]
    fn token_uses_only_the_iso_prefix() {
        let date = ymd_token("2025-10-03 some trailing noise").expect("prefix parses");
        assert_eq!(date.as_str(), "2025-10-03");
    }

    #[test]
    fn token_accepts_dotted_dates_with_trailers() {
        let date = ymd_token("03.10.2025 00:00:00").expect("dotted token parses");
        assert_eq!(date.as_str(), "2025-10-03");
    }

    #[test]
    fn token_captures_digits_without_range_checking() {
        let date = ymd_token("2025-99-99").expect("token captured literally");
        assert_eq!(date.as_str(), "2025-99-99");
    }

    #[test]
    fn lexical_ordering_matches_chronology() {
        let earlier = Ymd::from_parts(2025, 9, 30);
        let later = Ymd::from_parts(2025, 10, 1);
        assert!(earlier < later);
    }
}
