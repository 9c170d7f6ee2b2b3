// src/dates.rs
//! Publication-date normalization.
//!
//! Feeds publish dates in whatever format their CMS emits. We try the common
//! syndication shapes, hand the instant to a [`TimezoneConverter`] and render
//! `YYYY-MM-DD HH:MM:SS` in the application timezone.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};
use std::sync::Arc;

pub const CANONICAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Default application timezone (Africa/Khartoum, no DST).
pub const DEFAULT_APP_UTC_OFFSET: &str = "+02:00";

/// A successfully parsed publication instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedInstant {
    /// The string carried an explicit offset or zone.
    Aware(DateTime<FixedOffset>),
    /// No zone information in the string.
    Naive(NaiveDateTime),
}

/// Converts a parsed instant into the application's canonical local time.
pub trait TimezoneConverter: Send + Sync {
    fn to_app_timezone(&self, instant: ParsedInstant) -> NaiveDateTime;
}

/// Fixed-offset application timezone. Naive instants are taken as UTC.
#[derive(Debug, Clone, Copy)]
pub struct FixedOffsetZone {
    offset: FixedOffset,
}

impl FixedOffsetZone {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Parse an offset like `+02:00` or `-0530`.
    pub fn from_offset_str(s: &str) -> anyhow::Result<Self> {
        let offset: FixedOffset = s
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid UTC offset `{}`: {}", s, e))?;
        Ok(Self::new(offset))
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }
}

impl Default for FixedOffsetZone {
    fn default() -> Self {
        Self::new(FixedOffset::east_opt(2 * 3600).unwrap_or_else(|| Utc.fix()))
    }
}

impl TimezoneConverter for FixedOffsetZone {
    fn to_app_timezone(&self, instant: ParsedInstant) -> NaiveDateTime {
        let utc = match instant {
            ParsedInstant::Aware(dt) => dt.with_timezone(&Utc),
            ParsedInstant::Naive(naive) => naive.and_utc(),
        };
        utc.with_timezone(&self.offset).naive_local()
    }
}

// Offset-aware formats tried after RFC 2822 / RFC 3339.
const AWARE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%dT%H:%M%z",
    "%a, %d %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M:%S %z",
    "%a, %d %b %Y %H:%M %z",
    "%d %b %Y %H:%M %z",
    "%A, %d %B %Y %H:%M:%S %z",
    "%d %B %Y %H:%M:%S %z",
    // hour-only offsets such as "+03"
    "%Y-%m-%dT%H:%M:%S%#z",
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%#z",
];

// Zone-less formats; dates without a time land on midnight.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%a, %d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M:%S",
    "%A, %d %B %Y %H:%M:%S",
    "%d %B %Y %H:%M:%S",
    "%b %d, %Y %H:%M:%S",
    "%b %d, %Y %H:%M",
    "%A, %B %d, %Y %H:%M:%S",
    "%A, %B %d, %Y %H:%M",
    // month-first first; day-first only matches once the first field is > 12
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_ONLY_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
];

// Trailing zone names that mean UTC but that chrono's `%z` won't take.
const UTC_SUFFIXES: &[&str] = &[" GMT", " UTC", " UT", "Z"];

/// Best-effort parse of a syndication date string.
pub fn parse_flexible(raw: &str) -> Option<ParsedInstant> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(ParsedInstant::Aware(dt));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(ParsedInstant::Aware(dt));
    }
    if let Some(p) = parse_with_formats(s) {
        return Some(p);
    }

    // Publishers regularly get the weekday wrong; chrono rejects that, so retry
    // without the leading "Mon, " part.
    if let Some((head, rest)) = s.split_once(',') {
        if head.chars().all(|c| c.is_ascii_alphabetic()) {
            let rest = rest.trim();
            if let Ok(dt) = DateTime::parse_from_rfc2822(rest) {
                return Some(ParsedInstant::Aware(dt));
            }
            if let Some(p) = parse_with_formats(rest) {
                return Some(p);
            }
        }
    }

    // "2024-05-01 10:00:00 GMT" and friends: strip the zone name, read as UTC.
    for suffix in UTC_SUFFIXES {
        if let Some(stripped) = s.strip_suffix(suffix) {
            if let Some(ParsedInstant::Naive(naive)) = parse_with_formats(stripped.trim_end()) {
                return Some(ParsedInstant::Aware(naive.and_utc().fixed_offset()));
            }
        }
    }

    None
}

fn parse_with_formats(s: &str) -> Option<ParsedInstant> {
    for fmt in AWARE_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(ParsedInstant::Aware(dt));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ParsedInstant::Naive(dt));
        }
    }
    for fmt in DATE_ONLY_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(ParsedInstant::Naive);
        }
    }
    None
}

/// Parses raw feed dates and renders them in the application timezone.
#[derive(Clone)]
pub struct DateNormalizer {
    zone: Arc<dyn TimezoneConverter>,
}

impl DateNormalizer {
    pub fn new(zone: Arc<dyn TimezoneConverter>) -> Self {
        Self { zone }
    }

    /// `Some("YYYY-MM-DD HH:MM:SS")` on success, `None` when the string is
    /// empty or unparseable. Failures are logged, never raised.
    pub fn normalize(&self, raw: &str) -> Option<String> {
        self.normalize_for(raw, "unknown")
    }

    /// Same as [`normalize`](Self::normalize) but names the feed source in the
    /// warning emitted on parse failure.
    pub fn normalize_for(&self, raw: &str, source: &str) -> Option<String> {
        if raw.trim().is_empty() {
            return None;
        }
        match parse_flexible(raw) {
            Some(instant) => Some(
                self.zone
                    .to_app_timezone(instant)
                    .format(CANONICAL_FORMAT)
                    .to_string(),
            ),
            None => {
                tracing::warn!(date = raw, source, "could not parse publication date");
                None
            }
        }
    }
}

impl Default for DateNormalizer {
    fn default() -> Self {
        Self::new(Arc::new(FixedOffsetZone::default()))
    }
}

impl std::fmt::Debug for DateNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DateNormalizer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> DateNormalizer {
        DateNormalizer::new(Arc::new(FixedOffsetZone::from_offset_str("+00:00").unwrap()))
    }

    #[test]
    fn rfc2822_converted_to_app_zone() {
        let n = DateNormalizer::default();
        assert_eq!(
            n.normalize("Tue, 14 May 2024 08:30:00 GMT").as_deref(),
            Some("2024-05-14 10:30:00")
        );
        assert_eq!(
            n.normalize("Tue, 14 May 2024 08:30:00 +0300").as_deref(),
            Some("2024-05-14 07:30:00")
        );
    }

    #[test]
    fn wrong_weekday_still_parses() {
        // 14 May 2024 was a Tuesday.
        assert_eq!(
            utc().normalize("Fri, 14 May 2024 08:30:00 +0000").as_deref(),
            Some("2024-05-14 08:30:00")
        );
    }

    #[test]
    fn iso_variants() {
        let n = utc();
        assert_eq!(
            n.normalize("2024-05-14T08:30:00Z").as_deref(),
            Some("2024-05-14 08:30:00")
        );
        assert_eq!(
            n.normalize("2024-05-14T08:30:00.123+02:00").as_deref(),
            Some("2024-05-14 06:30:00")
        );
        assert_eq!(
            n.normalize("2024-05-14 08:30:00").as_deref(),
            Some("2024-05-14 08:30:00")
        );
        assert_eq!(n.normalize("2024-05-14").as_deref(), Some("2024-05-14 00:00:00"));
    }

    #[test]
    fn hour_only_offset() {
        assert_eq!(
            utc().normalize("2024-05-14T08:30:00+03").as_deref(),
            Some("2024-05-14 05:30:00")
        );
        assert_eq!(
            DateNormalizer::default().normalize("2024-05-14T08:30:00+03").as_deref(),
            Some("2024-05-14 07:30:00")
        );
    }

    #[test]
    fn us_style_month_names() {
        let n = utc();
        assert_eq!(
            n.normalize("May 14, 2024 08:30:00").as_deref(),
            Some("2024-05-14 08:30:00")
        );
        assert_eq!(
            n.normalize("Tuesday, May 14, 2024 08:30").as_deref(),
            Some("2024-05-14 08:30:00")
        );
        assert_eq!(n.normalize("May 14, 2024").as_deref(), Some("2024-05-14 00:00:00"));
    }

    #[test]
    fn slash_dates_month_first_then_day_first() {
        let n = utc();
        assert_eq!(
            n.normalize("14/05/2024 08:30").as_deref(),
            Some("2024-05-14 08:30:00")
        );
        assert_eq!(
            n.normalize("05/06/2024 08:30").as_deref(),
            Some("2024-05-06 08:30:00")
        );
        assert_eq!(n.normalize("25/12/2024").as_deref(), Some("2024-12-25 00:00:00"));
    }

    #[test]
    fn textual_utc_suffix() {
        assert_eq!(
            utc().normalize("2024-05-14 08:30:00 UTC").as_deref(),
            Some("2024-05-14 08:30:00")
        );
    }

    #[test]
    fn naive_is_treated_as_utc() {
        let n = DateNormalizer::default();
        assert_eq!(
            n.normalize("2024-12-31 23:30:00").as_deref(),
            Some("2025-01-01 01:30:00")
        );
    }

    #[test]
    fn garbage_returns_none() {
        let n = DateNormalizer::default();
        assert_eq!(n.normalize("not a date"), None);
        assert_eq!(n.normalize("  "), None);
        assert_eq!(n.normalize("32/13/2024"), None);
    }

    #[test]
    fn bad_offset_is_an_error() {
        assert!(FixedOffsetZone::from_offset_str("Khartoum").is_err());
        let z = FixedOffsetZone::from_offset_str("+03:00").unwrap();
        assert_eq!(z.offset().local_minus_utc(), 3 * 3600);
    }
}
