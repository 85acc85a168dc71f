//! Loose date tokens used by content collections.
//!
//! Content authors write dates as `"YYYY-MM"`, `"YYYY"` or `"present"`. This
//! module turns those tokens into comparable millisecond timestamps and into
//! display strings. Nothing here reads the system clock: the caller passes
//! the "now" anchor that `"present"` resolves to, which keeps every function
//! deterministic under test.
//!
//! # Functions
//!
//! - [`parse_date`] — token → milliseconds since the Unix epoch (`0` when unknown)
//! - [`format_date`] — token → `"June 2024"` / `"Present"`, passthrough otherwise
//! - [`format_date_range`] — `"June 2024 – Present"`

use chrono::{DateTime, Month, TimeZone, Utc};

/// Sentinel timestamp for empty or unparsable tokens. Sorts as the oldest date.
pub const UNKNOWN_TIMESTAMP: i64 = 0;

/// Separator placed between the two ends of a range (en-dash).
pub const RANGE_SEPARATOR: &str = " – ";

const PRESENT: &str = "present";

/// A calendar month decoded from a `"YYYY"` or `"YYYY-MM"` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct YearMonth {
    pub year: i32,
    /// 1-based month (1 = January).
    pub month: u32,
}

impl YearMonth {
    /// Midnight UTC on the first day of this month, if chrono can represent it.
    pub fn first_instant(&self) -> Option<DateTime<Utc>> {
        Utc.with_ymd_and_hms(self.year, self.month, 1, 0, 0, 0)
            .single()
    }

    /// English month name, e.g. `"March"`.
    pub fn month_name(&self) -> &'static str {
        u8::try_from(self.month)
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .map(|m| m.name())
            .unwrap_or("January")
    }
}

/// Decode the `"YYYY"` / `"YYYY-MM"` grammar shared by the parser and formatter.
///
/// The month defaults to January when the token has no `-`. Components after
/// the month (e.g. the day in `"2024-06-15"`) are ignored. Returns `None` when
/// the year is not a run of ASCII digits, the month is not an integer, or the
/// month falls outside `1..=12`.
pub fn parse_month_token(token: &str) -> Option<YearMonth> {
    let mut parts = token.trim().split('-');

    let year_part = parts.next()?;
    if year_part.is_empty() || !year_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = year_part.parse().ok()?;

    let month = match parts.next() {
        None => 1,
        Some(m) if !m.is_empty() && m.bytes().all(|b| b.is_ascii_digit()) => m.parse().ok()?,
        Some(_) => return None,
    };
    if !(1..=12).contains(&month) {
        return None;
    }

    Some(YearMonth { year, month })
}

fn is_present(token: &str) -> bool {
    token.trim().eq_ignore_ascii_case(PRESENT)
}

/// Convert a date token into milliseconds since the Unix epoch.
///
/// # Arguments
///
/// * `anchor` — The "now" instant that `"present"` resolves to
/// * `token` — `"YYYY-MM"`, `"YYYY"`, `"present"` (any case) or anything else
///
/// # Returns
///
/// - `anchor` in milliseconds for `"present"`, so ongoing entries always sort newest
/// - midnight UTC on the first of the month for `"YYYY"` / `"YYYY-MM"`
/// - [`UNKNOWN_TIMESTAMP`] for empty, whitespace-only or malformed tokens
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use content_order::date::parse_date;
///
/// let now = Utc.with_ymd_and_hms(2026, 2, 18, 12, 0, 0).unwrap();
/// assert_eq!(parse_date(now, "2024-06"), 1_717_200_000_000);
/// assert_eq!(parse_date(now, "Present"), now.timestamp_millis());
/// assert_eq!(parse_date(now, "soon"), 0);
/// ```
pub fn parse_date(anchor: DateTime<Utc>, token: &str) -> i64 {
    if token.trim().is_empty() {
        return UNKNOWN_TIMESTAMP;
    }
    if is_present(token) {
        return anchor.timestamp_millis();
    }

    parse_month_token(token)
        .and_then(|ym| ym.first_instant())
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(UNKNOWN_TIMESTAMP)
}

/// Render a date token for display.
///
/// `"2024-06"` → `"June 2024"`, `"2024"` → `"January 2024"`, `"present"` in
/// any case → `"Present"`. Anything else, including the empty string, is
/// returned unchanged.
pub fn format_date(token: &str) -> String {
    if is_present(token) {
        return "Present".to_string();
    }
    match parse_month_token(token) {
        Some(ym) => format!("{} {}", ym.month_name(), ym.year),
        None => token.to_string(),
    }
}

/// Render a start/end pair for display.
///
/// Returns `""` without a start, the formatted start alone when the end is
/// missing or identical to the start, and `"<start> – <end>"` otherwise.
/// Empty strings count as missing.
pub fn format_date_range(start: Option<&str>, end: Option<&str>) -> String {
    let Some(start) = start.filter(|s| !s.is_empty()) else {
        return String::new();
    };
    match end.filter(|e| !e.is_empty()) {
        Some(end) if end != start => {
            format!("{}{}{}", format_date(start), RANGE_SEPARATOR, format_date(end))
        }
        _ => format_date(start),
    }
}
