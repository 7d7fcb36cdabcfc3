//! Unit, date and name normalisation.
//!
//! Everything in here is pure: temperature conversion, named timestamp
//! layouts, date parsing and validation, 12-hour to 24-hour time conversion,
//! filename and URL slug cleanup, and `Country/City` parsing.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::error::{PipelineError, Result};

static TEMPERATURE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(-?\d+(?:\.\d+)?)\s*°\s*([CF])").unwrap());
static CLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d{1,2})[:.](\d{2})\s*(am|pm)?").unwrap());
static NON_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").unwrap());
static SEPARATOR_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-\s]+").unwrap());

/// Convert Fahrenheit to Celsius: `(F - 32) * 5 / 9`.
pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Round a temperature for display (no decimals).
pub fn round_display(value: f64) -> i64 {
    value.round() as i64
}

/// Round a value for statistics (one decimal).
pub fn round_stat(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `23°C`-style display string.
pub fn format_celsius(celsius: f64) -> String {
    format!("{}°C", round_display(celsius))
}

/// Parse a temperature such as `"73 °F"` or `"-4°C"` into Celsius.
pub fn parse_temperature(text: &str) -> Option<f64> {
    let caps = TEMPERATURE_RE.captures(text)?;
    let value: f64 = caps[1].parse().ok()?;
    match &caps[2] {
        "F" => Some(fahrenheit_to_celsius(value)),
        _ => Some(value),
    }
}

/// The fixed set of timestamp layouts used across the tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampLayout {
    /// `2025-05-06T14:30:00+05:30`
    Iso8601,
    /// `06-05-2025 14:30`, to-do creation time.
    TaskStamp,
    /// `06-05-2025 14:30:00`, headline scrape time.
    ScrapeStamp,
    /// `14:30:00 06/05/2025`, plain-text journal line.
    JournalLine,
    /// `2025-05-06 14:30:00`, event log.
    EventLog,
    /// `2025-05-06`, filenames.
    FileDate,
    /// `20250506`, historic weather queries.
    QueryDate,
    /// `May 06, 2025`
    Display,
}

impl TimestampLayout {
    /// The `chrono` format string for this layout.
    pub fn pattern(self) -> &'static str {
        match self {
            Self::Iso8601 => "%Y-%m-%dT%H:%M:%S%:z",
            Self::TaskStamp => "%d-%m-%Y %H:%M",
            Self::ScrapeStamp => "%d-%m-%Y %H:%M:%S",
            Self::JournalLine => "%H:%M:%S %d/%m/%Y",
            Self::EventLog => "%Y-%m-%d %H:%M:%S",
            Self::FileDate => "%Y-%m-%d",
            Self::QueryDate => "%Y%m%d",
            Self::Display => "%B %d, %Y",
        }
    }

    /// Format a zoned timestamp with this layout.
    pub fn format<Tz>(self, at: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        at.format(self.pattern()).to_string()
    }

    /// Format a calendar date. Only meaningful for date-only layouts.
    pub fn format_date(self, date: NaiveDate) -> String {
        date.format(self.pattern()).to_string()
    }
}

/// Date layouts accepted from users, tried in order; the first match wins.
const DATE_INPUT_FORMATS: [&str; 6] = [
    "%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d", "%m-%d-%Y", "%d-%m-%Y",
];

/// Parse a user-supplied date relative to `today`.
///
/// Accepts `today`, `yesterday`, `tomorrow`, `YYYYMMDD` and the layouts in
/// [`DATE_INPUT_FORMATS`]. Ambiguous inputs like `05/06/2025` resolve to the
/// month-first reading.
pub fn parse_date_relative(input: &str, today: NaiveDate) -> Option<NaiveDate> {
    let input = input.trim();
    match input.to_ascii_lowercase().as_str() {
        "today" => return Some(today),
        "yesterday" => return today.pred_opt(),
        "tomorrow" => return today.succ_opt(),
        _ => {}
    }

    if input.len() == 8 && input.chars().all(|c| c.is_ascii_digit()) {
        let year = input[..4].parse().ok()?;
        let month = input[4..6].parse().ok()?;
        let day = input[6..].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    DATE_INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(input, fmt).ok())
}

/// Parse a user-supplied date relative to the local calendar.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    parse_date_relative(input, chrono::Local::now().date_naive())
}

/// Every date from `start` to `end` inclusive. Reversed bounds are swapped.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let (start, end) = if start > end { (end, start) } else { (start, end) };
    start.iter_days().take_while(|d| *d <= end).collect()
}

/// Check that a query range is ordered and within what the source serves:
/// at most one year back and ten days ahead of `today`.
pub fn validate_date_range(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Result<()> {
    if start > end {
        return Err(PipelineError::invalid("Start date cannot be after end date"));
    }
    let max_past = today
        .with_year(today.year() - 1)
        .unwrap_or(today - Duration::days(365));
    if start < max_past {
        return Err(PipelineError::invalid(
            "Start date is too far in the past (max 1 year)",
        ));
    }
    if end > today + Duration::days(10) {
        return Err(PipelineError::invalid(
            "End date is too far in the future (max 10 days)",
        ));
    }
    Ok(())
}

/// Normalise a clock reading such as `"2:30 pm"`, `"12:00 am"` or `"06.50"`
/// to 24-hour `HH:MM`.
pub fn to_24h(text: &str) -> Option<String> {
    let caps = CLOCK_RE.captures(text)?;
    let mut hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    match caps.get(3).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(ref p) if p == "pm" && hour != 12 => hour += 12,
        Some(ref p) if p == "am" && hour == 12 => hour = 0,
        _ => {}
    }
    if hour > 23 || minute > 59 {
        return None;
    }
    Some(format!("{hour:02}:{minute:02}"))
}

/// Clean a free-form name for use in a filename.
///
/// Strips non-word characters, collapses runs of whitespace and hyphens into
/// a single `-`, trims leading/trailing hyphens and lowercases.
///
/// ```ignore
/// assert_eq!(clean_filename("New York!"), "new-york");
/// ```
pub fn clean_filename(name: &str) -> String {
    let stripped = NON_WORD_RE.replace_all(name, "");
    let collapsed = SEPARATOR_RUN_RE.replace_all(&stripped, "-");
    collapsed.trim_matches('-').to_lowercase()
}

/// Build a snapshot filename stem: `{city}_{date}` or `{city}_{date}_{suffix}`.
///
/// `date` defaults to today's `YYYY-MM-DD`. The same inputs always produce
/// the same name.
pub fn generate_filename(city: &str, date: Option<&str>, suffix: &str) -> String {
    let date = date.map(str::to_string).unwrap_or_else(|| {
        TimestampLayout::FileDate.format_date(chrono::Local::now().date_naive())
    });
    let city = clean_filename(city).replace('-', "_");
    if suffix.is_empty() {
        format!("{city}_{date}")
    } else {
        format!("{city}_{date}_{}", clean_filename(suffix))
    }
}

/// Slug used in timeanddate.com URLs: lowercase, spaces and underscores
/// become hyphens.
pub fn url_slug(name: &str) -> String {
    name.trim().to_lowercase().replace([' ', '_'], "-")
}

/// Split a `Country/City` location into `(country, city)`.
///
/// # Errors
///
/// Returns [`PipelineError::Validation`] unless the input has exactly one `/`
/// with non-empty text on both sides.
pub fn parse_location(input: &str) -> Result<(String, String)> {
    let parts: Vec<&str> = input.split('/').collect();
    if parts.len() != 2 {
        return Err(PipelineError::invalid(
            "Please use Country/City format (e.g., 'Japan/Tokyo')",
        ));
    }
    let country = parts[0].trim();
    let city = parts[1].trim();
    if country.is_empty() || city.is_empty() {
        return Err(PipelineError::invalid(
            "Both country and city are required (e.g., 'Japan/Tokyo')",
        ));
    }
    Ok((country.to_string(), city.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Local};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_fahrenheit_reference_points() {
        assert_eq!(round_display(fahrenheit_to_celsius(32.0)), 0);
        assert_eq!(round_display(fahrenheit_to_celsius(212.0)), 100);
        assert_eq!(round_display(fahrenheit_to_celsius(98.6)), 37);
    }

    #[test]
    fn test_stat_rounding_keeps_one_decimal() {
        assert_eq!(round_stat(fahrenheit_to_celsius(75.0)), 23.9);
        assert_eq!(round_stat(21.04), 21.0);
    }

    #[test]
    fn test_parse_temperature_units() {
        assert_eq!(parse_temperature("20 °C"), Some(20.0));
        assert_eq!(parse_temperature("-3°C"), Some(-3.0));
        assert_eq!(parse_temperature("212 °F").map(round_display), Some(100));
        assert_eq!(parse_temperature("no reading"), None);
    }

    #[test]
    fn test_format_celsius() {
        assert_eq!(format_celsius(22.6), "23°C");
        assert_eq!(format_celsius(-0.2), "0°C");
    }

    #[test]
    fn test_timestamp_layouts() {
        let tz = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let at = tz.with_ymd_and_hms(2025, 5, 6, 14, 30, 5).unwrap();
        assert_eq!(TimestampLayout::Iso8601.format(&at), "2025-05-06T14:30:05+05:30");
        assert_eq!(TimestampLayout::TaskStamp.format(&at), "06-05-2025 14:30");
        assert_eq!(TimestampLayout::ScrapeStamp.format(&at), "06-05-2025 14:30:05");
        assert_eq!(TimestampLayout::JournalLine.format(&at), "14:30:05 06/05/2025");
        assert_eq!(TimestampLayout::EventLog.format(&at), "2025-05-06 14:30:05");
        assert_eq!(TimestampLayout::QueryDate.format_date(ymd(2025, 5, 6)), "20250506");
        assert_eq!(TimestampLayout::Display.format_date(ymd(2025, 5, 6)), "May 06, 2025");
    }

    #[test]
    fn test_parse_date_formats() {
        let today = ymd(2025, 5, 6);
        assert_eq!(parse_date_relative("2025-01-31", today), Some(ymd(2025, 1, 31)));
        assert_eq!(parse_date_relative("20250131", today), Some(ymd(2025, 1, 31)));
        assert_eq!(parse_date_relative("01/31/2025", today), Some(ymd(2025, 1, 31)));
        assert_eq!(parse_date_relative("31/01/2025", today), Some(ymd(2025, 1, 31)));
        assert_eq!(parse_date_relative("2025/01/31", today), Some(ymd(2025, 1, 31)));
        assert_eq!(parse_date_relative("31-01-2025", today), Some(ymd(2025, 1, 31)));
        assert_eq!(parse_date_relative("05/06/2025", today), Some(ymd(2025, 5, 6)));
        assert_eq!(parse_date_relative("yesterday", today), Some(ymd(2025, 5, 5)));
        assert_eq!(parse_date_relative("not a date", today), None);
        assert_eq!(parse_date_relative("20251340", today), None);
    }

    #[test]
    fn test_date_range_is_inclusive_and_swaps() {
        let range = date_range(ymd(2025, 5, 3), ymd(2025, 5, 1));
        assert_eq!(range, vec![ymd(2025, 5, 1), ymd(2025, 5, 2), ymd(2025, 5, 3)]);
        assert_eq!(date_range(ymd(2025, 5, 1), ymd(2025, 5, 1)).len(), 1);
    }

    #[test]
    fn test_validate_date_range_limits() {
        let today = ymd(2025, 5, 6);
        assert!(validate_date_range(ymd(2025, 5, 1), ymd(2025, 5, 6), today).is_ok());
        assert!(validate_date_range(ymd(2025, 5, 6), ymd(2025, 5, 1), today).is_err());
        assert!(validate_date_range(ymd(2024, 1, 1), ymd(2025, 5, 1), today).is_err());
        assert!(validate_date_range(ymd(2025, 5, 1), ymd(2025, 5, 30), today).is_err());
    }

    #[test]
    fn test_to_24h() {
        assert_eq!(to_24h("2:30 pm").as_deref(), Some("14:30"));
        assert_eq!(to_24h("12:00 am").as_deref(), Some("00:00"));
        assert_eq!(to_24h("12:15 PM").as_deref(), Some("12:15"));
        assert_eq!(to_24h("6.50").as_deref(), Some("06:50"));
        assert_eq!(to_24h("12:00 amMon, 5 May").as_deref(), Some("00:00"));
        assert_eq!(to_24h("noon"), None);
    }

    #[test]
    fn test_clean_filename() {
        assert_eq!(clean_filename("New York!"), "new-york");
        assert_eq!(clean_filename("  São -- Paulo  "), "são-paulo");
        assert_eq!(clean_filename("a@b#c"), "abc");
    }

    #[test]
    fn test_generate_filename_is_deterministic() {
        let a = generate_filename("New York", Some("2025-05-06"), "historic");
        let b = generate_filename("New York", Some("2025-05-06"), "historic");
        assert_eq!(a, b);
        assert_eq!(a, "new_york_2025-05-06_historic");
        assert_ne!(a, generate_filename("New York", Some("2025-05-07"), "historic"));
        assert_ne!(a, generate_filename("Boston", Some("2025-05-06"), "historic"));
        assert_ne!(a, generate_filename("New York", Some("2025-05-06"), "24hrs"));
        assert_eq!(generate_filename("Paris", Some("2025-05-06"), ""), "paris_2025-05-06");
    }

    #[test]
    fn test_generate_filename_defaults_to_today() {
        let today = TimestampLayout::FileDate.format_date(Local::now().date_naive());
        assert_eq!(generate_filename("Oslo", None, ""), format!("oslo_{today}"));
    }

    #[test]
    fn test_url_slug() {
        assert_eq!(url_slug("New York"), "new-york");
        assert_eq!(url_slug("rio_de_janeiro"), "rio-de-janeiro");
    }

    #[test]
    fn test_parse_location() {
        assert_eq!(
            parse_location("Japan/Tokyo").unwrap(),
            ("Japan".to_string(), "Tokyo".to_string())
        );
        assert_eq!(
            parse_location(" USA / New York ").unwrap(),
            ("USA".to_string(), "New York".to_string())
        );
        assert!(parse_location("Tokyo").is_err());
        assert!(parse_location("Japan/").is_err());
        assert!(parse_location("a/b/c").is_err());
    }
}
