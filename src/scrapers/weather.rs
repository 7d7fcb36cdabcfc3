//! timeanddate.com weather scraper.
//!
//! Pages used:
//!
//! | Data | URL |
//! |------|-----|
//! | Current conditions | `{base}/{country}/{city}` |
//! | Hourly forecast | `{base}/{country}/{city}/hourly` |
//! | Historic table | `{base}/{country}/{city}/historic?hd=YYYYMMDD`, then `?start=YYYYMMDD` |
//! | City list | `{base}/{country}` |
//!
//! Parsing is split from fetching: every `parse_*` function takes raw HTML and
//! is pure, so fixtures can exercise it directly.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use crate::config::WeatherConfig;
use crate::error::{PipelineError, Result};
use crate::extract::{self, Page, element_text};
use crate::fetch::fetch_text;
use crate::models::{HistoricObservation, HourlyForecast, WeatherReport};
use crate::normalize::{TimestampLayout, parse_temperature, to_24h, url_slug};
use crate::outputs::listing::CITY_CACHE_SUFFIX;
use crate::utils::{take_chars, upcase};

/// Slots picked from each day of a date-range query.
pub const RANGE_TARGET_TIMES: [&str; 4] = ["06:00", "12:00", "18:00", "00:00"];

const MAX_HOURLY_ROWS: usize = 24;
const MIN_HOURLY_ROWS: usize = 5;

static TABLE_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("table").unwrap());
static ROW_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static CELL_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("th, td").unwrap());
static TH_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("th").unwrap());
static TD_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());
static HEAD_ROW_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("thead tr").unwrap());
static BODY_ROW_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("tbody tr").unwrap());
static HISTORIC_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("table#wt-his").unwrap());
static HISTORIC_FALLBACK_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table.zebra.tb-wt").unwrap());
static DETAILS_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table.table--left.table--inner-borders-rows").unwrap());
static ANCHOR_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static TWELVE_HOUR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*\d{1,2}:\d{2}\s*(am|pm)").unwrap());
static INLINE_TEMP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d+\s*°\s*[CF]").unwrap());

/// Scrapes one configured timeanddate.com mirror.
#[derive(Debug, Clone)]
pub struct WeatherScraper {
    client: Client,
    base_url: String,
    data_dir: PathBuf,
}

impl WeatherScraper {
    pub fn new(client: Client, config: &WeatherConfig, data_dir: PathBuf) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            data_dir,
        }
    }

    pub fn city_url(&self, country: &str, city: &str) -> String {
        format!("{}/{}/{}", self.base_url, url_slug(country), url_slug(city))
    }

    /// Fetch current conditions plus the hourly forecast.
    ///
    /// # Errors
    ///
    /// - Transport or status errors from the city page
    /// - [`PipelineError::Extraction`] when no current temperature is found
    ///
    /// A failed hourly fetch only leaves `hourly_forecast` empty.
    #[instrument(level = "info", skip(self))]
    pub async fn fetch_report(&self, country: &str, city: &str) -> Result<WeatherReport> {
        let url = self.city_url(country, city);
        let html = fetch_text(&self.client, &url).await?;
        let timestamp = TimestampLayout::Iso8601.format(&Local::now());
        let mut report = parse_report(&html, country, city, &url, timestamp)?;

        let hourly_url = format!("{url}/hourly");
        match fetch_text(&self.client, &hourly_url).await {
            Ok(body) => report.hourly_forecast = parse_hourly(&body),
            Err(e) => warn!(url = %hourly_url, error = %e, "Hourly forecast unavailable"),
        }
        info!(
            location = %report.location,
            temp_c = report.current_temp_c,
            hours = report.hourly_forecast.len(),
            "Weather report scraped"
        );
        Ok(report)
    }

    /// Fetch the key/value details table from the city page.
    #[instrument(level = "info", skip(self))]
    pub async fn fetch_details(&self, country: &str, city: &str) -> Result<BTreeMap<String, String>> {
        let url = self.city_url(country, city);
        let html = fetch_text(&self.client, &url).await?;
        let details = parse_details_table(&html);
        if details.is_empty() {
            return Err(PipelineError::Extraction {
                field: "details table",
                source_url: url,
            });
        }
        Ok(details)
    }

    /// Fetch the historic observations for one day.
    ///
    /// Both historic URL forms are tried in turn. Network errors and pages
    /// without a usable table move on to the next form; an empty result
    /// means no data was available.
    #[instrument(level = "info", skip(self))]
    pub async fn fetch_historic(&self, country: &str, city: &str, date: NaiveDate) -> Vec<HistoricObservation> {
        let base = format!("{}/historic", self.city_url(country, city));
        let day = TimestampLayout::QueryDate.format_date(date);
        for url in [format!("{base}?hd={day}"), format!("{base}?start={day}")] {
            let html = match fetch_text(&self.client, &url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!(%url, error = %e, "Historic request failed");
                    continue;
                }
            };
            match parse_historic(&html) {
                Some(rows) => {
                    info!(%url, rows = rows.len(), "Historic table parsed");
                    return rows;
                }
                None => debug!(%url, "No usable historic table"),
            }
        }
        warn!(%date, "No historic data available");
        Vec::new()
    }

    /// Observations closest to 06:00, 12:00, 18:00 and 00:00 for each day in
    /// `start..=end`. Days are fetched one after another.
    #[instrument(level = "info", skip(self))]
    pub async fn fetch_range(
        &self,
        country: &str,
        city: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<HistoricObservation> {
        let days = crate::normalize::date_range(start, end);
        let per_day: Vec<Vec<HistoricObservation>> = stream::iter(days)
            .then(|day| async move {
                info!(%day, "Processing day");
                let rows = self.fetch_historic(country, city, day).await;
                select_range_slots(&rows, day)
            })
            .collect()
            .await;
        per_day.into_iter().flatten().collect()
    }

    /// Observations from yesterday and today that fall within 24 hours of
    /// `now`, oldest first.
    #[instrument(level = "info", skip(self, now))]
    pub async fn fetch_last_24h(
        &self,
        country: &str,
        city: &str,
        now: DateTime<Local>,
    ) -> Vec<HistoricObservation> {
        let today = now.date_naive();
        let mut combined = Vec::new();
        for day in [today - Duration::days(1), today] {
            let date = TimestampLayout::FileDate.format_date(day);
            combined.extend(
                self.fetch_historic(country, city, day)
                    .await
                    .into_iter()
                    .map(|row| HistoricObservation {
                        date: Some(date.clone()),
                        ..row
                    }),
            );
        }
        filter_last_24h(combined, now.naive_local())
    }

    /// City slugs for `country`, from the cache file unless `refresh`.
    ///
    /// A fresh list is written back to `{data_dir}/{country}_cities.json`.
    #[instrument(level = "info", skip(self))]
    pub async fn cities(&self, country: &str, refresh: bool) -> Result<Vec<String>> {
        let country = url_slug(country);
        let cache = self.data_dir.join(format!("{country}{CITY_CACHE_SUFFIX}"));
        if !refresh && cache.exists() {
            match serde_json::from_str::<Vec<String>>(&fs::read_to_string(&cache).await?) {
                Ok(cities) => {
                    debug!(path = %cache.display(), count = cities.len(), "City list from cache");
                    return Ok(cities);
                }
                Err(e) => warn!(path = %cache.display(), error = %e, "Ignoring corrupt city cache"),
            }
        }

        let url = format!("{}/{country}", self.base_url);
        let html = fetch_text(&self.client, &url).await?;
        let cities = parse_cities(&html, &country);
        fs::create_dir_all(&self.data_dir).await?;
        fs::write(&cache, serde_json::to_string_pretty(&cities)?).await?;
        info!(count = cities.len(), path = %cache.display(), "City list cached");
        Ok(cities)
    }
}

/// Build a [`WeatherReport`] from a city page.
///
/// # Errors
///
/// Returns [`PipelineError::Extraction`] when the temperature chain finds
/// nothing.
pub fn parse_report(
    html: &str,
    country: &str,
    city: &str,
    source_url: &str,
    timestamp: String,
) -> Result<WeatherReport> {
    let page = Page::parse(html);
    let temperature = extract::temperature_chain();
    let current_temp_c = temperature
        .extract(&page)
        .ok_or_else(|| PipelineError::Extraction {
            field: temperature.field(),
            source_url: source_url.to_string(),
        })?;
    let forecast = extract::forecast_high_low(&page);

    Ok(WeatherReport {
        location: format!("{}, {}", upcase(city), upcase(country)),
        country: country.to_string(),
        city: city.to_string(),
        current_temp_c,
        condition: extract::condition_chain().extract(&page),
        feels_like_c: extract::feels_like(&page),
        forecast_high_c: forecast.map(|(high, _)| high),
        forecast_low_c: forecast.map(|(_, low)| low),
        humidity: extract::humidity(&page),
        wind: extract::wind(&page),
        pressure: extract::pressure(&page),
        visibility: extract::visibility(&page),
        hourly_forecast: Vec::new(),
        timestamp,
    })
}

/// Rows of the hourly forecast page.
///
/// A row counts when its first cell is a 12-hour time and a later cell holds
/// a temperature; the condition is the next non-empty cell after it. Tables
/// are scanned until one yields at least five rows.
pub fn parse_hourly(html: &str) -> Vec<HourlyForecast> {
    let document = Html::parse_document(html);
    let mut hours = Vec::new();
    for table in document.select(&TABLE_SEL) {
        for row in table.select(&ROW_SEL) {
            if let Some(hour) = hourly_row(&row) {
                hours.push(hour);
            }
        }
        if hours.len() >= MIN_HOURLY_ROWS {
            break;
        }
    }
    hours.truncate(MAX_HOURLY_ROWS);
    hours
}

fn hourly_row(row: &ElementRef<'_>) -> Option<HourlyForecast> {
    let cells: Vec<String> = row.select(&CELL_SEL).map(|c| element_text(&c)).collect();
    if cells.len() < 3 || !TWELVE_HOUR_RE.is_match(&cells[0]) {
        return None;
    }
    let time = to_24h(&cells[0])?;
    let (offset, temperature_c) = cells[1..]
        .iter()
        .enumerate()
        .find_map(|(i, c)| parse_temperature(c).map(|t| (i + 1, t)))?;
    let condition = cells[offset + 1..]
        .iter()
        .find(|c| !c.is_empty())
        .map(|c| take_chars(c.trim_end_matches('.'), 25))
        .unwrap_or_default();
    Some(HourlyForecast {
        time,
        temperature_c,
        condition,
    })
}

/// Column positions in a historic table, from its header row.
#[derive(Debug, Default)]
struct HistoricColumns {
    time: Option<usize>,
    temperature: Option<usize>,
    weather: Option<usize>,
    wind: Option<usize>,
    humidity: Option<usize>,
    barometer: Option<usize>,
    visibility: Option<usize>,
}

impl HistoricColumns {
    fn from_headers(headers: &[String]) -> Self {
        let mut columns = Self::default();
        for (i, header) in headers.iter().enumerate() {
            let h = header.to_lowercase();
            let slot = if h.contains("time") {
                &mut columns.time
            } else if h.contains("temp") {
                &mut columns.temperature
            } else if h.contains("weather") || h.contains("conditions") {
                &mut columns.weather
            } else if h.contains("wind") {
                &mut columns.wind
            } else if h.contains("humidity") {
                &mut columns.humidity
            } else if h.contains("barometer") {
                &mut columns.barometer
            } else if h.contains("visibility") {
                &mut columns.visibility
            } else {
                continue;
            };
            slot.get_or_insert(i);
        }
        columns.time.get_or_insert(0);
        columns
    }
}

fn cell_value(cells: &[String], column: Option<usize>) -> Option<String> {
    let value = cells.get(column?)?.trim();
    match value {
        "" | "-" | "N/A" => None,
        v => Some(v.to_string()),
    }
}

/// Parse a historic observations table.
///
/// Returns `None` when the page has no historic table, the table says
/// "No data available", or no row survives cleaning. Rows are sorted by
/// time and never carry a `date`.
pub fn parse_historic(html: &str) -> Option<Vec<HistoricObservation>> {
    let document = Html::parse_document(html);
    let table = document
        .select(&HISTORIC_SEL)
        .next()
        .or_else(|| document.select(&HISTORIC_FALLBACK_SEL).next())?;

    let header_row = table
        .select(&HEAD_ROW_SEL)
        .last()
        .or_else(|| table.select(&ROW_SEL).next())?;
    let headers: Vec<String> = header_row
        .select(&CELL_SEL)
        .map(|c| element_text(&c))
        .collect();
    let columns = HistoricColumns::from_headers(&headers);
    if columns.temperature.is_none() && columns.weather.is_none() {
        return None;
    }

    let mut rows = Vec::new();
    for row in table.select(&BODY_ROW_SEL) {
        let cells: Vec<String> = row.select(&CELL_SEL).map(|c| element_text(&c)).collect();
        if cells
            .iter()
            .any(|c| c.to_lowercase().contains("no data available"))
        {
            return None;
        }
        if cells.iter().any(|c| c.contains("CustomWeather")) {
            continue;
        }
        let Some(time) = cell_value(&cells, columns.time).and_then(|t| to_24h(&t)) else {
            continue;
        };

        let raw_weather = cell_value(&cells, columns.weather);
        let (temperature_c, weather) = match columns.temperature {
            Some(_) => (
                cell_value(&cells, columns.temperature).and_then(|t| parse_temperature(&t)),
                raw_weather,
            ),
            None => (
                raw_weather.as_deref().and_then(parse_temperature),
                raw_weather.map(|w| INLINE_TEMP_RE.replace_all(&w, "").trim().to_string()),
            ),
        };
        let weather = weather
            .map(|w| w.trim_matches(|c: char| c == '.' || c.is_whitespace()).to_string())
            .filter(|w| !w.is_empty());

        rows.push(HistoricObservation {
            time,
            temperature_c,
            weather,
            wind: cell_value(&cells, columns.wind),
            humidity_pct: cell_value(&cells, columns.humidity)
                .and_then(|h| h.trim_end_matches('%').trim().parse().ok()),
            barometer: cell_value(&cells, columns.barometer),
            visibility: cell_value(&cells, columns.visibility),
            ..Default::default()
        });
    }

    if rows.is_empty() {
        return None;
    }
    rows.sort_by(|a, b| a.time.cmp(&b.time));
    Some(rows)
}

/// `th`/`td` pairs of the current-conditions details table, keys without `:`.
pub fn parse_details_table(html: &str) -> BTreeMap<String, String> {
    let document = Html::parse_document(html);
    let mut details = BTreeMap::new();
    let Some(table) = document.select(&DETAILS_SEL).next() else {
        return details;
    };
    for row in table.select(&ROW_SEL) {
        let header = row.select(&TH_SEL).next();
        let value = row.select(&TD_SEL).next();
        if let (Some(header), Some(value)) = (header, value) {
            details.insert(
                element_text(&header).replace(':', ""),
                element_text(&value),
            );
        }
    }
    details
}

/// City slugs linked from a country page, sorted and deduplicated.
pub fn parse_cities(html: &str, country: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let prefix = format!("/weather/{country}/");
    let mut cities: Vec<String> = document
        .select(&ANCHOR_SEL)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.starts_with(&prefix))
        .filter_map(|href| {
            let parts: Vec<&str> = href.split('/').collect();
            let city = parts.get(3)?.trim();
            (!city.is_empty() && city != country).then(|| city.to_string())
        })
        .collect();
    cities.sort();
    cities.dedup();
    cities
}

fn minutes_of_day(hhmm: &str) -> Option<i64> {
    let time = NaiveTime::parse_from_str(hhmm, "%H:%M").ok()?;
    Some(i64::from(time.hour() * 60 + time.minute()))
}

/// The row whose time is nearest to `target` (`HH:MM`); the earliest wins a
/// tie. Distances do not wrap around midnight.
pub fn closest_to<'a>(rows: &'a [HistoricObservation], target: &str) -> Option<&'a HistoricObservation> {
    let target = minutes_of_day(target)?;
    rows.iter()
        .filter_map(|r| minutes_of_day(&r.time).map(|m| (r, (m - target).abs())))
        .min_by_key(|(_, distance)| *distance)
        .map(|(r, _)| r)
}

/// One row per [`RANGE_TARGET_TIMES`] slot, tagged with `day` and the slot.
pub fn select_range_slots(rows: &[HistoricObservation], day: NaiveDate) -> Vec<HistoricObservation> {
    let date = TimestampLayout::FileDate.format_date(day);
    RANGE_TARGET_TIMES
        .iter()
        .filter_map(|target| {
            closest_to(rows, target).map(|row| HistoricObservation {
                date: Some(date.clone()),
                target_time: Some(target.to_string()),
                ..row.clone()
            })
        })
        .collect()
}

/// Keep dated rows at or after `now - 24h`, sorted oldest first.
pub fn filter_last_24h(rows: Vec<HistoricObservation>, now: NaiveDateTime) -> Vec<HistoricObservation> {
    let cutoff = now - Duration::hours(24);
    let mut stamped: Vec<(NaiveDateTime, HistoricObservation)> = rows
        .into_iter()
        .filter_map(|row| {
            let stamp = format!("{} {}", row.date.as_deref()?, row.time);
            let at = NaiveDateTime::parse_from_str(&stamp, "%Y-%m-%d %H:%M").ok()?;
            Some((at, row))
        })
        .filter(|(at, _)| *at >= cutoff)
        .collect();
    stamped.sort_by_key(|(at, _)| *at);
    stamped.into_iter().map(|(_, row)| row).collect()
}

/// Rows whose time lies within `start..=end` (`HH:MM`). A window whose start
/// is after its end wraps past midnight.
///
/// # Errors
///
/// Returns [`PipelineError::Validation`] when either bound is not `HH:MM`.
pub fn filter_by_time_range(
    rows: &[HistoricObservation],
    start: &str,
    end: &str,
) -> Result<Vec<HistoricObservation>> {
    let bound = |s: &str| {
        minutes_of_day(s.trim())
            .ok_or_else(|| PipelineError::invalid(format!("Invalid time '{s}'. Use HH:MM (24h).")))
    };
    let (start, end) = (bound(start)?, bound(end)?);
    Ok(rows
        .iter()
        .filter(|r| {
            minutes_of_day(&r.time).is_some_and(|m| {
                if start <= end {
                    m >= start && m <= end
                } else {
                    m >= start || m <= end
                }
            })
        })
        .cloned()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::round_display;

    const CITY_PAGE: &str = r#"<html><body>
        <div id="qlook"><div>Now</div><div class="h2">86&nbsp;°F</div><p>Passing clouds.</p>
        <p>Feels Like: 95&nbsp;°F</p><p>Forecast: 91 / 79&nbsp;°F</p><p>Wind: 7 mph from West</p></div>
        <table class="table table--left table--inner-borders-rows">
          <tr><th>Location:</th><td>Mumbai</td></tr>
          <tr><th>Humidity:</th><td>74%</td></tr>
          <tr><th>Pressure:</th><td>29.77 "Hg</td></tr>
        </table></body></html>"#;

    const HOURLY_PAGE: &str = r#"<html><body>
        <table><tr><td>Unrelated</td><td>1</td><td>2</td></tr></table>
        <table id="wt-hbh">
          <thead><tr><th>Time</th><th></th><th>Temp</th><th>Weather</th></tr></thead>
          <tbody>
            <tr><th>1:00 pm<br>Mon</th><td><img></td><td>86 °F</td><td>Passing clouds.</td></tr>
            <tr><th>2:00 pm</th><td><img></td><td>88 °F</td><td>Scattered clouds and a very long tail.</td></tr>
            <tr><th>3:00 pm</th><td><img></td><td>88 °F</td><td>Sunny.</td></tr>
            <tr><th>4:00 pm</th><td><img></td><td>86 °F</td><td>Sunny.</td></tr>
            <tr><th>12:00 am</th><td><img></td><td>79 °F</td><td>Clear.</td></tr>
          </tbody>
        </table></body></html>"#;

    const HISTORIC_PAGE: &str = r#"<html><body>
        <table id="wt-his">
          <thead>
            <tr><th colspan="2"></th><th colspan="3">Conditions</th><th colspan="3">Comfort</th></tr>
            <tr><th>Time</th><th></th><th>Temp</th><th>Weather</th><th>Wind</th><th>Humidity</th><th>Barometer</th><th>Visibility</th></tr>
          </thead>
          <tbody>
            <tr><th>12:00 pm</th><td></td><td>30 °C</td><td>Sunny.</td><td>9 km/h</td><td>55%</td><td>1009 mbar</td><td>N/A</td></tr>
            <tr><th>6:00 am</th><td></td><td>26 °C</td><td>Fog.</td><td>No wind</td><td>89%</td><td>1011 mbar</td><td>2 km</td></tr>
            <tr><td colspan="8">Weather by CustomWeather, © 2025</td></tr>
            <tr><th>6:30 pm</th><td></td><td>28 °C</td><td>Passing clouds.</td><td>11 km/h</td><td>70%</td><td>1008 mbar</td><td></td></tr>
          </tbody>
        </table></body></html>"#;

    fn obs(date: Option<&str>, time: &str) -> HistoricObservation {
        HistoricObservation {
            date: date.map(str::to_string),
            time: time.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_report_from_fixture() {
        let report = parse_report(CITY_PAGE, "india", "mumbai", "u", "t".into()).unwrap();
        assert_eq!(report.location, "Mumbai, India");
        assert_eq!(round_display(report.current_temp_c), 30);
        assert_eq!(report.condition.as_deref(), Some("Passing clouds"));
        assert_eq!(report.feels_like_c.map(round_display), Some(35));
        assert_eq!(report.forecast_low_c.map(round_display), Some(26));
        assert_eq!(report.humidity.as_deref(), Some("74%"));
        assert_eq!(report.wind.as_deref(), Some("7 mph from West"));
        assert!(report.hourly_forecast.is_empty());
    }

    #[test]
    fn test_parse_report_without_temperature_fails() {
        let err = parse_report("<p>Maintenance</p>", "india", "pune", "https://x", "t".into()).unwrap_err();
        assert!(matches!(err, PipelineError::Extraction { field: "current temperature", .. }));
    }

    #[test]
    fn test_parse_hourly() {
        let hours = parse_hourly(HOURLY_PAGE);
        assert_eq!(hours.len(), 5);
        assert_eq!(hours[0].time, "13:00");
        assert_eq!(round_display(hours[0].temperature_c), 30);
        assert_eq!(hours[0].condition, "Passing clouds");
        assert_eq!(hours[1].condition.chars().count(), 25);
        assert_eq!(hours[4].time, "00:00");
    }

    #[test]
    fn test_parse_hourly_caps_rows() {
        let rows: String = (0..30)
            .map(|i| format!("<tr><td>{}:00 am</td><td>50 °F</td><td>Clear</td></tr>", i % 12 + 1))
            .collect();
        let html = format!("<table>{rows}</table>");
        assert_eq!(parse_hourly(&html).len(), 24);
    }

    #[test]
    fn test_parse_historic_maps_headers_and_sorts() {
        let rows = parse_historic(HISTORIC_PAGE).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].time, "06:00");
        assert_eq!(rows[0].weather.as_deref(), Some("Fog"));
        assert_eq!(rows[0].humidity_pct, Some(89));
        assert_eq!(rows[0].visibility.as_deref(), Some("2 km"));
        assert_eq!(rows[1].time, "12:00");
        assert_eq!(rows[1].temperature_c, Some(30.0));
        assert_eq!(rows[1].visibility, None);
        assert_eq!(rows[2].time, "18:30");
        assert_eq!(rows[2].barometer.as_deref(), Some("1008 mbar"));
    }

    #[test]
    fn test_parse_historic_temperature_inside_weather() {
        let html = r#"<table class="zebra tb-wt fw">
            <thead><tr><th>Time</th><th>Conditions</th></tr></thead>
            <tbody><tr><td>09:00</td><td>24 °C Light rain.</td></tr></tbody></table>"#;
        let rows = parse_historic(html).unwrap();
        assert_eq!(rows[0].temperature_c, Some(24.0));
        assert_eq!(rows[0].weather.as_deref(), Some("Light rain"));
    }

    #[test]
    fn test_parse_historic_no_data() {
        let html = r#"<table id="wt-his"><thead><tr><th>Time</th><th>Temp</th></tr></thead>
            <tbody><tr><td colspan="2">No data available for this date</td></tr></tbody></table>"#;
        assert!(parse_historic(html).is_none());
        assert!(parse_historic("<p>nothing</p>").is_none());
    }

    #[test]
    fn test_parse_details_table() {
        let details = parse_details_table(CITY_PAGE);
        assert_eq!(details["Location"], "Mumbai");
        assert_eq!(details["Pressure"], "29.77 \"Hg");
    }

    #[test]
    fn test_parse_cities() {
        let html = r#"<a href="/weather/india/pune">Pune</a><a href="/weather/india/agra">Agra</a>
            <a href="/weather/india/pune/ext">Pune 14 day</a><a href="/weather/japan/tokyo">Tokyo</a>
            <a href="/weather/india/">India</a>"#;
        assert_eq!(parse_cities(html, "india"), vec!["agra", "pune"]);
    }

    #[test]
    fn test_select_range_slots() {
        let rows = vec![obs(None, "00:30"), obs(None, "05:00"), obs(None, "07:00"), obs(None, "13:00")];
        let day = NaiveDate::from_ymd_opt(2025, 5, 6).unwrap();
        let picked = select_range_slots(&rows, day);
        let times: Vec<&str> = picked.iter().map(|r| r.time.as_str()).collect();
        // 06:00 is equidistant from 05:00 and 07:00; the earlier row wins.
        assert_eq!(times, vec!["05:00", "13:00", "13:00", "00:30"]);
        assert_eq!(picked[0].date.as_deref(), Some("2025-05-06"));
        assert_eq!(picked[3].target_time.as_deref(), Some("00:00"));
        assert!(select_range_slots(&[], day).is_empty());
    }

    #[test]
    fn test_filter_last_24h() {
        let rows = vec![
            obs(Some("2025-05-06"), "09:00"),
            obs(Some("2025-05-05"), "08:00"),
            obs(Some("2025-05-05"), "11:00"),
            obs(None, "10:00"),
        ];
        let now = NaiveDateTime::parse_from_str("2025-05-06 10:00", "%Y-%m-%d %H:%M").unwrap();
        let kept = filter_last_24h(rows, now);
        let stamps: Vec<String> = kept
            .iter()
            .map(|r| format!("{} {}", r.date.as_deref().unwrap(), r.time))
            .collect();
        assert_eq!(stamps, vec!["2025-05-05 11:00", "2025-05-06 09:00"]);
    }

    #[test]
    fn test_filter_by_time_range_wraps_midnight() {
        let rows = vec![obs(None, "01:00"), obs(None, "12:00"), obs(None, "23:00")];
        let day = filter_by_time_range(&rows, "09:00", "18:00").unwrap();
        assert_eq!(day.len(), 1);
        let night = filter_by_time_range(&rows, "22:00", "02:00").unwrap();
        assert_eq!(night.len(), 2);
        assert!(filter_by_time_range(&rows, "late", "02:00").is_err());
    }

    #[test]
    fn test_city_url_slugs() {
        let scraper = WeatherScraper::new(Client::new(), &WeatherConfig::default(), PathBuf::from("."));
        assert_eq!(
            scraper.city_url("United Kingdom", "New York"),
            "https://www.timeanddate.com/weather/united-kingdom/new-york"
        );
    }
}
