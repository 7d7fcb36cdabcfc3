//! Weather session state shared by the weather commands and menu.
//!
//! A [`WeatherSession`] holds the scraper, the current location and the
//! most recent result, so "save" and "statistics" act on whatever was
//! fetched last.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use tracing::{info, instrument};

use crate::display;
use crate::error::{PipelineError, Result};
use crate::models::{HistoricObservation, WeatherReport};
use crate::normalize::{TimestampLayout, generate_filename, validate_date_range};
use crate::outputs::indexes::{FileIndex, INDEX_FILE};
use crate::outputs::{SaveFormat, csv, json};
use crate::scrapers::weather::WeatherScraper;
use crate::stats::WeatherStats;

/// Which query produced a set of observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationKind {
    Historic,
    Range,
    Last24h,
}

impl ObservationKind {
    /// Filename suffix for saved files.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Historic => "historic",
            Self::Range => "range",
            Self::Last24h => "24h",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Historic => "Historic weather",
            Self::Range => "Weather range",
            Self::Last24h => "Last 24 hours",
        }
    }
}

/// The most recent fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum LastResult {
    Report(WeatherReport),
    Observations {
        kind: ObservationKind,
        /// First day covered; used in the saved filename.
        date: NaiveDate,
        rows: Vec<HistoricObservation>,
    },
}

#[derive(Debug)]
pub struct WeatherSession {
    scraper: WeatherScraper,
    data_dir: PathBuf,
    country: String,
    city: String,
    last: Option<LastResult>,
}

impl WeatherSession {
    pub fn new(scraper: WeatherScraper, data_dir: &Path, country: &str, city: &str) -> Self {
        Self {
            scraper,
            data_dir: data_dir.to_path_buf(),
            country: country.to_string(),
            city: city.to_string(),
            last: None,
        }
    }

    pub fn scraper(&self) -> &WeatherScraper {
        &self.scraper
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    /// `"City, Country"` as entered.
    pub fn location(&self) -> String {
        format!("{}, {}", self.city, self.country)
    }

    /// Switch location; the last result is kept until the next fetch.
    pub fn set_location(&mut self, country: &str, city: &str) {
        self.country = country.to_string();
        self.city = city.to_string();
        info!(%country, %city, "Location changed");
    }

    pub fn last(&self) -> Option<&LastResult> {
        self.last.as_ref()
    }

    pub fn remember(&mut self, result: LastResult) {
        self.last = Some(result);
    }

    /// Current conditions and hourly forecast.
    pub async fn today(&mut self) -> Result<WeatherReport> {
        let report = self.scraper.fetch_report(&self.country, &self.city).await?;
        self.last = Some(LastResult::Report(report.clone()));
        Ok(report)
    }

    pub async fn historic(&mut self, date: NaiveDate) -> &[HistoricObservation] {
        let rows = self.scraper.fetch_historic(&self.country, &self.city, date).await;
        self.store_rows(ObservationKind::Historic, date, rows)
    }

    /// Observations at the four daily slots for `start..=end`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Validation`] for a reversed range or one the
    /// source does not serve.
    pub async fn range(&mut self, start: NaiveDate, end: NaiveDate) -> Result<&[HistoricObservation]> {
        validate_date_range(start, end, Local::now().date_naive())?;
        let rows = self.scraper.fetch_range(&self.country, &self.city, start, end).await;
        Ok(self.store_rows(ObservationKind::Range, start, rows))
    }

    pub async fn last_24h(&mut self) -> &[HistoricObservation] {
        let now = Local::now();
        let rows = self.scraper.fetch_last_24h(&self.country, &self.city, now).await;
        self.store_rows(ObservationKind::Last24h, now.date_naive(), rows)
    }

    fn store_rows(
        &mut self,
        kind: ObservationKind,
        date: NaiveDate,
        rows: Vec<HistoricObservation>,
    ) -> &[HistoricObservation] {
        match self.last.insert(LastResult::Observations { kind, date, rows }) {
            LastResult::Observations { rows, .. } => rows,
            LastResult::Report(_) => &[],
        }
    }

    /// Statistics over the last result.
    pub fn stats(&self) -> Option<WeatherStats> {
        match self.last.as_ref()? {
            LastResult::Report(report) => Some(WeatherStats::from_forecast(&report.hourly_forecast)),
            LastResult::Observations { rows, .. } => Some(WeatherStats::from_observations(rows)),
        }
    }

    /// Terminal rendering of the last result.
    pub fn render_last(&self) -> Option<String> {
        Some(match self.last.as_ref()? {
            LastResult::Report(report) => display::weather_report(report),
            LastResult::Observations { kind, rows, .. } => {
                display::observations(&format!("{}, {}", kind.title(), self.location()), rows)
            }
        })
    }

    /// Filename stem the last result would be saved under.
    pub fn save_stem(&self) -> Option<String> {
        Some(match self.last.as_ref()? {
            LastResult::Report(_) => generate_filename(&self.city, None, ""),
            LastResult::Observations { kind, date, .. } => {
                let date = TimestampLayout::FileDate.format_date(*date);
                generate_filename(&self.city, Some(&date), kind.suffix())
            }
        })
    }

    /// Write the last result to the data directory and record it in the
    /// index.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Validation`] when nothing has been fetched
    /// yet, plus any write error.
    #[instrument(level = "info", skip(self), fields(data_dir = %self.data_dir.display()))]
    pub async fn save(&self, format: SaveFormat) -> Result<PathBuf> {
        let (Some(last), Some(stem)) = (self.last.as_ref(), self.save_stem()) else {
            return Err(PipelineError::invalid("Nothing to save yet; fetch some weather first"));
        };
        let dir = self.data_dir.as_path();
        let path = match (last, format) {
            (LastResult::Report(report), SaveFormat::Json) => {
                json::write_snapshot(dir, &stem, report).await?
            }
            (LastResult::Report(report), SaveFormat::Csv) => {
                csv::write_weather_csv(dir, &stem, report).await?
            }
            (LastResult::Observations { rows, .. }, SaveFormat::Json) => {
                json::write_json_array(dir, &stem, rows).await?
            }
            (LastResult::Observations { rows, .. }, SaveFormat::Csv) => {
                csv::write_observations_csv(dir, &stem, rows).await?
            }
        };
        record_saved(dir, &path).await?;
        Ok(path)
    }
}

/// Touch `path` in the data directory's index.
pub async fn record_saved(dir: &Path, path: &Path) -> Result<()> {
    let index_path = dir.join(INDEX_FILE);
    let mut index = FileIndex::load(&index_path).await;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if index.touch(&name, &TimestampLayout::Iso8601.format(&Local::now())) {
        info!(file = %name, "Indexed new file");
    }
    index.save(&index_path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeatherConfig;
    use crate::models::HourlyForecast;
    use tempfile::TempDir;

    fn session(dir: &Path) -> WeatherSession {
        let scraper = WeatherScraper::new(
            reqwest::Client::new(),
            &WeatherConfig::default(),
            dir.to_path_buf(),
        );
        WeatherSession::new(scraper, dir, "japan", "tokyo")
    }

    fn report() -> WeatherReport {
        WeatherReport {
            location: "Tokyo, Japan".into(),
            country: "japan".into(),
            city: "tokyo".into(),
            current_temp_c: 21.7,
            condition: Some("Sunny".into()),
            feels_like_c: None,
            forecast_high_c: None,
            forecast_low_c: None,
            humidity: None,
            wind: None,
            pressure: None,
            visibility: None,
            hourly_forecast: vec![HourlyForecast {
                time: "15:00".into(),
                temperature_c: 22.0,
                condition: "Sunny".into(),
            }],
            timestamp: "2025-05-06T14:30:00+09:00".into(),
        }
    }

    #[tokio::test]
    async fn save_requires_a_result() {
        let dir = TempDir::new().unwrap();
        let s = session(dir.path());
        assert!(matches!(
            s.save(SaveFormat::Json).await,
            Err(PipelineError::Validation(_))
        ));
        assert!(s.stats().is_none());
        assert!(s.render_last().is_none());
    }

    #[tokio::test]
    async fn observations_save_under_dated_stem_and_index() {
        let dir = TempDir::new().unwrap();
        let mut s = session(dir.path());
        s.remember(LastResult::Observations {
            kind: ObservationKind::Range,
            date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            rows: vec![HistoricObservation {
                time: "06:00".into(),
                temperature_c: Some(18.0),
                ..Default::default()
            }],
        });
        assert_eq!(s.save_stem().unwrap(), "tokyo_2025-05-01_range");

        let path = s.save(SaveFormat::Csv).await.unwrap();
        assert!(path.ends_with("tokyo_2025-05-01_range.csv"));
        let index = FileIndex::load(&dir.path().join(INDEX_FILE)).await;
        assert!(index.get("tokyo_2025-05-01_range.csv").is_some());

        let stats = s.stats().unwrap();
        assert_eq!(stats.temperature.unwrap().avg, 18.0);
    }

    #[tokio::test]
    async fn report_saves_as_snapshot() {
        let dir = TempDir::new().unwrap();
        let mut s = session(dir.path());
        s.remember(LastResult::Report(report()));
        let path = s.save(SaveFormat::Json).await.unwrap();
        let loaded: WeatherReport = json::read_snapshot(&path).await.unwrap();
        assert_eq!(loaded, report());
        assert!(s.render_last().unwrap().contains("Weather for Tokyo, Japan"));
    }

    #[test]
    fn location_changes() {
        let dir = TempDir::new().unwrap();
        let mut s = session(dir.path());
        s.set_location("uk", "london");
        assert_eq!(s.location(), "london, uk");
        assert_eq!(s.country(), "uk");
    }
}
