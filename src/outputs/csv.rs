//! CSV exports.
//!
//! Records are flattened into one row per line with fixed headers. This is
//! the only place (besides terminal tables) where absent values become the
//! literal `N/A`.
//!
//! Weather report layout:
//!
//! ```text
//! Type,Location,City,Country,Temperature,Condition,Humidity,Wind,Pressure,Visibility,Timestamp,Time,Notes
//! Current Weather,"Tokyo, Japan",tokyo,japan,22°C,Sunny,40%,N/A,N/A,N/A,2025-05-06T14:30:00+09:00,,
//! Hourly Forecast,"Tokyo, Japan",tokyo,japan,22°C,Sunny,N/A,N/A,N/A,N/A,2025-05-06T14:30:00+09:00,15:00,Forecast data
//! ```

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use tracing::{info, instrument};

use crate::error::Result;
use crate::models::{Headline, HistoricObservation, WeatherReport};
use crate::normalize::format_celsius;
use crate::utils::{NOT_AVAILABLE, or_na};

/// One line of a weather report export.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct WeatherCsvRow {
    #[serde(rename = "Type")]
    pub kind: String,
    pub location: String,
    pub city: String,
    pub country: String,
    pub temperature: String,
    pub condition: String,
    pub humidity: String,
    pub wind: String,
    pub pressure: String,
    pub visibility: String,
    pub timestamp: String,
    pub time: String,
    pub notes: String,
}

/// One line of an observation export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservationCsvRow {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Target_Time")]
    pub target_time: String,
    #[serde(rename = "Time")]
    pub time: String,
    #[serde(rename = "Temperature")]
    pub temperature: String,
    #[serde(rename = "Weather")]
    pub weather: String,
    #[serde(rename = "Wind")]
    pub wind: String,
    #[serde(rename = "Humidity")]
    pub humidity: String,
    #[serde(rename = "Barometer")]
    pub barometer: String,
    #[serde(rename = "Visibility")]
    pub visibility: String,
}

/// Flatten a report: one current-conditions row, then one row per hour.
pub fn weather_rows(report: &WeatherReport) -> Vec<WeatherCsvRow> {
    let current = WeatherCsvRow {
        kind: "Current Weather".to_string(),
        location: report.location.clone(),
        city: report.city.clone(),
        country: report.country.clone(),
        temperature: format_celsius(report.current_temp_c),
        condition: or_na(report.condition.as_deref()),
        humidity: or_na(report.humidity.as_deref()),
        wind: or_na(report.wind.as_deref()),
        pressure: or_na(report.pressure.as_deref()),
        visibility: or_na(report.visibility.as_deref()),
        timestamp: report.timestamp.clone(),
        time: String::new(),
        notes: String::new(),
    };
    let hourly = report.hourly_forecast.iter().map(|hour| WeatherCsvRow {
        kind: "Hourly Forecast".to_string(),
        location: report.location.clone(),
        city: report.city.clone(),
        country: report.country.clone(),
        temperature: format_celsius(hour.temperature_c),
        condition: or_na(Some(hour.condition.as_str())),
        humidity: NOT_AVAILABLE.to_string(),
        wind: NOT_AVAILABLE.to_string(),
        pressure: NOT_AVAILABLE.to_string(),
        visibility: NOT_AVAILABLE.to_string(),
        timestamp: report.timestamp.clone(),
        time: hour.time.clone(),
        notes: "Forecast data".to_string(),
    });
    std::iter::once(current).chain(hourly).collect()
}

pub fn observation_row(obs: &HistoricObservation) -> ObservationCsvRow {
    ObservationCsvRow {
        date: or_na(obs.date.as_deref()),
        target_time: or_na(obs.target_time.as_deref()),
        time: obs.time.clone(),
        temperature: obs
            .temperature_c
            .map(format_celsius)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        weather: or_na(obs.weather.as_deref()),
        wind: or_na(obs.wind.as_deref()),
        humidity: obs
            .humidity_pct
            .map(|h| format!("{h}%"))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        barometer: or_na(obs.barometer.as_deref()),
        visibility: or_na(obs.visibility.as_deref()),
    }
}

/// Serialize rows to CSV text with a header line.
pub fn render<T: Serialize>(rows: impl IntoIterator<Item = T>) -> Result<String> {
    let mut writer = ::csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

async fn write_csv(dir: &Path, stem: &str, contents: String) -> Result<PathBuf> {
    fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{stem}.csv"));
    fs::write(&path, contents).await?;
    info!(path = %path.display(), "Wrote CSV");
    Ok(path)
}

#[instrument(level = "info", skip_all, fields(dir = %dir.display(), %stem))]
pub async fn write_weather_csv(dir: &Path, stem: &str, report: &WeatherReport) -> Result<PathBuf> {
    write_csv(dir, stem, render(weather_rows(report))?).await
}

#[instrument(level = "info", skip_all, fields(dir = %dir.display(), %stem, rows = rows.len()))]
pub async fn write_observations_csv(dir: &Path, stem: &str, rows: &[HistoricObservation]) -> Result<PathBuf> {
    write_csv(dir, stem, render(rows.iter().map(observation_row))?).await
}

#[instrument(level = "info", skip_all, fields(dir = %dir.display(), %stem, rows = headlines.len()))]
pub async fn write_headlines_csv(dir: &Path, stem: &str, headlines: &[Headline]) -> Result<PathBuf> {
    write_csv(dir, stem, render(headlines)?).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HourlyForecast;

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
            humidity: Some("40%".into()),
            wind: None,
            pressure: None,
            visibility: None,
            hourly_forecast: vec![HourlyForecast {
                time: "15:00".into(),
                temperature_c: 22.2,
                condition: "Sunny".into(),
            }],
            timestamp: "2025-05-06T14:30:00+09:00".into(),
        }
    }

    #[test]
    fn weather_csv_layout() {
        let text = render(weather_rows(&report())).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Type,Location,City,Country,Temperature,Condition,Humidity,Wind,Pressure,Visibility,Timestamp,Time,Notes"
        );
        assert_eq!(
            lines[1],
            "Current Weather,\"Tokyo, Japan\",tokyo,japan,22°C,Sunny,40%,N/A,N/A,N/A,2025-05-06T14:30:00+09:00,,"
        );
        assert!(lines[2].starts_with("Hourly Forecast,"));
        assert!(lines[2].ends_with(",15:00,Forecast data"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn observation_rows_fill_placeholders() {
        let obs = HistoricObservation {
            date: Some("2025-05-06".into()),
            time: "06:00".into(),
            temperature_c: Some(26.0),
            humidity_pct: Some(89),
            ..Default::default()
        };
        let text = render([observation_row(&obs)]).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Date,Target_Time,Time,Temperature,Weather,Wind,Humidity,Barometer,Visibility");
        assert_eq!(lines[1], "2025-05-06,N/A,06:00,26°C,N/A,N/A,89%,N/A,N/A");
    }

    #[test]
    fn headline_columns() {
        let headlines = vec![Headline {
            title: "Summit ends".into(),
            link: "https://www.bbc.com/news/world-1".into(),
            scraped_at: "06-05-2025 14:30:00".into(),
        }];
        let text = render(&headlines).unwrap();
        assert!(text.starts_with("title,Link,Scraped_At\n"));
    }
}
