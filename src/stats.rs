//! Summary statistics over scraped weather observations.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{HistoricObservation, HourlyForecast};
use crate::normalize::round_stat;

/// Average, minimum and maximum of a numeric series, one decimal each.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl Summary {
    /// `None` for an empty series.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let sum: f64 = values.iter().sum();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Self {
            avg: round_stat(sum / values.len() as f64),
            min: round_stat(min),
            max: round_stat(max),
            count: values.len(),
        })
    }

    /// Spread between the warmest and coldest reading.
    pub fn range(&self) -> f64 {
        round_stat(self.max - self.min)
    }
}

/// Frequency of each observed condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionSummary {
    /// Most frequent condition; ties go to the alphabetically first.
    pub most_common: String,
    pub counts: BTreeMap<String, usize>,
}

impl ConditionSummary {
    pub fn from_conditions<'a>(conditions: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for c in conditions {
            *counts.entry(c.to_string()).or_default() += 1;
        }
        let mut best: Option<(&String, usize)> = None;
        for (name, &n) in &counts {
            if best.is_none_or(|(_, top)| n > top) {
                best = Some((name, n));
            }
        }
        let most_common = best?.0.clone();
        Some(Self { most_common, counts })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeatherStats {
    pub temperature: Option<Summary>,
    pub humidity: Option<Summary>,
    pub weather: Option<ConditionSummary>,
}

impl WeatherStats {
    /// Statistics over a set of historic observations.
    pub fn from_observations(rows: &[HistoricObservation]) -> Self {
        let temps: Vec<f64> = rows.iter().filter_map(|r| r.temperature_c).collect();
        let humidity: Vec<f64> = rows
            .iter()
            .filter_map(|r| r.humidity_pct.map(f64::from))
            .collect();
        Self {
            temperature: Summary::from_values(&temps),
            humidity: Summary::from_values(&humidity),
            weather: ConditionSummary::from_conditions(
                rows.iter().filter_map(|r| r.weather.as_deref()),
            ),
        }
    }

    /// Statistics over an hourly forecast.
    pub fn from_forecast(hours: &[HourlyForecast]) -> Self {
        let temps: Vec<f64> = hours.iter().map(|h| h.temperature_c).collect();
        Self {
            temperature: Summary::from_values(&temps),
            humidity: None,
            weather: ConditionSummary::from_conditions(hours.iter().map(|h| h.condition.as_str())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.humidity.is_none() && self.weather.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(time: &str, temp: Option<f64>, weather: Option<&str>, humidity: Option<u8>) -> HistoricObservation {
        HistoricObservation {
            time: time.to_string(),
            temperature_c: temp,
            weather: weather.map(str::to_string),
            humidity_pct: humidity,
            ..Default::default()
        }
    }

    #[test]
    fn test_summary_rounds_to_one_decimal() {
        let s = Summary::from_values(&[20.0, 21.0, 23.5]).unwrap();
        assert_eq!(s.avg, 21.5);
        assert_eq!(s.min, 20.0);
        assert_eq!(s.max, 23.5);
        assert_eq!(s.count, 3);
        assert_eq!(s.range(), 3.5);
        assert!(Summary::from_values(&[]).is_none());
    }

    #[test]
    fn test_conditions_tie_breaks_alphabetically() {
        let c = ConditionSummary::from_conditions(["Sunny", "Clear", "Sunny", "Clear"]).unwrap();
        assert_eq!(c.most_common, "Clear");
        assert_eq!(c.counts["Sunny"], 2);
    }

    #[test]
    fn test_stats_skip_missing_values() {
        let rows = vec![
            obs("00:00", Some(18.0), Some("Clear"), Some(80)),
            obs("06:00", None, Some("Fog"), None),
            obs("12:00", Some(26.0), Some("Clear"), Some(40)),
        ];
        let stats = WeatherStats::from_observations(&rows);
        assert_eq!(stats.temperature.unwrap().avg, 22.0);
        assert_eq!(stats.humidity.unwrap().count, 2);
        assert_eq!(stats.weather.unwrap().most_common, "Clear");
    }

    #[test]
    fn test_empty_rows_give_empty_stats() {
        assert!(WeatherStats::from_observations(&[]).is_empty());
    }
}
