//! Record types produced and consumed by the pipelines.
//!
//! Each pipeline has its own shape; nothing here is shared between them:
//! - [`Beer`] and its ingredient sub-records, decoded from the Punk API
//! - [`CurrentConditions`], decoded from the weatherstack API
//! - [`WeatherReport`], [`HourlyForecast`] and [`HistoricObservation`],
//!   scraped from timeanddate.com
//! - [`Headline`], scraped from the news front page
//! - [`Task`], [`JournalEntry`] and [`IndexEntry`], kept in local files
//!
//! Fields the source may omit are `Option`s. The `"N/A"` placeholder only
//! exists at the CSV and terminal boundaries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::PipelineError;

/// A beer as returned by the Punk API.
///
/// `id` is the natural key used for deduplication in the database. The
/// ingredient collections become child rows keyed by the same identifier.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Beer {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tagline: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub first_brewed: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    /// Alcohol by volume, percent.
    #[serde(default)]
    pub abv: Option<f64>,
    /// International bitterness units.
    #[serde(default)]
    pub ibu: Option<f64>,
    /// European brewery convention colour.
    #[serde(default)]
    pub ebc: Option<f64>,
    #[serde(default)]
    pub ph: Option<f64>,
    #[serde(default)]
    pub brewers_tips: Option<String>,
    #[serde(default)]
    pub contributed_by: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ingredients: Ingredients,
    #[serde(default, deserialize_with = "null_as_default")]
    pub food_pairing: Vec<String>,
}

/// Treat an explicit JSON `null` like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Ingredients {
    #[serde(default, deserialize_with = "null_as_default")]
    pub malt: Vec<Malt>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hops: Vec<Hop>,
    #[serde(default)]
    pub yeast: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Malt {
    pub name: Option<String>,
    #[serde(default)]
    pub amount: Option<Amount>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Hop {
    pub name: Option<String>,
    #[serde(default)]
    pub amount: Option<Amount>,
    /// Brewing stage the hop is added at ("start", "middle", "end", ...).
    #[serde(default)]
    pub add: Option<String>,
    #[serde(default)]
    pub attribute: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Amount {
    pub value: Option<f64>,
    pub unit: Option<String>,
}

/// Response body of the weatherstack `current` endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CurrentConditions {
    pub location: StackLocation,
    pub current: StackCurrent,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StackLocation {
    pub name: String,
    /// Local time at the location, `YYYY-MM-DD HH:MM`.
    pub localtime: String,
    pub utc_offset: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StackCurrent {
    pub temperature: f64,
    #[serde(default)]
    pub weather_descriptions: Vec<String>,
    pub wind_speed: f64,
}

impl CurrentConditions {
    /// The first weather description, if the API supplied any.
    pub fn description(&self) -> Option<&str> {
        self.current.weather_descriptions.first().map(String::as_str)
    }
}

/// Current conditions scraped from a timeanddate.com city page.
///
/// A report is a snapshot: it is created on every fetch and never updated.
/// `current_temp_c` is the only mandatory reading; a page without it does
/// not produce a report at all.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WeatherReport {
    /// Display name, `"City, Country"`.
    pub location: String,
    pub country: String,
    pub city: String,
    pub current_temp_c: f64,
    pub condition: Option<String>,
    pub feels_like_c: Option<f64>,
    pub forecast_high_c: Option<f64>,
    pub forecast_low_c: Option<f64>,
    pub humidity: Option<String>,
    pub wind: Option<String>,
    pub pressure: Option<String>,
    pub visibility: Option<String>,
    #[serde(default)]
    pub hourly_forecast: Vec<HourlyForecast>,
    /// ISO-8601 time the report was scraped.
    pub timestamp: String,
}

/// One row of the hourly forecast table.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HourlyForecast {
    /// 24-hour `HH:MM`.
    pub time: String,
    pub temperature_c: f64,
    pub condition: String,
}

/// One row of a historic weather table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct HistoricObservation {
    /// `YYYY-MM-DD`, filled in by range and 24-hour queries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Target slot (`06:00`, `12:00`, ...) for date-range queries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_time: Option<String>,
    /// 24-hour `HH:MM`.
    pub time: String,
    pub temperature_c: Option<f64>,
    pub weather: Option<String>,
    pub wind: Option<String>,
    pub humidity_pct: Option<u8>,
    pub barometer: Option<String>,
    pub visibility: Option<String>,
}

/// A news headline with its absolute link.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Headline {
    pub title: String,
    #[serde(rename = "Link")]
    pub link: String,
    /// `DD-MM-YYYY HH:mm:ss`.
    #[serde(rename = "Scraped_At")]
    pub scraped_at: String,
}

/// A to-do item. Its key lives in the surrounding map.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Task {
    pub task: String,
    pub status: TaskStatus,
    /// Creation time, `DD-MM-YYYY HH:mm`.
    pub datetime: String,
}

/// The two states a task can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
}

impl TaskStatus {
    /// The other state.
    pub fn toggled(self) -> Self {
        match self {
            Self::Pending => Self::Completed,
            Self::Completed => Self::Pending,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Completed => f.write_str("completed"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            other => Err(PipelineError::invalid(format!(
                "unknown status '{other}' (expected pending or completed)"
            ))),
        }
    }
}

/// A journal entry stored in a per-topic JSON or CSV file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct JournalEntry {
    /// ISO-8601, used for chronological ordering.
    pub timestamp: String,
    pub message: String,
}

/// Bookkeeping for one file tracked by an index.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IndexEntry {
    pub created_at: String,
    pub last_modified: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const BEER_JSON: &str = r#"{
        "id": 1,
        "name": "Buzz",
        "tagline": "A Real Bitter Experience.",
        "first_brewed": "09/2007",
        "description": "A light, crisp and bitter IPA.",
        "image": "1.png",
        "abv": 4.5,
        "ibu": 60,
        "ebc": 20,
        "ph": 4.4,
        "ingredients": {
            "malt": [{"name": "Maris Otter Extra Pale", "amount": {"value": 3.3, "unit": "kilograms"}}],
            "hops": [{"name": "Fuggles", "amount": {"value": 25, "unit": "grams"}, "add": "start", "attribute": "bitter"}],
            "yeast": "Wyeast 1056 - American Ale"
        },
        "food_pairing": ["Spicy chicken tikka masala", "Grilled chicken quesadilla"],
        "brewers_tips": "The earthy and floral aromas.",
        "contributed_by": "Sam Mason <samjbmason>"
    }"#;

    #[test]
    fn test_beer_deserialization() {
        let beer: Beer = serde_json::from_str(BEER_JSON).unwrap();
        assert_eq!(beer.id, 1);
        assert_eq!(beer.name, "Buzz");
        assert_eq!(beer.ibu, Some(60.0));
        assert_eq!(beer.ingredients.malt.len(), 1);
        assert_eq!(beer.ingredients.hops[0].add.as_deref(), Some("start"));
        assert_eq!(beer.ingredients.yeast.as_deref(), Some("Wyeast 1056 - American Ale"));
        assert_eq!(beer.food_pairing.len(), 2);
    }

    #[test]
    fn test_null_fields_keep_the_page() {
        let page = r#"[
            {"id": 1, "name": "Buzz", "tagline": null, "first_brewed": "09/2007",
             "ingredients": {"malt": null, "hops": [], "yeast": null}, "food_pairing": null},
            {"id": 2, "name": null, "tagline": "You Know You Shouldn't"}
        ]"#;
        let beers: Vec<Beer> = serde_json::from_str(page).unwrap();
        assert_eq!(beers.len(), 2);
        assert_eq!(beers[0].tagline, "");
        assert!(beers[0].ingredients.malt.is_empty());
        assert!(beers[0].food_pairing.is_empty());
        assert_eq!(beers[1].name, "");
        assert_eq!(beers[1].tagline, "You Know You Shouldn't");
    }

    #[test]
    fn test_beer_with_missing_optionals() {
        let beer: Beer = serde_json::from_str(r#"{"id": 7, "name": "Bare", "abv": null}"#).unwrap();
        assert_eq!(beer.abv, None);
        assert!(beer.ingredients.malt.is_empty());
        assert!(beer.ingredients.yeast.is_none());
        assert!(beer.food_pairing.is_empty());
    }

    #[test]
    fn test_current_conditions_description() {
        let json = r#"{
            "location": {"name": "Mumbai", "localtime": "2025-09-09 10:30", "utc_offset": "5.5"},
            "current": {"temperature": 29, "weather_descriptions": ["Haze"], "wind_speed": 11}
        }"#;
        let conditions: CurrentConditions = serde_json::from_str(json).unwrap();
        assert_eq!(conditions.description(), Some("Haze"));
        assert_eq!(conditions.location.utc_offset, "5.5");
    }

    #[test]
    fn test_task_status_serialization() {
        let task = Task {
            task: "Water plants".to_string(),
            status: TaskStatus::Completed,
            datetime: "06-05-2025 14:30".to_string(),
        };
        let json = serde_json::to_string(&task).unwrap();
        assert!(json.contains(r#""status":"completed""#));
    }

    #[test]
    fn test_task_status_parse_and_toggle() {
        assert_eq!("Pending".parse::<TaskStatus>().unwrap(), TaskStatus::Pending);
        assert!("archived".parse::<TaskStatus>().is_err());
        assert_eq!(TaskStatus::Pending.toggled(), TaskStatus::Completed);
        assert_eq!(TaskStatus::Completed.toggled(), TaskStatus::Pending);
    }

    #[test]
    fn test_headline_uses_original_column_names() {
        let headline = Headline {
            title: "Story".to_string(),
            link: "https://www.bbc.com/news/articles/abc".to_string(),
            scraped_at: "06-05-2025 14:30:00".to_string(),
        };
        let json = serde_json::to_string(&headline).unwrap();
        assert!(json.contains(r#""Link""#));
        assert!(json.contains(r#""Scraped_At""#));
    }

    #[test]
    fn test_historic_observation_skips_empty_date() {
        let obs = HistoricObservation {
            time: "06:00".to_string(),
            temperature_c: Some(21.0),
            ..Default::default()
        };
        let json = serde_json::to_string(&obs).unwrap();
        assert!(!json.contains("date"));
        assert!(json.contains(r#""time":"06:00""#));
    }
}
