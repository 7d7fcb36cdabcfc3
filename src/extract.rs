//! Field extraction from scraped HTML with ordered fallback strategies.
//!
//! Source markup is unstable, so each field is read by a [`FallbackChain`]:
//! an ordered list of named, pure strategies `fn(&Page) -> Option<T>`. The
//! first strategy that returns `Some` wins. When every strategy misses, the
//! field is absent; only the caller decides whether that is fatal.
//!
//! # Chains
//!
//! | Field | Strategies, in order |
//! |-------|----------------------|
//! | current temperature | `now-label`, `document-scan`, `element-scan` |
//! | condition | `after-temperature`, `known-phrase`, `sentence` |
//!
//! The remaining fields (feels-like, forecast, humidity, wind, pressure,
//! visibility) each have a single labelled pattern.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::normalize::fahrenheit_to_celsius;
use crate::utils::ellipsize;

/// A parsed page: the DOM plus its visible text, one text node per line.
pub struct Page {
    pub document: Html,
    pub text: String,
}

impl Page {
    pub fn parse(html: &str) -> Self {
        let document = Html::parse_document(html);
        let text = visible_text(&document);
        Self { document, text }
    }
}

/// Text of every node outside `script`/`style`, trimmed, joined by newlines.
fn visible_text(document: &Html) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let in_code = node
            .parent()
            .and_then(|p| p.value().as_element().map(|e| e.name().to_string()))
            .is_some_and(|name| matches!(name.as_str(), "script" | "style" | "noscript"));
        if in_code {
            continue;
        }
        let t = text.trim();
        if !t.is_empty() {
            parts.push(t);
        }
    }
    parts.join("\n")
}

/// Text content of an element with each text node trimmed and joined by a
/// single space.
pub fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// A single extraction attempt.
pub type Strategy<T> = fn(&Page) -> Option<T>;

/// Ordered strategies for one field; the first success is used.
pub struct FallbackChain<T> {
    field: &'static str,
    strategies: Vec<(&'static str, Strategy<T>)>,
}

impl<T> FallbackChain<T> {
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            strategies: Vec::new(),
        }
    }

    /// Append a strategy to the end of the chain.
    pub fn then(mut self, name: &'static str, strategy: Strategy<T>) -> Self {
        self.strategies.push((name, strategy));
        self
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Strategy names in the order they are tried.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|(name, _)| *name).collect()
    }

    /// Run the chain, returning the first strategy's hit.
    pub fn extract(&self, page: &Page) -> Option<T> {
        for (name, strategy) in &self.strategies {
            if let Some(value) = strategy(page) {
                debug!(field = self.field, strategy = name, "Field extracted");
                return Some(value);
            }
        }
        debug!(field = self.field, tried = ?self.strategy_names(), "No strategy matched");
        None
    }
}

static NOW_TEMP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Now\s*(-?\d+)\s*°\s*([FC])").unwrap());
static ANY_TEMP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(-?\d+)\s*°\s*([FC])").unwrap());
static TEMP_THEN_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+\s*°\s*[FC]\s([^\n\r]{1,30})").unwrap());
static SENTENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Z][a-z]+ [a-z]+)\.").unwrap());
static FEELS_LIKE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Feels Like[:\s]+(-?\d+)\s*°\s*([FC])").unwrap());
static FORECAST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Forecast[:\s]+(-?\d+)\s*/\s*(-?\d+)\s*°\s*([FC])").unwrap());
static HUMIDITY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Humidity[:\s]+(\d+%)").unwrap());
static WIND_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Wind[:\s]+([^\n\r]{1,50})").unwrap());
static PRESSURE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)Pressure[:\s]+([\d.]+ (?:"Hg|mbar|hPa))"#).unwrap());
static VISIBILITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Visibility[:\s]+([^\n\r]{1,20})").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Condition phrases used on timeanddate.com, most specific first.
const KNOWN_CONDITIONS: [&str; 20] = [
    "Passing clouds",
    "Partly cloudy",
    "Broken clouds",
    "Scattered clouds",
    "Mostly sunny",
    "Mostly cloudy",
    "Light rain",
    "Heavy rain",
    "Thunderstorm",
    "Overcast",
    "Drizzle",
    "Showers",
    "Cloudy",
    "Sunny",
    "Clear",
    "Rain",
    "Snow",
    "Fog",
    "Mist",
    "Fair",
];

const ELEMENT_SCAN_TAGS: [&str; 4] = ["h2", "h3", "div", "span"];

/// Convert a captured `(value, unit)` pair to Celsius.
fn to_celsius(value: &str, unit: &str) -> Option<f64> {
    let v: f64 = value.parse().ok()?;
    Some(if unit.eq_ignore_ascii_case("F") {
        fahrenheit_to_celsius(v)
    } else {
        v
    })
}

/// A current reading is plausible between 30 °F and 120 °F, or between
/// -1 °C and 49 °C. The bound is checked in the unit the page used.
fn plausible(value: &str, unit: &str) -> Option<f64> {
    let v: f64 = value.parse().ok()?;
    let in_range = if unit.eq_ignore_ascii_case("F") {
        (30.0..=120.0).contains(&v)
    } else {
        (-1.0..=49.0).contains(&v)
    };
    if in_range { to_celsius(value, unit) } else { None }
}

fn first_plausible(text: &str) -> Option<f64> {
    ANY_TEMP_RE
        .captures_iter(text)
        .find_map(|c| plausible(&c[1], &c[2]))
}

/// `Now` label immediately followed by a temperature.
pub fn temp_now_label(page: &Page) -> Option<f64> {
    let caps = NOW_TEMP_RE.captures(&page.text)?;
    to_celsius(&caps[1], &caps[2])
}

/// First temperature anywhere in the page within the plausible range.
pub fn temp_document_scan(page: &Page) -> Option<f64> {
    first_plausible(&page.text)
}

/// First plausible temperature inside a heading, `div` or `span`.
pub fn temp_element_scan(page: &Page) -> Option<f64> {
    for tag in ELEMENT_SCAN_TAGS {
        let Ok(selector) = Selector::parse(tag) else {
            continue;
        };
        for element in page.document.select(&selector) {
            if let Some(c) = first_plausible(&element.text().collect::<String>()) {
                return Some(c);
            }
        }
    }
    None
}

/// Current temperature in Celsius.
pub fn temperature_chain() -> FallbackChain<f64> {
    FallbackChain::new("current temperature")
        .then("now-label", temp_now_label)
        .then("document-scan", temp_document_scan)
        .then("element-scan", temp_element_scan)
}

/// A known condition on the line right after a temperature.
pub fn condition_after_temperature(page: &Page) -> Option<String> {
    TEMP_THEN_LINE_RE.captures_iter(&page.text).find_map(|caps| {
        let area = caps.get(1)?.as_str();
        KNOWN_CONDITIONS
            .iter()
            .find(|c| area.contains(*c))
            .map(|c| c.to_string())
    })
}

/// A known condition anywhere in the page.
pub fn condition_known_phrase(page: &Page) -> Option<String> {
    KNOWN_CONDITIONS
        .iter()
        .find(|c| page.text.contains(*c))
        .map(|c| c.to_string())
}

/// A short capitalised phrase ending in a full stop, e.g. `Passing clouds.`
pub fn condition_sentence(page: &Page) -> Option<String> {
    let caps = SENTENCE_RE.captures(&page.text)?;
    let phrase = caps[1].trim();
    (phrase.len() < 30).then(|| phrase.to_string())
}

pub fn condition_chain() -> FallbackChain<String> {
    FallbackChain::new("condition")
        .then("after-temperature", condition_after_temperature)
        .then("known-phrase", condition_known_phrase)
        .then("sentence", condition_sentence)
}

pub fn feels_like(page: &Page) -> Option<f64> {
    let caps = FEELS_LIKE_RE.captures(&page.text)?;
    to_celsius(&caps[1], &caps[2])
}

/// Forecast `(high, low)` in Celsius.
pub fn forecast_high_low(page: &Page) -> Option<(f64, f64)> {
    let caps = FORECAST_RE.captures(&page.text)?;
    Some((to_celsius(&caps[1], &caps[3])?, to_celsius(&caps[2], &caps[3])?))
}

pub fn humidity(page: &Page) -> Option<String> {
    HUMIDITY_RE
        .captures(&page.text)
        .map(|c| c[1].to_string())
}

/// Wind description with whitespace collapsed, at most 50 characters.
pub fn wind(page: &Page) -> Option<String> {
    let caps = WIND_RE.captures(&page.text)?;
    let cleaned = WHITESPACE_RE.replace_all(caps[1].trim(), " ");
    Some(ellipsize(&cleaned, 50))
}

pub fn pressure(page: &Page) -> Option<String> {
    PRESSURE_RE
        .captures(&page.text)
        .map(|c| c[1].to_string())
}

/// Visibility, dropped when the page reports `N/A`.
pub fn visibility(page: &Page) -> Option<String> {
    let caps = VISIBILITY_RE.captures(&page.text)?;
    let value = caps[1].trim();
    (value != "N/A" && value.len() < 20).then(|| value.to_string())
}
