//! weatherstack current-conditions API.
//!
//! A single GET to `{base}?access_key=KEY&query=CITY`. The API answers
//! failures (bad key, unknown city, quota) with HTTP 200 and an `error`
//! object, so the body is checked before decoding.

use reqwest::Client;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::config::WeatherstackConfig;
use crate::error::{PipelineError, Result};
use crate::fetch::fetch_text;
use crate::models::CurrentConditions;

#[derive(Debug, Deserialize)]
struct ApiFailure {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    info: Option<String>,
}

/// Request URL for `query`. The key and query are percent-encoded.
pub fn current_url(config: &WeatherstackConfig, access_key: &str, query: &str) -> String {
    format!(
        "{}?access_key={}&query={}",
        config.base_url,
        urlencoding::encode(access_key),
        urlencoding::encode(query)
    )
}

/// Decode a response body, turning an API error envelope into
/// [`PipelineError::Validation`].
pub fn decode_current(body: &str) -> Result<CurrentConditions> {
    if let Ok(failure) = serde_json::from_str::<ApiFailure>(body) {
        let info = failure.error.info.unwrap_or_else(|| "unknown error".to_string());
        warn!(code = ?failure.error.code, %info, "weatherstack rejected the request");
        return Err(PipelineError::invalid(format!("weatherstack: {info}")));
    }
    Ok(serde_json::from_str(body)?)
}

/// Fetch current conditions for `query`.
///
/// # Errors
///
/// Transport and status errors, an API error envelope, or a body that does
/// not match [`CurrentConditions`].
#[instrument(level = "info", skip(client, config, access_key))]
pub async fn fetch_current(
    client: &Client,
    config: &WeatherstackConfig,
    access_key: &str,
    query: &str,
) -> Result<CurrentConditions> {
    let body = fetch_text(client, &current_url(config, access_key, query)).await?;
    let conditions = decode_current(&body)?;
    info!(
        city = %conditions.location.name,
        temperature = conditions.current.temperature,
        "Current conditions received"
    );
    Ok(conditions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_url_encodes_query() {
        let url = current_url(&WeatherstackConfig::default(), "k3y", "New York");
        assert_eq!(
            url,
            "http://api.weatherstack.com/current?access_key=k3y&query=New%20York"
        );
    }

    #[test]
    fn test_decode_success() {
        let body = r#"{
            "request": {"type": "City", "query": "Mumbai, India"},
            "location": {"name": "Mumbai", "country": "India", "localtime": "2025-05-06 14:30", "utc_offset": "5.50"},
            "current": {"temperature": 31, "weather_descriptions": ["Haze"], "wind_speed": 15}
        }"#;
        let c = decode_current(body).unwrap();
        assert_eq!(c.location.name, "Mumbai");
        assert_eq!(c.description(), Some("Haze"));
        assert_eq!(c.current.wind_speed, 15.0);
    }

    #[test]
    fn test_decode_error_envelope() {
        let body = r#"{"success": false, "error": {"code": 101, "type": "invalid_access_key", "info": "You have not supplied a valid API Access Key."}}"#;
        let err = decode_current(body).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(m) if m.contains("valid API Access Key")));
    }
}
