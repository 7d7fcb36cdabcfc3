//! Runtime configuration.
//!
//! Settings are read from an optional YAML file. The path comes from
//! `--config` / `PIPEWORKS_CONFIG`, falling back to
//! `{config_dir}/pipeworks/config.yaml`. Every field has a default, so a
//! missing file simply yields [`AppConfig::default`]; a malformed file is an
//! error.
//!
//! ```yaml
//! data_dir: ./weather_data
//! db_path: ./pipeworks.sqlite
//! http:
//!   timeout_secs: 20
//! weatherstack:
//!   query: Mumbai
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::Result;

/// Top-level configuration for all pipelines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory for weather snapshots, city caches and the snapshot index.
    pub data_dir: PathBuf,
    /// SQLite database used by the ingestion pipelines.
    pub db_path: PathBuf,
    pub http: HttpConfig,
    pub beer: BeerConfig,
    pub weather: WeatherConfig,
    pub weatherstack: WeatherstackConfig,
    pub news: NewsConfig,
    pub todo: TodoConfig,
    pub journal: JournalConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("weather_data"),
            db_path: PathBuf::from("pipeworks.sqlite"),
            http: HttpConfig::default(),
            beer: BeerConfig::default(),
            weather: WeatherConfig::default(),
            weatherstack: WeatherstackConfig::default(),
            news: NewsConfig::default(),
            todo: TodoConfig::default(),
            journal: JournalConfig::default(),
        }
    }
}

/// Settings for the shared HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BeerConfig {
    pub base_url: String,
    pub per_page: u32,
}

impl Default for BeerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://punkapi.online/v3/beers".to_string(),
            per_page: 80,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Root of the timeanddate.com weather pages.
    pub base_url: String,
    pub default_country: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.timeanddate.com/weather".to_string(),
            default_country: "india".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherstackConfig {
    pub base_url: String,
    /// API key; usually supplied through `WEATHERSTACK_ACCESS_KEY` instead.
    pub access_key: Option<String>,
    pub query: String,
}

impl Default for WeatherstackConfig {
    fn default() -> Self {
        Self {
            base_url: "http://api.weatherstack.com/current".to_string(),
            access_key: None,
            query: "Mumbai".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub url: String,
    pub feed_url: String,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            url: "https://www.bbc.com/news".to_string(),
            feed_url: "https://feeds.bbci.co.uk/news/rss.xml".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TodoConfig {
    pub task_file: PathBuf,
}

impl Default for TodoConfig {
    fn default() -> Self {
        Self {
            task_file: PathBuf::from("task.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    /// Directory holding topic files, the index and the event log.
    pub dir: PathBuf,
    pub index_file: String,
    pub events_log: String,
    /// Plain-text journal written by `journal log`.
    pub log_file: String,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            index_file: "journal_index.json".to_string(),
            events_log: "events.txt".to_string(),
            log_file: "journal.txt".to_string(),
        }
    }
}

impl AppConfig {
    /// Default config location: `{config_dir}/pipeworks/config.yaml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("pipeworks").join("config.yaml"))
    }

    /// Load configuration from `path`, or from [`AppConfig::default_path`] when
    /// no path is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    #[instrument(level = "debug")]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(p) => p,
            None => return Ok(Self::default()),
        };
        if !path.exists() {
            debug!(path = %path.display(), "No config file; using defaults");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(&path)?;
        let config: Self = serde_yaml::from_str(&contents)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }
}
