//! Error taxonomy shared by every pipeline.
//!
//! Errors fall into four families: transport (network and HTTP status
//! failures), extraction (a mandatory field could not be found in a page),
//! persistence (SQLite failures) and validation (malformed user input). The
//! remaining variants wrap file and format errors from the stores.

use std::io;

/// Errors that can occur while fetching, parsing or persisting records.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("could not extract {field} from {source_url}")]
    Extraction {
        field: &'static str,
        source_url: String,
    },

    #[error("database error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("config error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("XML error: {0}")]
    Xml(String),
}

impl PipelineError {
    /// Shorthand for a [`PipelineError::Validation`] with a formatted message.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// True for failures that came from the network layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status { .. })
    }
}

pub type Result<T> = core::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_are_transport() {
        let err = PipelineError::Status {
            url: "https://example.com".into(),
            status: 503,
        };
        assert!(err.is_transport());
        assert_eq!(
            err.to_string(),
            "unexpected HTTP status 503 from https://example.com"
        );
    }

    #[test]
    fn validation_is_not_transport() {
        let err = PipelineError::invalid("Please use Country/City format");
        assert!(!err.is_transport());
        assert!(err.to_string().contains("Country/City"));
    }
}
