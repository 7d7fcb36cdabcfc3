//! JSON snapshots and record arrays.
//!
//! A weather snapshot is the report with a `metadata` object merged in:
//!
//! ```json
//! {
//!   "location": "Tokyo, Japan",
//!   "current_temp_c": 21.7,
//!   "...": "...",
//!   "metadata": {
//!     "saved_at": "2025-05-06T14:30:00+09:00",
//!     "data_version": "1.0",
//!     "source": "timeanddate.com"
//!   }
//! }
//! ```
//!
//! [`read_snapshot`] drops the envelope again, so a snapshot round-trips to
//! the record it was written from. Observation sets and headlines are
//! written as plain pretty-printed arrays.

use std::path::{Path, PathBuf};

use chrono::Local;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;
use tracing::{error, info, instrument};

use crate::error::Result;
use crate::normalize::TimestampLayout;

pub const DATA_VERSION: &str = "1.0";
pub const SNAPSHOT_SOURCE: &str = "timeanddate.com";

/// Envelope attached to every snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub saved_at: String,
    pub data_version: String,
    pub source: String,
}

impl SnapshotMetadata {
    pub fn now() -> Self {
        Self {
            saved_at: TimestampLayout::Iso8601.format(&Local::now()),
            data_version: DATA_VERSION.to_string(),
            source: SNAPSHOT_SOURCE.to_string(),
        }
    }
}

#[derive(Serialize)]
struct Snapshot<'a, T> {
    #[serde(flatten)]
    record: &'a T,
    metadata: SnapshotMetadata,
}

/// Serialize `record` with its metadata envelope.
pub fn render_snapshot<T: Serialize>(record: &T, metadata: SnapshotMetadata) -> Result<String> {
    Ok(serde_json::to_string_pretty(&Snapshot { record, metadata })?)
}

/// Decode a snapshot, discarding the metadata envelope.
pub fn parse_snapshot<T: DeserializeOwned>(contents: &str) -> Result<T> {
    let mut value: Value = serde_json::from_str(contents)?;
    if let Some(object) = value.as_object_mut() {
        object.remove("metadata");
    }
    Ok(serde_json::from_value(value)?)
}

async fn write_file(dir: &Path, filename: &str, contents: String) -> Result<PathBuf> {
    if let Err(e) = fs::create_dir_all(dir).await {
        error!(dir = %dir.display(), error = %e, "Failed to create output dir");
        return Err(e.into());
    }
    let path = dir.join(filename);
    fs::write(&path, contents).await?;
    info!(path = %path.display(), "Wrote JSON");
    Ok(path)
}

/// Write `{dir}/{stem}.json` as a snapshot of `record`.
#[instrument(level = "info", skip_all, fields(dir = %dir.display(), %stem))]
pub async fn write_snapshot<T: Serialize>(dir: &Path, stem: &str, record: &T) -> Result<PathBuf> {
    let contents = render_snapshot(record, SnapshotMetadata::now())?;
    write_file(dir, &format!("{stem}.json"), contents).await
}

/// Read a snapshot written by [`write_snapshot`].
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn read_snapshot<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path).await?;
    parse_snapshot(&contents)
}

/// Write `{dir}/{stem}.json` as a pretty JSON array.
#[instrument(level = "info", skip_all, fields(dir = %dir.display(), %stem, rows = rows.len()))]
pub async fn write_json_array<T: Serialize>(dir: &Path, stem: &str, rows: &[T]) -> Result<PathBuf> {
    write_file(dir, &format!("{stem}.json"), serde_json::to_string_pretty(rows)?).await
}
