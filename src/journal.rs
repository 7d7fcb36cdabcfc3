//! Topic journals and the plain-text daily log.
//!
//! `journal add` appends a timestamped entry to `{date}_{topic}.{json|csv}`
//! inside the journal directory, keeping each file in chronological order.
//! Every write is recorded in the journal index ([`FileIndex`]) and in an
//! append-only events log:
//!
//! ```text
//! [2025-05-06 09:12:44] Created file: 2025-05-06_work.json
//! [2025-05-06 09:12:44] Appended entry to: 2025-05-06_work.json
//! ```
//!
//! `journal log` is the simpler single-file journal: one
//! `HH:mm:ss DD/MM/YYYY : message` line per call.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate};
use clap::ValueEnum;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::config::JournalConfig;
use crate::error::{PipelineError, Result};
use crate::models::{IndexEntry, JournalEntry};
use crate::normalize::{TimestampLayout, clean_filename};
use crate::outputs::indexes::FileIndex;

/// On-disk format of a topic file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum JournalFormat {
    Json,
    Csv,
}

impl JournalFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

/// Parse a `--date` argument given as `DD/MM/YY`.
pub fn parse_entry_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%d/%m/%y")
        .map_err(|_| PipelineError::invalid(format!("Invalid date '{input}'. Use DD/MM/YY")))
}

/// `{YYYY-MM-DD}_{topic}.{ext}`, with the topic cleaned for filesystem use.
pub fn topic_filename(date: NaiveDate, topic: &str, format: JournalFormat) -> Result<String> {
    let topic = clean_filename(topic);
    if topic.is_empty() {
        return Err(PipelineError::invalid("Topic must contain letters or digits"));
    }
    Ok(format!(
        "{}_{topic}.{}",
        TimestampLayout::FileDate.format_date(date),
        format.extension()
    ))
}

/// Outcome of [`Journal::add`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedEntry {
    pub filename: String,
    pub created: bool,
}

/// Handle on the journal directory.
#[derive(Debug, Clone)]
pub struct Journal {
    dir: PathBuf,
    index_path: PathBuf,
    events_path: PathBuf,
    log_path: PathBuf,
}

impl Journal {
    pub fn new(config: &JournalConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            index_path: config.dir.join(&config.index_file),
            events_path: config.dir.join(&config.events_log),
            log_path: config.dir.join(&config.log_file),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Append `message` to the topic file for `date` (today when `None`).
    ///
    /// The file is created if needed, entries are re-sorted by timestamp,
    /// and the index and events log are updated.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Validation`] for an empty message or topic,
    /// and I/O or format errors if the topic file cannot be read or written.
    #[instrument(level = "info", skip_all, fields(%topic, format = ?format))]
    pub async fn add(
        &self,
        topic: &str,
        message: &str,
        format: JournalFormat,
        date: Option<NaiveDate>,
        now: &DateTime<Local>,
    ) -> Result<AddedEntry> {
        let message = message.trim();
        if message.is_empty() {
            return Err(PipelineError::invalid("Journal message cannot be empty"));
        }
        let date = date.unwrap_or_else(|| now.date_naive());
        let filename = topic_filename(date, topic, format)?;
        let path = self.dir.join(&filename);
        fs::create_dir_all(&self.dir).await?;

        let created = !fs::try_exists(&path).await?;
        let mut entries = if created {
            Vec::new()
        } else {
            read_entries(&path).await?
        };
        let timestamp = TimestampLayout::Iso8601.format(now);
        entries.push(JournalEntry {
            timestamp: timestamp.clone(),
            message: message.to_string(),
        });
        entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        fs::write(&path, render_entries(&entries, format)?).await?;

        let mut index = FileIndex::load(&self.index_path).await;
        index.touch(&filename, &timestamp);
        index.save(&self.index_path).await?;

        if created {
            self.log_event(&format!("Created file: {filename}"), now).await?;
        }
        self.log_event(&format!("Appended entry to: {filename}"), now)
            .await?;
        info!(%filename, entries = entries.len(), created, "Journal entry added");
        Ok(AddedEntry { filename, created })
    }

    /// Every indexed journal file with its bookkeeping.
    pub async fn list(&self) -> Vec<(String, IndexEntry)> {
        FileIndex::load(&self.index_path)
            .await
            .iter()
            .map(|(name, entry)| (name.clone(), entry.clone()))
            .collect()
    }

    /// Indexed files whose name starts with `prefix` (usually `YYYY-MM-DD`).
    pub async fn search_by_date(&self, prefix: &str) -> Vec<String> {
        FileIndex::load(&self.index_path)
            .await
            .filenames()
            .filter(|name| name.starts_with(prefix))
            .map(str::to_string)
            .collect()
    }

    /// Indexed files containing `keyword` in any message, case-insensitively.
    /// Files that cannot be read are skipped with a warning.
    #[instrument(level = "info", skip_all, fields(%keyword))]
    pub async fn search_by_keyword(&self, keyword: &str) -> Vec<String> {
        let needle = keyword.to_lowercase();
        let index = FileIndex::load(&self.index_path).await;
        let mut matches = Vec::new();
        for name in index.filenames() {
            let entries = match read_entries(&self.dir.join(name)).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(file = %name, error = %e, "Skipping unreadable journal");
                    continue;
                }
            };
            if entries
                .iter()
                .any(|e| e.message.to_lowercase().contains(&needle))
            {
                matches.push(name.to_string());
            }
        }
        debug!(matches = matches.len(), "Keyword search finished");
        matches
    }

    /// Append `HH:mm:ss DD/MM/YYYY : message` to the plain-text journal.
    pub async fn log_line(&self, message: &str, now: &DateTime<Local>) -> Result<String> {
        let message = message.trim();
        if message.is_empty() {
            return Err(PipelineError::invalid("Journal message cannot be empty"));
        }
        let line = format!("{} : {message}", TimestampLayout::JournalLine.format(now));
        append_line(&self.log_path, &line).await?;
        info!(path = %self.log_path.display(), "Journal line written");
        Ok(line)
    }

    /// Contents of the plain-text journal; empty when nothing was logged yet.
    pub async fn read_log(&self) -> Result<String> {
        match fs::read_to_string(&self.log_path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn log_event(&self, message: &str, now: &DateTime<Local>) -> Result<()> {
        let line = format!("[{}] {message}", TimestampLayout::EventLog.format(now));
        append_line(&self.events_path, &line).await
    }
}

async fn append_line(path: &Path, line: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(format!("{line}\n").as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

/// Read a topic file, choosing the decoder by extension.
async fn read_entries(path: &Path) -> Result<Vec<JournalEntry>> {
    let contents = fs::read_to_string(path).await?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => {
            let mut reader = ::csv::Reader::from_reader(contents.as_bytes());
            let mut entries = Vec::new();
            for row in reader.deserialize() {
                entries.push(row?);
            }
            Ok(entries)
        }
        _ => Ok(serde_json::from_str(&contents)?),
    }
}

fn render_entries(entries: &[JournalEntry], format: JournalFormat) -> Result<String> {
    match format {
        JournalFormat::Json => Ok(serde_json::to_string_pretty(entries)?),
        JournalFormat::Csv => crate::outputs::csv::render(entries),
    }
}
