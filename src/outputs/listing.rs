//! Inventory of saved data files.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tokio::fs;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::outputs::SaveFormat;
use crate::outputs::indexes::INDEX_FILE;

/// Suffix of the per-country city list caches.
pub const CITY_CACHE_SUFFIX: &str = "_cities.json";

/// A saved `.json` or `.csv` report found in a data directory.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedFile {
    pub format: SaveFormat,
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<DateTime<Local>>,
}

impl SavedFile {
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Human-readable size: `512 B`, `1.5 KB`, `2.0 MB`, `1.1 GB`.
pub fn format_file_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else if b < KB * KB * KB {
        format!("{:.1} MB", b / (KB * KB))
    } else {
        format!("{:.1} GB", b / (KB * KB * KB))
    }
}

/// Index and city-cache files, which live next to the reports.
fn is_bookkeeping(name: &str) -> bool {
    name == INDEX_FILE || name.ends_with(CITY_CACHE_SUFFIX)
}

/// JSON files first, then CSV, each sorted by name. Bookkeeping files are
/// skipped. A missing directory lists as empty.
#[instrument(level = "debug", skip_all, fields(dir = %dir.display()))]
pub async fn list_saved_files(dir: &Path) -> Result<Vec<SavedFile>> {
    let mut files = Vec::new();
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
        Err(e) => return Err(e.into()),
    };
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let Some(format) = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(SaveFormat::from_extension)
        else {
            continue;
        };
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(is_bookkeeping)
        {
            continue;
        }
        let meta = entry.metadata().await?;
        files.push(SavedFile {
            format,
            path,
            size: meta.len(),
            modified: meta.modified().ok().map(DateTime::<Local>::from),
        });
    }
    files.sort_by(|a, b| a.format.cmp(&b.format).then_with(|| a.path.cmp(&b.path)));
    debug!(count = files.len(), "Listed saved files");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sizes() {
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(2 * 1024 * 1024), "2.0 MB");
    }

    #[tokio::test]
    async fn lists_json_before_csv() {
        let dir = TempDir::new().unwrap();
        for name in ["b.csv", "a.json", "notes.txt", "c.json"] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }
        let files = list_saved_files(dir.path()).await.unwrap();
        let names: Vec<String> = files.iter().map(SavedFile::name).collect();
        assert_eq!(names, vec!["a.json", "c.json", "b.csv"]);
        assert_eq!(files[0].size, 1);
        assert!(list_saved_files(&dir.path().join("none")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn skips_index_and_city_caches() {
        let dir = TempDir::new().unwrap();
        for name in ["index.json", "japan_cities.json", "tokyo_2025-05-06.json", "tokyo_2025-05-06.csv"] {
            std::fs::write(dir.path().join(name), "{}").unwrap();
        }
        let files = list_saved_files(dir.path()).await.unwrap();
        let names: Vec<String> = files.iter().map(SavedFile::name).collect();
        assert_eq!(names, vec!["tokyo_2025-05-06.json", "tokyo_2025-05-06.csv"]);
        assert_eq!(files[1].format, SaveFormat::Csv);
    }
}
