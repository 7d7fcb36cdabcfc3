//! In-place clean-up of CSV exports.
//!
//! Every `*.csv` file in a directory is rewritten with:
//!
//! - headers trimmed, lowercased and spaces replaced by `_`
//! - blank cells (and cells missing from short rows) set to `NA`
//! - a trailing `row_number` column counting data rows from 1

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{info, instrument, warn};

use crate::error::{PipelineError, Result};

pub const MISSING: &str = "NA";

/// A file that was rewritten and how many data rows it has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrangledFile {
    pub path: PathBuf,
    pub rows: usize,
}

pub fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace(' ', "_")
}

/// Clean one CSV document, returning the new text and its data row count.
pub fn wrangle_csv(contents: &str) -> Result<(String, usize)> {
    let mut reader = ::csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(contents.as_bytes());
    let mut headers: Vec<String> = reader.headers()?.iter().map(normalize_header).collect();
    let width = headers.len();
    headers.push("row_number".to_string());

    let mut writer = ::csv::Writer::from_writer(Vec::new());
    writer.write_record(&headers)?;
    let mut rows = 0;
    for record in reader.records() {
        let record = record?;
        rows += 1;
        let mut cells: Vec<String> = (0..width)
            .map(|i| match record.get(i).map(str::trim) {
                Some(cell) if !cell.is_empty() => cell.to_string(),
                _ => MISSING.to_string(),
            })
            .collect();
        cells.push(rows.to_string());
        writer.write_record(&cells)?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok((String::from_utf8_lossy(&bytes).into_owned(), rows))
}

/// Wrangle every CSV file directly inside `dir`, in name order.
///
/// A file that fails at any step is logged and skipped; the remaining
/// files are still processed.
///
/// # Errors
///
/// Returns [`PipelineError::Validation`] when the directory holds no CSV
/// files, and I/O errors if it cannot be read.
#[instrument(level = "info", skip_all, fields(dir = %dir.display()))]
pub async fn wrangle_dir(dir: &Path) -> Result<Vec<WrangledFile>> {
    let mut paths = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|e| e == "csv") {
            paths.push(path);
        }
    }
    if paths.is_empty() {
        return Err(PipelineError::invalid(format!(
            "No CSV files found in {}",
            dir.display()
        )));
    }
    paths.sort();

    let mut done = Vec::with_capacity(paths.len());
    for path in paths {
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Skipping unreadable CSV");
                continue;
            }
        };
        let (cleaned, rows) = match wrangle_csv(&contents) {
            Ok(result) => result,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Skipping malformed CSV");
                continue;
            }
        };
        if let Err(e) = fs::write(&path, cleaned).await {
            warn!(file = %path.display(), error = %e, "Failed to rewrite CSV");
            continue;
        }
        info!(file = %path.display(), rows, "Wrangled");
        done.push(WrangledFile { path, rows });
    }
    Ok(done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn headers_blanks_and_row_numbers() {
        let input = " First Name ,Age,City\nAda,36,\nLinus, ,Helsinki\nGrace\n";
        let (out, rows) = wrangle_csv(input).unwrap();
        assert_eq!(rows, 3);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "first_name,age,city,row_number");
        assert_eq!(lines[1], "Ada,36,NA,1");
        assert_eq!(lines[2], "Linus,NA,Helsinki,2");
        assert_eq!(lines[3], "Grace,NA,NA,3");
    }

    #[tokio::test]
    async fn rewrites_every_csv_in_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.csv"), "X\n1\n2\n").unwrap();
        std::fs::write(dir.path().join("a.csv"), "Y Z\n\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "untouched").unwrap();

        let done = wrangle_dir(dir.path()).await.unwrap();
        let summary: Vec<(String, usize)> = done
            .iter()
            .map(|f| (f.path.file_name().unwrap().to_string_lossy().into_owned(), f.rows))
            .collect();
        assert_eq!(summary, vec![("a.csv".to_string(), 0), ("b.csv".to_string(), 2)]);
        let b = std::fs::read_to_string(dir.path().join("b.csv")).unwrap();
        assert_eq!(b, "x,row_number\n1,1\n2,2\n");
        assert_eq!(std::fs::read_to_string(dir.path().join("notes.txt")).unwrap(), "untouched");
    }

    #[tokio::test]
    async fn unreadable_file_does_not_stop_the_run() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.csv"), b"\xff\xfe").unwrap();
        std::fs::write(dir.path().join("b.csv"), "Col A\n1\n").unwrap();

        let done = wrangle_dir(dir.path()).await.unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].path, dir.path().join("b.csv"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("b.csv")).unwrap(),
            "col_a,row_number\n1,1\n"
        );
        assert_eq!(std::fs::read(dir.path().join("a.csv")).unwrap(), b"\xff\xfe");
    }

    #[tokio::test]
    async fn empty_dir_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            wrangle_dir(dir.path()).await,
            Err(PipelineError::Validation(_))
        ));
    }
}
