//! Persisters: everything that writes records somewhere durable.
//!
//! # Submodules
//!
//! - [`database`]: SQLite tables for the beer and weatherstack ingestions
//! - [`json`]: weather snapshots with a metadata envelope, JSON arrays
//! - [`csv`]: flattened CSV exports with fixed headers
//! - [`indexes`]: filename → created/modified bookkeeping
//! - [`listing`]: inventory of saved files in a data directory
//!
//! # Output Structure
//!
//! ```text
//! data_dir/
//! ├── tokyo_2025-05-06.json            # current-conditions snapshot
//! ├── tokyo_2025-05-06.csv
//! ├── tokyo_2025-05-01_range.json      # observation sets
//! ├── japan_cities.json                # city list cache
//! └── index.json                       # snapshot index
//! ```
//!
//! The index and the city caches are bookkeeping; file listings skip them.

pub mod csv;
pub mod database;
pub mod indexes;
pub mod json;
pub mod listing;

/// File format for `--save`. Ordered the way listings show them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum SaveFormat {
    Json,
    Csv,
}

impl SaveFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Csv => "CSV",
        }
    }

    /// The format a file extension belongs to, if any.
    pub fn from_extension(ext: &str) -> Option<Self> {
        [Self::Json, Self::Csv]
            .into_iter()
            .find(|f| f.extension().eq_ignore_ascii_case(ext))
    }
}
