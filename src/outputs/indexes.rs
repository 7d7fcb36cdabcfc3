//! Index file bookkeeping.
//!
//! An index maps each filename a tool has written to its creation and
//! last-modification timestamps:
//!
//! ```json
//! {
//!   "2025-05-06_work.json": {
//!     "created_at": "2025-05-06T09:12:44+05:30",
//!     "last_modified": "2025-05-06T17:40:02+05:30"
//!   }
//! }
//! ```
//!
//! # Load and Replace
//!
//! The whole index is loaded, changed in memory and rewritten wholesale. A
//! missing or unreadable index loads as empty, so a corrupt file is replaced
//! on the next save rather than blocking the tool.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::models::IndexEntry;

/// Default index filename inside a data directory.
pub const INDEX_FILE: &str = "index.json";

/// Filename → [`IndexEntry`], ordered by filename.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileIndex(BTreeMap<String, IndexEntry>);

impl FileIndex {
    /// Load the index at `path`; missing or malformed files give an empty
    /// index.
    #[instrument(level = "debug", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Self {
        let contents = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) => {
                debug!(error = %e, "No index yet");
                return Self::default();
            }
        };
        match serde_json::from_str(&contents) {
            Ok(index) => index,
            Err(e) => {
                warn!(error = %e, "Index is corrupt; starting empty");
                Self::default()
            }
        }
    }

    /// Rewrite the index file with the current entries.
    #[instrument(level = "debug", skip_all, fields(path = %path.display(), entries = self.0.len()))]
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?).await?;
        info!("Index saved");
        Ok(())
    }

    /// Record a write to `filename` at `at`. Returns `true` when the file was
    /// not indexed before.
    pub fn touch(&mut self, filename: &str, at: &str) -> bool {
        match self.0.get_mut(filename) {
            Some(entry) => {
                entry.last_modified = at.to_string();
                false
            }
            None => {
                self.0.insert(
                    filename.to_string(),
                    IndexEntry {
                        created_at: at.to_string(),
                        last_modified: at.to_string(),
                    },
                );
                true
            }
        }
    }

    pub fn get(&self, filename: &str) -> Option<&IndexEntry> {
        self.0.get(filename)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &IndexEntry)> {
        self.0.iter()
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}
