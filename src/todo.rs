//! To-do list kept in a single JSON file.
//!
//! The file is an object keyed by task number:
//!
//! ```json
//! {
//!   "1": { "task": "Buy milk", "status": "pending", "datetime": "06-05-2025 09:15" },
//!   "3": { "task": "Call Sam", "status": "completed", "datetime": "06-05-2025 10:02" }
//! }
//! ```
//!
//! Every operation loads the whole file, changes it in memory and rewrites
//! it. New tasks take the smallest unused key, and deleting a task renumbers
//! the rest to `1..=n` in their existing order. Both reuse numbers the user
//! may remember, so callers report every key that changed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use crate::error::{PipelineError, Result};
use crate::models::{Task, TaskStatus};
use crate::normalize::TimestampLayout;

/// A key that moved during renumbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChange {
    pub old: u32,
    pub new: u32,
}

/// The task file, loaded into memory.
#[derive(Debug)]
pub struct TaskStore {
    path: PathBuf,
    tasks: BTreeMap<u32, Task>,
}

impl TaskStore {
    /// Load tasks from `path`. A missing or malformed file yields an empty
    /// list; it is replaced on the next save.
    #[instrument(level = "debug", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Self {
        let tasks = match fs::read_to_string(path).await {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!(error = %e, "Task file is malformed; starting empty");
                BTreeMap::new()
            }),
            Err(e) => {
                debug!(error = %e, "No task file yet");
                BTreeMap::new()
            }
        };
        Self {
            path: path.to_path_buf(),
            tasks,
        }
    }

    /// An empty store that will be written to `path`.
    pub fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            tasks: BTreeMap::new(),
        }
    }

    pub async fn save(&self) -> Result<()> {
        fs::write(&self.path, serde_json::to_string_pretty(&self.tasks)?).await?;
        debug!(path = %self.path.display(), count = self.tasks.len(), "Tasks saved");
        Ok(())
    }

    pub fn tasks(&self) -> &BTreeMap<u32, Task> {
        &self.tasks
    }

    pub fn get(&self, key: u32) -> Option<&Task> {
        self.tasks.get(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks with `status`, in key order.
    pub fn with_status(&self, status: TaskStatus) -> impl Iterator<Item = (u32, &Task)> {
        self.tasks
            .iter()
            .filter(move |(_, t)| t.status == status)
            .map(|(k, t)| (*k, t))
    }

    /// Smallest positive key not in use.
    pub fn next_key(&self) -> u32 {
        (1..).find(|k| !self.tasks.contains_key(k)).unwrap_or(1)
    }

    /// Add a pending task created at `at`, returning its key.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Validation`] for blank task text.
    pub fn add_at(&mut self, text: &str, at: &DateTime<Local>) -> Result<u32> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PipelineError::invalid("Task text cannot be empty"));
        }
        let key = self.next_key();
        self.tasks.insert(
            key,
            Task {
                task: text.to_string(),
                status: TaskStatus::Pending,
                datetime: TimestampLayout::TaskStamp.format(at),
            },
        );
        info!(key, "Task added");
        Ok(key)
    }

    pub fn add(&mut self, text: &str) -> Result<u32> {
        self.add_at(text, &Local::now())
    }

    /// Remove `key`, returning the task.
    pub fn remove(&mut self, key: u32) -> Result<Task> {
        let task = self
            .tasks
            .remove(&key)
            .ok_or_else(|| PipelineError::invalid(format!("Invalid task key {key}")))?;
        info!(key, "Task deleted");
        Ok(task)
    }

    /// Reassign keys to `1..=n` keeping their order. Returns the keys that
    /// changed.
    pub fn renumber(&mut self) -> Vec<KeyChange> {
        let old = std::mem::take(&mut self.tasks);
        let mut changes = Vec::new();
        for (new, (old_key, task)) in (1u32..).zip(old) {
            if old_key != new {
                changes.push(KeyChange { old: old_key, new });
            }
            self.tasks.insert(new, task);
        }
        if !changes.is_empty() {
            info!(changed = changes.len(), "Tasks renumbered");
        }
        changes
    }

    /// Remove `key` and, unless `keep_keys`, renumber the rest.
    pub fn delete(&mut self, key: u32, keep_keys: bool) -> Result<(Task, Vec<KeyChange>)> {
        let task = self.remove(key)?;
        let changes = if keep_keys { Vec::new() } else { self.renumber() };
        Ok((task, changes))
    }

    /// Set the status of `key`, returning the previous one.
    pub fn set_status(&mut self, key: u32, status: TaskStatus) -> Result<TaskStatus> {
        let task = self
            .tasks
            .get_mut(&key)
            .ok_or_else(|| PipelineError::invalid(format!("Invalid task key {key}")))?;
        let previous = std::mem::replace(&mut task.status, status);
        info!(key, from = %previous, to = %status, "Task status updated");
        Ok(previous)
    }
}

/// Warning listing renumbered keys, or `None` when nothing moved.
pub fn describe_changes(changes: &[KeyChange]) -> Option<String> {
    if changes.is_empty() {
        return None;
    }
    let moves: Vec<String> = changes.iter().map(|c| format!("{} -> {}", c.old, c.new)).collect();
    Some(format!("Task keys changed: {}", moves.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn store_with(keys: &[u32]) -> TaskStore {
        let mut store = TaskStore::empty(Path::new("unused.json"));
        for &k in keys {
            store.tasks.insert(
                k,
                Task {
                    task: format!("task {k}"),
                    status: TaskStatus::Pending,
                    datetime: "06-05-2025 09:15".into(),
                },
            );
        }
        store
    }

    #[test]
    fn next_key_fills_gaps() {
        assert_eq!(store_with(&[1, 2, 4]).next_key(), 3);
        assert_eq!(store_with(&[]).next_key(), 1);
        assert_eq!(store_with(&[2, 3]).next_key(), 1);
    }

    #[test]
    fn delete_then_renumber_preserves_order() {
        let mut store = store_with(&[1, 2, 3]);
        store.remove(2).unwrap();
        let changes = store.renumber();
        assert_eq!(changes, vec![KeyChange { old: 3, new: 2 }]);
        let remaining: Vec<(u32, &str)> = store
            .tasks()
            .iter()
            .map(|(k, t)| (*k, t.task.as_str()))
            .collect();
        assert_eq!(remaining, vec![(1, "task 1"), (2, "task 3")]);
    }

    #[test]
    fn delete_can_keep_keys() {
        let mut store = store_with(&[1, 2, 3]);
        let (task, changes) = store.delete(1, true).unwrap();
        assert_eq!(task.task, "task 1");
        assert!(changes.is_empty());
        assert_eq!(store.tasks().keys().copied().collect::<Vec<_>>(), vec![2, 3]);

        let (_, changes) = store.delete(2, false).unwrap();
        assert_eq!(
            describe_changes(&changes).as_deref(),
            Some("Task keys changed: 3 -> 1")
        );
        assert_eq!(describe_changes(&[]), None);
    }

    #[test]
    fn renumber_contiguous_is_noop() {
        assert!(store_with(&[1, 2]).renumber().is_empty());
    }

    #[test]
    fn add_uses_task_stamp() {
        let mut store = store_with(&[1]);
        let at = Local.with_ymd_and_hms(2025, 5, 6, 14, 30, 0).unwrap();
        let key = store.add_at("  Water plants ", &at).unwrap();
        assert_eq!(key, 2);
        let task = store.get(2).unwrap();
        assert_eq!(task.task, "Water plants");
        assert_eq!(task.datetime, "06-05-2025 14:30");
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(store.add("   ").is_err());
    }

    #[test]
    fn status_and_invalid_keys() {
        let mut store = store_with(&[1]);
        assert_eq!(store.set_status(1, TaskStatus::Completed).unwrap(), TaskStatus::Pending);
        assert_eq!(store.with_status(TaskStatus::Completed).count(), 1);
        assert!(store.set_status(9, TaskStatus::Pending).is_err());
        assert!(store.remove(9).is_err());
    }

    #[tokio::test]
    async fn save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("task.json");
        let mut store = TaskStore::load(&path).await;
        assert!(store.is_empty());
        store.add("First").unwrap();
        store.save().await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"1\": {"));
        let reloaded = TaskStore::load(&path).await;
        assert_eq!(reloaded.get(1).unwrap().task, "First");
    }

    #[tokio::test]
    async fn malformed_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("task.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(TaskStore::load(&path).await.is_empty());
    }
}
