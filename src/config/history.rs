//! Promote history persistence
//!
//! Stores promote records as a JSON array. Every operation is a whole-file
//! load → modify → write-back; there is no locking across processes.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{HistoryError, Result};
use crate::workspace::PromoteRecord;

/// Append-only, bounded log of promote records
#[derive(Debug, Clone)]
pub struct HistoryLog {
    /// Path to the JSON file
    path: PathBuf,
    /// Maximum retained records
    max: usize,
}

impl HistoryLog {
    /// Create a log backed by `path`, retaining at most `max` records
    pub fn new(path: impl Into<PathBuf>, max: usize) -> Self {
        Self {
            path: path.into(),
            max: max.max(1),
        }
    }

    /// Get the history file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all records in append order
    ///
    /// A missing file is an empty history.
    pub fn load(&self) -> Result<Vec<PromoteRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content =
            std::fs::read_to_string(&self.path).map_err(|e| HistoryError::ReadFailed {
                path: self.path.clone(),
                cause: e.to_string(),
            })?;

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let records = serde_json::from_str(&content).map_err(|e| HistoryError::Corrupt {
            path: self.path.clone(),
            cause: e.to_string(),
        })?;

        Ok(records)
    }

    /// Append a record, dropping the oldest entries beyond the cap
    pub fn append(&self, record: PromoteRecord) -> Result<()> {
        let mut records = self.load()?;
        records.push(record);

        if records.len() > self.max {
            let excess = records.len() - self.max;
            records.drain(..excess);
            debug!("Dropped {} oldest history record(s)", excess);
        }

        self.save(&records)
    }

    /// Remove and return the most recent record
    pub fn pop(&self) -> Result<Option<PromoteRecord>> {
        let mut records = self.load()?;
        let last = records.pop();
        if last.is_some() {
            self.save(&records)?;
        }
        Ok(last)
    }

    /// The most recent record, if any
    pub fn last(&self) -> Result<Option<PromoteRecord>> {
        Ok(self.load()?.pop())
    }

    /// Number of stored records
    pub fn len(&self) -> Result<usize> {
        Ok(self.load()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Remove every record
    pub fn clear(&self) -> Result<()> {
        self.save(&[])
    }

    fn save(&self, records: &[PromoteRecord]) -> Result<()> {
        let write_failed = |e: String| HistoryError::WriteFailed {
            path: self.path.clone(),
            cause: e,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| write_failed(format!("Failed to create history directory: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(records)
            .map_err(|e| write_failed(format!("Failed to serialize history: {}", e)))?;

        // Write to a sibling file first so a failed write never truncates the log
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(|e| write_failed(e.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| write_failed(e.to_string()))?;

        Ok(())
    }
}
