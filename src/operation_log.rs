/// Persistent record of the moves made by one organize run.
///
/// The log lives next to the organized files as a hidden JSON sidecar and is
/// what `undo` replays:
///
/// ```json
/// {
///   "timestamp": "2026-10-18T17:02:11.402+02:00",
///   "operations": [
///     { "source": "/home/me/Downloads/report.pdf",
///       "destination": "/home/me/Downloads/Documents/report.pdf" }
///   ]
/// }
/// ```
use crate::file_organizer::{OrganizeError, OrganizeResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the sidecar, created inside the organized directory.
pub const HISTORY_FILE_NAME: &str = ".dirsort_history.json";

/// A single move, in the order it was performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Where the file was before organizing.
    pub source: PathBuf,
    /// Where the file was moved to.
    pub destination: PathBuf,
}

/// All moves of one organize run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationLog {
    /// ISO 8601 timestamp of when the run started.
    pub timestamp: String,
    pub operations: Vec<Operation>,
}

impl OperationLog {
    /// Creates an empty log stamped with the current local time.
    pub fn new() -> Self {
        Self {
            timestamp: chrono::Local::now().to_rfc3339(),
            operations: Vec::new(),
        }
    }

    /// Records a completed move.
    pub fn record(&mut self, source: PathBuf, destination: PathBuf) {
        self.operations.push(Operation {
            source,
            destination,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns the path of the sidecar for a base directory.
    pub fn history_file_path(base_path: &Path) -> PathBuf {
        base_path.join(HISTORY_FILE_NAME)
    }

    /// Writes this log to the sidecar of `base_path`, replacing any earlier log.
    pub fn save(&self, base_path: &Path) -> OrganizeResult<PathBuf> {
        let history_path = Self::history_file_path(base_path);
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            OrganizeError::HistoryWriteFailed {
                path: history_path.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("JSON serialization failed: {}", e),
                ),
            }
        })?;

        fs::write(&history_path, json).map_err(|e| OrganizeError::HistoryWriteFailed {
            path: history_path.clone(),
            source: e,
        })?;

        Ok(history_path)
    }

    /// Loads the log of `base_path`, or `None` if there is no sidecar.
    pub fn load(base_path: &Path) -> OrganizeResult<Option<Self>> {
        let history_path = Self::history_file_path(base_path);

        if !history_path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&history_path).map_err(|e| {
            OrganizeError::HistoryReadFailed {
                path: history_path.clone(),
                source: e,
            }
        })?;

        let log = serde_json::from_str(&json).map_err(|e| OrganizeError::InvalidHistoryFormat {
            path: history_path.clone(),
            reason: e.to_string(),
        })?;

        Ok(Some(log))
    }

    /// Deletes the sidecar of `base_path` if it exists.
    pub fn delete(base_path: &Path) -> OrganizeResult<()> {
        let history_path = Self::history_file_path(base_path);
        if history_path.exists() {
            fs::remove_file(&history_path).map_err(|e| OrganizeError::HistoryWriteFailed {
                path: history_path.clone(),
                source: e,
            })?;
        }
        Ok(())
    }
}

impl Default for OperationLog {
    fn default() -> Self {
        Self::new()
    }
}
