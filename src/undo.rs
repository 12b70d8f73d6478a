/// Reverting the most recent organize run.
///
/// The operation log is replayed newest first. Every file that is still at
/// its recorded destination is moved back; anything that took its place in
/// the meantime is renamed aside, never overwritten. Category folders left
/// empty afterwards are removed and the log is deleted.
use crate::config::OrganizerConfig;
use crate::events::{EventSink, Stage};
use crate::file_organizer::{OrganizeResult, resolve_base_path};
use crate::mover::transfer;
use crate::naming::path_taken;
use crate::operation_log::{Operation, OperationLog};
use std::fs;
use std::path::{Path, PathBuf};

/// What an undo run did.
#[derive(Debug, Default)]
pub struct UndoReport {
    /// Operations found in the log.
    pub attempted: usize,
    /// Files moved back to their original location.
    pub restored: usize,
    /// Destinations that no longer existed.
    pub missing: Vec<PathBuf>,
    /// Files that could not be moved back, with the reason.
    pub failed: Vec<(PathBuf, String)>,
    /// Files renamed aside because they occupied an original location.
    pub backups: Vec<PathBuf>,
    /// Category folders removed because they were empty.
    pub removed_dirs: Vec<PathBuf>,
}

impl UndoReport {
    /// `(restored, attempted)`.
    pub fn counts(&self) -> (usize, usize) {
        (self.restored, self.attempted)
    }

    /// Returns true if every logged file was restored.
    pub fn is_complete_success(&self) -> bool {
        self.restored == self.attempted
    }
}

/// Result of asking for an undo.
#[derive(Debug)]
pub enum UndoOutcome {
    /// No log, or an empty one.
    NothingToUndo,
    Completed(UndoReport),
}

/// Manages undo operations for file organization.
pub struct UndoManager;

impl UndoManager {
    /// Undoes the most recent organize run in `base_path`.
    ///
    /// A missing base path or a malformed log is an error and nothing is
    /// touched; the malformed log stays in place. Files that cannot be
    /// restored are recorded in the report instead.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dirsort::config::OrganizerConfig;
    /// use dirsort::events::TracingSink;
    /// use dirsort::undo::{UndoManager, UndoOutcome};
    /// use std::path::Path;
    ///
    /// let config = OrganizerConfig::default();
    /// match UndoManager::undo(Path::new("/path/to/directory"), &config, &mut TracingSink) {
    ///     Ok(UndoOutcome::Completed(report)) => println!("Restored {} files", report.restored),
    ///     Ok(UndoOutcome::NothingToUndo) => println!("Nothing to undo"),
    ///     Err(e) => eprintln!("Undo failed: {}", e),
    /// }
    /// ```
    pub fn undo(
        base_path: &Path,
        config: &OrganizerConfig,
        sink: &mut dyn EventSink,
    ) -> OrganizeResult<UndoOutcome> {
        let root = resolve_base_path(base_path)?;

        let log = match OperationLog::load(&root)? {
            Some(log) if !log.is_empty() => log,
            _ => {
                sink.info(Stage::Undo, "No operations to undo.".to_string());
                return Ok(UndoOutcome::NothingToUndo);
            }
        };

        sink.info(
            Stage::Undo,
            format!(
                "Undoing {} operation(s) recorded at {}",
                log.len(),
                log.timestamp
            ),
        );

        let mut report = UndoReport {
            attempted: log.len(),
            ..UndoReport::default()
        };

        for (index, operation) in log.operations.iter().rev().enumerate() {
            Self::restore_file(operation, &mut report, sink);
            sink.progress(index + 1, log.len());
        }

        Self::remove_empty_category_dirs(&root, config, &mut report, sink);

        if let Err(e) = OperationLog::delete(&root) {
            sink.warning(Stage::History, format!("Could not delete history file: {}", e));
        }

        sink.info(
            Stage::Undo,
            format!(
                "Undo complete: {} of {} file(s) restored",
                report.restored, report.attempted
            ),
        );
        Ok(UndoOutcome::Completed(report))
    }

    fn restore_file(operation: &Operation, report: &mut UndoReport, sink: &mut dyn EventSink) {
        let Operation {
            source,
            destination,
        } = operation;

        if !path_taken(destination) {
            sink.warning(
                Stage::Undo,
                format!("File not found, cannot restore: {}", destination.display()),
            );
            report.missing.push(destination.clone());
            return;
        }

        if let Some(parent) = source.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            sink.error(
                Stage::Undo,
                format!("Could not recreate {}: {}", parent.display(), e),
            );
            report.failed.push((destination.clone(), e.to_string()));
            return;
        }

        if path_taken(source) {
            let backup_path = Self::generate_backup_path(source);
            if let Err(e) = fs::rename(source, &backup_path) {
                let reason = format!("Could not back up conflicting file: {}", e);
                sink.error(Stage::Undo, format!("{}: {}", source.display(), reason));
                report.failed.push((destination.clone(), reason));
                return;
            }
            sink.warning(
                Stage::Undo,
                format!(
                    "Existing file moved aside: {} -> {}",
                    source.display(),
                    backup_path.display()
                ),
            );
            report.backups.push(backup_path);
        }

        match transfer(destination, source) {
            Ok(()) => {
                sink.info(
                    Stage::Undo,
                    format!("Restored: {} -> {}", destination.display(), source.display()),
                );
                report.restored += 1;
            }
            Err(e) => {
                sink.error(Stage::Undo, format!("Failed to restore: {}", e));
                report.failed.push((destination.clone(), e.to_string()));
            }
        }
    }

    /// Generates a backup path for a file by appending a timestamp.
    ///
    /// Example: `file.txt` becomes `file.txt.bak.20261018-143052`, then
    /// `file.txt.bak.20261018-143052.1` if that is taken as well.
    fn generate_backup_path(original_path: &Path) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let filename = original_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let parent = original_path.parent().unwrap_or_else(|| Path::new(""));

        let backup = parent.join(format!("{}.bak.{}", filename, timestamp));
        let mut candidate = backup.clone();
        let mut counter = 1;
        while path_taken(&candidate) {
            candidate = PathBuf::from(format!("{}.{}", backup.display(), counter));
            counter += 1;
        }
        candidate
    }

    fn remove_empty_category_dirs(
        root: &Path,
        config: &OrganizerConfig,
        report: &mut UndoReport,
        sink: &mut dyn EventSink,
    ) {
        for name in config.categories.names() {
            let dir = root.join(name);
            // remove_dir refuses non-empty directories
            let is_empty = fs::read_dir(&dir)
                .map(|mut entries| entries.next().is_none())
                .unwrap_or(false);
            if !is_empty {
                continue;
            }
            match fs::remove_dir(&dir) {
                Ok(()) => {
                    sink.debug(
                        Stage::Undo,
                        format!("Removed empty folder: {}", dir.display()),
                    );
                    report.removed_dirs.push(dir);
                }
                Err(e) => sink.warning(
                    Stage::Undo,
                    format!("Could not remove {}: {}", dir.display(), e),
                ),
            }
        }
    }
}
