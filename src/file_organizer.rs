/// Organization engine: moves files into category directories.
///
/// One [`Organizer::organize`] call scans a base directory, works out the
/// category and final destination of every candidate, moves it, and writes
/// the resulting [`OperationLog`] so the run can be undone. A failure on one
/// file is counted and reported but never stops the batch.
use crate::config::OrganizerConfig;
use crate::events::{EventSink, Stage};
use crate::mover::{FileError, FileErrorKind, Mover, SpaceProbe, SystemSpace};
use crate::naming::{Clock, LocalClock, NameResolver, Resolution, path_taken};
use crate::operation_log::OperationLog;
use crate::scanner::Scanner;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Errors that abort a whole organize or undo run.
#[derive(Debug, thiserror::Error)]
pub enum OrganizeError {
    /// The base directory does not exist or cannot be resolved.
    #[error("invalid base path {}: {source}", path.display())]
    InvalidBasePath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The base path exists but is not a directory.
    #[error("base path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    /// Failed to write or delete the history file.
    #[error("failed to write history file {}: {source}", path.display())]
    HistoryWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Failed to read the history file.
    #[error("failed to read history file {}: {source}", path.display())]
    HistoryReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// History file has invalid format.
    #[error("invalid history file {}: {reason}", path.display())]
    InvalidHistoryFormat { path: PathBuf, reason: String },
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Checks that `path` is an existing directory and returns its canonical form.
pub fn resolve_base_path(path: &Path) -> OrganizeResult<PathBuf> {
    let resolved = fs::canonicalize(path).map_err(|e| OrganizeError::InvalidBasePath {
        path: path.to_path_buf(),
        source: e,
    })?;
    if !resolved.is_dir() {
        return Err(OrganizeError::NotADirectory(resolved));
    }
    Ok(resolved)
}

/// What happened to one scanned file.
#[derive(Debug)]
pub enum FileOutcome {
    /// The file was moved (or would be, in preview mode).
    Moved {
        source: PathBuf,
        destination: PathBuf,
        category: String,
    },
    /// The file was deliberately left in place.
    Skipped { source: PathBuf, reason: String },
    /// The file could not be moved.
    Failed { source: PathBuf, error: FileError },
}

/// Counters for one organize run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Files returned by the scan.
    pub total: usize,
    pub organized: usize,
    pub skipped: usize,
    pub errors: usize,
    /// Files organized per category.
    pub categories: BTreeMap<String, usize>,
    pub elapsed: Duration,
    /// Whether this was a preview run.
    pub preview: bool,
    /// Processing stopped early on an interrupt.
    pub interrupted: bool,
    /// Where the operation log was written, if it was.
    pub history_file: Option<PathBuf>,
    /// Why the operation log could not be written, if it could not.
    pub history_error: Option<String>,
}

impl Statistics {
    fn record(&mut self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Moved { category, .. } => {
                self.organized += 1;
                *self.categories.entry(category.clone()).or_insert(0) += 1;
            }
            FileOutcome::Skipped { .. } => self.skipped += 1,
            FileOutcome::Failed { .. } => self.errors += 1,
        }
    }

    /// Files that went through processing.
    pub fn processed(&self) -> usize {
        self.organized + self.skipped + self.errors
    }

    /// True when no file failed and the history was saved if it had to be.
    pub fn is_success(&self) -> bool {
        self.errors == 0 && self.history_error.is_none()
    }

    /// Categories sorted by descending count, then by name.
    pub fn categories_by_count(&self) -> Vec<(&str, usize)> {
        let mut categories: Vec<_> = self
            .categories
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        categories.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        categories
    }
}

/// Moves the files of a directory into per-category subdirectories.
///
/// The organizer carries everything a run needs: the configuration, whether
/// this is a preview, the clock used for renamed files, the free-space probe,
/// and an optional interrupt flag.
pub struct Organizer<'a> {
    config: &'a OrganizerConfig,
    preview: bool,
    clock: Box<dyn Clock + 'a>,
    space: Box<dyn SpaceProbe + 'a>,
    interrupt: Option<Arc<AtomicBool>>,
}

impl<'a> Organizer<'a> {
    pub fn new(config: &'a OrganizerConfig, preview: bool) -> Self {
        Self {
            config,
            preview,
            clock: Box::new(LocalClock),
            space: Box::new(SystemSpace),
            interrupt: None,
        }
    }

    /// Uses `clock` for the timestamps of renamed files.
    pub fn with_clock(mut self, clock: impl Clock + 'a) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Uses `space` for the free-space check.
    pub fn with_space_probe(mut self, space: impl SpaceProbe + 'a) -> Self {
        self.space = Box::new(space);
        self
    }

    /// Stops processing between files once `flag` is raised.
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Organizes the files of `base_path`.
    ///
    /// # Errors
    ///
    /// Only a missing or non-directory base path is an error; it is detected
    /// before anything on disk changes. Per-file failures are counted in the
    /// returned [`Statistics`] instead.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dirsort::config::OrganizerConfig;
    /// use dirsort::events::TracingSink;
    /// use dirsort::file_organizer::Organizer;
    /// use std::path::Path;
    ///
    /// let config = OrganizerConfig::default();
    /// let stats = Organizer::new(&config, false)
    ///     .organize(Path::new("/path/to/Downloads"), false, &mut TracingSink)
    ///     .expect("valid directory");
    /// println!("{} of {} files organized", stats.organized, stats.total);
    /// ```
    pub fn organize(
        &self,
        base_path: &Path,
        recursive: bool,
        sink: &mut dyn EventSink,
    ) -> OrganizeResult<Statistics> {
        let started = Instant::now();
        let root = resolve_base_path(base_path)?;

        let mut stats = Statistics {
            preview: self.preview,
            ..Statistics::default()
        };

        let files = Scanner::new(self.config).scan(&root, recursive, sink);
        stats.total = files.len();
        if files.is_empty() {
            sink.info(Stage::Organize, "No files to organize.".to_string());
            stats.elapsed = started.elapsed();
            return Ok(stats);
        }
        sink.info(
            Stage::Organize,
            format!("Found {} file(s) to organize in {}", files.len(), root.display()),
        );

        let mover = Mover::new(self.preview, self.space.as_ref());
        let resolver = NameResolver::new(self.config.duplicate_strategy, self.clock.as_ref());
        let mut log = OperationLog::new();
        let mut planned = HashSet::new();

        for (index, file) in files.iter().enumerate() {
            if self.is_interrupted() {
                stats.interrupted = true;
                sink.warning(
                    Stage::Organize,
                    format!(
                        "Interrupted after {} of {} file(s); remaining files were left in place",
                        index,
                        files.len()
                    ),
                );
                break;
            }

            let outcome = self.organize_file(&root, file, &mover, &resolver, &mut log, &mut planned);
            report_outcome(&outcome, self.preview, sink);
            stats.record(&outcome);
            sink.progress(index + 1, files.len());
        }

        if !self.preview && !log.is_empty() {
            self.persist(&root, &log, &mut stats, sink);
        }

        stats.elapsed = started.elapsed();
        Ok(stats)
    }

    fn is_interrupted(&self) -> bool {
        self.interrupt
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    fn organize_file(
        &self,
        root: &Path,
        file: &Path,
        mover: &Mover<'_>,
        resolver: &NameResolver<'_>,
        log: &mut OperationLog,
        planned: &mut HashSet<PathBuf>,
    ) -> FileOutcome {
        let Some(file_name) = file.file_name() else {
            return FileOutcome::Failed {
                source: file.to_path_buf(),
                error: FileError::new(FileErrorKind::Unexpected, file, "file has no name component"),
            };
        };

        let category = self
            .config
            .categories
            .resolve(&file_name.to_string_lossy())
            .to_string();
        let category_dir = root.join(&category);

        if !self.preview
            && let Err(e) = fs::create_dir_all(&category_dir)
        {
            return FileOutcome::Failed {
                source: file.to_path_buf(),
                error: FileError::from_io(&category_dir, &e),
            };
        }

        let desired = category_dir.join(file_name);
        let resolution = if self.preview {
            resolver.resolve_with(&desired, |p| path_taken(p) || planned.contains(p))
        } else {
            resolver.resolve(&desired)
        };

        let destination = match resolution {
            Ok(Resolution::MoveTo(destination)) => destination,
            Ok(Resolution::Skip) => {
                return FileOutcome::Skipped {
                    source: file.to_path_buf(),
                    reason: format!("duplicate of {}", desired.display()),
                };
            }
            Err(e) => {
                return FileOutcome::Failed {
                    source: file.to_path_buf(),
                    error: FileError::new(FileErrorKind::NameGeneration, file, e.to_string()),
                };
            }
        };

        match mover.relocate(file, &destination, log) {
            Ok(()) => {
                if self.preview {
                    planned.insert(destination.clone());
                }
                FileOutcome::Moved {
                    source: file.to_path_buf(),
                    destination,
                    category,
                }
            }
            Err(error) => FileOutcome::Failed {
                source: file.to_path_buf(),
                error,
            },
        }
    }

    fn persist(
        &self,
        root: &Path,
        log: &OperationLog,
        stats: &mut Statistics,
        sink: &mut dyn EventSink,
    ) {
        if OperationLog::history_file_path(root).exists() {
            sink.warning(
                Stage::History,
                "Replacing the history of a previous run; that run can no longer be undone"
                    .to_string(),
            );
        }

        match log.save(root) {
            Ok(path) => {
                sink.info(
                    Stage::History,
                    format!("Saved operation history: {} operation(s)", log.len()),
                );
                stats.history_file = Some(path);
            }
            Err(e) => {
                sink.error(Stage::History, format!("Failed to save history: {}", e));
                stats.history_error = Some(e.to_string());
            }
        }
    }
}

fn report_outcome(outcome: &FileOutcome, preview: bool, sink: &mut dyn EventSink) {
    match outcome {
        FileOutcome::Moved {
            source,
            destination,
            ..
        } => sink.info(
            Stage::Move,
            format!(
                "{}: {} -> {}",
                if preview { "Would move" } else { "Moved" },
                source.display(),
                destination.display()
            ),
        ),
        FileOutcome::Skipped { source, reason } => sink.info(
            Stage::Organize,
            format!("Skipped {}: {}", source.display(), reason),
        ),
        FileOutcome::Failed { source, error } => sink.error(
            Stage::Move,
            format!("Error organizing {}: {}", source.display(), error),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DuplicateStrategy;
    use crate::events::MemorySink;
    use crate::mover::FixedSpace;
    use crate::naming::FixedClock;
    use tempfile::TempDir;

    const STAMP: &str = "20261018_093000";

    fn organizer(config: &OrganizerConfig, preview: bool) -> Organizer<'_> {
        Organizer::new(config, preview)
            .with_clock(FixedClock(STAMP.to_string()))
            .with_space_probe(FixedSpace(u64::MAX))
    }

    #[test]
    fn test_organize_four_file_example() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        for name in ["report.pdf", "photo.JPG", "archive.zip", "unknown.xyz"] {
            fs::write(base_path.join(name), name).expect("Failed to write file");
        }

        let config = OrganizerConfig::default();
        let mut sink = MemorySink::new();
        let stats = organizer(&config, false)
            .organize(base_path, false, &mut sink)
            .expect("organize");

        assert_eq!(stats.total, 4);
        assert_eq!(stats.organized, 4);
        assert_eq!(stats.skipped, 0);
        assert_eq!(stats.errors, 0);
        assert!(stats.is_success());
        assert!(base_path.join("Documents/report.pdf").exists());
        assert!(base_path.join("Images/photo.JPG").exists());
        assert!(base_path.join("Archives/archive.zip").exists());
        assert!(base_path.join("Others/unknown.xyz").exists());
        assert_eq!(stats.categories.get("Images"), Some(&1));
        assert!(stats.history_file.is_some());

        let log = OperationLog::load(base_path)
            .expect("load history")
            .expect("history written");
        assert_eq!(log.len(), 4);
    }

    #[test]
    fn test_invalid_base_path_is_fatal() {
        let config = OrganizerConfig::default();
        let mut sink = MemorySink::new();
        let result = organizer(&config, false).organize(Path::new("/non/existent/path"), false, &mut sink);
        assert!(matches!(result, Err(OrganizeError::InvalidBasePath { .. })));
    }

    #[test]
    fn test_file_as_base_path_is_fatal() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("plain.txt");
        fs::write(&file, "x").expect("Failed to write file");

        let config = OrganizerConfig::default();
        let mut sink = MemorySink::new();
        let result = organizer(&config, false).organize(&file, false, &mut sink);
        assert!(matches!(result, Err(OrganizeError::NotADirectory(_))));
    }

    #[test]
    fn test_rename_on_existing_destination() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        fs::create_dir(base_path.join("Documents")).expect("mkdir");
        fs::write(base_path.join("Documents/report.pdf"), "old").expect("write");
        fs::write(base_path.join("report.pdf"), "new").expect("write");

        let config = OrganizerConfig::default();
        let mut sink = MemorySink::new();
        let stats = organizer(&config, false)
            .organize(base_path, false, &mut sink)
            .expect("organize");

        assert_eq!(stats.organized, 1);
        let renamed = base_path.join(format!("Documents/report_{STAMP}.pdf"));
        assert_eq!(fs::read_to_string(renamed).expect("read"), "new");
        assert_eq!(
            fs::read_to_string(base_path.join("Documents/report.pdf")).expect("read"),
            "old"
        );
    }

    #[test]
    fn test_skip_strategy_leaves_file_and_log_untouched() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        fs::create_dir(base_path.join("Documents")).expect("mkdir");
        fs::write(base_path.join("Documents/report.pdf"), "old").expect("write");
        fs::write(base_path.join("report.pdf"), "new").expect("write");

        let config = OrganizerConfig {
            duplicate_strategy: DuplicateStrategy::Skip,
            ..OrganizerConfig::default()
        };
        let mut sink = MemorySink::new();
        let stats = organizer(&config, false)
            .organize(base_path, false, &mut sink)
            .expect("organize");

        assert_eq!(stats.total, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.organized, 0);
        assert!(stats.is_success());
        assert_eq!(fs::read_to_string(base_path.join("report.pdf")).expect("read"), "new");
        assert!(stats.history_file.is_none());
        assert!(!OperationLog::history_file_path(base_path).exists());
    }

    #[test]
    fn test_overwrite_strategy_replaces_destination() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        fs::create_dir(base_path.join("Documents")).expect("mkdir");
        fs::write(base_path.join("Documents/report.pdf"), "old").expect("write");
        fs::write(base_path.join("report.pdf"), "new").expect("write");

        let config = OrganizerConfig {
            duplicate_strategy: DuplicateStrategy::Overwrite,
            ..OrganizerConfig::default()
        };
        let mut sink = MemorySink::new();
        let stats = organizer(&config, false)
            .organize(base_path, false, &mut sink)
            .expect("organize");

        assert_eq!(stats.organized, 1);
        assert_eq!(
            fs::read_to_string(base_path.join("Documents/report.pdf")).expect("read"),
            "new"
        );
    }

    #[test]
    fn test_preview_changes_nothing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        fs::write(base_path.join("a.pdf"), "a").expect("write");
        fs::write(base_path.join("b.png"), "b").expect("write");

        let config = OrganizerConfig::default();
        let mut sink = MemorySink::new();
        let stats = organizer(&config, true)
            .organize(base_path, false, &mut sink)
            .expect("organize");

        assert!(stats.preview);
        assert_eq!(stats.organized, 2);
        assert!(base_path.join("a.pdf").exists());
        assert!(!base_path.join("Documents").exists());
        assert!(!base_path.join("Images").exists());
        assert!(!OperationLog::history_file_path(base_path).exists());
    }

    #[test]
    fn test_preview_plans_renames_for_same_named_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        fs::create_dir_all(base_path.join("one")).expect("mkdir");
        fs::create_dir_all(base_path.join("two")).expect("mkdir");
        fs::write(base_path.join("one/notes.txt"), "1").expect("write");
        fs::write(base_path.join("two/notes.txt"), "2").expect("write");

        let config = OrganizerConfig::default();
        let mut sink = MemorySink::new();
        let stats = organizer(&config, true)
            .organize(base_path, true, &mut sink)
            .expect("organize");

        assert_eq!(stats.organized, 2);
        assert!(sink.contains(&format!("notes_{STAMP}.txt")));
    }

    #[test]
    fn test_space_failure_counts_as_error_and_continues() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        fs::write(base_path.join("empty.txt"), "").expect("write");
        fs::write(base_path.join("full.txt"), "some bytes").expect("write");

        let config = OrganizerConfig::default();
        let mut sink = MemorySink::new();
        let stats = Organizer::new(&config, false)
            .with_space_probe(FixedSpace(0))
            .organize(base_path, false, &mut sink)
            .expect("organize");

        assert_eq!(stats.total, 2);
        assert_eq!(stats.organized, 1);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.processed(), stats.total);
        assert!(!stats.is_success());
        assert!(base_path.join("Documents/empty.txt").exists());
        assert!(base_path.join("full.txt").exists());
    }

    #[test]
    fn test_interrupt_stops_between_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        fs::write(base_path.join("a.pdf"), "a").expect("write");

        let flag = Arc::new(AtomicBool::new(true));
        let config = OrganizerConfig::default();
        let mut sink = MemorySink::new();
        let stats = organizer(&config, false)
            .with_interrupt(flag)
            .organize(base_path, false, &mut sink)
            .expect("organize");

        assert!(stats.interrupted);
        assert_eq!(stats.processed(), 0);
        assert!(base_path.join("a.pdf").exists());
    }

    #[test]
    fn test_second_run_does_not_reorganize_category_folders() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        fs::write(base_path.join("a.pdf"), "a").expect("write");

        let config = OrganizerConfig::default();
        let mut sink = MemorySink::new();
        organizer(&config, false)
            .organize(base_path, true, &mut sink)
            .expect("first run");
        let stats = organizer(&config, false)
            .organize(base_path, true, &mut sink)
            .expect("second run");

        assert_eq!(stats.total, 0);
        assert!(base_path.join("Documents/a.pdf").exists());
    }

    #[test]
    fn test_directory_inside_ignored_folder_is_left_alone() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path().join("node_modules").join("pkg");
        fs::create_dir_all(&base_path).expect("mkdir");
        fs::write(base_path.join("a.pdf"), "a").expect("write");

        let config = OrganizerConfig::default();
        let mut sink = MemorySink::new();
        let stats = organizer(&config, false)
            .organize(&base_path, false, &mut sink)
            .expect("organize");

        assert_eq!(stats.total, 0);
        assert!(base_path.join("a.pdf").exists());
        assert!(!base_path.join("Documents").exists());
    }

    #[test]
    fn test_exhausted_rename_counts_one_error_and_continues() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let documents = base_path.join("Documents");
        fs::create_dir(&documents).expect("mkdir");
        fs::write(documents.join("a.pdf"), "old").expect("write");
        fs::write(documents.join(format!("a_{STAMP}.pdf")), "old").expect("write");
        for counter in 1..=crate::naming::MAX_RENAME_ATTEMPTS {
            fs::write(documents.join(format!("a_{STAMP}_{counter}.pdf")), "old").expect("write");
        }
        fs::write(base_path.join("a.pdf"), "new").expect("write");
        fs::write(base_path.join("b.pdf"), "b").expect("write");

        let config = OrganizerConfig::default();
        let mut sink = MemorySink::new();
        let stats = organizer(&config, false)
            .organize(base_path, false, &mut sink)
            .expect("organize");

        assert_eq!(stats.total, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.organized, 1);
        assert!(sink.contains(FileErrorKind::NameGeneration.as_str()));
        assert_eq!(fs::read_to_string(base_path.join("a.pdf")).expect("read"), "new");
        assert!(documents.join("b.pdf").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_permission_denied_move_counts_one_error_and_continues() {
        use std::os::unix::fs::PermissionsExt;

        // root ignores directory permissions
        if unsafe { libc::geteuid() } == 0 {
            return;
        }
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let locked = base_path.join("locked");
        fs::create_dir(&locked).expect("mkdir");
        fs::write(locked.join("a.pdf"), "a").expect("write");
        fs::write(base_path.join("zeta.pdf"), "z").expect("write");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).expect("chmod");

        let config = OrganizerConfig::default();
        let mut sink = MemorySink::new();
        let result = organizer(&config, false).organize(base_path, true, &mut sink);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).expect("chmod");
        let stats = result.expect("organize");

        assert_eq!(stats.total, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.organized, 1);
        assert!(sink.contains(FileErrorKind::PermissionDenied.as_str()));
        assert!(locked.join("a.pdf").exists());
        assert!(base_path.join("Documents/zeta.pdf").exists());
    }

    #[test]
    fn test_categories_by_count() {
        let mut stats = Statistics::default();
        stats.categories.insert("Images".to_string(), 1);
        stats.categories.insert("Documents".to_string(), 3);
        stats.categories.insert("Audio".to_string(), 1);

        assert_eq!(
            stats.categories_by_count(),
            vec![("Documents", 3), ("Audio", 1), ("Images", 1)]
        );
    }
}
