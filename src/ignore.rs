//! Exclusion rules deciding which files are never touched.
//!
//! The policy is a pure predicate over a path. It only reads metadata to
//! detect symbolic links.

use crate::config::OrganizerConfig;
use crate::operation_log::HISTORY_FILE_NAME;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Platform conventions that affect which files are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformRules {
    /// Skip files whose name starts with a dot.
    pub skip_hidden: bool,
    /// Skip symbolic links instead of moving them.
    pub skip_symlinks: bool,
}

impl PlatformRules {
    /// Rules for the platform this binary was compiled for.
    ///
    /// Dot-files are a hiding convention everywhere except Windows, where
    /// plenty of ordinary files start with a dot.
    pub fn host() -> Self {
        Self {
            skip_hidden: !cfg!(windows),
            skip_symlinks: true,
        }
    }
}

impl Default for PlatformRules {
    fn default() -> Self {
        Self::host()
    }
}

/// Why a path was excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    FileName,
    Folder,
    Hidden,
    Symlink,
    OwnFile,
}

/// Decides whether a path is excluded from organizing.
#[derive(Debug, Clone)]
pub struct IgnorePolicy {
    ignore_files: BTreeSet<String>,
    ignore_folders: BTreeSet<String>,
    log_file: String,
    platform: PlatformRules,
}

impl IgnorePolicy {
    pub fn new(config: &OrganizerConfig) -> Self {
        Self {
            ignore_files: config.ignore_files.clone(),
            ignore_folders: config.ignore_folders.clone(),
            log_file: Path::new(&config.log.file)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            platform: config.platform,
        }
    }

    /// True if `path` must not be organized.
    pub fn is_ignored(&self, path: &Path) -> bool {
        self.reason(path).is_some()
    }

    /// True if a directory with this name is never descended into.
    pub fn is_ignored_folder(&self, name: &str) -> bool {
        self.ignore_folders.contains(name)
    }

    /// Returns the first rule that excludes `path`, if any.
    ///
    /// Every ancestor of `path` counts, including those above the organized
    /// directory, so pass the canonical path.
    pub fn reason(&self, path: &Path) -> Option<IgnoreReason> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if self.is_own_file(&name) {
            return Some(IgnoreReason::OwnFile);
        }

        if self.ignore_files.contains(&name.to_lowercase()) {
            return Some(IgnoreReason::FileName);
        }

        let in_ignored_folder = path
            .parent()
            .into_iter()
            .flat_map(Path::components)
            .any(|c| self.is_ignored_folder(&c.as_os_str().to_string_lossy()));
        if in_ignored_folder {
            return Some(IgnoreReason::Folder);
        }

        if self.platform.skip_hidden && name.starts_with('.') {
            return Some(IgnoreReason::Hidden);
        }

        if self.platform.skip_symlinks
            && fs::symlink_metadata(path)
                .map(|m| m.file_type().is_symlink())
                .unwrap_or(false)
        {
            return Some(IgnoreReason::Symlink);
        }

        None
    }

    /// The undo history and the log file (with its rotated backups) belong to
    /// the tool itself.
    fn is_own_file(&self, name: &str) -> bool {
        if name == HISTORY_FILE_NAME {
            return true;
        }
        if self.log_file.is_empty() {
            return false;
        }
        name == self.log_file
            || name
                .strip_prefix(self.log_file.as_str())
                .and_then(|rest| rest.strip_prefix('.'))
                .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
    }
}
