//! Enumeration of the files an organize run should consider.

use crate::config::OrganizerConfig;
use crate::events::{EventSink, Stage};
use crate::ignore::IgnorePolicy;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Lists candidate files under a root directory.
pub struct Scanner<'a> {
    config: &'a OrganizerConfig,
    policy: IgnorePolicy,
}

impl<'a> Scanner<'a> {
    pub fn new(config: &'a OrganizerConfig) -> Self {
        Self {
            config,
            policy: IgnorePolicy::new(config),
        }
    }

    /// Returns the files to organize, sorted by path.
    ///
    /// Flat scans look at the direct children of `root` only. Recursive scans
    /// walk the whole tree without following links, and never descend into
    /// ignored folders or into the category folders directly under `root`.
    /// Directories that cannot be listed are reported and contribute nothing.
    pub fn scan(&self, root: &Path, recursive: bool, sink: &mut dyn EventSink) -> Vec<PathBuf> {
        let mut files = if recursive {
            self.scan_recursive(root, sink)
        } else {
            self.scan_flat(root, sink)
        };
        files.sort();
        files
    }

    fn scan_flat(&self, root: &Path, sink: &mut dyn EventSink) -> Vec<PathBuf> {
        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                sink.error(
                    Stage::Scan,
                    format!("Cannot read directory {}: {}", root.display(), e),
                );
                return Vec::new();
            }
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    sink.warning(
                        Stage::Scan,
                        format!("Cannot read entry in {}: {}", root.display(), e),
                    );
                    continue;
                }
            };
            // DirEntry::file_type does not follow symlinks
            if let Ok(file_type) = entry.file_type()
                && file_type.is_file()
            {
                let path = entry.path();
                if self.policy.is_ignored(&path) {
                    sink.debug(Stage::Scan, format!("Ignored: {}", path.display()));
                } else {
                    files.push(path);
                }
            }
        }
        files
    }

    fn scan_recursive(&self, root: &Path, sink: &mut dyn EventSink) -> Vec<PathBuf> {
        let walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| !self.prune(entry));

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let location = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| root.display().to_string());
                    sink.error(
                        Stage::Scan,
                        format!("Cannot read directory {}: {}", location, e),
                    );
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            if self.policy.is_ignored(&path) {
                sink.debug(Stage::Scan, format!("Ignored: {}", path.display()));
            } else {
                files.push(path);
            }
        }
        files
    }

    /// True for directories the walk must not enter.
    fn prune(&self, entry: &DirEntry) -> bool {
        if !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        self.policy.is_ignored_folder(&name)
            || (entry.depth() == 1 && self.config.categories.contains(&name))
    }
}
