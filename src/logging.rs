//! Log file setup for the command-line tool.
//!
//! Events from the core reach `tracing` through
//! [`TracingSink`](crate::events::TracingSink); this module installs the
//! subscriber that writes them to the log file. The file is rotated by size
//! once, at startup: `dirsort.log` becomes `dirsort.log.1`, `dirsort.log.1`
//! becomes `dirsort.log.2`, and so on up to the configured backup count.

use crate::config::LogSettings;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;

/// Where log output ended up.
#[derive(Debug)]
pub enum LogTarget {
    /// Records go to this file.
    File(PathBuf),
    /// The file could not be opened; warnings and errors go to stderr.
    Stderr { path: PathBuf, reason: String },
    /// A global subscriber was already installed.
    Unavailable,
}

/// Path of the `index`-th rotated backup of `path`.
pub fn backup_path(path: &Path, index: usize) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{}", index));
    PathBuf::from(name)
}

/// Rotates `path` if it is at least `max_size` bytes.
///
/// With a backup count of zero the file is simply truncated. A `max_size` of
/// zero disables rotation.
pub fn rotate(path: &Path, max_size: u64, backup_count: usize) -> io::Result<()> {
    if max_size == 0 {
        return Ok(());
    }
    let size = match fs::metadata(path) {
        Ok(metadata) => metadata.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if size < max_size {
        return Ok(());
    }

    if backup_count == 0 {
        return fs::remove_file(path);
    }

    let oldest = backup_path(path, backup_count);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for index in (1..backup_count).rev() {
        let from = backup_path(path, index);
        if from.exists() {
            fs::rename(&from, backup_path(path, index + 1))?;
        }
    }
    fs::rename(path, backup_path(path, 1))
}

fn open_log_file(path: &Path, settings: &LogSettings) -> io::Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    rotate(path, settings.max_size, settings.backup_count)?;
    OpenOptions::new().create(true).append(true).open(path)
}

/// Installs the global subscriber, logging to `settings.file` under `root`.
///
/// Falls back to a stderr layer showing warnings and errors when the file
/// cannot be opened, unless `quiet` is set.
pub fn init(settings: &LogSettings, root: &Path, quiet: bool) -> LogTarget {
    let path = root.join(&settings.file);

    match open_log_file(&path, settings) {
        Ok(file) => {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file))
                .with_filter(LevelFilter::from_level(settings.level));
            match tracing_subscriber::registry().with(file_layer).try_init() {
                Ok(()) => LogTarget::File(path),
                Err(_) => LogTarget::Unavailable,
            }
        }
        Err(e) => {
            let stderr_layer = (!quiet).then(|| {
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(io::stderr)
                    .with_filter(LevelFilter::WARN)
            });
            match tracing_subscriber::registry().with(stderr_layer).try_init() {
                Ok(()) => LogTarget::Stderr {
                    path,
                    reason: e.to_string(),
                },
                Err(_) => LogTarget::Unavailable,
            }
        }
    }
}
