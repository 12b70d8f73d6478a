//! Destination collision handling.
//!
//! Given the path a file would naturally land on, the [`NameResolver`]
//! applies the configured [`DuplicateStrategy`] and returns either a path to
//! move to or a signal to leave the file alone.

use crate::config::DuplicateStrategy;
use std::fs;
use std::path::{Path, PathBuf};

/// Counter suffixes tried after the timestamped name before giving up.
pub const MAX_RENAME_ATTEMPTS: u32 = 1000;

/// Source of the timestamp used for renamed files.
pub trait Clock {
    /// Current time formatted as `YYYYMMDD_HHMMSS`.
    fn stamp(&self) -> String;
}

/// Wall clock in local time.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn stamp(&self) -> String {
        chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
    }
}

/// A clock frozen at one stamp.
#[derive(Debug, Clone)]
pub struct FixedClock(pub String);

impl Clock for FixedClock {
    fn stamp(&self) -> String {
        self.0.clone()
    }
}

/// Outcome of resolving a destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Move the file here.
    MoveTo(PathBuf),
    /// Leave the file where it is.
    Skip,
}

/// No free name was found within [`MAX_RENAME_ATTEMPTS`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("could not generate a unique name for {} after {attempts} attempts", desired.display())]
pub struct NameGenerationError {
    pub desired: PathBuf,
    pub attempts: u32,
}

/// True if anything, including a dangling symlink, occupies `path`.
pub fn path_taken(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Applies a duplicate strategy to desired destinations.
pub struct NameResolver<'a> {
    strategy: DuplicateStrategy,
    clock: &'a dyn Clock,
}

impl<'a> NameResolver<'a> {
    pub fn new(strategy: DuplicateStrategy, clock: &'a dyn Clock) -> Self {
        Self { strategy, clock }
    }

    /// Resolves `desired` against what is on disk.
    pub fn resolve(&self, desired: &Path) -> Result<Resolution, NameGenerationError> {
        self.resolve_with(desired, path_taken)
    }

    /// Resolves `desired`, using `taken` to decide whether a candidate collides.
    ///
    /// Preview runs pass a predicate that also counts destinations planned
    /// earlier in the same run.
    pub fn resolve_with<F>(&self, desired: &Path, taken: F) -> Result<Resolution, NameGenerationError>
    where
        F: Fn(&Path) -> bool,
    {
        if !taken(desired) {
            return Ok(Resolution::MoveTo(desired.to_path_buf()));
        }

        match self.strategy {
            DuplicateStrategy::Skip => Ok(Resolution::Skip),
            DuplicateStrategy::Overwrite => Ok(Resolution::MoveTo(desired.to_path_buf())),
            DuplicateStrategy::Rename => self.unique_name(desired, &taken).map(Resolution::MoveTo),
        }
    }

    /// `stem_STAMP.ext`, then `stem_STAMP_1.ext`, `stem_STAMP_2.ext`, ...
    fn unique_name<F>(&self, desired: &Path, taken: &F) -> Result<PathBuf, NameGenerationError>
    where
        F: Fn(&Path) -> bool,
    {
        let parent = desired.parent().unwrap_or_else(|| Path::new(""));
        let stem = desired
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let suffix = desired
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let stamp = self.clock.stamp();

        let candidate = parent.join(format!("{stem}_{stamp}{suffix}"));
        if !taken(&candidate) {
            return Ok(candidate);
        }

        for counter in 1..=MAX_RENAME_ATTEMPTS {
            let candidate = parent.join(format!("{stem}_{stamp}_{counter}{suffix}"));
            if !taken(&candidate) {
                return Ok(candidate);
            }
        }

        Err(NameGenerationError {
            desired: desired.to_path_buf(),
            attempts: MAX_RENAME_ATTEMPTS,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    const STAMP: &str = "20261018_120000";

    fn clock() -> FixedClock {
        FixedClock(STAMP.to_string())
    }

    #[test]
    fn test_free_destination_is_used_for_every_strategy() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let desired = temp_dir.path().join("report.pdf");
        let clock = clock();

        for strategy in [
            DuplicateStrategy::Rename,
            DuplicateStrategy::Skip,
            DuplicateStrategy::Overwrite,
        ] {
            let resolution = NameResolver::new(strategy, &clock)
                .resolve(&desired)
                .expect("resolve");
            assert_eq!(resolution, Resolution::MoveTo(desired.clone()));
        }
    }

    #[test]
    fn test_rename_appends_timestamp() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let desired = temp_dir.path().join("report.pdf");
        fs::write(&desired, "old").expect("Failed to write file");
        let clock = clock();

        let resolution = NameResolver::new(DuplicateStrategy::Rename, &clock)
            .resolve(&desired)
            .expect("resolve");
        assert_eq!(
            resolution,
            Resolution::MoveTo(temp_dir.path().join(format!("report_{STAMP}.pdf")))
        );
    }

    #[test]
    fn test_rename_falls_back_to_counter() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let dir = temp_dir.path();
        fs::write(dir.join("notes"), "a").expect("write");
        fs::write(dir.join(format!("notes_{STAMP}")), "b").expect("write");
        fs::write(dir.join(format!("notes_{STAMP}_1")), "c").expect("write");
        let clock = clock();

        let resolution = NameResolver::new(DuplicateStrategy::Rename, &clock)
            .resolve(&dir.join("notes"))
            .expect("resolve");
        assert_eq!(resolution, Resolution::MoveTo(dir.join(format!("notes_{STAMP}_2"))));
    }

    #[test]
    fn test_rename_gives_up_after_limit() {
        let clock = clock();
        let resolver = NameResolver::new(DuplicateStrategy::Rename, &clock);
        let desired = Path::new("/virtual/a.txt");

        let err = resolver
            .resolve_with(desired, |_| true)
            .expect_err("every name is taken");
        assert_eq!(err.attempts, MAX_RENAME_ATTEMPTS);
        assert_eq!(err.desired, desired);
    }

    #[test]
    fn test_skip_and_overwrite_on_collision() {
        let clock = clock();
        let desired = Path::new("/virtual/a.txt");

        let skip = NameResolver::new(DuplicateStrategy::Skip, &clock)
            .resolve_with(desired, |_| true)
            .expect("resolve");
        assert_eq!(skip, Resolution::Skip);

        let overwrite = NameResolver::new(DuplicateStrategy::Overwrite, &clock)
            .resolve_with(desired, |_| true)
            .expect("resolve");
        assert_eq!(overwrite, Resolution::MoveTo(desired.to_path_buf()));
    }

    #[test]
    fn test_planned_destinations_count_as_taken() {
        let clock = clock();
        let resolver = NameResolver::new(DuplicateStrategy::Rename, &clock);
        let planned: HashSet<PathBuf> = [PathBuf::from("/virtual/Images/a.png")].into();

        let resolution = resolver
            .resolve_with(Path::new("/virtual/Images/a.png"), |p| planned.contains(p))
            .expect("resolve");
        assert_eq!(
            resolution,
            Resolution::MoveTo(PathBuf::from(format!("/virtual/Images/a_{STAMP}.png")))
        );
    }

    #[test]
    fn test_local_clock_format() {
        let stamp = LocalClock.stamp();
        assert_eq!(stamp.len(), 15);
        assert_eq!(stamp.as_bytes()[8], b'_');
    }
}
