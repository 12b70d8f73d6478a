//! Relocation of single files.
//!
//! The [`Mover`] checks that the destination volume has room, performs the
//! move, and turns every failure into a [`FileError`] the caller can count
//! and report. It never panics and never propagates a failure beyond the
//! file it was working on.

use crate::naming::path_taken;
use crate::operation_log::OperationLog;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Free space required on top of the file size, as a fraction of it (10%).
const SPACE_MARGIN_DIVISOR: u64 = 10;

/// Classification of a failed move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileErrorKind {
    /// The destination volume lacks room for the file plus margin.
    InsufficientSpace,
    PermissionDenied,
    /// Any other error reported by the operating system.
    Os,
    /// Anything that is not an OS error, e.g. a path without a file name.
    Unexpected,
    /// No unique destination name could be generated.
    NameGeneration,
}

impl FileErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileErrorKind::InsufficientSpace => "insufficient space",
            FileErrorKind::PermissionDenied => "permission denied",
            FileErrorKind::Os => "OS error",
            FileErrorKind::Unexpected => "unexpected error",
            FileErrorKind::NameGeneration => "name generation failed",
        }
    }
}

/// A failure confined to one file.
#[derive(Debug, thiserror::Error)]
#[error("{}: {}: {message}", kind.as_str(), path.display())]
pub struct FileError {
    pub kind: FileErrorKind,
    pub path: PathBuf,
    pub message: String,
}

impl FileError {
    pub fn new(kind: FileErrorKind, path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }

    /// Classifies an I/O error raised while working on `path`.
    pub fn from_io(path: &Path, error: &io::Error) -> Self {
        let kind = match error.kind() {
            io::ErrorKind::PermissionDenied => FileErrorKind::PermissionDenied,
            _ => FileErrorKind::Os,
        };
        Self::new(kind, path, error.to_string())
    }
}

/// Reports free space on the volume holding a directory.
pub trait SpaceProbe {
    /// Bytes available to unprivileged users, or `None` if unknown.
    fn available_space(&self, dir: &Path) -> Option<u64>;
}

/// Asks the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSpace;

impl SpaceProbe for SystemSpace {
    #[cfg(unix)]
    fn available_space(&self, dir: &Path) -> Option<u64> {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let c_path = CString::new(dir.as_os_str().as_bytes()).ok()?;
        let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
        // SAFETY: c_path is a valid NUL-terminated string and stat is a
        // properly sized, writable statvfs struct.
        let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
        if rc != 0 {
            return None;
        }
        Some((stat.f_bavail as u64).saturating_mul(stat.f_frsize as u64))
    }

    #[cfg(not(unix))]
    fn available_space(&self, _dir: &Path) -> Option<u64> {
        None
    }
}

/// Reports a fixed amount of free space.
#[derive(Debug, Clone, Copy)]
pub struct FixedSpace(pub u64);

impl SpaceProbe for FixedSpace {
    fn available_space(&self, _dir: &Path) -> Option<u64> {
        Some(self.0)
    }
}

/// Bytes that must be free to move a file of `size` bytes.
pub fn required_space(size: u64) -> u64 {
    size.saturating_add(size.div_ceil(SPACE_MARGIN_DIVISOR))
}

/// Moves files, or pretends to in preview mode.
pub struct Mover<'a> {
    preview: bool,
    space: &'a dyn SpaceProbe,
}

impl<'a> Mover<'a> {
    pub fn new(preview: bool, space: &'a dyn SpaceProbe) -> Self {
        Self { preview, space }
    }

    pub fn is_preview(&self) -> bool {
        self.preview
    }

    /// Moves `source` to `destination` and records the move in `log`.
    ///
    /// In preview mode nothing is checked, moved or recorded.
    pub fn relocate(
        &self,
        source: &Path,
        destination: &Path,
        log: &mut OperationLog,
    ) -> Result<(), FileError> {
        if self.preview {
            return Ok(());
        }

        self.check_space(source, destination)?;
        transfer(source, destination)?;
        log.record(source.to_path_buf(), destination.to_path_buf());
        Ok(())
    }

    fn check_space(&self, source: &Path, destination: &Path) -> Result<(), FileError> {
        let dir = destination.parent().ok_or_else(|| {
            FileError::new(
                FileErrorKind::Unexpected,
                destination,
                "destination has no parent directory",
            )
        })?;

        let size = fs::metadata(source)
            .map_err(|e| FileError::from_io(source, &e))?
            .len();

        if let Some(available) = self.space.available_space(dir) {
            let needed = required_space(size);
            if available < needed {
                return Err(FileError::new(
                    FileErrorKind::InsufficientSpace,
                    source,
                    format!(
                        "{} bytes needed in {}, {} available",
                        needed,
                        dir.display(),
                        available
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// Renames `source` to `destination`, copying across devices when needed.
///
/// The copy fallback is not atomic. On failure the source is kept, and the
/// destination is left as it was found: a copy is removed only if this call
/// created it.
pub fn transfer(source: &Path, destination: &Path) -> Result<(), FileError> {
    if source.file_name().is_none() {
        return Err(FileError::new(
            FileErrorKind::Unexpected,
            source,
            "source has no file name component",
        ));
    }

    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => copy_then_remove(source, destination),
        Err(e) => Err(FileError::from_io(source, &e)),
    }
}

pub(crate) fn copy_then_remove(source: &Path, destination: &Path) -> Result<(), FileError> {
    let existed = path_taken(destination);
    if let Err(e) = fs::copy(source, destination) {
        if !existed {
            let _ = fs::remove_file(destination);
        }
        return Err(FileError::from_io(source, &e));
    }
    if let Err(e) = fs::remove_file(source) {
        // the source remains the only copy
        let _ = fs::remove_file(destination);
        return Err(FileError::from_io(source, &e));
    }
    Ok(())
}
