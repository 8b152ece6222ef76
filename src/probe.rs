//! File metadata probe
//!
//! Captures the identity snapshot of a single file without following
//! symlinks, so a symlink substituted for a monitored regular file is
//! never mistaken for the real thing.

use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

/// Identity snapshot of a monitored file.
///
/// Two records for the same path count as equivalent when size,
/// modification time, and mode bits all match (see [`FileRecord::matches`]).
/// Owner and group are captured so restores can reapply them, but they are
/// not compared for drift. Records are immutable; a re-capture supersedes
/// the old record rather than mutating it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Modification time, seconds since the epoch.
    pub mtime: i64,
    /// Full st_mode bits (file type + permissions).
    pub mode: u32,
    /// Owner UID.
    pub uid: u32,
    /// Owner GID.
    pub gid: u32,
}

impl FileRecord {
    /// Drift check: size, modification time, and mode only.
    pub fn matches(&self, other: &FileRecord) -> bool {
        self.size == other.size && self.mtime == other.mtime && self.mode == other.mode
    }
}

/// Capture a [`FileRecord`] for `path` without following symlinks.
///
/// Pure read; callers distinguish a vanished file via
/// [`io::ErrorKind::NotFound`].
pub fn probe(path: &Path) -> io::Result<FileRecord> {
    let meta = std::fs::symlink_metadata(path)?;

    Ok(FileRecord {
        path: path.to_path_buf(),
        size: meta.len(),
        mtime: meta.mtime(),
        mode: meta.mode(),
        uid: meta.uid(),
        gid: meta.gid(),
    })
}

/// Non-following regular-file gate.
///
/// Symlinks, directories, devices, and sockets are never baselined, backed
/// up, or restored.
pub fn is_regular_file(path: &Path) -> bool {
    std::fs::symlink_metadata(path)
        .map(|m| m.file_type().is_file())
        .unwrap_or(false)
}
