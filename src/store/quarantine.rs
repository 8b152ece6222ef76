//! Quarantine holding area
//!
//! Suspicious files are moved (never copied) into a flat directory for
//! later human inspection. Entries are terminal: the engine never deletes
//! or re-reads them.

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Flat run-scoped quarantine directory.
pub struct QuarantineStore {
    root: PathBuf,
}

impl QuarantineStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Move `path` into the quarantine root under a collision-proof name:
    /// a millisecond timestamp, the original filename, and the original
    /// parent directory with separators flattened.
    ///
    /// Returns the quarantined path.
    pub fn quarantine(&self, path: &Path) -> anyhow::Result<PathBuf> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("creating quarantine root {:?}", self.root))?;

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S_%3f");
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unnamed");
        let parent = path
            .parent()
            .map(|p| p.to_string_lossy().replace('/', "_"))
            .unwrap_or_default();

        let target = self.root.join(format!("{timestamp}_{file_name}_{parent}"));

        fs::rename(path, &target)
            .with_context(|| format!("moving {:?} into quarantine", path))?;

        info!("quarantined {:?} as {:?}", path, target);
        Ok(target)
    }
}
