//! Pristine backup mirror
//!
//! Holds a byte-for-byte copy of every monitored file, captured once at
//! startup. The mirror is the authoritative recovery source and is never
//! updated while monitoring runs.

use super::apply_attributes;
use crate::config::ExtensionFilter;
use crate::probe::{self, FileRecord};
use anyhow::{bail, Context};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Mirrored directory tree under a run-scoped backup root.
pub struct BackupStore {
    watch_root: PathBuf,
    backup_root: PathBuf,
}

impl BackupStore {
    pub fn new(watch_root: impl Into<PathBuf>, backup_root: impl Into<PathBuf>) -> Self {
        Self {
            watch_root: watch_root.into(),
            backup_root: backup_root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.backup_root
    }

    /// Walk the watch root and copy every accepted regular file into the
    /// mirror, reapplying the source's attributes to each copy.
    ///
    /// Any single copy failure fails the whole pass: a partial mirror would
    /// later restore stale or missing content. Returns the number of files
    /// backed up.
    pub fn backup_all(&self, filter: &ExtensionFilter) -> anyhow::Result<usize> {
        fs::create_dir_all(&self.backup_root)
            .with_context(|| format!("creating backup root {:?}", self.backup_root))?;

        let mut count = 0;
        self.backup_dir(&self.watch_root, filter, &mut count)?;

        info!("backed up {} files to {:?}", count, self.backup_root);
        Ok(count)
    }

    fn backup_dir(
        &self,
        dir: &Path,
        filter: &ExtensionFilter,
        count: &mut usize,
    ) -> anyhow::Result<()> {
        for entry in fs::read_dir(dir).with_context(|| format!("reading {:?}", dir))? {
            let entry = entry?;
            let path = entry.path();

            if entry.file_type()?.is_dir() {
                self.backup_dir(&path, filter, count)?;
            } else if filter.matches(&path) && probe::is_regular_file(&path) {
                self.backup_file(&path)
                    .with_context(|| format!("backing up {:?}", path))?;
                *count += 1;
            }
        }

        Ok(())
    }

    fn backup_file(&self, src: &Path) -> anyhow::Result<()> {
        let record = probe::probe(src)?;
        let dst = self.backup_path(src)?;

        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(src, &dst)?;
        apply_attributes(&dst, &record)?;

        debug!("backed up {:?}", src);
        Ok(())
    }

    /// Map a monitored path into the mirror.
    fn backup_path(&self, path: &Path) -> anyhow::Result<PathBuf> {
        let rel = path
            .strip_prefix(&self.watch_root)
            .with_context(|| format!("{:?} is outside the watch root", path))?;
        Ok(self.backup_root.join(rel))
    }

    /// Restore `path` to the content held in the mirror and the attributes
    /// held in `record`.
    ///
    /// Both must exist; a missing mirror copy is reported to the caller and
    /// not retried here. The path is simply re-classified on the next tick.
    pub fn restore(&self, path: &Path, record: &FileRecord) -> anyhow::Result<()> {
        let src = self.backup_path(path)?;
        if !probe::is_regular_file(&src) {
            bail!("no backup copy for {:?}", path);
        }

        fs::copy(&src, path).with_context(|| format!("restoring {:?}", path))?;
        apply_attributes(path, record)?;

        info!("restored {:?} from backup", path);
        Ok(())
    }
}
