//! Last-known-good baseline shared by every poller
//!
//! At any quiescent instant the baseline holds exactly the monitored,
//! existing, extension-matching regular files and their last-verified-good
//! metadata.

use crate::config::ExtensionFilter;
use crate::probe::{self, FileRecord};
use anyhow::Context;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Shared mapping from absolute path to last-verified-good metadata.
///
/// Explicitly owned and handed to every worker via `Arc` at construction
/// time. Pollers take read access for membership and equality checks; the
/// response engine takes write access for mutations. Each poller owns a
/// disjoint directory, so concurrent mutations never target the same key,
/// but the lock still guards the map's shared structure.
#[derive(Debug)]
pub struct Baseline {
    records: RwLock<HashMap<PathBuf, FileRecord>>,
}

impl Baseline {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the whole baseline atomically. Startup only.
    pub async fn install(&self, records: HashMap<PathBuf, FileRecord>) {
        *self.records.write().await = records;
    }

    pub async fn get(&self, path: &Path) -> Option<FileRecord> {
        self.records.read().await.get(path).cloned()
    }

    pub async fn contains(&self, path: &Path) -> bool {
        self.records.read().await.contains_key(path)
    }

    /// Baseline entries whose parent directory is exactly `dir`.
    ///
    /// Non-recursive on purpose: each poller reconciles only the direct
    /// children of its own directory.
    pub async fn entries_under(&self, dir: &Path) -> Vec<FileRecord> {
        self.records
            .read()
            .await
            .values()
            .filter(|record| record.path.parent() == Some(dir))
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for Baseline {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk `root` and capture a [`FileRecord`] for every accepted regular file.
///
/// This is a second full walk, decoupled from the backup pass, so a failure
/// in one cannot corrupt the other. Any probe failure fails the whole
/// capture: monitoring must not start from a partial baseline.
pub fn capture(
    root: &Path,
    filter: &ExtensionFilter,
) -> anyhow::Result<HashMap<PathBuf, FileRecord>> {
    let mut records = HashMap::new();
    capture_dir(root, filter, &mut records)?;
    Ok(records)
}

fn capture_dir(
    dir: &Path,
    filter: &ExtensionFilter,
    out: &mut HashMap<PathBuf, FileRecord>,
) -> anyhow::Result<()> {
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {:?}", dir))? {
        let entry = entry?;
        let path = entry.path();

        if entry.file_type()?.is_dir() {
            capture_dir(&path, filter, out)?;
        } else if filter.matches(&path) && probe::is_regular_file(&path) {
            let record = probe::probe(&path).with_context(|| format!("probing {:?}", path))?;
            out.insert(path, record);
        }
    }

    Ok(())
}
