//! Change classification and recovery

pub mod alert;

pub use alert::{Alert, AlertDispatcher, AlertHandle, Severity};

use crate::baseline::Baseline;
use crate::probe::FileRecord;
use crate::store::{BackupStore, QuarantineStore};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Classifies per-directory deltas against the baseline and drives the
/// quarantine/restore state transitions.
///
/// Every poller invokes [`ResponseEngine::reconcile`] independently; the
/// engine is idempotent, so reconciling an unchanged snapshot twice takes
/// no action and raises no alert, and every recovery failure leaves state
/// that the next tick re-classifies the same way.
pub struct ResponseEngine {
    baseline: Arc<Baseline>,
    backup: BackupStore,
    quarantine: QuarantineStore,
    alerts: AlertHandle,
}

impl ResponseEngine {
    pub fn new(
        baseline: Arc<Baseline>,
        backup: BackupStore,
        quarantine: QuarantineStore,
        alerts: AlertHandle,
    ) -> Self {
        Self {
            baseline,
            backup,
            quarantine,
            alerts,
        }
    }

    /// Reconcile one directory's live snapshot against the baseline subset
    /// whose parent is `dir`.
    pub async fn reconcile(&self, dir: &Path, live: &HashMap<PathBuf, FileRecord>) {
        let known = self.baseline.entries_under(dir).await;

        for (path, current) in live {
            match known.iter().find(|record| record.path == *path) {
                None => self.handle_added(path, current),
                Some(original) if !original.matches(current) => {
                    self.handle_modified(path, original, current);
                }
                Some(_) => {}
            }
        }

        for record in &known {
            if !live.contains_key(&record.path) {
                self.handle_deleted(record);
            }
        }
    }

    /// A path present live but absent from the baseline: suspicious
    /// addition. Quarantine is terminal; the baseline never adopts the
    /// file.
    fn handle_added(&self, path: &Path, current: &FileRecord) {
        self.alerts.send(
            Severity::Warning,
            format!(
                "new suspicious file: {} ({} bytes)",
                file_name(path),
                current.size
            ),
        );

        if let Err(e) = self.quarantine.quarantine(path) {
            error!("failed to quarantine new file {:?}: {:#}", path, e);
        }
    }

    /// A baselined path whose record no longer matches: tampering.
    /// Quarantine first so the tampered content survives for forensics,
    /// then restore over the now-vacant path. The baseline entry already
    /// reflects the pristine state and stays untouched.
    fn handle_modified(&self, path: &Path, original: &FileRecord, current: &FileRecord) {
        self.alerts
            .send(Severity::Warning, format!("file modified: {}", file_name(path)));

        info!(
            "modification detail - original: size={}, mtime={}, mode={:o}",
            original.size, original.mtime, original.mode
        );
        info!(
            "modification detail - current:  size={}, mtime={}, mode={:o}",
            current.size, current.mtime, current.mode
        );

        if let Err(e) = self.quarantine.quarantine(path) {
            error!("failed to quarantine modified file {:?}: {:#}", path, e);
        }

        if let Err(e) = self.backup.restore(path, original) {
            error!("failed to restore {:?}: {:#}", path, e);
        }
    }

    /// A baselined path absent from the live snapshot: removal. Recreate it
    /// from the mirror; the baseline entry stays valid.
    fn handle_deleted(&self, record: &FileRecord) {
        self.alerts.send(
            Severity::Warning,
            format!("file deleted: {}", file_name(&record.path)),
        );

        if let Err(e) = self.backup.restore(&record.path, record) {
            error!("failed to restore deleted file {:?}: {:#}", record.path, e);
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
