//! Per-directory polling loop

use crate::config::ExtensionFilter;
use crate::probe::{self, FileRecord};
use crate::response::ResponseEngine;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Fixed re-sample period. Sub-second so a dropped artifact is neutralized
/// before it can be used; not exposed as a runtime option.
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Polls a single directory's direct file children and hands every snapshot
/// to the response engine.
///
/// One poller per monitored subdirectory; pollers never communicate with
/// each other. New subdirectories created while the monitor runs are not
/// picked up, since the directory set is fixed at startup.
pub struct DirectoryPoller {
    dir: PathBuf,
    filter: ExtensionFilter,
    engine: Arc<ResponseEngine>,
}

impl DirectoryPoller {
    pub fn new(dir: PathBuf, filter: ExtensionFilter, engine: Arc<ResponseEngine>) -> Self {
        Self {
            dir,
            filter,
            engine,
        }
    }

    /// Run until the token fires. In production that is process exit; tests
    /// cancel for an orderly shutdown.
    pub async fn run(self, token: CancellationToken) {
        let mut ticker = tokio::time::interval(POLL_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        debug!("polling {:?}", self.dir);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => self.tick().await,
            }
        }
    }

    async fn tick(&self) {
        match self.snapshot() {
            Ok(live) => self.engine.reconcile(&self.dir, &live).await,
            // Only this directory's worker is affected; try again next tick.
            Err(e) => error!("failed to read {:?}: {}", self.dir, e),
        }
    }

    /// Probe the directory's direct, accepted file children.
    ///
    /// A file that vanishes between listing and probing is simply absent
    /// from the snapshot; the delta then shows up as a deletion.
    fn snapshot(&self) -> io::Result<HashMap<PathBuf, FileRecord>> {
        let mut live = HashMap::new();

        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                continue;
            }

            let path = entry.path();
            if !self.filter.matches(&path) || !probe::is_regular_file(&path) {
                continue;
            }

            match probe::probe(&path) {
                Ok(record) => {
                    live.insert(path, record);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => error!("failed to probe {:?}: {}", path, e),
            }
        }

        Ok(live)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::Baseline;
    use crate::response::alert;
    use crate::store::{BackupStore, QuarantineStore};
    use std::fs;
    use tempfile::tempdir;

    fn poller(dir: PathBuf, filter: ExtensionFilter, tmp: &tempfile::TempDir) -> DirectoryPoller {
        let (alerts, _rx) = alert::channel();
        let engine = Arc::new(ResponseEngine::new(
            Arc::new(Baseline::new()),
            BackupStore::new(dir.clone(), tmp.path().join("backup")),
            QuarantineStore::new(tmp.path().join("isolate")),
            alerts,
        ));
        DirectoryPoller::new(dir, filter, engine)
    }

    #[test]
    fn test_snapshot_lists_direct_accepted_children_only() {
        let tmp = tempdir().unwrap();
        let watch = tmp.path().join("www");
        let sub = watch.join("sub");
        fs::create_dir_all(&sub).unwrap();

        fs::write(watch.join("index.php"), "a").unwrap();
        fs::write(watch.join("notes.txt"), "b").unwrap();
        fs::write(sub.join("nested.php"), "c").unwrap();

        let poller = poller(watch.clone(), ExtensionFilter::parse(".php"), &tmp);
        let live = poller.snapshot().unwrap();

        assert_eq!(live.len(), 1);
        assert!(live.contains_key(&watch.join("index.php")));
    }

    #[test]
    fn test_snapshot_skips_symlinks() {
        let tmp = tempdir().unwrap();
        let watch = tmp.path().join("www");
        fs::create_dir(&watch).unwrap();

        let real = watch.join("real.php");
        fs::write(&real, "a").unwrap();
        std::os::unix::fs::symlink(&real, watch.join("link.php")).unwrap();

        let poller = poller(watch, ExtensionFilter::default(), &tmp);
        assert_eq!(poller.snapshot().unwrap().len(), 1);
    }

    #[test]
    fn test_snapshot_missing_directory_errors() {
        let tmp = tempdir().unwrap();
        let poller = poller(tmp.path().join("gone"), ExtensionFilter::default(), &tmp);
        assert!(poller.snapshot().is_err());
    }

    #[tokio::test]
    async fn test_run_stops_on_cancellation() {
        let tmp = tempdir().unwrap();
        let watch = tmp.path().join("www");
        fs::create_dir(&watch).unwrap();

        let poller = poller(watch, ExtensionFilter::default(), &tmp);
        let token = CancellationToken::new();
        let handle = tokio::spawn(poller.run(token.clone()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
        handle.await.unwrap();
    }
}
