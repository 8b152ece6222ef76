//! Monitor orchestration
//!
//! Startup is strictly sequential: validate paths, discover the
//! subdirectory set, mirror every accepted file into the backup store,
//! capture the baseline. Only then are the polling workers spawned. A
//! failure anywhere in that sequence aborts startup entirely; no partial
//! monitoring begins.

use crate::baseline::{self, Baseline};
use crate::config::Config;
use crate::poller::{DirectoryPoller, POLL_INTERVAL};
use crate::response::{alert, AlertDispatcher, ResponseEngine};
use crate::store::{BackupStore, QuarantineStore};
use anyhow::{bail, Context};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// The monitoring engine.
///
/// The monitored subdirectory set is computed once before polling starts
/// and never refreshed: a file dropped into a subdirectory created after
/// startup is not seen. Known limitation of this design.
#[derive(Debug)]
pub struct Monitor {
    config: Config,
    watch_root: PathBuf,
    backup_root: PathBuf,
    quarantine_root: PathBuf,
    baseline: Arc<Baseline>,
}

impl Monitor {
    /// Resolve and validate the configured paths and lay out the run-scoped
    /// workspace names. Fails fast on a missing watch root or on a
    /// workspace that resolves inside the monitored tree.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let watch_root = fs::canonicalize(&config.watch_dir)
            .with_context(|| format!("watch directory {:?}", config.watch_dir))?;
        if !watch_root.is_dir() {
            bail!("watch path {:?} is not a directory", watch_root);
        }

        // Check nesting before creating anything, then again on the
        // resolved path in case a symlink hides the nesting.
        let base_abs = std::path::absolute(&config.base_dir)?;
        if base_abs.starts_with(&watch_root) {
            bail!(
                "workspace root must not be nested inside the watch directory\n  watch: {:?}\n  workspace: {:?}",
                watch_root,
                base_abs
            );
        }

        fs::create_dir_all(&base_abs)
            .with_context(|| format!("creating workspace root {:?}", base_abs))?;
        let base_root = fs::canonicalize(&base_abs)?;

        if base_root.starts_with(&watch_root) {
            bail!(
                "workspace root must not be nested inside the watch directory\n  watch: {:?}\n  workspace: {:?}",
                watch_root,
                base_root
            );
        }

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let backup_root = base_root.join(format!("backup_{timestamp}"));
        let quarantine_root = base_root.join(format!("isolate_{timestamp}"));

        info!("watch directory: {:?}", watch_root);
        info!("backup directory: {:?}", backup_root);
        info!("quarantine directory: {:?}", quarantine_root);

        Ok(Self {
            config,
            watch_root,
            backup_root,
            quarantine_root,
            baseline: Arc::new(Baseline::new()),
        })
    }

    pub fn baseline(&self) -> Arc<Baseline> {
        self.baseline.clone()
    }

    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    pub fn quarantine_root(&self) -> &Path {
        &self.quarantine_root
    }

    /// Build the backup mirror and baseline, then poll every discovered
    /// subdirectory until `token` fires.
    ///
    /// Production never cancels except on a termination signal; tests
    /// cancel for an orderly shutdown.
    pub async fn run(self, token: CancellationToken) -> anyhow::Result<()> {
        let directories = discover_directories(&self.watch_root)?;
        info!("monitoring {} directories", directories.len());

        let backup = BackupStore::new(self.watch_root.clone(), self.backup_root.clone());
        backup
            .backup_all(&self.config.extensions)
            .context("initial backup failed")?;

        let records = baseline::capture(&self.watch_root, &self.config.extensions)
            .context("baseline capture failed")?;
        info!("baseline established: {} files", records.len());
        self.baseline.install(records).await;

        fs::create_dir_all(&self.quarantine_root)
            .with_context(|| format!("creating quarantine root {:?}", self.quarantine_root))?;

        match &self.config.api_endpoint {
            Some(endpoint) => info!("alert receiver: http://{}", endpoint),
            None => info!("no alert receiver configured, local logging only"),
        }

        let (alerts, alert_rx) = alert::channel();
        let dispatcher = AlertDispatcher::new(alert_rx, self.config.api_endpoint.clone())?;

        let engine = Arc::new(ResponseEngine::new(
            self.baseline.clone(),
            backup,
            QuarantineStore::new(self.quarantine_root.clone()),
            alerts,
        ));

        let mut workers = Vec::with_capacity(directories.len() + 1);
        workers.push(tokio::spawn(dispatcher.run(token.clone())));
        for dir in directories {
            let poller = DirectoryPoller::new(dir, self.config.extensions.clone(), engine.clone());
            workers.push(tokio::spawn(poller.run(token.clone())));
        }

        info!(
            "monitoring started, polling every {} ms",
            POLL_INTERVAL.as_millis()
        );

        for worker in workers {
            if let Err(e) = worker.await {
                error!("worker task failed: {}", e);
            }
        }

        Ok(())
    }
}

/// All subdirectories of the watch root, the root itself included, from a
/// single recursive walk.
fn discover_directories(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut dirs = vec![root.to_path_buf()];
    let mut next = 0;

    while next < dirs.len() {
        let dir = dirs[next].clone();
        for entry in fs::read_dir(&dir).with_context(|| format!("reading {:?}", dir))? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                dirs.push(entry.path());
            }
        }
        next += 1;
    }

    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtensionFilter;
    use std::time::Duration;
    use tempfile::tempdir;

    fn config(watch: &Path, base: &Path, extensions: &str) -> Config {
        Config {
            watch_dir: watch.to_path_buf(),
            base_dir: base.to_path_buf(),
            extensions: ExtensionFilter::parse(extensions),
            api_endpoint: None,
        }
    }

    #[test]
    fn test_discover_directories_includes_root_and_nested() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("a");
        let b = a.join("b");
        fs::create_dir_all(&b).unwrap();
        fs::write(tmp.path().join("file.txt"), "x").unwrap();

        let dirs = discover_directories(tmp.path()).unwrap();
        assert_eq!(dirs.len(), 3);
        assert!(dirs.contains(&tmp.path().to_path_buf()));
        assert!(dirs.contains(&a));
        assert!(dirs.contains(&b));
    }

    #[test]
    fn test_missing_watch_root_fails_fast() {
        let tmp = tempdir().unwrap();
        let cfg = config(&tmp.path().join("absent"), &tmp.path().join("base"), "");
        assert!(Monitor::new(cfg).is_err());
    }

    #[test]
    fn test_nested_workspace_fails_fast() {
        let tmp = tempdir().unwrap();
        let watch = tmp.path().join("www");
        fs::create_dir(&watch).unwrap();

        let cfg = config(&watch, &watch.join("workspace"), "");
        let err = Monitor::new(cfg).unwrap_err();
        assert!(err.to_string().contains("must not be nested"));
        // Fail-fast: the run-scoped directories were never created.
        assert!(fs::read_dir(&watch).unwrap().next().is_none());
    }

    #[test]
    fn test_sibling_workspace_is_accepted() {
        let tmp = tempdir().unwrap();
        let watch = tmp.path().join("www");
        fs::create_dir(&watch).unwrap();

        let monitor = Monitor::new(config(&watch, &tmp.path().join("workspace"), "")).unwrap();
        assert!(monitor.backup_root().starts_with(tmp.path().join("workspace")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_end_to_end_tampered_file_is_restored() {
        let tmp = tempdir().unwrap();
        let watch = tmp.path().join("www");
        fs::create_dir(&watch).unwrap();
        fs::write(watch.join("shell.php"), "<?php echo 'ok'; ?>").unwrap();
        fs::write(watch.join("notes.txt"), "not monitored").unwrap();

        let monitor =
            Monitor::new(config(&watch, &tmp.path().join("workspace"), ".php")).unwrap();
        let quarantine_root = monitor.quarantine_root().to_path_buf();
        let baseline = monitor.baseline();

        let token = CancellationToken::new();
        let handle = tokio::spawn(monitor.run(token.clone()));

        // Wait for startup, then overwrite the monitored file externally.
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(baseline.len().await, 1);
        fs::write(watch.join("shell.php"), "<?php system($_GET['c']); ?>").unwrap();

        // Well past one polling interval.
        tokio::time::sleep(Duration::from_millis(600)).await;
        token.cancel();
        handle.await.unwrap().unwrap();

        assert_eq!(
            fs::read_to_string(watch.join("shell.php")).unwrap(),
            "<?php echo 'ok'; ?>"
        );

        let quarantined: Vec<String> = fs::read_dir(&quarantine_root)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(quarantined.len(), 1);
        assert!(quarantined[0].contains("shell.php"));

        // The unmonitored file was never touched.
        assert_eq!(
            fs::read_to_string(watch.join("notes.txt")).unwrap(),
            "not monitored"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_end_to_end_unfiltered_mutation_is_ignored() {
        let tmp = tempdir().unwrap();
        let watch = tmp.path().join("www");
        fs::create_dir(&watch).unwrap();
        fs::write(watch.join("data.txt"), "before").unwrap();

        let monitor =
            Monitor::new(config(&watch, &tmp.path().join("workspace"), ".php")).unwrap();
        let quarantine_root = monitor.quarantine_root().to_path_buf();
        let backup_root = monitor.backup_root().to_path_buf();

        let token = CancellationToken::new();
        let handle = tokio::spawn(monitor.run(token.clone()));

        tokio::time::sleep(Duration::from_millis(400)).await;
        fs::write(watch.join("data.txt"), "after").unwrap();

        tokio::time::sleep(Duration::from_millis(600)).await;
        token.cancel();
        handle.await.unwrap().unwrap();

        // Never backed up, never restored, never quarantined.
        assert_eq!(fs::read_to_string(watch.join("data.txt")).unwrap(), "after");
        assert!(!backup_root.join("data.txt").exists());
        assert!(fs::read_dir(&quarantine_root).unwrap().next().is_none());
    }
}
