//! Vigil - host-level file-integrity watchdog
//!
//! Snapshots a directory tree at startup, re-samples every subdirectory on
//! a fixed 200 ms period, and neutralizes unauthorized changes before they
//! can be used:
//!
//! - **Added** files are moved into a quarantine directory for review
//! - **Modified** files are quarantined for forensics, then restored from
//!   the pristine backup taken at startup
//! - **Deleted** files are recreated from that same backup
//!
//! Every event raises a best-effort alert toward an optional HTTP receiver;
//! alert delivery never blocks recovery.
//!
//! # Example
//!
//! ```rust,no_run
//! use tokio_util::sync::CancellationToken;
//! use vigil::{Config, ExtensionFilter, Monitor};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config {
//!         watch_dir: "/var/www/html".into(),
//!         base_dir: "/tmp/vigil_workspace".into(),
//!         extensions: ExtensionFilter::parse(".php,.jsp"),
//!         api_endpoint: None,
//!     };
//!
//!     let monitor = Monitor::new(config)?;
//!     monitor.run(CancellationToken::new()).await
//! }
//! ```
//!
//! # Limitations
//!
//! Subdirectories created after startup are not added to the polling set,
//! and symlinks or other non-regular files are never monitored, backed up,
//! or restored.

pub mod baseline;
pub mod config;
pub mod monitor;
pub mod poller;
pub mod probe;
pub mod response;
pub mod store;

pub use baseline::Baseline;
pub use config::{Config, ExtensionFilter};
pub use monitor::Monitor;
pub use probe::FileRecord;
pub use response::{Alert, AlertDispatcher, AlertHandle, ResponseEngine, Severity};
pub use store::{BackupStore, QuarantineStore};
