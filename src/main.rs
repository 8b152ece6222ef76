//! Vigil - host-level file-integrity watchdog
//!
//! # Usage
//!
//! ```bash
//! # Monitor a web root, restoring from /tmp/vigil_workspace
//! vigil -m /var/www/html -b /tmp/vigil_workspace -e .php,.jsp
//!
//! # Same, forwarding alerts to a notification receiver
//! vigil -m /var/www/html -b /tmp/vigil_workspace -e .php -a 192.168.1.100:8080
//! ```

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;

use vigil::config::{Config, ExtensionFilter};
use vigil::monitor::Monitor;

#[derive(Parser)]
#[command(name = "vigil")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a YAML configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory tree to monitor
    #[arg(short = 'm', long)]
    watch_dir: Option<PathBuf>,

    /// Workspace root; backup_<ts> and isolate_<ts> are created under it
    #[arg(short = 'b', long)]
    base_dir: Option<PathBuf>,

    /// Comma-separated extension allow-list (e.g. .php,.js,.html)
    #[arg(short = 'e', long)]
    extensions: Option<String>,

    /// Alert receiver as host:port; omit to log alerts locally only
    #[arg(short = 'a', long)]
    endpoint: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn build_config(cli: Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            Config::load(path).with_context(|| format!("loading config {:?}", path))?
        }
        None => Config {
            watch_dir: PathBuf::new(),
            base_dir: PathBuf::new(),
            extensions: ExtensionFilter::default(),
            api_endpoint: None,
        },
    };

    if let Some(dir) = cli.watch_dir {
        config.watch_dir = dir;
    }
    if let Some(dir) = cli.base_dir {
        config.base_dir = dir;
    }
    if let Some(spec) = cli.extensions {
        config.extensions = ExtensionFilter::parse(&spec);
    }
    if let Some(endpoint) = cli.endpoint {
        config.api_endpoint = Some(endpoint);
    }

    if config.watch_dir.as_os_str().is_empty() {
        anyhow::bail!("no watch directory given (use -m or a config file)");
    }
    if config.base_dir.as_os_str().is_empty() {
        anyhow::bail!("no workspace root given (use -b or a config file)");
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = build_config(cli)?;
    let monitor = Monitor::new(config)?;

    let mut sigterm =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    let token = CancellationToken::new();
    let shutdown = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("received SIGINT, shutting down..."),
            _ = sigterm.recv() => info!("received SIGTERM, shutting down..."),
        }
        shutdown.cancel();
    });

    monitor.run(token).await
}
