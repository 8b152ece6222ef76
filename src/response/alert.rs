//! Best-effort alert dispatch
//!
//! Recovery never waits on alert delivery: [`AlertHandle::send`] logs
//! locally and enqueues, and a separate [`AlertDispatcher`] task owns the
//! HTTP client. A slow or unreachable receiver can therefore never delay a
//! restore or quarantine already in flight.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Client timeout for the outbound alert call, the only timeout in the
/// system.
const ALERT_TIMEOUT: Duration = Duration::from_secs(5);

/// Severity tag carried in the outbound alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

/// A single alert event.
#[derive(Debug, Clone)]
pub struct Alert {
    pub severity: Severity,
    pub message: String,
}

/// Cloneable producer side handed to the response engine.
#[derive(Clone)]
pub struct AlertHandle {
    tx: mpsc::UnboundedSender<Alert>,
}

impl AlertHandle {
    /// Report locally and enqueue for delivery.
    pub fn send(&self, severity: Severity, message: impl Into<String>) {
        let message = message.into();

        match severity {
            Severity::Info => info!("[ALERT] {}", message),
            Severity::Warning => warn!("[ALERT] {}", message),
            Severity::Critical => error!("[ALERT] {}", message),
        }

        // A closed channel means shutdown is already in progress.
        let _ = self.tx.send(Alert { severity, message });
    }
}

/// Create the alert queue. The receiver feeds an [`AlertDispatcher`].
pub fn channel() -> (AlertHandle, mpsc::UnboundedReceiver<Alert>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (AlertHandle { tx }, rx)
}

/// Consumes queued alerts and forwards each as a single HTTP GET to the
/// configured receiver. Delivery failures are logged and dropped; they
/// never block or reverse the recovery action already taken.
pub struct AlertDispatcher {
    rx: mpsc::UnboundedReceiver<Alert>,
    endpoint: Option<String>,
    client: reqwest::Client,
}

impl AlertDispatcher {
    /// `endpoint` is `host:port`; `None` disables outbound delivery
    /// entirely (local reporting happens at the send site).
    pub fn new(
        rx: mpsc::UnboundedReceiver<Alert>,
        endpoint: Option<String>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(ALERT_TIMEOUT).build()?;

        Ok(Self {
            rx,
            endpoint,
            client,
        })
    }

    /// Drain the queue until cancellation or until every handle is dropped.
    pub async fn run(mut self, token: CancellationToken) {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                alert = self.rx.recv() => match alert {
                    Some(alert) => self.deliver(&alert).await,
                    None => break,
                },
            }
        }
    }

    async fn deliver(&self, alert: &Alert) {
        let Some(endpoint) = &self.endpoint else {
            return;
        };

        let url = format!("http://{endpoint}/api/agent/edr-alert");
        let result = self
            .client
            .get(&url)
            .query(&[
                ("type", alert.severity.as_str()),
                ("message", alert.message.as_str()),
            ])
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                info!("alert delivered: {}", alert.message);
            }
            Ok(resp) => {
                error!("alert receiver returned HTTP {}", resp.status());
            }
            Err(e) => {
                error!("alert delivery failed: {}", e);
            }
        }
    }
}
