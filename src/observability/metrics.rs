//! Metrics collection and exposition.
//!
//! # Metrics
//! - `shutdown_notifications_total` (counter): notifications by watcher
//! - `shutdown_watcher_errors_total` (counter): watcher failures by watcher
//! - `shutdown_forced_exits_total` (counter): forced exits by reason
//!
//! Counters are no-ops until a recorder is installed.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Why the process was forced to exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForcedExit {
    /// The grace period elapsed.
    Timeout,
    /// A second notification arrived.
    Force,
}

impl ForcedExit {
    pub fn as_str(self) -> &'static str {
        match self {
            ForcedExit::Timeout => "timeout",
            ForcedExit::Force => "force",
        }
    }
}

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_notification(watcher: &str) {
    metrics::counter!("shutdown_notifications_total", "watcher" => watcher.to_string()).increment(1);
}

pub fn record_watcher_error(watcher: &str) {
    metrics::counter!("shutdown_watcher_errors_total", "watcher" => watcher.to_string()).increment(1);
}

pub fn record_forced_exit(reason: ForcedExit) {
    metrics::counter!("shutdown_forced_exits_total", "reason" => reason.as_str()).increment(1);
}
