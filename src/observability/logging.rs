//! Structured logging.
//!
//! # Responsibilities
//! - Carry human-readable escalation messages to a replaceable [`Logger`]
//! - Initialize the tracing subscriber for binaries
//!
//! # Design Decisions
//! - The default logger forwards to `tracing` at error level
//! - Log level for the subscriber comes from `RUST_LOG`, with a fallback

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Receives escalation messages (notification reasons, watcher errors, timeouts).
pub trait Logger: Send + Sync {
    fn log(&self, message: &str);
}

impl<F> Logger for F
where
    F: Fn(&str) + Send + Sync,
{
    fn log(&self, message: &str) {
        self(message)
    }
}

/// Forwards messages to `tracing` as errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, message: &str) {
        tracing::error!(target: "shutdown_watch", "{}", message);
    }
}

/// Discards every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _message: &str) {}
}

/// Install a fmt subscriber filtered by `RUST_LOG`, or `default_filter` if unset.
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
