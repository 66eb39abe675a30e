//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! watch(options) (shutdown.rs):
//!     Apply options → Subscribe to signals → Spawn one task per watcher
//!     → Wait until every watcher has started → Return (context, release)
//!
//! Per watcher task:
//!     watcher.rs (body) ──notifier──▶ supervisor.rs (escalation)
//!                                       → context.rs (complete with cause)
//!                                       → exit.rs (forced exit, on escalation)
//!
//! Signals (signals.rs):
//!     SIGINT/SIGTERM → graceful shutdown request
//!     Second signal (double-signal mode) → forced exit
//! ```
//!
//! # Design Decisions
//! - One task per watcher; the supervision loop runs inside the same task
//! - Shutdown has an optional deadline: forced exit once it passes
//! - Watchers never restart; each runs exactly once

pub mod context;
pub mod exit;
pub mod shutdown;
pub mod signals;
pub(crate) mod supervisor;
pub mod watcher;

pub use context::{BoxError, Cause, ShutdownContext};
pub use exit::{Exiter, ProcessExit};
pub use shutdown::{watch, ReleaseHandle, WatchError};
pub use signals::{OsSignals, Signal, SignalNotice, SignalSource, SignalStream, SignalWatcher};
pub use watcher::{named, watcher_fn, Notifier, Watcher};

use tokio::time::Instant;

/// Sleep until `deadline`, or forever when there is none.
pub(crate) async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
