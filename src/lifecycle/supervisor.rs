//! Per-watcher supervision loop.
//!
//! # States
//! - Waiting: no notification yet
//! - Grace: shutdown requested, teardown in progress
//! - Done: exited quietly, or forced the process to exit
//!
//! # State Transitions
//! ```text
//! Waiting → Done:  context completed elsewhere, or channel closed unused
//! Waiting → Grace: first notification (context completed with its cause)
//! Grace → Done:    grace period elapsed          → exit(timeout code)
//! Grace → Done:    second notification           → exit(force code)
//! Grace → Done:    channel closed, no grace set  → nothing
//! Grace → Grace:   channel closed, grace set     → keep waiting on the deadline
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::lifecycle::context::ShutdownContext;
use crate::lifecycle::exit::Exiter;
use crate::lifecycle::until;
use crate::lifecycle::watcher::Notification;
use crate::observability::logging::Logger;
use crate::observability::metrics::{self, ForcedExit};

/// How a supervision loop escalates once shutdown has been requested.
#[derive(Clone)]
pub(crate) struct Escalation {
    pub logger: Arc<dyn Logger>,
    pub exit: Arc<dyn Exiter>,
    pub force_exit_code: i32,
    pub timeout_exit_code: i32,
    pub grace_period: Option<Duration>,
}

/// How a supervision loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// Another watcher or the owner completed the context first.
    Preempted,
    /// The watcher finished without notifying.
    Quiescent,
    /// Shutdown was requested and the watcher finished without escalating.
    Graceful,
    /// The exit function was invoked.
    Forced(ForcedExit),
}

/// Drive one watcher's notifications through the escalation state machine.
pub(crate) async fn supervise(
    name: &str,
    policy: &Escalation,
    ctx: &ShutdownContext,
    mut rx: mpsc::Receiver<Notification>,
) -> Outcome {
    let first = tokio::select! {
        _ = ctx.done() => return Outcome::Preempted,
        received = rx.recv() => match received {
            Some(notification) => notification,
            None => return Outcome::Quiescent,
        },
    };

    metrics::record_notification(name);
    if let Some(cause) = &first {
        policy.logger.log(&cause.to_string());
    }
    ctx.cancel_with(first);
    tracing::debug!(watcher = name, grace_period = ?policy.grace_period, "Shutdown requested");

    let deadline = policy.grace_period.map(|grace| Instant::now() + grace);
    let mut listening = true;

    loop {
        tokio::select! {
            _ = until(deadline) => {
                policy.logger.log("shutdown timeout reached, force exit");
                return force(policy, ForcedExit::Timeout);
            }
            received = rx.recv(), if listening => match received {
                Some(notification) => {
                    metrics::record_notification(name);
                    if let Some(cause) = notification {
                        policy.logger.log(&cause.to_string());
                    }
                    return force(policy, ForcedExit::Force);
                }
                None if deadline.is_some() => listening = false,
                None => return Outcome::Graceful,
            },
        }
    }
}

fn force(policy: &Escalation, reason: ForcedExit) -> Outcome {
    let code = match reason {
        ForcedExit::Timeout => policy.timeout_exit_code,
        ForcedExit::Force => policy.force_exit_code,
    };
    metrics::record_forced_exit(reason);
    policy.exit.exit(code);
    Outcome::Forced(reason)
}
