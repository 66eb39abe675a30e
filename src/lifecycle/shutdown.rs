//! Shutdown orchestration.
//!
//! [`watch`] turns a set of watchers into one shared [`ShutdownContext`] and
//! a [`ReleaseHandle`] for the owner.

use std::io;
use std::sync::Arc;

use futures_util::FutureExt;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::options::{ShutdownConfig, ShutdownOption};
use crate::lifecycle::context::ShutdownContext;
use crate::lifecycle::signals::{Signal, SignalWatcher};
use crate::lifecycle::supervisor::{self, Escalation};
use crate::lifecycle::watcher::{Notifier, Watcher};
use crate::observability::metrics;

/// Error starting the orchestrator.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to subscribe to signals {signals:?}: {source}")]
    SignalRegistration {
        signals: Vec<Signal>,
        #[source]
        source: io::Error,
    },
}

/// Completes the shared context without a cause.
///
/// Releasing is idempotent and never overwrites a cause recorded earlier.
#[derive(Debug, Clone)]
pub struct ReleaseHandle {
    ctx: ShutdownContext,
}

impl ReleaseHandle {
    pub fn release(&self) {
        if self.ctx.cancel() {
            tracing::debug!("Shutdown context released");
        }
    }
}

/// Start watching for shutdown.
///
/// Applies `options` over the defaults, adds the built-in signal watcher when
/// any signals are configured, and spawns one task per watcher. Returns once
/// every watcher has started running, so a signal sent right after this
/// returns is observed.
///
/// ```no_run
/// use std::time::Duration;
/// use shutdown_watch::{watch, ShutdownOption};
///
/// # async fn run() -> Result<(), shutdown_watch::WatchError> {
/// let (ctx, release) = watch([
///     ShutdownOption::DoubleSignal,
///     ShutdownOption::GracePeriod(Duration::from_secs(30)),
/// ])
/// .await?;
///
/// ctx.done().await;
/// // teardown
/// release.release();
/// # Ok(())
/// # }
/// ```
pub async fn watch<I>(options: I) -> Result<(ShutdownContext, ReleaseHandle), WatchError>
where
    I: IntoIterator<Item = ShutdownOption>,
{
    let mut cfg = ShutdownConfig::default().apply(options);

    let ctx = match &cfg.parent {
        Some(parent) => parent.child(),
        None => ShutdownContext::new(),
    };

    if !cfg.signals.is_empty() {
        let watcher = SignalWatcher::subscribe(
            cfg.signal_source.as_ref(),
            &cfg.signals,
            cfg.double_signal,
            cfg.grace_period,
        )
        .map_err(|source| WatchError::SignalRegistration {
            signals: cfg.signals.clone(),
            source,
        })?;
        cfg.watchers.push(Box::new(watcher));
    }

    let policy = Arc::new(Escalation {
        logger: cfg.logger.clone(),
        exit: cfg.exit.clone(),
        force_exit_code: cfg.force_exit_code,
        timeout_exit_code: cfg.timeout_exit_code,
        grace_period: cfg.grace_period,
    });

    tracing::debug!(
        watchers = cfg.watchers.len(),
        signals = ?cfg.signals,
        double_signal = cfg.double_signal,
        grace_period = ?cfg.grace_period,
        "Starting shutdown watchers"
    );

    let (started_tx, mut started_rx) = mpsc::channel::<()>(1);
    for watcher in cfg.watchers.drain(..) {
        tokio::spawn(run_watcher(
            watcher,
            ctx.clone(),
            policy.clone(),
            started_tx.clone(),
        ));
    }
    drop(started_tx);

    // Every task drops its sender once its watcher has been polled.
    let _ = started_rx.recv().await;

    Ok((ctx.clone(), ReleaseHandle { ctx }))
}

async fn run_watcher(
    watcher: Box<dyn Watcher>,
    ctx: ShutdownContext,
    policy: Arc<Escalation>,
    started: mpsc::Sender<()>,
) {
    let name = watcher.name().to_string();
    let (notifier, rx) = Notifier::channel();

    let body = {
        let ctx = ctx.clone();
        let policy = policy.clone();
        let name = name.clone();
        async move {
            if let Err(err) = watcher.watch(ctx.clone(), notifier).await {
                metrics::record_watcher_error(&name);
                policy.logger.log(&format!("watcher error: {}", err));
                ctx.cancel_with(Some(Arc::from(err)));
            }
        }
    };
    let mut body = Box::pin(body);

    // Run the body up to its first suspension point before reporting started.
    let finished = (&mut body).now_or_never().is_some();
    drop(started);

    let outcome = if finished {
        supervisor::supervise(&name, &policy, &ctx, rx).await
    } else {
        let ((), outcome) = tokio::join!(body, supervisor::supervise(&name, &policy, &ctx, rx));
        outcome
    };

    tracing::debug!(watcher = %name, ?outcome, "Watcher finished");
}
