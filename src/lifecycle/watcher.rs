//! The watcher contract.
//!
//! A watcher is a unit of shutdown-trigger logic. It runs once, receives the
//! shared [`ShutdownContext`] and a [`Notifier`], and reports through the
//! notifier:
//!
//! - no notification: quiescent, never triggers shutdown
//! - one notification: graceful shutdown request
//! - a second notification: force exit, bypassing the grace period
//!
//! Returning an error without notifying completes the context with that error
//! as cause but never escalates to a forced exit.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::lifecycle::context::{BoxError, Cause, ShutdownContext};

/// Message sent from a watcher to its supervision loop.
pub(crate) type Notification = Option<Cause>;

/// A unit of shutdown-trigger logic.
#[async_trait]
pub trait Watcher: Send + 'static {
    /// Label used in logs and metrics.
    fn name(&self) -> &str {
        "watcher"
    }

    /// Run until done or until `ctx` completes.
    ///
    /// The notifier is dropped when this returns, which tells the
    /// supervision loop no further notifications will arrive.
    async fn watch(
        self: Box<Self>,
        ctx: ShutdownContext,
        notifier: Notifier,
    ) -> Result<(), BoxError>;
}

/// Outbound half of a watcher's notification channel.
#[derive(Debug)]
pub struct Notifier {
    tx: mpsc::Sender<Notification>,
}

impl Notifier {
    /// Create a notifier and the receiving end read by the supervision loop.
    pub(crate) fn channel() -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(1);
        (Self { tx }, rx)
    }

    /// Request shutdown with a reason.
    ///
    /// Waits while a previous notification is still pending. Does nothing if
    /// the supervision loop has already stopped listening.
    pub async fn notify<E>(&self, reason: E)
    where
        E: Into<BoxError>,
    {
        let cause: Cause = Arc::from(reason.into());
        let _ = self.tx.send(Some(cause)).await;
    }

    /// Request shutdown without a reason.
    pub async fn notify_empty(&self) {
        let _ = self.tx.send(None).await;
    }

    /// Whether the supervision loop has stopped listening.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Watcher backed by a closure.
pub struct FnWatcher<F> {
    f: F,
}

/// Build a watcher from an async closure.
///
/// ```no_run
/// use shutdown_watch::{watcher_fn, ShutdownContext, Notifier};
///
/// let watcher = watcher_fn(|_ctx: ShutdownContext, notifier: Notifier| async move {
///     notifier.notify("shutdown").await;
///     Ok(())
/// });
/// ```
pub fn watcher_fn<F, Fut>(f: F) -> FnWatcher<F>
where
    F: FnOnce(ShutdownContext, Notifier) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    FnWatcher { f }
}

#[async_trait]
impl<F, Fut> Watcher for FnWatcher<F>
where
    F: FnOnce(ShutdownContext, Notifier) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    fn name(&self) -> &str {
        "fn"
    }

    async fn watch(
        self: Box<Self>,
        ctx: ShutdownContext,
        notifier: Notifier,
    ) -> Result<(), BoxError> {
        (self.f)(ctx, notifier).await
    }
}

/// A watcher with an explicit name.
pub struct Named<W> {
    name: String,
    inner: W,
}

/// Give a watcher a name for logs and metrics.
pub fn named<W: Watcher>(name: impl Into<String>, inner: W) -> Named<W> {
    Named {
        name: name.into(),
        inner,
    }
}

#[async_trait]
impl<W: Watcher> Watcher for Named<W> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn watch(
        self: Box<Self>,
        ctx: ShutdownContext,
        notifier: Notifier,
    ) -> Result<(), BoxError> {
        Box::new(self.inner).watch(ctx, notifier).await
    }
}
