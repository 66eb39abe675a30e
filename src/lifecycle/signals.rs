//! OS signal handling.
//!
//! # Responsibilities
//! - Name the signals a process can be asked to stop with
//! - Subscribe to them through a replaceable [`SignalSource`]
//! - Turn deliveries into watcher notifications, optionally escalating on a
//!   second delivery
//!
//! # Design Decisions
//! - Subscriptions are made by the orchestrator before it returns, so a signal
//!   sent right after startup is never missed
//! - The subscription is owned by the watcher and dropped on every exit path;
//!   on unix the signal's default action applies again once no subscription
//!   remains
//! - The double-signal window is bounded by the grace period, computed once

use std::fmt;
use std::io;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;

use crate::lifecycle::context::{BoxError, ShutdownContext};
use crate::lifecycle::watcher::{Notifier, Watcher};

/// A signal the built-in watcher can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Signal {
    Interrupt,
    Terminate,
    Hangup,
    Quit,
    User1,
    User2,
    /// Any other signal by number.
    Raw(i32),
}

impl Signal {
    /// Signals watched when none are configured.
    pub const DEFAULT: [Signal; 2] = [Signal::Interrupt, Signal::Terminate];
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Interrupt => f.write_str("SIGINT"),
            Signal::Terminate => f.write_str("SIGTERM"),
            Signal::Hangup => f.write_str("SIGHUP"),
            Signal::Quit => f.write_str("SIGQUIT"),
            Signal::User1 => f.write_str("SIGUSR1"),
            Signal::User2 => f.write_str("SIGUSR2"),
            Signal::Raw(n) => write!(f, "signal {}", n),
        }
    }
}

/// Error parsing a signal name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseSignalError {
    #[error("unknown signal `{0}`")]
    Unknown(String),
    #[error("signal `{0}` cannot be caught")]
    Uncatchable(String),
}

impl FromStr for Signal {
    type Err = ParseSignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(n) = trimmed.parse::<i32>() {
            return Ok(Signal::Raw(n));
        }

        let upper = trimmed.to_ascii_uppercase();
        let name = upper.strip_prefix("SIG").unwrap_or(&upper);
        match name {
            "INT" | "INTERRUPT" => Ok(Signal::Interrupt),
            "TERM" | "TERMINATE" => Ok(Signal::Terminate),
            "HUP" | "HANGUP" => Ok(Signal::Hangup),
            "QUIT" => Ok(Signal::Quit),
            "USR1" => Ok(Signal::User1),
            "USR2" => Ok(Signal::User2),
            "KILL" | "STOP" => Err(ParseSignalError::Uncatchable(s.to_string())),
            _ => Err(ParseSignalError::Unknown(s.to_string())),
        }
    }
}

impl TryFrom<String> for Signal {
    type Error = ParseSignalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Signal> for String {
    fn from(signal: Signal) -> Self {
        match signal {
            Signal::Raw(n) => n.to_string(),
            other => other.to_string(),
        }
    }
}

/// Notification reasons sent by the built-in signal watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignalNotice {
    #[error("signal {0} received")]
    Received(Signal),
    #[error("second {0} signal received")]
    Repeated(Signal),
}

/// Where signal deliveries come from.
pub trait SignalSource: Send + Sync {
    /// Start receiving `signals`. Deliveries before this call are not seen.
    fn subscribe(&self, signals: &[Signal]) -> io::Result<Box<dyn SignalStream>>;
}

/// An active subscription. Dropping it releases the subscription.
#[async_trait]
pub trait SignalStream: Send {
    /// Wait for the next delivery. `None` once no more can arrive.
    async fn recv(&mut self) -> Option<Signal>;
}

/// Operating system signals via Tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsSignals;

#[cfg(unix)]
mod os {
    use super::*;
    use std::collections::hash_map::Entry;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex, OnceLock, PoisonError};

    use futures_util::future::select_all;
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM, SIGUSR1, SIGUSR2};
    use signal_hook::flag;
    use tokio::signal::unix::{signal, SignalKind};

    impl Signal {
        fn number(self) -> i32 {
            match self {
                Signal::Interrupt => SIGINT,
                Signal::Terminate => SIGTERM,
                Signal::Hangup => SIGHUP,
                Signal::Quit => SIGQUIT,
                Signal::User1 => SIGUSR1,
                Signal::User2 => SIGUSR2,
                Signal::Raw(n) => n,
            }
        }

        fn kind(self) -> SignalKind {
            SignalKind::from_raw(self.number())
        }
    }

    /// Tokio never uninstalls its handlers, so once the last subscription to a
    /// signal is gone a conditional handler emulates the default action.
    struct Fallback {
        active: usize,
        armed: Arc<AtomicBool>,
    }

    fn fallbacks() -> &'static Mutex<HashMap<i32, Fallback>> {
        static FALLBACKS: OnceLock<Mutex<HashMap<i32, Fallback>>> = OnceLock::new();
        FALLBACKS.get_or_init(Default::default)
    }

    fn hold(sig: Signal) -> io::Result<()> {
        let mut fallbacks = fallbacks().lock().unwrap_or_else(PoisonError::into_inner);
        let fallback = match fallbacks.entry(sig.number()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let armed = Arc::new(AtomicBool::new(false));
                flag::register_conditional_default(sig.number(), Arc::clone(&armed))?;
                entry.insert(Fallback { active: 0, armed })
            }
        };
        fallback.active += 1;
        fallback.armed.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn release(sig: Signal) {
        let mut fallbacks = fallbacks().lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(fallback) = fallbacks.get_mut(&sig.number()) {
            fallback.active = fallback.active.saturating_sub(1);
            if fallback.active == 0 {
                fallback.armed.store(true, Ordering::SeqCst);
                tracing::debug!(signal = %sig, "Default signal action restored");
            }
        }
    }

    pub(super) struct UnixSignals {
        streams: Vec<(Signal, tokio::signal::unix::Signal)>,
    }

    impl Drop for UnixSignals {
        fn drop(&mut self) {
            for (sig, _) in &self.streams {
                release(*sig);
            }
        }
    }

    impl SignalSource for OsSignals {
        fn subscribe(&self, signals: &[Signal]) -> io::Result<Box<dyn SignalStream>> {
            // Partial subscriptions are released by `Drop` on error.
            let mut subscription = UnixSignals {
                streams: Vec::with_capacity(signals.len()),
            };
            for &sig in signals {
                let stream = signal(sig.kind())?;
                hold(sig)?;
                subscription.streams.push((sig, stream));
            }
            Ok(Box::new(subscription))
        }
    }

    #[async_trait]
    impl SignalStream for UnixSignals {
        async fn recv(&mut self) -> Option<Signal> {
            if self.streams.is_empty() {
                return None;
            }

            let pending = self.streams.iter_mut().map(|(sig, stream)| {
                let sig = *sig;
                Box::pin(async move { stream.recv().await.map(|()| sig) })
            });
            let (received, _, _) = select_all(pending).await;
            received
        }
    }

}

#[cfg(not(unix))]
mod os {
    use super::*;

    pub(super) struct CtrlCSignals {
        inner: tokio::signal::windows::CtrlC,
    }

    impl SignalSource for OsSignals {
        fn subscribe(&self, signals: &[Signal]) -> io::Result<Box<dyn SignalStream>> {
            if let Some(sig) = signals.iter().find(|s| **s != Signal::Interrupt) {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    format!("{} is not supported on this platform", sig),
                ));
            }
            Ok(Box::new(CtrlCSignals {
                inner: tokio::signal::windows::ctrl_c()?,
            }))
        }
    }

    #[async_trait]
    impl SignalStream for CtrlCSignals {
        async fn recv(&mut self) -> Option<Signal> {
            self.inner.recv().await.map(|()| Signal::Interrupt)
        }
    }
}

/// Built-in watcher translating signal deliveries into notifications.
pub struct SignalWatcher {
    stream: Box<dyn SignalStream>,
    double_signal: bool,
    window: Option<Duration>,
}

impl SignalWatcher {
    /// Subscribe to `signals` right away.
    ///
    /// With `double_signal`, a second delivery within `window` (unbounded when
    /// `None`) is reported as an urgent notification.
    pub fn subscribe(
        source: &dyn SignalSource,
        signals: &[Signal],
        double_signal: bool,
        window: Option<Duration>,
    ) -> io::Result<Self> {
        Ok(Self {
            stream: source.subscribe(signals)?,
            double_signal,
            window,
        })
    }
}

#[async_trait]
impl Watcher for SignalWatcher {
    fn name(&self) -> &str {
        "signals"
    }

    async fn watch(
        self: Box<Self>,
        ctx: ShutdownContext,
        notifier: Notifier,
    ) -> Result<(), BoxError> {
        let SignalWatcher {
            mut stream,
            double_signal,
            window,
        } = *self;

        let first = tokio::select! {
            _ = ctx.done() => return Ok(()),
            received = stream.recv() => received,
        };

        // The source is gone; nothing more can be delivered.
        let Some(first) = first else {
            ctx.done().await;
            return Ok(());
        };

        tracing::debug!(signal = %first, "Signal received");
        notifier.notify(SignalNotice::Received(first)).await;

        if !double_signal {
            return Ok(());
        }

        // The shared context is already complete at this point, so only the
        // window bounds the wait for a second delivery.
        let deadline = window.map(|window| Instant::now() + window);
        tokio::select! {
            _ = super::until(deadline) => {
                tracing::debug!("Double-signal window closed");
            }
            Some(second) = stream.recv() => {
                tracing::debug!(signal = %second, "Second signal received");
                notifier.notify(SignalNotice::Repeated(second)).await;
            }
        }

        Ok(())
    }
}
