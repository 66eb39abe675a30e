//! Option assembly.
//!
//! A [`ShutdownConfig`] starts from defaults and is changed by applying
//! [`ShutdownOption`]s in order. Scalar options follow last-applied-wins;
//! watcher lists accumulate.

use std::sync::Arc;
use std::time::Duration;

use crate::lifecycle::context::ShutdownContext;
use crate::lifecycle::exit::{Exiter, ProcessExit};
use crate::lifecycle::signals::{OsSignals, Signal, SignalSource};
use crate::lifecycle::watcher::Watcher;
use crate::observability::logging::{Logger, NoopLogger, TracingLogger};

/// Exit code used for both forced and timed-out exits unless overridden.
pub const DEFAULT_EXIT_CODE: i32 = 1;

/// Resolved orchestrator configuration.
pub struct ShutdownConfig {
    pub(crate) parent: Option<ShutdownContext>,
    pub(crate) logger: Arc<dyn Logger>,
    pub(crate) signals: Vec<Signal>,
    pub(crate) signal_source: Arc<dyn SignalSource>,
    pub(crate) double_signal: bool,
    pub(crate) exit: Arc<dyn Exiter>,
    pub(crate) force_exit_code: i32,
    pub(crate) timeout_exit_code: i32,
    pub(crate) grace_period: Option<Duration>,
    pub(crate) watchers: Vec<Box<dyn Watcher>>,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            parent: None,
            logger: Arc::new(TracingLogger),
            signals: Signal::DEFAULT.to_vec(),
            signal_source: Arc::new(OsSignals),
            double_signal: false,
            exit: Arc::new(ProcessExit),
            force_exit_code: DEFAULT_EXIT_CODE,
            timeout_exit_code: DEFAULT_EXIT_CODE,
            grace_period: None,
            watchers: Vec::new(),
        }
    }
}

impl ShutdownConfig {
    /// Apply `options` in order.
    pub fn apply<I>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = ShutdownOption>,
    {
        for option in options {
            option.apply_to(&mut self);
        }
        self
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn double_signal(&self) -> bool {
        self.double_signal
    }

    pub fn force_exit_code(&self) -> i32 {
        self.force_exit_code
    }

    pub fn timeout_exit_code(&self) -> i32 {
        self.timeout_exit_code
    }

    /// `None` means shutdown may take forever.
    pub fn grace_period(&self) -> Option<Duration> {
        self.grace_period
    }

    /// Number of user watchers registered so far.
    pub fn watcher_count(&self) -> usize {
        self.watchers.len()
    }
}

impl std::fmt::Debug for ShutdownConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownConfig")
            .field("parent", &self.parent)
            .field("signals", &self.signals)
            .field("double_signal", &self.double_signal)
            .field("force_exit_code", &self.force_exit_code)
            .field("timeout_exit_code", &self.timeout_exit_code)
            .field("grace_period", &self.grace_period)
            .field("watchers", &self.watchers.len())
            .finish_non_exhaustive()
    }
}

/// A single named change to a [`ShutdownConfig`].
pub enum ShutdownOption {
    /// Derive the shared context from this one. Default: a fresh root.
    Context(ShutdownContext),
    /// Receiver of escalation messages. Default: [`TracingLogger`].
    Logger(Arc<dyn Logger>),
    /// Drop all escalation messages.
    WithoutLog,
    /// Signals for the built-in watcher. Default: SIGINT and SIGTERM.
    Signals(Vec<Signal>),
    /// Disable the built-in signal watcher.
    WithoutSignals,
    /// Where signals come from. Default: [`OsSignals`].
    SignalSource(Arc<dyn SignalSource>),
    /// Force exit when a second signal arrives.
    DoubleSignal,
    /// Called with the exit code on escalation. Default: [`ProcessExit`].
    Exit(Arc<dyn Exiter>),
    /// Code for exits forced by a second notification. Default: 1.
    ForceExitCode(i32),
    /// Bound on graceful shutdown. Zero means unbounded, the default.
    GracePeriod(Duration),
    /// Code for exits forced by the grace period. Default: 1.
    TimeoutExitCode(i32),
    /// Additional watchers, appended to any already registered.
    Watchers(Vec<Box<dyn Watcher>>),
}

impl ShutdownOption {
    pub fn logger(logger: impl Logger + 'static) -> Self {
        ShutdownOption::Logger(Arc::new(logger))
    }

    pub fn signals(signals: impl IntoIterator<Item = Signal>) -> Self {
        ShutdownOption::Signals(signals.into_iter().collect())
    }

    pub fn signal_source(source: impl SignalSource + 'static) -> Self {
        ShutdownOption::SignalSource(Arc::new(source))
    }

    pub fn exit(exit: impl Exiter + 'static) -> Self {
        ShutdownOption::Exit(Arc::new(exit))
    }

    pub fn watcher(watcher: impl Watcher) -> Self {
        ShutdownOption::Watchers(vec![Box::new(watcher)])
    }

    fn apply_to(self, cfg: &mut ShutdownConfig) {
        match self {
            ShutdownOption::Context(parent) => cfg.parent = Some(parent),
            ShutdownOption::Logger(logger) => cfg.logger = logger,
            ShutdownOption::WithoutLog => cfg.logger = Arc::new(NoopLogger),
            ShutdownOption::Signals(signals) => cfg.signals = signals,
            ShutdownOption::WithoutSignals => cfg.signals.clear(),
            ShutdownOption::SignalSource(source) => cfg.signal_source = source,
            ShutdownOption::DoubleSignal => cfg.double_signal = true,
            ShutdownOption::Exit(exit) => cfg.exit = exit,
            ShutdownOption::ForceExitCode(code) => cfg.force_exit_code = code,
            ShutdownOption::GracePeriod(grace) => {
                cfg.grace_period = (!grace.is_zero()).then_some(grace)
            }
            ShutdownOption::TimeoutExitCode(code) => cfg.timeout_exit_code = code,
            ShutdownOption::Watchers(mut watchers) => cfg.watchers.append(&mut watchers),
        }
    }
}
