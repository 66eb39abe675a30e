//! Configuration file schema.
//!
//! File-based settings cover the scalar options. Watchers, loggers and exit
//! functions are code and can only be supplied as [`ShutdownOption`]s.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::options::{ShutdownOption, DEFAULT_EXIT_CODE};
use crate::lifecycle::signals::Signal;

/// Shutdown settings as read from a TOML file.
///
/// ```toml
/// signals = ["SIGINT", "SIGTERM"]
/// double_signal = true
/// grace_period_secs = 30
/// force_exit_code = 1
/// timeout_exit_code = 1
/// log = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShutdownSettings {
    /// Signals for the built-in watcher. Empty disables it.
    pub signals: Vec<Signal>,

    /// Force exit on a second signal.
    pub double_signal: bool,

    /// Grace period in seconds (0 = unbounded).
    pub grace_period_secs: u64,

    /// Exit code after a second notification.
    pub force_exit_code: i32,

    /// Exit code after the grace period elapses.
    pub timeout_exit_code: i32,

    /// Emit escalation messages.
    pub log: bool,
}

impl Default for ShutdownSettings {
    fn default() -> Self {
        Self {
            signals: Signal::DEFAULT.to_vec(),
            double_signal: false,
            grace_period_secs: 0,
            force_exit_code: DEFAULT_EXIT_CODE,
            timeout_exit_code: DEFAULT_EXIT_CODE,
            log: true,
        }
    }
}

impl ShutdownSettings {
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    /// Equivalent options, to be applied before any overrides.
    pub fn into_options(self) -> Vec<ShutdownOption> {
        let mut options = vec![
            ShutdownOption::GracePeriod(self.grace_period()),
            ShutdownOption::ForceExitCode(self.force_exit_code),
            ShutdownOption::TimeoutExitCode(self.timeout_exit_code),
            ShutdownOption::Signals(self.signals),
        ];
        if self.double_signal {
            options.push(ShutdownOption::DoubleSignal);
        }
        if !self.log {
            options.push(ShutdownOption::WithoutLog);
        }
        options
    }
}
