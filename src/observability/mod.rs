//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Supervision loops produce:
//!     → logging.rs (escalation messages through the configured Logger)
//!     → metrics.rs (notification, failure and forced-exit counters)
//!     → tracing debug events for state transitions
//! ```
//!
//! # Design Decisions
//! - The Logger seam is separate from `tracing` so tests can capture messages
//! - Metrics are free when no recorder is installed

pub mod logging;
pub mod metrics;

pub use logging::{Logger, NoopLogger, TracingLogger};
