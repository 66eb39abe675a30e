//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (exit codes, raw signal numbers)
//! - Detect duplicate signals
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ShutdownSettings → Result<(), Vec<ValidationError>>

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::ShutdownSettings;
use crate::lifecycle::signals::Signal;

/// A single semantic problem in the settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be between 0 and 255, got {value}")]
    ExitCodeOutOfRange { field: &'static str, value: i32 },
    #[error("signal {0} is listed more than once")]
    DuplicateSignal(Signal),
    #[error("raw signal number must be positive, got {0}")]
    InvalidSignalNumber(i32),
}

/// Check `settings` and report every problem found.
pub fn validate_settings(settings: &ShutdownSettings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (field, value) in [
        ("force_exit_code", settings.force_exit_code),
        ("timeout_exit_code", settings.timeout_exit_code),
    ] {
        if !(0..=255).contains(&value) {
            errors.push(ValidationError::ExitCodeOutOfRange { field, value });
        }
    }

    let mut seen = HashSet::new();
    for &signal in &settings.signals {
        if let Signal::Raw(n) = signal {
            if n <= 0 {
                errors.push(ValidationError::InvalidSignalNumber(n));
                continue;
            }
        }
        if !seen.insert(signal) {
            errors.push(ValidationError::DuplicateSignal(signal));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
