//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML)
//!     → loader.rs (parse & deserialize into ShutdownSettings)
//!     → validation.rs (semantic checks)
//!     → schema.rs (settings → ShutdownOption list)
//!     → options.rs (defaults + options applied in order → ShutdownConfig)
//!     → read-only once watchers are spawned
//! ```
//!
//! # Design Decisions
//! - Options apply in order: scalars last-applied-wins, watchers accumulate
//! - All settings have defaults to allow minimal files
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod options;
pub mod schema;
pub mod validation;

pub use loader::{load_settings, ConfigError};
pub use options::{ShutdownConfig, ShutdownOption};
pub use schema::ShutdownSettings;
pub use validation::ValidationError;
