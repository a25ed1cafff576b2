//! plancheck shared foundations.
//!
//! - [`error`]: top-level error taxonomy (`PlancheckError` and its domains)
//! - [`config`]: `plancheck.toml` loading, env overrides and validation
//! - [`metrics`]: metric names shared by the runner and the CLI

pub mod config;
pub mod error;
pub mod metrics;

// --- re-exports ---

pub use config::{CaseEntry, CaseSpec, EngineConfig, GeneralConfig, PlancheckConfig, SuiteConfig};
pub use error::{ConfigError, EngineError, PlancheckError, SuiteError};
