#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`RunnerError`)
//! - [`config`]: Runner configuration (`RunnerConfig`, builder)
//! - [`types`]: Cases, verdicts and reports (`TestCase`, `RunResult`, `SuiteReport`)
//! - [`event`]: Case progress events (`CaseEvent`)
//! - [`engine`]: Engine contract (`ProvisioningEngine`), `TerraformEngine`, `format_args`
//! - [`workspace`]: Scoped per-case working directories (`CaseWorkspace`)
//! - [`runner`]: Orchestrator (`SuiteRunner`, `SuiteRunnerBuilder`)
//!
//! # Architecture
//!
//! ```text
//! RunnerConfig.cases --> SuiteRunner --spawn per case--> CaseWorkspace
//!                            |                                |
//!                       Semaphore(max_parallel)        engine.initialize
//!                            |                                |
//!                       JoinHandles (listed order)     engine.plan
//!                            |                                |
//!                       SuiteReport <------------------ RunResult
//!                                                             |
//!                                              CaseEvent --> mpsc (optional)
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod runner;
pub mod types;
pub mod workspace;

// --- Public API Re-exports ---

// Runner (main orchestrator)
pub use runner::{SuiteRunner, SuiteRunnerBuilder};

// Configuration
pub use config::{RunnerConfig, RunnerConfigBuilder};

// Error
pub use error::RunnerError;

// Events
pub use event::CaseEvent;

// Engine
pub use engine::{EngineOptions, ProvisioningEngine, TerraformEngine, format_args};

// Types
pub use types::{
    CaseState, Diagnostic, DiagnosticKind, PlanOutput, RunResult, SuiteReport, TestCase,
};

// Workspace
pub use workspace::CaseWorkspace;
