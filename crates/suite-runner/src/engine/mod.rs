//! Provisioning engine abstraction.
//!
//! The [`ProvisioningEngine`] trait is the only seam between the runner and
//! the external tool. The runner never spawns processes itself.
//!
//! ```text
//!   SuiteRunner
//!       |
//!       v
//!   ProvisioningEngine (trait)
//!       |
//!       +-- TerraformEngine   (tokio::process, `terraform` CLI)
//!       +-- MockEngine        (tests only)
//! ```
//!
//! # Implementations
//!
//! - [`TerraformEngine`]: production implementation spawning the engine binary
//! - `MockEngine`: scripted outcomes keyed by directory name (available in tests only)

pub mod args;
pub mod terraform;

use std::future::Future;
use std::path::Path;

use crate::types::{Diagnostic, PlanOutput};

pub use args::{EngineOptions, format_args};
pub use terraform::TerraformEngine;

/// External provisioning tool contract.
///
/// The trait is `Send + Sync + 'static` so one engine can be shared by every
/// case task behind an `Arc`.
pub trait ProvisioningEngine: Send + Sync + 'static {
    /// Prepares `dir` for planning (modules, providers, backend).
    ///
    /// Idempotent. Returns the captured output on success.
    ///
    /// # Errors
    ///
    /// - `Initialization`: missing directory, malformed configuration,
    ///   unreachable module or provider source
    /// - `Environment`: the engine could not be started
    fn initialize(&self, dir: &Path) -> impl Future<Output = Result<String, Diagnostic>> + Send;

    /// Evaluates the configuration in `dir` without changing anything.
    ///
    /// `args` are appended after the configured flags.
    ///
    /// # Errors
    ///
    /// - `Plan`: syntax errors, unresolved references, provider validation
    /// - `Environment`: the engine could not be started
    fn plan(
        &self,
        dir: &Path,
        args: &[String],
    ) -> impl Future<Output = Result<PlanOutput, Diagnostic>> + Send;

    /// Probes the engine and returns its version banner.
    ///
    /// # Errors
    ///
    /// Returns an `Environment` diagnostic when the engine is unusable.
    fn version(&self) -> impl Future<Output = Result<String, Diagnostic>> + Send;
}

#[cfg(test)]
pub use mock::MockEngine;
