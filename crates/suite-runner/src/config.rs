//! Runner configuration.
//!
//! [`RunnerConfig`] is built from the core [`PlancheckConfig`] with
//! [`RunnerConfig::from_core`], or assembled programmatically with
//! [`RunnerConfigBuilder`].
//!
//! ```
//! use plancheck_suite_runner::{RunnerConfigBuilder, TestCase};
//!
//! let config = RunnerConfigBuilder::new()
//!     .root("fixtures")
//!     .max_parallel(2)
//!     .case(TestCase::new("ok-config"))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.cases.len(), 1);
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use plancheck_core::config::{MAX_PARALLEL_LIMIT, PlancheckConfig, normalize_path};

use crate::engine::EngineOptions;
use crate::error::RunnerError;
use crate::types::TestCase;

/// Settings for one suite runner.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Directory case paths are resolved against
    pub root: PathBuf,
    /// Copy each case into a private temporary directory before running it
    pub isolate_workdir: bool,
    /// Maximum number of cases running at once
    pub max_parallel: usize,
    /// Stop starting new cases after the first failure
    pub fail_fast: bool,
    /// Enabled cases in listed order
    pub cases: Vec<TestCase>,
    /// Extra arguments appended to every plan
    pub plan_args: Vec<String>,
    /// Engine invocation options
    pub engine: EngineOptions,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::from_core(&PlancheckConfig::default())
    }
}

impl RunnerConfig {
    /// Creates a runner config from the loaded `plancheck.toml`.
    ///
    /// Only enabled cases are carried over, in declaration order.
    pub fn from_core(core: &PlancheckConfig) -> Self {
        let cases = core
            .suite
            .enabled_cases()
            .into_iter()
            .map(|(name, path)| TestCase::named(name, path))
            .collect();

        Self {
            root: PathBuf::from(&core.suite.root),
            isolate_workdir: core.suite.isolate_workdir,
            max_parallel: core.suite.max_parallel,
            fail_fast: core.suite.fail_fast,
            cases,
            plan_args: Vec::new(),
            engine: EngineOptions::from_core(&core.engine),
        }
    }

    /// Resolves a case path against the suite root, normalized lexically.
    ///
    /// `network`, `./network` and `<root>/network` resolve to the same path.
    pub fn resolve(&self, case: &TestCase) -> PathBuf {
        normalize_path(&self.root.join(Path::new(&case.path)))
    }

    /// Validates the configuration.
    ///
    /// # Rules
    ///
    /// - `root`: must not be empty
    /// - `max_parallel`: 1-256
    /// - `engine.binary`: must not be empty
    /// - `cases`: names unique and non-empty, paths non-empty and unique once resolved
    pub fn validate(&self) -> Result<(), RunnerError> {
        if self.root.as_os_str().is_empty() {
            return Err(RunnerError::Config {
                field: "root".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.max_parallel == 0 || self.max_parallel > MAX_PARALLEL_LIMIT {
            return Err(RunnerError::Config {
                field: "max_parallel".to_owned(),
                reason: format!("must be 1-{MAX_PARALLEL_LIMIT}"),
            });
        }

        if self.engine.binary.trim().is_empty() {
            return Err(RunnerError::Config {
                field: "engine.binary".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        self.validate_cases()
    }

    /// Checks case names and paths for emptiness and duplicates.
    fn validate_cases(&self) -> Result<(), RunnerError> {
        let mut names = HashSet::new();
        let mut paths = HashSet::new();
        for case in &self.cases {
            if case.name.trim().is_empty() {
                return Err(RunnerError::Config {
                    field: "cases".to_owned(),
                    reason: "case name must not be empty".to_owned(),
                });
            }
            if case.path.is_empty() {
                return Err(RunnerError::Config {
                    field: format!("cases.{}", case.name),
                    reason: "path must not be empty".to_owned(),
                });
            }
            if !names.insert(case.name.as_str()) {
                return Err(RunnerError::Config {
                    field: format!("cases.{}", case.name),
                    reason: "duplicate case name".to_owned(),
                });
            }
            if !paths.insert(self.resolve(case)) {
                return Err(RunnerError::Config {
                    field: format!("cases.{}", case.name),
                    reason: format!("path '{}' is listed more than once", case.path),
                });
            }
        }
        Ok(())
    }
}

/// Builder for [`RunnerConfig`].
#[derive(Debug, Default)]
pub struct RunnerConfigBuilder {
    config: RunnerConfig,
}

impl RunnerConfigBuilder {
    /// Creates a builder with default settings and no cases.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the suite root.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.root = root.into();
        self
    }

    /// Enables or disables per-case workspace isolation.
    pub fn isolate_workdir(mut self, isolate: bool) -> Self {
        self.config.isolate_workdir = isolate;
        self
    }

    /// Sets the concurrency limit.
    pub fn max_parallel(mut self, max: usize) -> Self {
        self.config.max_parallel = max;
        self
    }

    /// Enables fail-fast scheduling.
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.config.fail_fast = fail_fast;
        self
    }

    /// Replaces the case list.
    pub fn cases(mut self, cases: Vec<TestCase>) -> Self {
        self.config.cases = cases;
        self
    }

    /// Appends one case.
    pub fn case(mut self, case: TestCase) -> Self {
        self.config.cases.push(case);
        self
    }

    /// Sets extra plan arguments.
    pub fn plan_args(mut self, args: Vec<String>) -> Self {
        self.config.plan_args = args;
        self
    }

    /// Sets engine options.
    pub fn engine(mut self, engine: EngineOptions) -> Self {
        self.config.engine = engine;
        self
    }

    /// Validates and builds the config.
    ///
    /// # Errors
    ///
    /// Returns `RunnerError::Config` when validation fails.
    pub fn build(self) -> Result<RunnerConfig, RunnerError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
