//! Configuration -- `plancheck.toml` parsing and runtime settings.
//!
//! [`PlancheckConfig`] is the top-level structure holding every section.
//!
//! # Loading precedence
//! 1. CLI arguments (highest)
//! 2. Environment variables (`PLANCHECK_ENGINE_BINARY=tofu` style)
//! 3. Config file (`plancheck.toml`)
//! 4. Defaults (`Default` impls)
//!
//! # Case declarations
//!
//! The cases to verify live in `[suite.cases]` as an ordered table. Each
//! entry is either a bare toggle (`name = true`, path equals the name) or a
//! table with an explicit path:
//!
//! ```toml
//! [suite.cases]
//! custom = false
//! "multiple-assignments" = { path = "examples/multiple-assignments", enabled = true }
//! ```
//!
//! Declaration order is the reporting order.
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), plancheck_core::error::PlancheckError> {
//! use plancheck_core::config::PlancheckConfig;
//!
//! let config = PlancheckConfig::load("plancheck.toml").await?;
//! let config = PlancheckConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::{Component, Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, PlancheckError};

/// Upper bound for `suite.max_parallel`.
pub const MAX_PARALLEL_LIMIT: usize = 256;
/// Upper bound for `engine.command_timeout_secs` (24 hours).
pub const MAX_COMMAND_TIMEOUT_SECS: u64 = 86_400;
const MAX_PATH_LEN: usize = 4096;

/// plancheck configuration root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlancheckConfig {
    /// Logging settings
    #[serde(default)]
    pub general: GeneralConfig,
    /// Provisioning engine invocation settings
    #[serde(default)]
    pub engine: EngineConfig,
    /// Suite definition and scheduling
    #[serde(default)]
    pub suite: SuiteConfig,
}

impl PlancheckConfig {
    /// Loads a TOML file, applies environment overrides and validates.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, PlancheckError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads a TOML file without environment overrides or validation.
    ///
    /// Validation runs in [`load`](Self::load) once overrides are applied, so
    /// an out-of-range file value can still be corrected from the environment.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, PlancheckError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PlancheckError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                PlancheckError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// Parses a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, PlancheckError> {
        toml::from_str(toml_str).map_err(|e| {
            PlancheckError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// Overrides values from environment variables.
    ///
    /// Naming rule: `PLANCHECK_{SECTION}_{FIELD}`, e.g. `PLANCHECK_SUITE_MAX_PARALLEL=2`.
    /// Case declarations cannot be overridden from the environment.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "PLANCHECK_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "PLANCHECK_GENERAL_LOG_FORMAT");

        // Engine
        override_string(&mut self.engine.binary, "PLANCHECK_ENGINE_BINARY");
        override_bool(&mut self.engine.no_color, "PLANCHECK_ENGINE_NO_COLOR");
        override_bool(&mut self.engine.lock, "PLANCHECK_ENGINE_LOCK");
        override_string(&mut self.engine.lock_timeout, "PLANCHECK_ENGINE_LOCK_TIMEOUT");
        override_u32(&mut self.engine.parallelism, "PLANCHECK_ENGINE_PARALLELISM");
        override_bool(&mut self.engine.upgrade, "PLANCHECK_ENGINE_UPGRADE");
        override_bool(&mut self.engine.backend, "PLANCHECK_ENGINE_BACKEND");
        override_bool(
            &mut self.engine.detailed_exitcode,
            "PLANCHECK_ENGINE_DETAILED_EXITCODE",
        );
        override_csv(&mut self.engine.var_files, "PLANCHECK_ENGINE_VAR_FILES");
        override_csv(&mut self.engine.targets, "PLANCHECK_ENGINE_TARGETS");
        override_u64(
            &mut self.engine.command_timeout_secs,
            "PLANCHECK_ENGINE_COMMAND_TIMEOUT_SECS",
        );

        // Suite
        override_string(&mut self.suite.root, "PLANCHECK_SUITE_ROOT");
        override_bool(
            &mut self.suite.isolate_workdir,
            "PLANCHECK_SUITE_ISOLATE_WORKDIR",
        );
        override_usize(&mut self.suite.max_parallel, "PLANCHECK_SUITE_MAX_PARALLEL");
        override_bool(&mut self.suite.fail_fast, "PLANCHECK_SUITE_FAIL_FAST");
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), PlancheckError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        self.engine.validate()?;
        self.suite.validate()?;
        Ok(())
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log format (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// Provisioning engine settings.
///
/// Maps onto the command-line flags the engine receives; see
/// `plancheck_suite_runner::engine::format_args` for the exact rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine executable, resolved through `PATH` when not absolute
    pub binary: String,
    /// Variable files passed as `-var-file=...`
    pub var_files: Vec<String>,
    /// Resource targets passed as `-target=...`
    pub targets: Vec<String>,
    /// Pass `-no-color`
    pub no_color: bool,
    /// State locking (`-lock=<bool>`)
    pub lock: bool,
    /// Lock wait duration (`-lock-timeout=...`), empty to omit
    pub lock_timeout: String,
    /// Concurrent operations inside the engine (`-parallelism=N`), 0 to omit
    pub parallelism: u32,
    /// Upgrade modules and providers during init
    pub upgrade: bool,
    /// Configure the backend during init
    pub backend: bool,
    /// Use `plan -detailed-exitcode` (exit 2 = changes pending, still a pass)
    pub detailed_exitcode: bool,
    /// Per-command timeout in seconds, 0 disables it
    pub command_timeout_secs: u64,
    /// Input variables passed as `-var key=value`
    pub vars: BTreeMap<String, String>,
    /// Extra environment variables for every engine process
    pub env: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: "terraform".to_owned(),
            var_files: Vec::new(),
            targets: Vec::new(),
            no_color: true,
            lock: false,
            lock_timeout: String::new(),
            parallelism: 0,
            upgrade: false,
            backend: false,
            detailed_exitcode: true,
            command_timeout_secs: 0,
            vars: BTreeMap::new(),
            env: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.binary.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "engine.binary".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.command_timeout_secs > MAX_COMMAND_TIMEOUT_SECS {
            return Err(ConfigError::InvalidValue {
                field: "engine.command_timeout_secs".to_owned(),
                reason: format!("must be 0 (disabled) or 1-{MAX_COMMAND_TIMEOUT_SECS}"),
            });
        }

        if let Some(key) = self.vars.keys().find(|k| k.is_empty() || k.contains('=')) {
            return Err(ConfigError::InvalidValue {
                field: "engine.vars".to_owned(),
                reason: format!("invalid variable name '{key}'"),
            });
        }

        if let Some(key) = self.env.keys().find(|k| k.is_empty() || k.contains('=')) {
            return Err(ConfigError::InvalidValue {
                field: "engine.env".to_owned(),
                reason: format!("invalid environment variable name '{key}'"),
            });
        }

        Ok(())
    }
}

/// Suite definition and scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Directory case paths are resolved against
    pub root: String,
    /// Run every case inside a private temporary copy of the root
    pub isolate_workdir: bool,
    /// Maximum number of cases running at once
    pub max_parallel: usize,
    /// Stop starting new cases after the first failure
    pub fail_fast: bool,
    /// Ordered case declarations
    pub cases: IndexMap<String, CaseEntry>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            root: ".".to_owned(),
            isolate_workdir: true,
            max_parallel: default_parallelism(),
            fail_fast: false,
            cases: IndexMap::new(),
        }
    }
}

impl SuiteConfig {
    /// Enabled cases as `(name, path)` pairs in declaration order.
    pub fn enabled_cases(&self) -> Vec<(&str, &str)> {
        self.cases
            .iter()
            .filter(|(_, entry)| entry.is_enabled())
            .map(|(name, entry)| (name.as_str(), entry.path_or(name)))
            .collect()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.root.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "suite.root".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.max_parallel == 0 || self.max_parallel > MAX_PARALLEL_LIMIT {
            return Err(ConfigError::InvalidValue {
                field: "suite.max_parallel".to_owned(),
                reason: format!("must be 1-{MAX_PARALLEL_LIMIT}"),
            });
        }

        let mut seen_paths = HashSet::new();
        for (name, entry) in &self.cases {
            if name.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "suite.cases".to_owned(),
                    reason: "case name must not be empty".to_owned(),
                });
            }

            let path = entry.path_or(name);
            if path.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("suite.cases.{name}"),
                    reason: "path must not be empty".to_owned(),
                });
            }
            if path.len() > MAX_PATH_LEN {
                return Err(ConfigError::InvalidValue {
                    field: format!("suite.cases.{name}"),
                    reason: format!("path exceeds maximum length {MAX_PATH_LEN}"),
                });
            }

            // each path is evaluated at most once per run
            let resolved = normalize_path(&Path::new(&self.root).join(path));
            if entry.is_enabled() && !seen_paths.insert(resolved) {
                return Err(ConfigError::InvalidValue {
                    field: format!("suite.cases.{name}"),
                    reason: format!("path '{path}' is already declared by another enabled case"),
                });
            }
        }

        Ok(())
    }
}

/// One `[suite.cases]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CaseEntry {
    /// `name = true|false`, path equals the name
    Toggle(bool),
    /// `name = { path = "...", enabled = true }`
    Detailed(CaseSpec),
}

/// Table form of a case declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseSpec {
    /// Directory relative to `suite.root` (or absolute). Defaults to the case name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Whether the case runs
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl CaseEntry {
    /// Whether this case is part of the active set.
    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Toggle(enabled) => *enabled,
            Self::Detailed(spec) => spec.enabled,
        }
    }

    /// The declared path, falling back to the case name.
    pub fn path_or<'a>(&'a self, name: &'a str) -> &'a str {
        match self {
            Self::Detailed(CaseSpec {
                path: Some(path), ..
            }) => path.as_str(),
            _ => name,
        }
    }
}

/// Lexically normalizes `path`: drops `.` and folds `name/..` pairs.
///
/// The filesystem is not consulted, so symlinks are not followed.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

fn default_enabled() -> bool {
    true
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(MAX_PARALLEL_LIMIT)
}

// --- environment override helpers ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
