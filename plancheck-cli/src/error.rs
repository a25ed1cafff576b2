//! CLI-specific error types and exit code mapping

use plancheck_core::error::PlancheckError;
use plancheck_suite_runner::RunnerError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The provisioning engine is not usable.
    #[error("engine unavailable: {0}")]
    Environment(String),

    /// One or more cases failed.
    #[error("{0}")]
    CasesFailed(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from plancheck-core.
    #[error("{0}")]
    Core(PlancheckError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                      |
    /// |------|------------------------------|
    /// | 0    | Success                      |
    /// | 1    | General / command error      |
    /// | 2    | Configuration error          |
    /// | 3    | Engine unavailable           |
    /// | 4    | One or more cases failed     |
    /// | 10   | IO error                     |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Environment(_) => 3,
            Self::CasesFailed(_) => 4,
            Self::Io(_) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}

impl From<PlancheckError> for CliError {
    fn from(e: PlancheckError) -> Self {
        match e {
            PlancheckError::Config(config) => Self::Config(config.to_string()),
            PlancheckError::Io(io) => Self::Io(io),
            other => Self::Core(other),
        }
    }
}

impl From<RunnerError> for CliError {
    fn from(e: RunnerError) -> Self {
        PlancheckError::from(e).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use plancheck_core::error::{ConfigError, EngineError};

    #[test]
    fn test_exit_code_config_error() {
        let err = CliError::Config("test error".to_owned());
        assert_eq!(err.exit_code(), 2, "config error should return exit code 2");
    }

    #[test]
    fn test_exit_code_environment_error() {
        let err = CliError::Environment("terraform not found".to_owned());
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_cases_failed() {
        let err = CliError::CasesFailed("1 of 2 cases failed".to_owned());
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_exit_code_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = CliError::Io(io_err);
        assert_eq!(err.exit_code(), 10, "io error should return exit code 10");
    }

    #[test]
    fn test_exit_code_command_error() {
        let err = CliError::Command("unknown case: foo".to_owned());
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_from_core_config_error_is_config() {
        let core_err = PlancheckError::Config(ConfigError::FileNotFound {
            path: "plancheck.toml".to_owned(),
        });
        let cli_err: CliError = core_err.into();
        assert!(matches!(cli_err, CliError::Config(_)));
        assert_eq!(cli_err.exit_code(), 2);
        assert!(cli_err.to_string().contains("plancheck.toml"));
    }

    #[test]
    fn test_from_core_io_error_is_io() {
        let core_err =
            PlancheckError::Io(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"));
        let cli_err: CliError = core_err.into();
        assert_eq!(cli_err.exit_code(), 10);
    }

    #[test]
    fn test_from_core_engine_error_is_core() {
        let core_err = PlancheckError::Engine(EngineError::Unavailable("gone".to_owned()));
        let cli_err: CliError = core_err.into();
        assert!(matches!(cli_err, CliError::Core(_)));
        assert_eq!(cli_err.exit_code(), 1);
    }

    #[test]
    fn test_from_runner_config_error_is_config() {
        let err = RunnerError::Config {
            field: "max_parallel".to_owned(),
            reason: "must be 1-256".to_owned(),
        };
        let cli_err: CliError = err.into();
        assert_eq!(cli_err.exit_code(), 2);
        assert!(cli_err.to_string().contains("max_parallel"));
    }

    #[test]
    fn test_error_display_cases_failed_is_bare() {
        let err = CliError::CasesFailed("2 of 5 cases failed".to_owned());
        assert_eq!(err.to_string(), "2 of 5 cases failed");
    }
}
