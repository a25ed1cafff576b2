//! Runner error types.
//!
//! [`RunnerError`] covers everything that can go wrong *around* a case:
//! configuration and workspace preparation. Verdict-level
//! failures are [`Diagnostic`](crate::types::Diagnostic)s attached to a
//! result, never errors.

use plancheck_core::error::{ConfigError, PlancheckError, SuiteError};

/// Suite runner domain error.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Invalid runner configuration
    #[error("config error: {field}: {reason}")]
    Config {
        /// Offending field
        field: String,
        /// Why it was rejected
        reason: String,
    },

    /// Case workspace could not be prepared
    #[error("workspace error: {path}: {source}")]
    Workspace {
        /// Directory involved
        path: String,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

impl From<RunnerError> for PlancheckError {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::Config { field, reason } => {
                PlancheckError::Config(ConfigError::InvalidValue { field, reason })
            }
            RunnerError::Workspace { path, source } => {
                PlancheckError::Suite(SuiteError::Workspace(format!("{path}: {source}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = RunnerError::Config {
            field: "max_parallel".to_owned(),
            reason: "must be greater than 0".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "config error: max_parallel: must be greater than 0"
        );
    }

    #[test]
    fn workspace_error_display_includes_path() {
        let err = RunnerError::Workspace {
            path: "/tmp/case".to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/case"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn config_converts_to_core_config_error() {
        let err: PlancheckError = RunnerError::Config {
            field: "root".to_owned(),
            reason: "must not be empty".to_owned(),
        }
        .into();
        assert!(matches!(
            err,
            PlancheckError::Config(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn workspace_converts_to_suite_error() {
        let err: PlancheckError = RunnerError::Workspace {
            path: "cases/a".to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        }
        .into();
        assert!(matches!(err, PlancheckError::Suite(SuiteError::Workspace(_))));
        assert!(err.to_string().contains("cases/a"));
    }
}
