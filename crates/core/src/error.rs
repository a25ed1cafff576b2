//! Error types -- domain-specific error definitions shared by every crate.

/// Top-level plancheck error.
#[derive(Debug, thiserror::Error)]
pub enum PlancheckError {
    /// Configuration error
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Provisioning engine error
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Suite execution error
    #[error("suite error: {0}")]
    Suite(#[from] SuiteError),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file does not exist
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// Config could not be parsed
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// A config value is out of range or malformed
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Errors raised while talking to the external provisioning engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine binary is missing, not executable or failed its version probe
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// An engine command exited unsuccessfully
    #[error("'{command}' failed: {reason}")]
    CommandFailed { command: String, reason: String },

    /// An engine command exceeded its time budget
    #[error("'{command}' timed out after {secs}s")]
    Timeout { command: String, secs: u64 },
}

/// Errors raised by the suite runner outside of individual case verdicts.
#[derive(Debug, thiserror::Error)]
pub enum SuiteError {
    /// A per-case workspace could not be prepared or released
    #[error("workspace error: {0}")]
    Workspace(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_into_top_level() {
        let err: PlancheckError = ConfigError::InvalidValue {
            field: "suite.max_parallel".to_owned(),
            reason: "must be greater than 0".to_owned(),
        }
        .into();
        assert!(matches!(err, PlancheckError::Config(_)));
        assert!(err.to_string().contains("suite.max_parallel"));
    }

    #[test]
    fn engine_error_display() {
        let err = EngineError::CommandFailed {
            command: "plan".to_owned(),
            reason: "exit status 1".to_owned(),
        };
        assert_eq!(err.to_string(), "'plan' failed: exit status 1");

        let err = EngineError::Timeout {
            command: "init".to_owned(),
            secs: 30,
        };
        assert!(err.to_string().contains("30s"));
    }

    #[test]
    fn io_error_converts_into_top_level() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: PlancheckError = io_err.into();
        assert!(matches!(err, PlancheckError::Io(_)));
    }
}
