//! Process-backed engine driving the `terraform` CLI (or a compatible binary).

use std::io::ErrorKind;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Instant;

use metrics::{counter, histogram};
use plancheck_core::error::EngineError;
use plancheck_core::metrics::{
    ENGINE_COMMAND_DURATION_SECONDS, ENGINE_COMMANDS_TOTAL, LABEL_COMMAND,
};
use tokio::process::Command;
use tracing::debug;

use super::ProvisioningEngine;
use super::args::{EngineOptions, format_args};
use crate::types::{Diagnostic, DiagnosticKind, PlanOutput, combine_output};

/// Plan exit code meaning "succeeded, changes pending" under `-detailed-exitcode`.
const EXIT_CHANGES_PENDING: i32 = 2;

/// Production engine spawning one child process per command.
///
/// Every child runs with `TF_IN_AUTOMATION=1` and `TF_INPUT=0`, stdin closed
/// and `kill_on_drop(true)`, so an abandoned case never leaves a process behind.
#[derive(Debug, Clone)]
pub struct TerraformEngine {
    options: EngineOptions,
}

impl TerraformEngine {
    /// Creates an engine with the given options.
    pub fn new(options: EngineOptions) -> Self {
        Self { options }
    }

    /// Options in use.
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    async fn execute(
        &self,
        dir: Option<&Path>,
        command: &str,
        extra: &[String],
    ) -> Result<Output, EngineError> {
        let args = format_args(&self.options, command, extra);
        debug!(binary = %self.options.binary, args = ?args, "spawning engine");

        let mut cmd = Command::new(&self.options.binary);
        cmd.args(&args)
            .envs(&self.options.env)
            .env("TF_IN_AUTOMATION", "1")
            .env("TF_INPUT", "0")
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }

        let started = Instant::now();
        counter!(ENGINE_COMMANDS_TOTAL, LABEL_COMMAND => command.to_owned()).increment(1);

        let output = match self.options.command_timeout {
            Some(limit) => match tokio::time::timeout(limit, cmd.output()).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(EngineError::Timeout {
                        command: command.to_owned(),
                        secs: limit.as_secs(),
                    });
                }
            },
            None => cmd.output().await,
        };

        histogram!(ENGINE_COMMAND_DURATION_SECONDS, LABEL_COMMAND => command.to_owned())
            .record(started.elapsed().as_secs_f64());

        output.map_err(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => EngineError::Unavailable(
                format!("cannot execute '{}': {e}", self.options.binary),
            ),
            _ => EngineError::CommandFailed {
                command: command.to_owned(),
                reason: e.to_string(),
            },
        })
    }
}

/// Turns an engine error into a verdict diagnostic of the step's kind.
fn diagnostic_for(err: EngineError, step: DiagnosticKind) -> Diagnostic {
    match err {
        EngineError::Unavailable(msg) => Diagnostic::environment(msg),
        other => Diagnostic::new(step, other.to_string()),
    }
}

fn exit_reason(output: &Output) -> String {
    match output.status.code() {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_owned(),
    }
}

impl ProvisioningEngine for TerraformEngine {
    async fn initialize(&self, dir: &Path) -> Result<String, Diagnostic> {
        let is_dir = tokio::fs::metadata(dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(Diagnostic::initialization(format!(
                "configuration directory not found: {}",
                dir.display()
            )));
        }

        let output = self
            .execute(Some(dir), "init", &[])
            .await
            .map_err(|e| diagnostic_for(e, DiagnosticKind::Initialization))?;

        let text = combine_output(
            &String::from_utf8_lossy(&output.stdout),
            &String::from_utf8_lossy(&output.stderr),
        );
        if output.status.success() {
            Ok(text)
        } else {
            Err(
                Diagnostic::initialization(format!("'init' failed: {}", exit_reason(&output)))
                    .with_output(text),
            )
        }
    }

    async fn plan(&self, dir: &Path, args: &[String]) -> Result<PlanOutput, Diagnostic> {
        let output = self
            .execute(Some(dir), "plan", args)
            .await
            .map_err(|e| diagnostic_for(e, DiagnosticKind::Plan))?;

        let plan = PlanOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
            has_changes: false,
        };

        match plan.exit_code {
            Some(0) => Ok(plan),
            Some(EXIT_CHANGES_PENDING) if self.options.detailed_exitcode => Ok(PlanOutput {
                has_changes: true,
                ..plan
            }),
            _ => Err(
                Diagnostic::plan(format!("'plan' failed: {}", exit_reason(&output)))
                    .with_output(plan.combined()),
            ),
        }
    }

    async fn version(&self) -> Result<String, Diagnostic> {
        let output = self
            .execute(None, "version", &[])
            .await
            .map_err(|e| Diagnostic::environment(e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            return Err(Diagnostic::environment(format!(
                "'{} version' failed: {}",
                self.options.binary,
                exit_reason(&output)
            ))
            .with_output(combine_output(&stdout, &String::from_utf8_lossy(&output.stderr))));
        }

        Ok(stdout.lines().next().unwrap_or_default().trim().to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_maps_to_environment() {
        let diag = diagnostic_for(
            EngineError::Unavailable("cannot execute 'terraform'".to_owned()),
            DiagnosticKind::Plan,
        );
        assert_eq!(diag.kind, DiagnosticKind::Environment);
    }

    #[test]
    fn timeout_keeps_step_kind() {
        let diag = diagnostic_for(
            EngineError::Timeout {
                command: "init".to_owned(),
                secs: 5,
            },
            DiagnosticKind::Initialization,
        );
        assert_eq!(diag.kind, DiagnosticKind::Initialization);
        assert!(diag.message.contains("timed out"));
    }

    #[tokio::test]
    async fn missing_directory_fails_before_spawning() {
        let engine = TerraformEngine::new(EngineOptions {
            binary: "/nonexistent/terraform".to_owned(),
            ..EngineOptions::default()
        });
        let err = engine
            .initialize(Path::new("/nonexistent/case-dir"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::Initialization);
        assert!(err.message.contains("not found"));
    }

    #[tokio::test]
    async fn missing_binary_is_environment_error() {
        let engine = TerraformEngine::new(EngineOptions {
            binary: "/nonexistent/terraform".to_owned(),
            ..EngineOptions::default()
        });
        let err = engine.version().await.unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::Environment);

        let dir = tempfile::tempdir().unwrap();
        let err = engine.initialize(dir.path()).await.unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::Environment);
    }
}
