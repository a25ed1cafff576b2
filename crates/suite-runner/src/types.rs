//! Domain types -- cases, verdicts and the suite report.

use std::fmt;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One configuration directory under verification.
///
/// Immutable once listed. `path` is resolved against the suite root when the
/// case runs, never when it is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestCase {
    /// Display name, unique within a suite
    pub name: String,
    /// Directory relative to the suite root (or absolute)
    pub path: String,
}

impl TestCase {
    /// Creates a case named after its path.
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: path.clone(),
            path,
        }
    }

    /// Creates a case with an explicit name.
    pub fn named(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name == self.path {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} ({})", self.name, self.path)
        }
    }
}

/// Per-case lifecycle.
///
/// ```text
/// Pending -> Initializing -> Planning -> Passed
///                 |              |
///                 +--------------+----> Failed
/// Pending -> Skipped   (fail_fast only)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseState {
    /// Listed, not started
    Pending,
    /// Workspace prepared, engine init running
    Initializing,
    /// Engine plan running
    Planning,
    /// Init and plan succeeded
    Passed,
    /// Any step failed
    Failed,
    /// Never started because an earlier case failed under fail-fast
    Skipped,
}

impl CaseState {
    /// Whether no further transition can happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Passed | Self::Failed | Self::Skipped)
    }

    /// Lowercase state name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Initializing => "initializing",
            Self::Planning => "planning",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for CaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure class attached to a failed case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Setup problems: missing directory, malformed config, unreachable module source
    Initialization,
    /// Evaluation problems: syntax errors, unresolved references, provider validation
    Plan,
    /// The engine itself is missing, not executable or broken
    Environment,
    /// The case task died without producing a verdict
    Internal,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialization => write!(f, "initialization"),
            Self::Plan => write!(f, "plan"),
            Self::Environment => write!(f, "environment"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Why a case failed, with whatever the engine printed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct Diagnostic {
    /// Failure class
    pub kind: DiagnosticKind,
    /// One-line description
    pub message: String,
    /// Captured engine output, empty when no process ran
    #[serde(default)]
    pub output: String,
}

impl Diagnostic {
    /// Creates a diagnostic without captured output.
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            output: String::new(),
        }
    }

    /// `Initialization` diagnostic.
    pub fn initialization(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Initialization, message)
    }

    /// `Plan` diagnostic.
    pub fn plan(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Plan, message)
    }

    /// `Environment` diagnostic.
    pub fn environment(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Environment, message)
    }

    /// `Internal` diagnostic.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Internal, message)
    }

    /// Attaches captured output.
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }
}

/// Result of a successful plan step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanOutput {
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
    /// Process exit code, `None` when terminated by a signal
    pub exit_code: Option<i32>,
    /// Engine reported pending changes (detailed exit code 2)
    pub has_changes: bool,
}

impl PlanOutput {
    /// stdout followed by stderr.
    pub fn combined(&self) -> String {
        combine_output(&self.stdout, &self.stderr)
    }
}

/// Joins stdout and stderr, skipping empty streams.
pub(crate) fn combine_output(stdout: &str, stderr: &str) -> String {
    match (stdout.trim_end().is_empty(), stderr.trim_end().is_empty()) {
        (true, true) => String::new(),
        (false, true) => stdout.trim_end().to_owned(),
        (true, false) => stderr.trim_end().to_owned(),
        (false, false) => format!("{}\n{}", stdout.trim_end(), stderr.trim_end()),
    }
}

/// Outcome of one case. Owned by the case that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// The case this result belongs to
    pub case: TestCase,
    /// Terminal state (passed, failed, skipped)
    pub state: CaseState,
    /// True only for `Passed`
    pub succeeded: bool,
    /// Captured output of the last step that ran
    pub output: String,
    /// Failure description, `None` on success
    pub error: Option<Diagnostic>,
    /// Plan details, present on success
    pub plan: Option<PlanOutput>,
    /// Wall-clock time in milliseconds, including workspace setup
    pub duration_ms: u64,
}

impl RunResult {
    /// Successful case.
    pub fn passed(case: TestCase, plan: PlanOutput, duration: Duration) -> Self {
        Self {
            case,
            state: CaseState::Passed,
            succeeded: true,
            output: plan.combined(),
            error: None,
            plan: Some(plan),
            duration_ms: duration_ms(duration),
        }
    }

    /// Failed case.
    pub fn failed(case: TestCase, diagnostic: Diagnostic, duration: Duration) -> Self {
        Self {
            case,
            state: CaseState::Failed,
            succeeded: false,
            output: diagnostic.output.clone(),
            error: Some(diagnostic),
            plan: None,
            duration_ms: duration_ms(duration),
        }
    }

    /// Case that never started.
    pub fn skipped(case: TestCase) -> Self {
        Self {
            case,
            state: CaseState::Skipped,
            succeeded: false,
            output: String::new(),
            error: None,
            plan: None,
            duration_ms: 0,
        }
    }

    /// Diagnostic kind of a failed case.
    pub fn failure_kind(&self) -> Option<DiagnosticKind> {
        self.error.as_ref().map(|d| d.kind)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Verdicts of one suite run, in listed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    /// Unique id of this run
    pub run_id: String,
    /// One result per listed case, in listed order
    pub results: Vec<RunResult>,
    /// Wall-clock time of the whole run in milliseconds
    pub duration_ms: u64,
}

impl SuiteReport {
    pub(crate) fn new(run_id: String, results: Vec<RunResult>, duration: Duration) -> Self {
        Self {
            run_id,
            results,
            duration_ms: duration_ms(duration),
        }
    }

    /// Number of results (equals the number of listed cases).
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Number of passed cases.
    pub fn passed_count(&self) -> usize {
        self.count(CaseState::Passed)
    }

    /// Number of failed cases.
    pub fn failed_count(&self) -> usize {
        self.count(CaseState::Failed)
    }

    /// Number of skipped cases.
    pub fn skipped_count(&self) -> usize {
        self.count(CaseState::Skipped)
    }

    fn count(&self, state: CaseState) -> usize {
        self.results.iter().filter(|r| r.state == state).count()
    }

    /// Overall verdict: true when every listed case passed.
    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| r.succeeded)
    }

    /// Looks up a result by case name.
    pub fn get(&self, name: &str) -> Option<&RunResult> {
        self.results.iter().find(|r| r.case.name == name)
    }

    /// Verdicts keyed by case name, in listed order.
    pub fn verdicts(&self) -> IndexMap<&str, CaseState> {
        self.results
            .iter()
            .map(|r| (r.case.name.as_str(), r.state))
            .collect()
    }

    /// Failed results only.
    pub fn failures(&self) -> impl Iterator<Item = &RunResult> {
        self.results.iter().filter(|r| r.state == CaseState::Failed)
    }
}
