//! `plancheck run` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use plancheck_core::config::PlancheckConfig;
use plancheck_suite_runner::{
    CaseEvent, CaseState, DiagnosticKind, RunnerConfig, SuiteReport, SuiteRunnerBuilder,
    TerraformEngine, TestCase,
};

use crate::cli::{OutputFormat, RunArgs};
use crate::commands::resolve_root;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Progress channel capacity.
const PROGRESS_CHANNEL_CAPACITY: usize = 256;

/// Execute the `run` command.
pub async fn execute(
    args: RunArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = PlancheckConfig::load(config_path).await?;

    let mut runner_config = RunnerConfig::from_core(&config);
    runner_config.root = resolve_root(config_path, &config.suite.root);
    if !args.cases.is_empty() {
        runner_config.cases = select_cases(&config, &args.cases)?;
    }
    if let Some(max) = args.max_parallel {
        runner_config.max_parallel = max;
    }
    if args.no_isolate {
        runner_config.isolate_workdir = false;
    }
    if args.fail_fast {
        runner_config.fail_fast = true;
    }
    runner_config.plan_args = args.plan_args;

    if runner_config.cases.is_empty() {
        warn!("no enabled cases in configuration");
    }

    let engine = TerraformEngine::new(runner_config.engine.clone());
    let binary = runner_config.engine.binary.clone();
    let root = runner_config.root.display().to_string();

    let mut builder = SuiteRunnerBuilder::new(engine).config(runner_config);
    let progress = if writer.format() == OutputFormat::Text {
        let (tx, rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
        builder = builder.progress_sender(tx);
        Some(tokio::spawn(print_progress(rx)))
    } else {
        None
    };
    let runner = builder.build()?;

    info!(config = %config_path.display(), root = %root, cases = runner.config().cases.len(), "running suite");
    let suite = runner.run_once().await;

    // closes the progress channel
    drop(runner);
    if let Some(handle) = progress {
        if let Err(e) = handle.await {
            warn!(error = %e, "progress printer failed");
        }
    }

    let report = RunReport {
        source: config_path.display().to_string(),
        root,
        engine: binary,
        suite,
    };
    writer.render(&report)?;

    verdict(&report.suite)
}

/// Picks the named cases in declaration order, enabled or not.
fn select_cases(config: &PlancheckConfig, names: &[String]) -> Result<Vec<TestCase>, CliError> {
    if let Some(unknown) = names
        .iter()
        .find(|name| !config.suite.cases.contains_key(name.as_str()))
    {
        return Err(CliError::Command(format!(
            "unknown case: {unknown} (see `plancheck list`)"
        )));
    }

    Ok(config
        .suite
        .cases
        .iter()
        .filter(|(name, _)| names.iter().any(|n| n == *name))
        .map(|(name, entry)| TestCase::named(name.as_str(), entry.path_or(name)))
        .collect())
}

/// Maps the suite outcome to the command result.
fn verdict(report: &SuiteReport) -> Result<(), CliError> {
    if report.passed() {
        return Ok(());
    }

    let environment_only = report
        .failures()
        .all(|r| r.failure_kind() == Some(DiagnosticKind::Environment));
    if environment_only && report.failed_count() == report.total() {
        let reason = report
            .results
            .first()
            .and_then(|r| r.error.as_ref())
            .map(|d| d.message.clone())
            .unwrap_or_default();
        return Err(CliError::Environment(reason));
    }

    Err(CliError::CasesFailed(format!(
        "{} of {} cases failed",
        report.failed_count(),
        report.total()
    )))
}

async fn print_progress(mut rx: mpsc::Receiver<CaseEvent>) {
    use colored::Colorize;

    while let Some(event) = rx.recv().await {
        let label = match event.state {
            CaseState::Initializing => "init".cyan(),
            CaseState::Planning => "plan".cyan(),
            _ => continue,
        };
        eprintln!("  {:>5} {}", label, event.case.dimmed());
    }
}

#[derive(Serialize)]
pub struct RunReport {
    pub source: String,
    pub root: String,
    pub engine: String,
    #[serde(flatten)]
    pub suite: SuiteReport,
}

impl Render for RunReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Suite: {} ({})", self.root.bold(), self.engine)?;
        writeln!(w)?;

        let width = self
            .suite
            .results
            .iter()
            .map(|r| r.case.name.len())
            .max()
            .unwrap_or(0);

        for result in &self.suite.results {
            let status = match result.state {
                CaseState::Passed => "PASS".green().bold(),
                CaseState::Skipped => "SKIP".yellow().bold(),
                _ => "FAIL".red().bold(),
            };
            let elapsed = format!("{:.1}s", result.duration_ms as f64 / 1000.0);

            match (&result.error, &result.plan) {
                (Some(diagnostic), _) => {
                    writeln!(
                        w,
                        "  {}  {:<width$}  {:>6}  {}",
                        status,
                        result.case.name,
                        elapsed,
                        diagnostic.to_string().red(),
                    )?;
                    for line in diagnostic.output.lines().filter(|l| !l.trim().is_empty()) {
                        writeln!(w, "        {:<width$}  | {}", "", line.dimmed())?;
                    }
                }
                (None, Some(plan)) if plan.has_changes => {
                    writeln!(
                        w,
                        "  {}  {:<width$}  {:>6}  {}",
                        status,
                        result.case.name,
                        elapsed,
                        "changes pending".yellow(),
                    )?;
                }
                _ => {
                    writeln!(
                        w,
                        "  {}  {:<width$}  {:>6}",
                        status, result.case.name, elapsed
                    )?;
                }
            }
        }

        writeln!(w)?;
        let summary = format!(
            "{} passed, {} failed, {} skipped ({} total) in {:.1}s",
            self.suite.passed_count(),
            self.suite.failed_count(),
            self.suite.skipped_count(),
            self.suite.total(),
            self.suite.duration_ms as f64 / 1000.0
        );
        if self.suite.passed() {
            writeln!(w, "Result: {}", summary.green())?;
        } else {
            writeln!(w, "Result: {}", summary.red())?;
        }

        Ok(())
    }
}
