//! Suite runner orchestration.
//!
//! [`SuiteRunner`] drives every case through
//! `Pending -> Initializing -> Planning -> Passed | Failed` on its own tokio
//! task. Concurrency is bounded by a semaphore of `max_parallel` permits and
//! results are collected in listed order, whatever the completion order.
//! Dropping the future returned by [`SuiteRunner::run`] aborts every case task
//! still in flight. A case directory is evaluated at most once per run.
//!
//! # Usage
//!
//! ```ignore
//! let engine = TerraformEngine::new(config.engine.clone());
//! let runner = SuiteRunnerBuilder::new(engine).config(config).build()?;
//! let report = runner.run_once().await;
//! assert!(report.passed());
//! ```

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use plancheck_core::metrics::{
    CASE_DURATION_SECONDS, CASE_FAILURES_TOTAL, CASES_TOTAL, LABEL_KIND, LABEL_RESULT,
    SUITE_RUNS_TOTAL,
};
use tokio::sync::{Semaphore, mpsc};
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, error, info, warn};

use crate::config::RunnerConfig;
use crate::engine::ProvisioningEngine;
use crate::error::RunnerError;
use crate::event::CaseEvent;
use crate::types::{
    CaseState, Diagnostic, PlanOutput, RunResult, SuiteReport, TestCase,
};
use crate::workspace::CaseWorkspace;

/// Runs plan checks for a fixed, ordered set of cases.
///
/// One runner can be reused for any number of runs; runs share no state
/// apart from the counters below.
pub struct SuiteRunner<E: ProvisioningEngine> {
    /// Runner settings
    config: Arc<RunnerConfig>,
    /// External engine, shared by every case task
    engine: Arc<E>,
    /// Optional progress channel
    progress_tx: Option<mpsc::Sender<CaseEvent>>,
    /// Completed runs
    runs_completed: AtomicU64,
    /// Passed cases across runs
    cases_passed: AtomicU64,
    /// Failed cases across runs
    cases_failed: AtomicU64,
    /// Skipped cases across runs
    cases_skipped: AtomicU64,
}

/// Everything a case task needs, cloned per case.
struct CaseContext<E: ProvisioningEngine> {
    run_id: Arc<str>,
    config: Arc<RunnerConfig>,
    engine: Arc<E>,
    progress: Progress,
    permits: Arc<Semaphore>,
    failure_seen: Arc<AtomicBool>,
}

impl<E: ProvisioningEngine> Clone for CaseContext<E> {
    fn clone(&self) -> Self {
        Self {
            run_id: Arc::clone(&self.run_id),
            config: Arc::clone(&self.config),
            engine: Arc::clone(&self.engine),
            progress: self.progress.clone(),
            permits: Arc::clone(&self.permits),
            failure_seen: Arc::clone(&self.failure_seen),
        }
    }
}

/// One entry per listed case.
enum Slot {
    /// Case task in flight, aborted if the run is dropped
    Running(TestCase, AbortOnDropHandle<RunResult>),
    /// Decided without starting a task
    Done(RunResult),
}

/// Best-effort progress reporting.
#[derive(Clone)]
struct Progress {
    run_id: Arc<str>,
    tx: Option<mpsc::Sender<CaseEvent>>,
}

impl Progress {
    fn emit(&self, event: CaseEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(e) = tx.try_send(event) {
            debug!(run_id = %self.run_id, error = %e, "progress event dropped");
        }
    }

    fn state(&self, case: &TestCase, state: CaseState) {
        self.emit(CaseEvent::new(self.run_id.as_ref(), case.name.as_str(), state));
    }

    fn result(&self, result: &RunResult) {
        let event = match result.failure_kind() {
            Some(kind) => CaseEvent::failed(self.run_id.as_ref(), result.case.name.as_str(), kind),
            None => CaseEvent::new(self.run_id.as_ref(), result.case.name.as_str(), result.state),
        };
        self.emit(event);
    }
}

impl<E: ProvisioningEngine> SuiteRunner<E> {
    /// Runner settings.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// The engine in use.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Number of completed runs.
    pub fn runs_completed(&self) -> u64 {
        self.runs_completed.load(Ordering::Relaxed)
    }

    /// Number of passed cases across all runs.
    pub fn cases_passed(&self) -> u64 {
        self.cases_passed.load(Ordering::Relaxed)
    }

    /// Number of failed cases across all runs.
    pub fn cases_failed(&self) -> u64 {
        self.cases_failed.load(Ordering::Relaxed)
    }

    /// Number of skipped cases across all runs.
    pub fn cases_skipped(&self) -> u64 {
        self.cases_skipped.load(Ordering::Relaxed)
    }

    /// Probes the engine once.
    ///
    /// Returns the engine's version banner.
    ///
    /// # Errors
    ///
    /// An `Environment` diagnostic when the engine cannot be used.
    pub async fn preflight(&self) -> Result<String, Diagnostic> {
        let version = self.engine.version().await?;
        info!(version = %version, "engine available");
        Ok(version)
    }

    /// Runs the configured cases after a preflight probe.
    ///
    /// If the probe fails, every configured case is reported as failed with
    /// the probe's `Environment` diagnostic and the engine is not called
    /// again.
    pub async fn run_once(&self) -> SuiteReport {
        let cases = self.config.cases.clone();
        match self.preflight().await {
            Ok(_) => self.run(cases).await,
            Err(diagnostic) => {
                error!(error = %diagnostic, cases = cases.len(), "engine unavailable, failing all cases");
                self.fail_all(cases, diagnostic)
            }
        }
    }

    /// Runs `cases` and returns one result per case, in listed order.
    ///
    /// Never fails as a whole: every problem is a per-case verdict. A case
    /// whose resolved path was already listed in this run is not evaluated
    /// again and fails with an `Initialization` diagnostic. Dropping the
    /// returned future aborts the case tasks still running.
    pub async fn run(&self, cases: Vec<TestCase>) -> SuiteReport {
        let started = Instant::now();
        let run_id: Arc<str> = Arc::from(uuid::Uuid::new_v4().to_string());
        info!(
            run_id = %run_id,
            cases = cases.len(),
            max_parallel = self.config.max_parallel,
            isolate = self.config.isolate_workdir,
            "suite run started"
        );

        let ctx = CaseContext {
            run_id: Arc::clone(&run_id),
            config: Arc::clone(&self.config),
            engine: Arc::clone(&self.engine),
            progress: self.progress(&run_id),
            permits: Arc::new(Semaphore::new(self.config.max_parallel.max(1))),
            failure_seen: Arc::new(AtomicBool::new(false)),
        };

        let mut seen: HashMap<PathBuf, String> = HashMap::with_capacity(cases.len());
        let mut slots = Vec::with_capacity(cases.len());
        for case in cases {
            ctx.progress.state(&case, CaseState::Pending);
            match seen.entry(self.config.resolve(&case)) {
                Entry::Occupied(first) => {
                    warn!(
                        run_id = %run_id,
                        case = %case.name,
                        first = %first.get(),
                        "path already evaluated in this run"
                    );
                    let diagnostic = Diagnostic::initialization(format!(
                        "path '{}' is already evaluated by case '{}' in this run",
                        case.path,
                        first.get()
                    ));
                    let result = RunResult::failed(case, diagnostic, Duration::ZERO);
                    ctx.progress.result(&result);
                    slots.push(Slot::Done(result));
                }
                Entry::Vacant(entry) => {
                    entry.insert(case.name.clone());
                    let handle = tokio::spawn(run_case(ctx.clone(), case.clone()));
                    slots.push(Slot::Running(case, AbortOnDropHandle::new(handle)));
                }
            }
        }

        let mut results = Vec::with_capacity(slots.len());
        for slot in slots {
            let (case, handle) = match slot {
                Slot::Done(result) => {
                    self.record(&result);
                    results.push(result);
                    continue;
                }
                Slot::Running(case, handle) => (case, handle),
            };
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!(run_id = %run_id, case = %case.name, error = %e, "case task aborted");
                    let result = RunResult::failed(
                        case,
                        Diagnostic::internal(format!("case task aborted: {e}")),
                        Duration::ZERO,
                    );
                    ctx.progress.result(&result);
                    result
                }
            };
            self.record(&result);
            results.push(result);
        }

        let report = SuiteReport::new(run_id.to_string(), results, started.elapsed());
        self.finish(&report);
        report
    }

    fn fail_all(&self, cases: Vec<TestCase>, diagnostic: Diagnostic) -> SuiteReport {
        let run_id = uuid::Uuid::new_v4().to_string();
        let progress = self.progress(&run_id);
        let results = cases
            .into_iter()
            .map(|case| {
                let result = RunResult::failed(case, diagnostic.clone(), Duration::ZERO);
                progress.result(&result);
                self.record(&result);
                result
            })
            .collect();

        let report = SuiteReport::new(run_id, results, Duration::ZERO);
        self.finish(&report);
        report
    }

    fn progress(&self, run_id: &str) -> Progress {
        Progress {
            run_id: Arc::from(run_id),
            tx: self.progress_tx.clone(),
        }
    }

    fn record(&self, result: &RunResult) {
        let counter_ref = match result.state {
            CaseState::Passed => &self.cases_passed,
            CaseState::Skipped => &self.cases_skipped,
            _ => &self.cases_failed,
        };
        counter_ref.fetch_add(1, Ordering::Relaxed);

        counter!(CASES_TOTAL, LABEL_RESULT => result.state.as_str()).increment(1);
        if let Some(kind) = result.failure_kind() {
            counter!(CASE_FAILURES_TOTAL, LABEL_KIND => kind.to_string()).increment(1);
        }
        if result.state != CaseState::Skipped {
            histogram!(CASE_DURATION_SECONDS).record(result.duration_ms as f64 / 1000.0);
        }
    }

    fn finish(&self, report: &SuiteReport) {
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
        counter!(SUITE_RUNS_TOTAL).increment(1);
        info!(
            run_id = %report.run_id,
            total = report.total(),
            passed = report.passed_count(),
            failed = report.failed_count(),
            skipped = report.skipped_count(),
            duration_ms = report.duration_ms,
            "suite run finished"
        );
    }
}

/// Runs one case to a terminal state.
async fn run_case<E: ProvisioningEngine>(ctx: CaseContext<E>, case: TestCase) -> RunResult {
    let _permit = match Arc::clone(&ctx.permits).acquire_owned().await {
        Ok(permit) => permit,
        Err(e) => {
            let result = RunResult::failed(
                case,
                Diagnostic::internal(format!("scheduler closed: {e}")),
                Duration::ZERO,
            );
            ctx.progress.result(&result);
            return result;
        }
    };

    if ctx.config.fail_fast && ctx.failure_seen.load(Ordering::Acquire) {
        info!(run_id = %ctx.run_id, case = %case.name, "skipped after earlier failure");
        let result = RunResult::skipped(case);
        ctx.progress.result(&result);
        return result;
    }

    let started = Instant::now();
    let outcome = verify(&ctx, &case).await;
    let result = match outcome {
        Ok(plan) => {
            info!(
                run_id = %ctx.run_id,
                case = %case.name,
                has_changes = plan.has_changes,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "case passed"
            );
            RunResult::passed(case, plan, started.elapsed())
        }
        Err(diagnostic) => {
            warn!(
                run_id = %ctx.run_id,
                case = %case.name,
                kind = %diagnostic.kind,
                error = %diagnostic.message,
                "case failed"
            );
            ctx.failure_seen.store(true, Ordering::Release);
            RunResult::failed(case, diagnostic, started.elapsed())
        }
    };

    ctx.progress.result(&result);
    result
}

/// Workspace, init, then plan. The workspace is released before returning.
async fn verify<E: ProvisioningEngine>(
    ctx: &CaseContext<E>,
    case: &TestCase,
) -> Result<PlanOutput, Diagnostic> {
    ctx.progress.state(case, CaseState::Initializing);

    let case_dir = ctx.config.resolve(case);
    let workspace =
        CaseWorkspace::prepare(&ctx.config.root, &case_dir, ctx.config.isolate_workdir)
            .await
            .map_err(|e| {
                Diagnostic::initialization(format!(
                    "configuration directory unavailable: {}",
                    case_dir.display()
                ))
                .with_output(e.to_string())
            })?;

    let outcome = plan_in(ctx, case, &workspace).await;

    if let Err(e) = workspace.close() {
        warn!(run_id = %ctx.run_id, case = %case.name, error = %e, "workspace cleanup failed");
    }
    outcome
}

async fn plan_in<E: ProvisioningEngine>(
    ctx: &CaseContext<E>,
    case: &TestCase,
    workspace: &CaseWorkspace,
) -> Result<PlanOutput, Diagnostic> {
    let init_output = ctx.engine.initialize(workspace.path()).await?;
    debug!(run_id = %ctx.run_id, case = %case.name, output = %init_output, "initialized");

    ctx.progress.state(case, CaseState::Planning);
    ctx.engine
        .plan(workspace.path(), &ctx.config.plan_args)
        .await
}

/// Builder for [`SuiteRunner`].
pub struct SuiteRunnerBuilder<E: ProvisioningEngine> {
    engine: E,
    config: RunnerConfig,
    progress_tx: Option<mpsc::Sender<CaseEvent>>,
}

impl<E: ProvisioningEngine> SuiteRunnerBuilder<E> {
    /// Creates a builder around `engine` with default settings.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            config: RunnerConfig::default(),
            progress_tx: None,
        }
    }

    /// Sets the runner config.
    pub fn config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sends a [`CaseEvent`] on every case state transition.
    ///
    /// Events are sent with `try_send`; a full or closed channel drops them.
    pub fn progress_sender(mut self, tx: mpsc::Sender<CaseEvent>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Validates the config and builds the runner.
    ///
    /// # Errors
    ///
    /// `RunnerError::Config` when validation fails.
    pub fn build(self) -> Result<SuiteRunner<E>, RunnerError> {
        self.config.validate()?;

        Ok(SuiteRunner {
            config: Arc::new(self.config),
            engine: Arc::new(self.engine),
            progress_tx: self.progress_tx,
            runs_completed: AtomicU64::new(0),
            cases_passed: AtomicU64::new(0),
            cases_failed: AtomicU64::new(0),
            cases_skipped: AtomicU64::new(0),
        })
    }
}
