//! Integration tests for the suite runner
//!
//! Runs real fixture directories through the runner with an in-process engine
//! that resolves local module sources and rejects undeclared references.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use plancheck_suite_runner::{
    CaseState, Diagnostic, DiagnosticKind, PlanOutput, ProvisioningEngine, RunnerConfigBuilder,
    SuiteRunner, SuiteRunnerBuilder, TestCase,
};

fn fixture_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Engine double working on the files actually present in the workspace.
#[derive(Default)]
struct FixtureEngine {
    available: bool,
    seen_dirs: Mutex<Vec<PathBuf>>,
    plans: Mutex<Vec<PathBuf>>,
}

impl FixtureEngine {
    fn new() -> Self {
        Self {
            available: true,
            ..Self::default()
        }
    }

    fn unavailable() -> Self {
        Self::default()
    }

    fn seen_dirs(&self) -> Vec<PathBuf> {
        self.seen_dirs.lock().unwrap().clone()
    }

    fn plan_count(&self) -> usize {
        self.plans.lock().unwrap().len()
    }
}

fn read_config(dir: &Path) -> std::io::Result<String> {
    let mut content = String::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == "tf") {
            content.push_str(&std::fs::read_to_string(path)?);
        }
    }
    Ok(content)
}

fn local_sources(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            (key.trim() == "source").then(|| value.trim().trim_matches('"').to_owned())
        })
        .filter(|source| source.starts_with("./") || source.starts_with("../"))
        .collect()
}

impl ProvisioningEngine for FixtureEngine {
    async fn initialize(&self, dir: &Path) -> Result<String, Diagnostic> {
        self.seen_dirs.lock().unwrap().push(dir.to_path_buf());
        if !self.available {
            return Err(Diagnostic::environment("engine not installed"));
        }
        let content = read_config(dir)
            .map_err(|e| Diagnostic::initialization(format!("cannot read configuration: {e}")))?;
        for source in local_sources(&content) {
            if !dir.join(&source).is_dir() {
                return Err(Diagnostic::initialization("module not installed")
                    .with_output(format!("Error: Unreadable module directory {source}")));
            }
        }
        Ok("Terraform has been successfully initialized!".to_owned())
    }

    async fn plan(&self, dir: &Path, _args: &[String]) -> Result<PlanOutput, Diagnostic> {
        self.plans.lock().unwrap().push(dir.to_path_buf());
        let content = read_config(dir)
            .map_err(|e| Diagnostic::plan(format!("cannot read configuration: {e}")))?;
        if content.contains("undeclared_") {
            return Err(Diagnostic::plan("exit status 1")
                .with_output("Error: Reference to undeclared resource"));
        }
        Ok(PlanOutput {
            stdout: "Plan: 1 to add, 0 to change, 0 to destroy.".to_owned(),
            stderr: String::new(),
            exit_code: Some(2),
            has_changes: true,
        })
    }

    async fn version(&self) -> Result<String, Diagnostic> {
        if self.available {
            Ok("Terraform v1.9.0".to_owned())
        } else {
            Err(Diagnostic::environment("engine not installed"))
        }
    }
}

fn runner(engine: FixtureEngine, cases: &[&str]) -> SuiteRunner<FixtureEngine> {
    let config = RunnerConfigBuilder::new()
        .root(fixture_root())
        .max_parallel(4)
        .cases(cases.iter().map(|c| TestCase::new(*c)).collect())
        .build()
        .unwrap();
    SuiteRunnerBuilder::new(engine)
        .config(config)
        .build()
        .unwrap()
}

fn cases(names: &[&str]) -> Vec<TestCase> {
    names.iter().map(|n| TestCase::new(*n)).collect()
}

#[tokio::test]
async fn ok_config_passes() {
    // Given
    let runner = runner(FixtureEngine::new(), &["ok-config"]);

    // When
    let report = runner.run_once().await;

    // Then
    assert_eq!(report.total(), 1);
    assert_eq!(report.verdicts()["ok-config"], CaseState::Passed);
    assert!(report.passed());
}

#[tokio::test]
async fn bad_config_fails_without_affecting_ok_config() {
    let runner = runner(FixtureEngine::new(), &["ok-config", "bad-config"]);

    let report = runner.run_once().await;

    assert_eq!(report.verdicts()["ok-config"], CaseState::Passed);
    assert_eq!(report.verdicts()["bad-config"], CaseState::Failed);
    let bad = report.get("bad-config").unwrap();
    assert_eq!(bad.failure_kind(), Some(DiagnosticKind::Plan));
    assert!(bad.output.contains("undeclared"));
    assert!(!report.passed());
}

#[tokio::test]
async fn missing_directory_is_initialization_failure() {
    let runner = runner(FixtureEngine::new(), &[]);

    let report = runner.run(cases(&["ok-config", "no-such-dir"])).await;

    assert_eq!(report.total(), 2);
    let missing = report.get("no-such-dir").unwrap();
    assert_eq!(missing.state, CaseState::Failed);
    assert_eq!(missing.failure_kind(), Some(DiagnosticKind::Initialization));
    assert_eq!(report.verdicts()["ok-config"], CaseState::Passed);
}

#[tokio::test]
async fn relative_module_sources_resolve_in_isolated_workspace() {
    let runner = runner(FixtureEngine::new(), &["module-user"]);

    let report = runner.run_once().await;

    assert_eq!(report.verdicts()["module-user"], CaseState::Passed);
    let seen = runner.engine().seen_dirs();
    assert_eq!(seen.len(), 1);
    assert!(!seen[0].starts_with(fixture_root()));
    assert!(seen[0].ends_with("module-user"));
}

#[tokio::test]
async fn init_failure_skips_plan_step() {
    let runner = runner(FixtureEngine::new(), &["broken-module"]);

    let report = runner.run_once().await;

    let result = report.get("broken-module").unwrap();
    assert_eq!(result.failure_kind(), Some(DiagnosticKind::Initialization));
    assert!(result.output.contains("Unreadable module directory"));
    assert_eq!(runner.engine().plan_count(), 0);
}

#[tokio::test]
async fn result_count_matches_case_count() {
    let names = [
        "ok-config",
        "bad-config",
        "module-user",
        "broken-module",
        "no-such-dir",
    ];
    let runner = runner(FixtureEngine::new(), &names);

    let report = runner.run_once().await;

    assert_eq!(report.total(), names.len());
    assert_eq!(report.passed_count(), 2);
    assert_eq!(report.failed_count(), 3);
    let order: Vec<&str> = report.results.iter().map(|r| r.case.name.as_str()).collect();
    assert_eq!(order, names);
}

#[tokio::test]
async fn same_directory_twice_yields_same_verdict() {
    let runner = runner(FixtureEngine::new(), &["ok-config", "bad-config"]);

    let first = runner.run_once().await;
    let second = runner.run_once().await;

    assert_eq!(first.verdicts(), second.verdicts());
}

#[tokio::test]
async fn unavailable_engine_fails_every_case_with_environment() {
    let runner = runner(FixtureEngine::unavailable(), &["ok-config", "bad-config"]);

    let report = runner.run_once().await;

    assert_eq!(report.total(), 2);
    assert!(
        report
            .results
            .iter()
            .all(|r| r.failure_kind() == Some(DiagnosticKind::Environment))
    );
    assert!(runner.engine().seen_dirs().is_empty());
}

#[tokio::test]
async fn isolated_workspaces_are_removed_after_run() {
    let runner = runner(FixtureEngine::new(), &["ok-config", "bad-config"]);

    let report = runner.run_once().await;

    assert_eq!(report.total(), 2);
    let seen = runner.engine().seen_dirs();
    assert_eq!(seen.len(), 2);
    for dir in seen {
        assert!(!dir.exists(), "workspace {} still exists", dir.display());
    }
    assert!(fixture_root().join("ok-config/main.tf").is_file());
}

#[tokio::test]
async fn non_isolated_run_uses_fixture_directory() {
    let config = RunnerConfigBuilder::new()
        .root(fixture_root())
        .isolate_workdir(false)
        .case(TestCase::new("ok-config"))
        .build()
        .unwrap();
    let runner = SuiteRunnerBuilder::new(FixtureEngine::new())
        .config(config)
        .build()
        .unwrap();

    let report = runner.run_once().await;

    assert!(report.passed());
    assert_eq!(
        runner.engine().seen_dirs(),
        vec![fixture_root().join("ok-config")]
    );
}

#[tokio::test]
async fn report_serializes_to_json() {
    let runner = runner(FixtureEngine::new(), &["ok-config", "bad-config"]);

    let report = runner.run_once().await;
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["results"][0]["case"]["name"], "ok-config");
    assert_eq!(json["results"][0]["state"], "passed");
    assert_eq!(json["results"][1]["error"]["kind"], "plan");
}
