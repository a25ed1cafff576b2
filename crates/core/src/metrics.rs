//! Metric name constants and descriptions.
//!
//! Every counter and histogram plancheck records is named here so the
//! runner and any embedding process agree on the names.
//!
//! # Naming convention
//!
//! - prefix: `plancheck_`
//! - suffix: `_total` (counter), `_seconds` (histogram)
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(plancheck_core::metrics::CASES_TOTAL, plancheck_core::metrics::LABEL_RESULT => "passed")
//!     .increment(1);
//! ```

// ─── label keys ───────────────────────────────────────────────────────

/// Case outcome label key (passed, failed, skipped)
pub const LABEL_RESULT: &str = "result";

/// Engine command label key (init, plan, version)
pub const LABEL_COMMAND: &str = "command";

/// Diagnostic kind label key (initialization, plan, environment, internal)
pub const LABEL_KIND: &str = "kind";

// ─── suite runner ─────────────────────────────────────────────────────

/// Finished cases (counter, label: result)
pub const CASES_TOTAL: &str = "plancheck_cases_total";

/// Case failures by diagnostic kind (counter, label: kind)
pub const CASE_FAILURES_TOTAL: &str = "plancheck_case_failures_total";

/// Wall-clock time of one case including workspace setup (histogram, seconds)
pub const CASE_DURATION_SECONDS: &str = "plancheck_case_duration_seconds";

/// Completed suite runs (counter)
pub const SUITE_RUNS_TOTAL: &str = "plancheck_suite_runs_total";

// ─── engine adapter ───────────────────────────────────────────────────

/// Engine processes spawned (counter, label: command)
pub const ENGINE_COMMANDS_TOTAL: &str = "plancheck_engine_commands_total";

/// Engine process duration (histogram, seconds, label: command)
pub const ENGINE_COMMAND_DURATION_SECONDS: &str = "plancheck_engine_command_duration_seconds";

/// Suggested buckets for case and engine durations.
pub const DURATION_BUCKETS: [f64; 9] = [0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 900.0];

/// Registers descriptions with the installed recorder.
///
/// Harmless when no recorder is installed.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(CASES_TOTAL, "Total number of finished plan-check cases");
    describe_counter!(
        CASE_FAILURES_TOTAL,
        "Total number of failed cases by diagnostic kind"
    );
    describe_histogram!(
        CASE_DURATION_SECONDS,
        "Time to verify a single case in seconds"
    );
    describe_counter!(SUITE_RUNS_TOTAL, "Total number of completed suite runs");
    describe_counter!(
        ENGINE_COMMANDS_TOTAL,
        "Total number of provisioning engine processes spawned"
    );
    describe_histogram!(
        ENGINE_COMMAND_DURATION_SECONDS,
        "Provisioning engine command duration in seconds"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_use_prefix() {
        for name in [
            CASES_TOTAL,
            CASE_FAILURES_TOTAL,
            CASE_DURATION_SECONDS,
            SUITE_RUNS_TOTAL,
            ENGINE_COMMANDS_TOTAL,
            ENGINE_COMMAND_DURATION_SECONDS,
        ] {
            assert!(name.starts_with("plancheck_"), "{name} lacks prefix");
        }
    }

    #[test]
    fn duration_buckets_are_sorted() {
        assert!(DURATION_BUCKETS.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn describe_all_without_recorder_is_noop() {
        describe_all();
    }
}
