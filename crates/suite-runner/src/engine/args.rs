//! Engine options and argument rendering.
//!
//! [`format_args`] is a pure function: the same options and command always
//! produce the same argument vector, with variables in sorted order.

use std::collections::BTreeMap;
use std::time::Duration;

use plancheck_core::config::EngineConfig;

/// Commands that must never prompt.
const INPUT_COMMANDS: &[&str] = &["init", "plan", "apply", "destroy", "refresh", "import"];

/// Commands that take or release the state lock.
const LOCK_COMMANDS: &[&str] = &[
    "init", "plan", "apply", "destroy", "refresh", "import", "taint", "untaint",
];

/// Commands that accept `-var`, `-var-file` and `-target`.
const VAR_COMMANDS: &[&str] = &["plan", "apply", "destroy", "refresh", "import", "console"];

/// Commands that accept `-parallelism`.
const PARALLELISM_COMMANDS: &[&str] = &["plan", "apply", "destroy"];

/// Options controlling how the engine is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Engine executable
    pub binary: String,
    /// `-var key=value`, sorted by key
    pub vars: BTreeMap<String, String>,
    /// `-var-file=...`
    pub var_files: Vec<String>,
    /// `-target=...`
    pub targets: Vec<String>,
    /// `-no-color`
    pub no_color: bool,
    /// `-lock=<bool>`
    pub lock: bool,
    /// `-lock-timeout=...`, empty to omit
    pub lock_timeout: String,
    /// `-parallelism=N`, 0 to omit
    pub parallelism: u32,
    /// `init -upgrade=<bool>`
    pub upgrade: bool,
    /// `init -backend=<bool>`
    pub backend: bool,
    /// `plan -detailed-exitcode`
    pub detailed_exitcode: bool,
    /// Extra environment for every engine process
    pub env: BTreeMap<String, String>,
    /// Per-command timeout, `None` disables it
    pub command_timeout: Option<Duration>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from_core(&EngineConfig::default())
    }
}

impl EngineOptions {
    /// Builds options from the `[engine]` config section.
    pub fn from_core(core: &EngineConfig) -> Self {
        Self {
            binary: core.binary.clone(),
            vars: core.vars.clone(),
            var_files: core.var_files.clone(),
            targets: core.targets.clone(),
            no_color: core.no_color,
            lock: core.lock,
            lock_timeout: core.lock_timeout.clone(),
            parallelism: core.parallelism,
            upgrade: core.upgrade,
            backend: core.backend,
            detailed_exitcode: core.detailed_exitcode,
            env: core.env.clone(),
            command_timeout: (core.command_timeout_secs > 0)
                .then(|| Duration::from_secs(core.command_timeout_secs)),
        }
    }
}

/// Renders the argument vector for `command`.
///
/// The command name comes first and `extra` comes last; flags in between
/// depend on which flags `command` accepts.
pub fn format_args(options: &EngineOptions, command: &str, extra: &[String]) -> Vec<String> {
    let mut args = vec![command.to_owned()];

    if INPUT_COMMANDS.contains(&command) {
        args.push("-input=false".to_owned());
    }

    if options.no_color && command != "version" {
        args.push("-no-color".to_owned());
    }

    if command == "init" {
        args.push(format!("-upgrade={}", options.upgrade));
        args.push(format!("-backend={}", options.backend));
    }

    if LOCK_COMMANDS.contains(&command) {
        args.push(format!("-lock={}", options.lock));
        if !options.lock_timeout.is_empty() {
            args.push(format!("-lock-timeout={}", options.lock_timeout));
        }
    }

    if VAR_COMMANDS.contains(&command) {
        for (key, value) in &options.vars {
            args.push("-var".to_owned());
            args.push(format!("{key}={value}"));
        }
        args.extend(options.var_files.iter().map(|f| format!("-var-file={f}")));
        args.extend(options.targets.iter().map(|t| format!("-target={t}")));
    }

    if PARALLELISM_COMMANDS.contains(&command) && options.parallelism > 0 {
        args.push(format!("-parallelism={}", options.parallelism));
    }

    if command == "plan" && options.detailed_exitcode {
        args.push("-detailed-exitcode".to_owned());
    }

    args.extend(extra.iter().cloned());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> EngineOptions {
        EngineOptions::default()
    }

    #[test]
    fn default_options_match_core_defaults() {
        let opts = options();
        assert_eq!(opts.binary, "terraform");
        assert!(opts.no_color);
        assert!(!opts.lock);
        assert!(!opts.backend);
        assert!(opts.detailed_exitcode);
        assert!(opts.command_timeout.is_none());
    }

    #[test]
    fn from_core_converts_timeout() {
        let core = EngineConfig {
            command_timeout_secs: 90,
            ..EngineConfig::default()
        };
        let opts = EngineOptions::from_core(&core);
        assert_eq!(opts.command_timeout, Some(Duration::from_secs(90)));
    }

    #[test]
    fn init_args_with_defaults() {
        let args = format_args(&options(), "init", &[]);
        assert_eq!(
            args,
            vec![
                "init",
                "-input=false",
                "-no-color",
                "-upgrade=false",
                "-backend=false",
                "-lock=false",
            ]
        );
    }

    #[test]
    fn plan_args_with_defaults() {
        let args = format_args(&options(), "plan", &[]);
        assert_eq!(
            args,
            vec![
                "plan",
                "-input=false",
                "-no-color",
                "-lock=false",
                "-detailed-exitcode",
            ]
        );
    }

    #[test]
    fn version_args_have_no_flags() {
        assert_eq!(format_args(&options(), "version", &[]), vec!["version"]);
    }

    #[test]
    fn vars_are_sorted_and_precede_files_and_targets() {
        let mut opts = options();
        opts.vars.insert("zone".to_owned(), "b".to_owned());
        opts.vars.insert("location".to_owned(), "westeurope".to_owned());
        opts.var_files.push("prod.tfvars".to_owned());
        opts.targets.push("module.policy".to_owned());
        opts.detailed_exitcode = false;

        let args = format_args(&opts, "plan", &[]);
        assert_eq!(
            &args[4..],
            &[
                "-var",
                "location=westeurope",
                "-var",
                "zone=b",
                "-var-file=prod.tfvars",
                "-target=module.policy",
            ]
        );
    }

    #[test]
    fn init_ignores_vars_and_parallelism() {
        let mut opts = options();
        opts.vars.insert("a".to_owned(), "1".to_owned());
        opts.parallelism = 4;
        let args = format_args(&opts, "init", &[]);
        assert!(!args.iter().any(|a| a == "-var"));
        assert!(!args.iter().any(|a| a.starts_with("-parallelism")));
    }

    #[test]
    fn lock_timeout_and_parallelism_rendered_when_set() {
        let mut opts = options();
        opts.lock = true;
        opts.lock_timeout = "30s".to_owned();
        opts.parallelism = 8;
        let args = format_args(&opts, "plan", &[]);
        assert!(args.contains(&"-lock=true".to_owned()));
        assert!(args.contains(&"-lock-timeout=30s".to_owned()));
        assert!(args.contains(&"-parallelism=8".to_owned()));
    }

    #[test]
    fn taint_gets_lock_but_not_input() {
        let args = format_args(&options(), "taint", &[]);
        assert_eq!(args, vec!["taint", "-no-color", "-lock=false"]);
    }

    #[test]
    fn no_color_disabled() {
        let mut opts = options();
        opts.no_color = false;
        let args = format_args(&opts, "plan", &[]);
        assert!(!args.contains(&"-no-color".to_owned()));
    }

    #[test]
    fn extra_args_come_last() {
        let extra = vec!["-out=plan.bin".to_owned()];
        let args = format_args(&options(), "plan", &extra);
        assert_eq!(args.first().map(String::as_str), Some("plan"));
        assert_eq!(args.last().map(String::as_str), Some("-out=plan.bin"));
    }

    #[test]
    fn format_args_is_deterministic() {
        let mut opts = options();
        for key in ["c", "a", "b"] {
            opts.vars.insert(key.to_owned(), key.to_uppercase());
        }
        let first = format_args(&opts, "apply", &[]);
        let second = format_args(&opts.clone(), "apply", &[]);
        assert_eq!(first, second);
    }
}
