//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// plancheck -- init and plan every configured infrastructure directory.
///
/// Use `plancheck <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "plancheck", version, about, long_about = None)]
pub struct Cli {
    /// Path to the plancheck.toml configuration file.
    #[arg(short, long, global = true, default_value = "plancheck.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize and plan the enabled cases.
    Run(RunArgs),

    /// List declared cases and whether they are enabled.
    List,

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- run ----

/// Run the suite.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Run only these cases (repeatable). Disabled cases may be named explicitly.
    #[arg(long = "case", value_name = "NAME")]
    pub cases: Vec<String>,

    /// Override suite.max_parallel.
    #[arg(long, value_name = "N")]
    pub max_parallel: Option<usize>,

    /// Run cases in place instead of in a temporary copy.
    #[arg(long)]
    pub no_isolate: bool,

    /// Stop starting new cases after the first failure.
    #[arg(long)]
    pub fail_fast: bool,

    /// Extra argument appended to every plan (repeatable).
    #[arg(long = "plan-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub plan_args: Vec<String>,
}

// ---- config ----

/// Manage plancheck configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, engine, suite).
        #[arg(long)]
        section: Option<String>,
    },
}
