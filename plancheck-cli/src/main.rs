//! plancheck CLI entry point.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;
use colored::Colorize;

use plancheck_core::config::{GeneralConfig, PlancheckConfig};

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut general = PlancheckConfig::load(&cli.config)
        .await
        .map(|c| c.general)
        .unwrap_or_else(|_| GeneralConfig::default());
    if let Some(level) = &cli.log_level {
        general.log_level.clone_from(level);
    }
    if let Err(e) = logging::init_tracing(&general) {
        eprintln!("{} {e}", "warning:".yellow().bold());
    }

    plancheck_core::metrics::describe_all();

    let writer = OutputWriter::new(cli.output);
    let code = match dispatch(cli, &writer).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            e.exit_code()
        }
    };

    std::process::exit(code);
}

async fn dispatch(cli: Cli, writer: &OutputWriter) -> Result<(), CliError> {
    match cli.command {
        Commands::Run(args) => commands::run::execute(args, &cli.config, writer).await,
        Commands::List => commands::list::execute(&cli.config, writer).await,
        Commands::Config(args) => commands::config::execute(args, &cli.config, writer).await,
    }
}
