//! scopelog -- command-line front end for the scopelog engine.
//!
//! ```text
//! scopelog parse Build.log --target BuildCookRun --json-out report.json
//! scopelog rules validate logparse_patterns.xml
//! scopelog config show --section parse
//! ```

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;
use colored::Colorize;

use scopelog_core::config::{GeneralConfig, ScopelogConfig};

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {e}", "error:".red().bold());
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);

    // `config` reports on the file itself, so it must not fail before running.
    let config = match &cli.command {
        Commands::Config(_) => None,
        _ => Some(ScopelogConfig::load_or_default(&cli.config).await?),
    };

    let mut general = config
        .as_ref()
        .map(|c| c.general.clone())
        .unwrap_or_else(GeneralConfig::default);
    if let Some(level) = &cli.log_level {
        general.log_level = level.clone();
    }
    logging::init_tracing(&general).map_err(|e| CliError::Config(e.to_string()))?;
    scopelog_core::metrics::describe_metrics();

    tracing::debug!(config = %cli.config.display(), "scopelog starting");

    match (cli.command, config) {
        (Commands::Parse(args), Some(config)) => {
            commands::parse::execute(args, &config, &writer).await
        }
        (Commands::Rules(args), Some(config)) => {
            commands::rules::execute(args, &config, &writer).await
        }
        (Commands::Config(args), _) => commands::config::execute(args, &cli.config, &writer).await,
        (_, None) => Err(CliError::Command("configuration was not loaded".to_owned())),
    }
}
