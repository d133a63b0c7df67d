//! CLI argument parsing using clap derive API
//!
//! Purely declarative: no side effects or I/O happen here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// scopelog -- turn Unreal Engine automation logs into scoped reports.
///
/// Use `scopelog <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "scopelog", version, about, long_about = None)]
pub struct Cli {
    /// Path to the scopelog.toml configuration file.
    #[arg(short, long, default_value = "scopelog.toml")]
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
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse one or more log files against a rule target.
    Parse(ParseArgs),

    /// Inspect and validate rule definition documents.
    Rules(RulesArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- parse ----

/// Parse log files and print the scope report.
#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Log files to parse.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Rule definition document (overrides parse.rules_path).
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Target to resolve (overrides parse.target).
    #[arg(long)]
    pub target: Option<String>,

    /// Write the full JSON report to this file.
    #[arg(long)]
    pub json_out: Option<PathBuf>,

    /// Minimum pattern list severity to show (Message, Warning, Severe_Warning, Error, Fatal).
    #[arg(long)]
    pub min_severity: Option<String>,

    /// Only show pattern lists carrying one of these tags (semicolon separated).
    #[arg(long)]
    pub tags: Option<String>,

    /// Minimum number of matched lines for a pattern list to be shown.
    #[arg(long)]
    pub min_matches: Option<usize>,

    /// Lines shown per pattern list in text output (0 = unlimited).
    #[arg(long)]
    pub max_lines: Option<usize>,

    /// Exit with code 4 when any scope closed with a failure.
    #[arg(long)]
    pub fail_on_failure: bool,
}

// ---- rules ----

/// Inspect rule definition documents.
#[derive(Args, Debug)]
pub struct RulesArgs {
    #[command(subcommand)]
    pub action: RulesAction,
}

#[derive(Subcommand, Debug)]
pub enum RulesAction {
    /// Load a rule document and resolve every target.
    Validate {
        /// Rule definition document.
        path: PathBuf,
    },
    /// List templates and targets with their entry counts.
    List {
        /// Rule definition document.
        path: PathBuf,
    },
    /// Show the resolved scope tree of one target.
    Show {
        /// Rule definition document.
        path: PathBuf,

        /// Target to resolve.
        #[arg(long)]
        target: String,
    },
}

// ---- config ----

/// Manage scopelog configuration.
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
        /// Show only a specific section (general, parse).
        #[arg(long)]
        section: Option<String>,
    },
}
