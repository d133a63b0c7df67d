//! `scopelog rules` command handler

use std::io::Write;
use std::path::Path;

use colored::Colorize;
use serde::Serialize;
use tracing::info;

use scopelog_core::config::ScopelogConfig;
use scopelog_engine::rule::Entry;
use scopelog_engine::rule::types::entry_counts;
use scopelog_engine::{RuleLoader, RuleSet};

use crate::cli::{RulesAction, RulesArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `rules` command.
pub async fn execute(
    args: RulesArgs,
    config: &ScopelogConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let max_bytes = config.parse.max_rule_file_bytes;
    match args.action {
        RulesAction::Validate { path } => execute_validate(&path, max_bytes, writer).await,
        RulesAction::List { path } => execute_list(&path, max_bytes, writer).await,
        RulesAction::Show { path, target } => execute_show(&path, &target, max_bytes, writer).await,
    }
}

async fn load(path: &Path, max_bytes: u64) -> Result<RuleSet, CliError> {
    info!(path = %path.display(), "loading rule definitions");
    Ok(RuleLoader::load_file(path, max_bytes).await?)
}

/// Load the document and resolve every target, collecting per-target errors.
async fn execute_validate(path: &Path, max_bytes: u64, writer: &OutputWriter) -> Result<(), CliError> {
    let report = match RuleLoader::load_file(path, max_bytes).await {
        Ok(rules) => validation_report(path, &rules),
        Err(e) => RuleValidationReport {
            source: path.display().to_string(),
            valid: false,
            targets: Vec::new(),
            errors: vec![e.to_string()],
        },
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Definition(format!(
            "{} error(s) in {}",
            report.errors.len(),
            report.source
        )));
    }
    Ok(())
}

fn validation_report(path: &Path, rules: &RuleSet) -> RuleValidationReport {
    let mut targets = Vec::new();
    let mut errors = Vec::new();
    for (name, result) in rules.resolve_all() {
        match result {
            Ok(tree) => targets.push(TargetCheck {
                name,
                patterns: tree.pattern_count(),
            }),
            Err(e) => errors.push(format!("{name}: {e}")),
        }
    }
    RuleValidationReport {
        source: path.display().to_string(),
        valid: errors.is_empty(),
        targets,
        errors,
    }
}

async fn execute_list(path: &Path, max_bytes: u64, writer: &OutputWriter) -> Result<(), CliError> {
    let rules = load(path, max_bytes).await?;
    writer.render(&list_report(path, &rules))
}

fn list_report(path: &Path, rules: &RuleSet) -> RuleListReport {
    let templates = rules
        .templates()
        .map(|t| rule_entry("template", &t.name, &t.entries));
    let targets = rules
        .targets()
        .map(|t| rule_entry("target", &t.name, &t.entries));

    RuleListReport {
        source: path.display().to_string(),
        entries: templates.chain(targets).collect(),
    }
}

fn rule_entry(kind: &'static str, name: &str, entries: &[Entry]) -> RuleEntry {
    let (patterns, scopes, links) = entry_counts(entries);
    RuleEntry {
        kind,
        name: name.to_owned(),
        patterns,
        scopes,
        links,
    }
}

async fn execute_show(
    path: &Path,
    target: &str,
    max_bytes: u64,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let rules = load(path, max_bytes).await?;
    let tree = rules.resolve(target)?;

    let report = RuleTreeReport {
        target: tree.target().to_owned(),
        patterns: tree.pattern_count(),
        outline: tree.outline(),
    };
    writer.render(&report)
}

/// Per-target resolution result.
#[derive(Serialize)]
pub struct TargetCheck {
    pub name: String,
    pub patterns: usize,
}

/// Rule document validation report.
#[derive(Serialize)]
pub struct RuleValidationReport {
    pub source: String,
    pub valid: bool,
    pub targets: Vec<TargetCheck>,
    pub errors: Vec<String>,
}

impl Render for RuleValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "Rule Validation: {}", self.source.bold())?;
        for target in &self.targets {
            writeln!(w, "  {} {} ({} patterns)", "ok".green(), target.name, target.patterns)?;
        }
        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }
        Ok(())
    }
}

/// One template or target with its direct entry counts.
#[derive(Serialize)]
pub struct RuleEntry {
    pub kind: &'static str,
    pub name: String,
    pub patterns: usize,
    pub scopes: usize,
    pub links: usize,
}

/// Rule listing report.
#[derive(Serialize)]
pub struct RuleListReport {
    pub source: String,
    pub entries: Vec<RuleEntry>,
}

impl Render for RuleListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "Rules: {}", self.source.bold())?;
        writeln!(
            w,
            "{:<10} {:<28} {:>8} {:>6} {:>5}",
            "KIND", "NAME", "PATTERNS", "SCOPES", "LINKS"
        )?;
        writeln!(w, "{}", "-".repeat(61))?;
        for entry in &self.entries {
            writeln!(
                w,
                "{:<10} {:<28} {:>8} {:>6} {:>5}",
                entry.kind, entry.name, entry.patterns, entry.scopes, entry.links
            )?;
        }
        Ok(())
    }
}

/// Resolved rule tree of one target.
#[derive(Serialize)]
pub struct RuleTreeReport {
    pub target: String,
    pub patterns: usize,
    #[serde(skip)]
    pub outline: String,
}

impl Render for RuleTreeReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(
            w,
            "Target {} ({} patterns)",
            self.target.bold(),
            self.patterns
        )?;
        writeln!(w)?;
        write!(w, "{}", self.outline)
    }
}
