//! `scopelog parse` command handler

use std::io::Write;

use colored::{ColoredString, Colorize};
use serde::Serialize;
use tracing::{info, warn};

use scopelog_core::config::{ParseConfig, ScopelogConfig};
use scopelog_core::types::Severity;
use scopelog_engine::report::{TextSection, format_line};
use scopelog_engine::{EngineConfig, LogParser, ParseSummary, Report, ReportFilter};

use crate::cli::ParseArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `parse` command.
pub async fn execute(
    args: ParseArgs,
    config: &ScopelogConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let fail_on_failure = args.fail_on_failure;
    let report = run_parse(args, config).await?;

    writer.render(&report)?;

    if fail_on_failure && !report.failed_scopes.is_empty() {
        return Err(CliError::ScopeFailed(report.failed_scopes.join(", ")));
    }
    Ok(())
}

/// Parse every file and build the (filtered) report payload.
async fn run_parse(args: ParseArgs, config: &ScopelogConfig) -> Result<ParseReport, CliError> {
    let parse_config = effective_config(&config.parse, &args);
    let filter = ReportFilter::from_core(&parse_config)?;
    let parser = LogParser::from_config(EngineConfig::from_core(&parse_config)).await?;

    info!(
        files = args.files.len(),
        rule_target = %parse_config.target,
        rules = %parse_config.rules_path,
        "parsing log files"
    );

    let outcome = parser.parse_files(&args.files).await?;

    if let Some(path) = &args.json_out {
        let json = outcome.report.to_json_pretty()?;
        tokio::fs::write(path, json).await?;
        info!(path = %path.display(), "json report written");
    }

    for summary in outcome.summaries.iter().filter(|s| s.has_warnings()) {
        warn!(
            source_id = %summary.source_id,
            warnings = summary.warnings.len(),
            "log parsed with warnings"
        );
    }

    Ok(ParseReport {
        target: parse_config.target,
        failed_scopes: failed_scopes(&outcome.report),
        report: outcome.report.filter(&filter),
        summaries: outcome.summaries,
        max_lines: parse_config.max_lines,
    })
}

/// Apply command-line overrides on top of the `[parse]` section.
fn effective_config(base: &ParseConfig, args: &ParseArgs) -> ParseConfig {
    let mut config = base.clone();
    if let Some(rules) = &args.rules {
        config.rules_path = rules.display().to_string();
    }
    if let Some(target) = &args.target {
        config.target = target.clone();
    }
    if let Some(severity) = &args.min_severity {
        config.min_severity = severity.clone();
    }
    if let Some(tags) = &args.tags {
        config.tags = split_tags(tags);
    }
    if let Some(min_matches) = args.min_matches {
        config.min_matches = min_matches;
    }
    if let Some(max_lines) = args.max_lines {
        config.max_lines = max_lines;
    }
    config
}

fn split_tags(tags: &str) -> Vec<String> {
    tags.split(';')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_uppercase)
        .collect()
}

/// `source_id:Qualified.Scope` for every scope that closed with a failure.
fn failed_scopes(report: &Report) -> Vec<String> {
    let mut failed = Vec::new();
    for (source_id, root) in report.iter() {
        root.walk(&mut |qualified, scope| {
            if scope.status == scopelog_engine::ScopeStatus::ClosedFailure {
                failed.push(format!("{source_id}:{qualified}"));
            }
        });
    }
    failed
}

/// Parse result payload.
#[derive(Serialize)]
pub struct ParseReport {
    /// Resolved target name
    pub target: String,
    /// Filtered scope report keyed by source id
    pub report: Report,
    /// Per-file summaries in input order
    pub summaries: Vec<ParseSummary>,
    /// Scopes that closed with a failure (before filtering)
    pub failed_scopes: Vec<String>,
    #[serde(skip)]
    pub max_lines: usize,
}

impl Render for ParseReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        for (source_id, root) in self.report.iter() {
            writeln!(
                w,
                "{} {} ({})",
                "==".bold(),
                source_id.bold(),
                paint_status(root.status)
            )?;

            for section in root.text_sections(self.max_lines) {
                render_section(w, &section)?;
            }

            if let Some(summary) = self.summaries.iter().find(|s| s.source_id == source_id) {
                render_summary(w, summary)?;
            }
            writeln!(w)?;
        }

        if self.failed_scopes.is_empty() {
            writeln!(w, "Result: {}", "OK".green().bold())?;
        } else {
            writeln!(w, "Result: {}", "FAILED".red().bold())?;
            for scope in &self.failed_scopes {
                writeln!(w, "  {}", scope.red())?;
            }
        }
        Ok(())
    }
}

fn render_section(w: &mut dyn Write, section: &TextSection<'_>) -> std::io::Result<()> {
    writeln!(w, "{}", paint(section.header(), section.severity))?;
    for line in &section.lines {
        writeln!(w, "{}", format_line(line))?;
    }
    let hidden = section.total - section.lines.len();
    if hidden > 0 {
        writeln!(w, "{}", format!("... {hidden} more").dimmed())?;
    }
    writeln!(w)
}

fn render_summary(w: &mut dyn Write, summary: &ParseSummary) -> std::io::Result<()> {
    let counts: Vec<String> = Severity::all()
        .iter()
        .filter_map(|s| {
            let n = summary.severity_count(*s);
            (n > 0).then(|| format!("{s}={n}"))
        })
        .collect();
    writeln!(
        w,
        "{} lines processed, {} matched, {} scopes [{}]",
        summary.lines_processed,
        summary.lines_matched,
        summary.scopes_opened,
        counts.join(" ")
    )?;
    for scope in &summary.unterminated_scopes {
        writeln!(w, "  {} unterminated scope {scope}", "warning:".yellow())?;
    }
    if summary.capture_warnings > 0 {
        writeln!(
            w,
            "  {} {} numeric captures could not be parsed",
            "warning:".yellow(),
            summary.capture_warnings
        )?;
    }
    if summary.unclaimed_flags > 0 {
        writeln!(
            w,
            "  {} {} flags had no listening scope",
            "note:".cyan(),
            summary.unclaimed_flags
        )?;
    }
    Ok(())
}

fn paint(text: String, severity: Severity) -> ColoredString {
    match severity {
        Severity::Fatal | Severity::Error => text.red().bold(),
        Severity::SevereWarning => text.magenta(),
        Severity::Warning => text.yellow(),
        Severity::Message => text.normal(),
    }
}

fn paint_status(status: scopelog_engine::ScopeStatus) -> ColoredString {
    use scopelog_engine::ScopeStatus;
    match status {
        ScopeStatus::ClosedSuccess => status.as_str().green(),
        ScopeStatus::ClosedFailure => status.as_str().red(),
        ScopeStatus::ClosedNeutral | ScopeStatus::Open => status.as_str().normal(),
    }
}
