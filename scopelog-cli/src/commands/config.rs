//! `scopelog config` command handler

use std::io::Write;
use std::path::Path;

use colored::Colorize;
use serde::Serialize;
use tracing::info;

use scopelog_core::config::ScopelogConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Load and validate the configuration file, reporting any error.
///
/// Unlike the other commands, a missing file is reported as invalid.
async fn execute_validate(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let errors = match ScopelogConfig::load(config_path).await {
        Ok(_) => Vec::new(),
        Err(e) => vec![e.to_string()],
    };
    let report = ConfigValidationReport {
        source: config_path.display().to_string(),
        valid: errors.is_empty(),
        errors,
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }
    Ok(())
}

/// Show the effective configuration (file, then env overrides, then defaults).
async fn execute_show(
    config_path: &Path,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let config = ScopelogConfig::load_or_default(config_path).await?;
    let report = config_report(config_path, &config, section)?;
    writer.render(&report)
}

fn config_report(
    config_path: &Path,
    config: &ScopelogConfig,
    section: Option<String>,
) -> Result<ConfigReport, CliError> {
    let config_toml = match section.as_deref() {
        None => toml::to_string_pretty(config),
        Some("general") => toml::to_string_pretty(&config.general),
        Some("parse") => toml::to_string_pretty(&config.parse),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {other} (expected: general, parse)"
            )));
        }
    }
    .unwrap_or_else(|e| format!("(serialization error: {e})"));

    Ok(ConfigReport {
        source: config_path.display().to_string(),
        section,
        config_toml,
    })
}

/// Configuration display report.
///
/// `config_toml` is only used for text rendering.
#[derive(Serialize)]
pub struct ConfigReport {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        match &self.section {
            Some(section) => writeln!(
                w,
                "Configuration {} (source: {})",
                format!("[{section}]").bold(),
                self.source
            )?,
            None => writeln!(w, "Configuration (source: {})", self.source.bold())?,
        }
        writeln!(w)?;
        write!(w, "{}", self.config_toml)
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    pub source: String,
    pub valid: bool,
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "Config Validation: {}", self.source.bold())?;
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_report_parse_section() {
        let config = ScopelogConfig::default();
        let report = config_report(Path::new("scopelog.toml"), &config, Some("parse".to_owned()))
            .expect("known section");
        assert!(report.config_toml.contains("target = \"BuildCookRun\""));
        assert!(!report.config_toml.contains("log_level"));
    }

    #[test]
    fn test_config_report_full() {
        let config = ScopelogConfig::default();
        let report =
            config_report(Path::new("scopelog.toml"), &config, None).expect("full config");
        assert!(report.config_toml.contains("[general]"));
        assert!(report.config_toml.contains("[parse]"));
    }

    #[test]
    fn test_config_report_unknown_section() {
        let config = ScopelogConfig::default();
        let err = match config_report(Path::new("scopelog.toml"), &config, Some("ebpf".to_owned()))
        {
            Ok(_) => panic!("unknown section should fail"),
            Err(e) => e,
        };
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("ebpf"));
    }

    #[test]
    fn test_validation_report_render() {
        colored::control::set_override(false);
        let report = ConfigValidationReport {
            source: "scopelog.toml".to_owned(),
            valid: false,
            errors: vec!["general.log_level: must be one of".to_owned()],
        };
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render");
        let text = String::from_utf8(buffer).expect("utf8");
        assert!(text.contains("INVALID"));
        assert!(text.contains("general.log_level"));
    }
}
