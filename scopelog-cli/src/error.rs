//! CLI-specific error types and exit code mapping

use scopelog_core::error::ScopelogError;
use scopelog_engine::LogParseError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// Rule definition document could not be loaded or resolved.
    #[error("rule definition error: {0}")]
    Definition(String),

    /// `--fail-on-failure` was given and a scope closed with a failure.
    #[error("failed scopes: {0}")]
    ScopeFailed(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (log read, report write, stdout write).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from scopelog-core.
    #[error("{0}")]
    Core(#[from] ScopelogError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                          |
    /// |------|----------------------------------|
    /// | 0    | Success                          |
    /// | 1    | General / command error          |
    /// | 2    | Configuration error              |
    /// | 3    | Rule definition error            |
    /// | 4    | Failed scope (--fail-on-failure) |
    /// | 10   | IO error                         |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(ScopelogError::Config(_)) => 2,
            Self::Definition(_) | Self::Core(ScopelogError::Definition(_)) => 3,
            Self::ScopeFailed(_) => 4,
            Self::Io(_) | Self::Core(ScopelogError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}

impl From<LogParseError> for CliError {
    fn from(e: LogParseError) -> Self {
        match e {
            LogParseError::Io(io) => Self::Io(io),
            LogParseError::Config { .. } => Self::Config(e.to_string()),
            e if e.is_load_error() => Self::Definition(e.to_string()),
            e => Self::Command(e.to_string()),
        }
    }
}
