//! Error type, exit codes and the console context shared by command handlers.

use std::fmt::{self, Display, Formatter};

use anyhow::anyhow;
use arkeon_config::ConfigError;
use arkeon_console::{Console, ConsoleError, MutationError};
use arkeon_telemetry::TelemetryError;

use crate::cli::OutputFormat;

/// CLI-level error type separating operator mistakes, contention and
/// operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Busy(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
            Self::Busy(_) => 4,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) | Self::Busy(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<ConsoleError> for CliError {
    fn from(err: ConsoleError) -> Self {
        classify_console(&err)
    }
}

impl From<MutationError> for CliError {
    fn from(err: MutationError) -> Self {
        match &err {
            MutationError::Validation { .. } => Self::Validation(err.describe()),
            MutationError::Busy { .. } => Self::Busy(err.describe()),
            MutationError::Remote { source, .. } => classify_console(source),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Validation(format!("invalid configuration: {}", err.describe()))
    }
}

impl From<TelemetryError> for CliError {
    fn from(err: TelemetryError) -> Self {
        Self::failure(anyhow!("telemetry setup failed: {err}"))
    }
}

/// Service rejections of operator input become validation errors carrying the
/// service detail; everything else is an operational failure.
pub(crate) fn classify_console(err: &ConsoleError) -> CliError {
    if err.is_rejected_input() {
        CliError::Validation(err.describe())
    } else {
        CliError::Failure(anyhow!(err.describe()))
    }
}

/// Application context passed to command handlers.
pub(crate) struct AppContext {
    pub(crate) console: Console,
    pub(crate) output: OutputFormat,
}

impl AppContext {
    /// Run one refresh cycle so handlers read a current snapshot.
    pub(crate) async fn load(&self) -> CliResult<()> {
        self.console.refresh().await?;
        Ok(())
    }
}
