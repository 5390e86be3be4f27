//! Logging initialisation and configuration.
//!
//! # Design
//! - Single entry point installing a fmt subscriber (pretty, compact or JSON).
//! - Logs go to stderr; stdout is reserved for command output.
//! - Records the build version once so every module reports the same value.

use std::str::FromStr;

use once_cell::sync::OnceCell;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Result, TelemetryError};

/// Default logging filter when none is configured.
pub const DEFAULT_LOG_LEVEL: &str = "info";

static BUILD_VERSION: OnceCell<String> = OnceCell::new();

/// Configure and install the global tracing subscriber.
///
/// `config.level` is used verbatim as an `EnvFilter` directive; an unparsable
/// directive falls back to [`DEFAULT_LOG_LEVEL`].
///
/// # Errors
///
/// Returns [`TelemetryError::LoggingInstall`] if another global subscriber
/// has already been set.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    BUILD_VERSION
        .set(config.build_version.to_string())
        .ok()
        .or(Some(()));

    let filter = build_env_filter(config.level);
    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_thread_ids(false),
            )
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init(),
    };
    installed.map_err(|source| TelemetryError::LoggingInstall { source })
}

/// Version recorded during logging initialisation.
#[must_use]
pub fn build_version() -> &'static str {
    BUILD_VERSION
        .get()
        .map_or(env!("CARGO_PKG_VERSION"), String::as_str)
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig<'a> {
    /// Filter directive (e.g. `info`, `arkeon_console=debug`).
    pub level: &'a str,
    /// Output format selection for the tracing subscriber.
    pub format: LogFormat,
    /// Build identifier recorded in structured logs.
    pub build_version: &'a str,
}

impl Default for LoggingConfig<'_> {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
            format: LogFormat::infer(),
            build_version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Available output formats for the logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Emit logs as structured JSON objects.
    Json,
    /// Emit human-readable, multi-line logs.
    Pretty,
    /// Emit one terse line per event.
    Compact,
}

impl LogFormat {
    /// Choose a sensible default for the current build.
    #[must_use]
    pub const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unsupported log format '{other}'")),
        }
    }
}

fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parses_known_names() {
        assert_eq!("json".parse(), Ok(LogFormat::Json));
        assert_eq!("compact".parse(), Ok(LogFormat::Compact));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn init_logging_installs_subscriber_once() {
        let config = LoggingConfig {
            level: "arkeon=debug,info",
            format: LogFormat::Compact,
            build_version: "test",
        };
        let first = init_logging(&config);
        let second = init_logging(&config);
        assert!(first.is_ok() || second.is_err());
        assert!(second.is_err());
    }
}
