//! Error types for configuration loading.

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Origin of the value (`env` or `cli`).
        section: &'static str,
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// The base URL could not be parsed.
    #[error("invalid API base URL")]
    InvalidUrl {
        /// Offending value.
        value: String,
        /// Parser error.
        source: url::ParseError,
    },
}

impl ConfigError {
    pub(crate) fn invalid(
        section: &'static str,
        field: &'static str,
        value: impl Into<String>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidField {
            section,
            field,
            value: Some(value.into()),
            reason,
        }
    }

    /// Render the error with its field context for operator-facing output.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::InvalidField {
                section,
                field,
                value,
                reason,
            } => value.as_ref().map_or_else(
                || format!("{section}.{field}: {reason}"),
                |value| format!("{section}.{field}={value:?}: {reason}"),
            ),
            Self::InvalidUrl { value, source } => format!("api_url={value:?}: {source}"),
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
