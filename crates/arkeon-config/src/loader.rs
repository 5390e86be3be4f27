//! Resolve [`ConsoleConfig`] from the environment and CLI overrides.
//!
//! The loader takes a lookup function instead of reading the process
//! environment directly, so callers and tests can supply their own source.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use arkeon_api_models::PageSize;

use crate::defaults;
use crate::error::ConfigResult;
use crate::model::{ConfigOverrides, ConsoleConfig};
use crate::validate::{check_secs, parse_base_url, parse_bool, parse_page_size, parse_secs};

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Builds a validated [`ConsoleConfig`].
pub struct ConfigLoader {
    lookup: Lookup,
}

impl ConfigLoader {
    /// Loader reading the current process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loader reading values through `lookup`.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Box::new(lookup),
        }
    }

    /// Loader backed by a fixed map of variables.
    #[must_use]
    pub fn from_map(vars: HashMap<String, String>) -> Self {
        Self::from_lookup(move |key| vars.get(key).cloned())
    }

    fn var(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|value| !value.trim().is_empty())
    }

    /// Resolve configuration: defaults, then environment, then `overrides`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError`] when any supplied value fails validation.
    pub fn load(&self, overrides: &ConfigOverrides) -> ConfigResult<ConsoleConfig> {
        let api_base_url = match (&overrides.api_base_url, self.var(defaults::ENV_API_URL)) {
            (Some(raw), _) => parse_base_url("cli", raw)?,
            (None, Some(raw)) => parse_base_url("env", &raw)?,
            (None, None) => parse_base_url("default", defaults::API_BASE_URL)?,
        };

        let request_timeout = self.resolve_secs(
            overrides.request_timeout_secs,
            defaults::ENV_HTTP_TIMEOUT,
            "request_timeout",
            defaults::REQUEST_TIMEOUT_SECS,
            defaults::MIN_REQUEST_TIMEOUT_SECS,
        )?;
        let refresh_interval = self.resolve_secs(
            overrides.refresh_interval_secs,
            defaults::ENV_REFRESH_INTERVAL,
            "refresh_interval",
            defaults::REFRESH_INTERVAL_SECS,
            defaults::MIN_REFRESH_INTERVAL_SECS,
        )?;

        let default_page_size = match (overrides.page_size, self.var(defaults::ENV_PAGE_SIZE)) {
            (Some(size), _) => parse_page_size("cli", &size.to_string())?,
            (None, Some(raw)) => parse_page_size("env", &raw)?,
            (None, None) => PageSize::DEFAULT,
        };

        let year_facet = match (overrides.year_facet, self.var(defaults::ENV_YEAR_FACET)) {
            (Some(flag), _) => flag,
            (None, Some(raw)) => parse_bool("env", "year_facet", &raw)?,
            (None, None) => true,
        };

        let log_level = self
            .var(defaults::ENV_LOG)
            .or_else(|| self.var(defaults::ENV_RUST_LOG))
            .unwrap_or_else(|| defaults::LOG_LEVEL.to_string());

        Ok(ConsoleConfig {
            api_base_url,
            request_timeout,
            refresh_interval,
            default_page_size,
            year_facet,
            log_level,
        })
    }

    fn resolve_secs(
        &self,
        explicit: Option<u64>,
        env_key: &str,
        field: &'static str,
        default: u64,
        min: u64,
    ) -> ConfigResult<Duration> {
        match (explicit, self.var(env_key)) {
            (Some(secs), _) => check_secs("cli", field, secs, min),
            (None, Some(raw)) => parse_secs("env", field, &raw, min),
            (None, None) => Ok(Duration::from_secs(default)),
        }
    }
}

impl fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigLoader").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigError;

    fn loader(pairs: &[(&str, &str)]) -> ConfigLoader {
        ConfigLoader::from_map(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        )
    }

    #[test]
    fn defaults_apply_without_environment() {
        let config = loader(&[])
            .load(&ConfigOverrides::default())
            .expect("defaults load");
        assert_eq!(config.api_base_url.as_str(), "http://localhost:8000/api/");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.refresh_interval, Duration::from_secs(15));
        assert_eq!(config.default_page_size, PageSize::DEFAULT);
        assert!(config.year_facet);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn environment_values_are_read() {
        let config = loader(&[
            ("ARKEON_API_URL", "https://media.lan/api/"),
            ("ARKEON_REFRESH_INTERVAL_SECS", "5"),
            ("ARKEON_PAGE_SIZE", "25"),
            ("ARKEON_YEAR_FACET", "false"),
            ("RUST_LOG", "debug"),
        ])
        .load(&ConfigOverrides::default())
        .expect("env load");
        assert_eq!(config.api_base_url.as_str(), "https://media.lan/api/");
        assert_eq!(config.refresh_interval, Duration::from_secs(5));
        assert_eq!(config.default_page_size.get(), 25);
        assert!(!config.year_facet);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn overrides_win_over_environment() {
        let overrides = ConfigOverrides {
            api_base_url: Some("http://127.0.0.1:9000/api".into()),
            refresh_interval_secs: Some(2),
            year_facet: Some(true),
            ..ConfigOverrides::default()
        };
        let config = loader(&[
            ("ARKEON_API_URL", "http://ignored/api"),
            ("ARKEON_REFRESH_INTERVAL_SECS", "60"),
            ("ARKEON_YEAR_FACET", "0"),
            ("ARKEON_LOG", "warn"),
            ("RUST_LOG", "trace"),
        ])
        .load(&overrides)
        .expect("override load");
        assert_eq!(config.api_base_url.as_str(), "http://127.0.0.1:9000/api/");
        assert_eq!(config.refresh_interval, Duration::from_secs(2));
        assert!(config.year_facet);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn invalid_values_fail_with_context() {
        let err = loader(&[("ARKEON_REFRESH_INTERVAL_SECS", "0")])
            .load(&ConfigOverrides::default())
            .unwrap_err();
        match err {
            ConfigError::InvalidField {
                section,
                field,
                value,
                ..
            } => {
                assert_eq!(section, "env");
                assert_eq!(field, "refresh_interval");
                assert_eq!(value.as_deref(), Some("0"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = loader(&[])
            .load(&ConfigOverrides {
                page_size: Some(12),
                ..ConfigOverrides::default()
            })
            .unwrap_err();
        assert!(err.describe().starts_with("cli.page_size="));
    }

    #[test]
    fn blank_variables_are_ignored() {
        let config = loader(&[("ARKEON_PAGE_SIZE", "  ")])
            .load(&ConfigOverrides::default())
            .expect("blank ignored");
        assert_eq!(config.default_page_size, PageSize::DEFAULT);
    }
}
