//! Parsing helpers for raw configuration values.

use std::time::Duration;

use arkeon_api_models::PageSize;
use url::Url;

use crate::error::{ConfigError, ConfigResult};

/// Parse the API base URL, forcing a trailing slash on its path.
///
/// # Errors
///
/// Returns [`ConfigError`] when the value is not an absolute `http(s)` URL.
pub fn parse_base_url(section: &'static str, raw: &str) -> ConfigResult<Url> {
    let trimmed = raw.trim();
    let mut url = Url::parse(trimmed).map_err(|source| ConfigError::InvalidUrl {
        value: trimmed.to_string(),
        source,
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::invalid(
            section,
            "api_url",
            trimmed,
            "scheme must be http or https",
        ));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::invalid(
            section,
            "api_url",
            trimmed,
            "must not carry a query or fragment",
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Parse a whole number of seconds no smaller than `min`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for non-numeric or too-small values.
pub fn parse_secs(
    section: &'static str,
    field: &'static str,
    raw: &str,
    min: u64,
) -> ConfigResult<Duration> {
    let secs = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| {
            ConfigError::invalid(section, field, raw, "must be a whole number of seconds")
        })?;
    check_secs(section, field, secs, min)
}

/// Check an already-numeric duration against its lower bound.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when `secs < min`.
pub fn check_secs(
    section: &'static str,
    field: &'static str,
    secs: u64,
    min: u64,
) -> ConfigResult<Duration> {
    if secs < min {
        return Err(ConfigError::invalid(
            section,
            field,
            secs.to_string(),
            "below minimum",
        ));
    }
    Ok(Duration::from_secs(secs))
}

/// Parse a page size restricted to the supported set.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is not offered.
pub fn parse_page_size(section: &'static str, raw: &str) -> ConfigResult<PageSize> {
    raw.trim()
        .parse::<PageSize>()
        .map_err(|_| {
            ConfigError::invalid(section, "page_size", raw, "must be one of 10, 25, 50, 100")
        })
}

/// Parse a boolean flag accepting the usual spellings.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for unrecognised spellings.
pub fn parse_bool(section: &'static str, field: &'static str, raw: &str) -> ConfigResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(section, field, raw, "must be a boolean")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let url = parse_base_url("env", "http://localhost:8000/api").expect("valid url");
        assert_eq!(url.as_str(), "http://localhost:8000/api/");
        assert_eq!(
            url.join("sources").expect("join").as_str(),
            "http://localhost:8000/api/sources"
        );
    }

    #[test]
    fn base_url_rejects_other_schemes() {
        let err = parse_base_url("cli", "ftp://example.com/api").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidField {
                field: "api_url",
                ..
            }
        ));
        assert!(matches!(
            parse_base_url("cli", "not a url"),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn seconds_respect_minimum() {
        assert_eq!(
            parse_secs("env", "refresh_interval", " 30 ", 1).ok(),
            Some(Duration::from_secs(30))
        );
        assert!(parse_secs("env", "refresh_interval", "0", 1).is_err());
        assert!(parse_secs("env", "refresh_interval", "soon", 1).is_err());
    }

    #[test]
    fn booleans_and_page_sizes() {
        assert_eq!(parse_bool("env", "year_facet", "Off").ok(), Some(false));
        assert_eq!(parse_bool("env", "year_facet", "1").ok(), Some(true));
        assert!(parse_bool("env", "year_facet", "maybe").is_err());
        assert_eq!(parse_page_size("env", "100").map(PageSize::get).ok(), Some(100));
        assert!(parse_page_size("env", "20").is_err());
    }
}
