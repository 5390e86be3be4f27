//! Baseline values applied when neither the environment nor CLI flags set a field.
//!
//! # Design
//! - Centralize defaults so the loader and tests agree on them.
//! - Keep time-based defaults in whole seconds, matching the env surface.

/// Base URL of the acquisition service API.
pub const API_BASE_URL: &str = "http://localhost:8000/api";
/// HTTP request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
/// Polling interval of the refresh scheduler in seconds.
pub const REFRESH_INTERVAL_SECS: u64 = 15;
/// Smallest accepted polling interval in seconds.
pub const MIN_REFRESH_INTERVAL_SECS: u64 = 1;
/// Smallest accepted HTTP timeout in seconds.
pub const MIN_REQUEST_TIMEOUT_SECS: u64 = 1;
/// Log filter used when no directive is supplied.
pub const LOG_LEVEL: &str = "info";

/// Environment variable naming the API base URL.
pub const ENV_API_URL: &str = "ARKEON_API_URL";
/// Environment variable naming the HTTP timeout.
pub const ENV_HTTP_TIMEOUT: &str = "ARKEON_HTTP_TIMEOUT_SECS";
/// Environment variable naming the polling interval.
pub const ENV_REFRESH_INTERVAL: &str = "ARKEON_REFRESH_INTERVAL_SECS";
/// Environment variable naming the default page size.
pub const ENV_PAGE_SIZE: &str = "ARKEON_PAGE_SIZE";
/// Environment variable toggling the year facet read.
pub const ENV_YEAR_FACET: &str = "ARKEON_YEAR_FACET";
/// Primary log filter variable.
pub const ENV_LOG: &str = "ARKEON_LOG";
/// Fallback log filter variable.
pub const ENV_RUST_LOG: &str = "RUST_LOG";
