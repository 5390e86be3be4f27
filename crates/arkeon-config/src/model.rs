//! Typed console settings and the overrides layered on top of them.
//!
//! # Design
//! - `ConsoleConfig` is the validated result; every field is ready to use.
//! - `ConfigOverrides` carries raw CLI input and is validated by the loader.

use std::time::Duration;

use arkeon_api_models::PageSize;
use url::Url;

/// Validated configuration consumed by the console and CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    /// API root; always ends with `/` so relative joins stay under it.
    pub api_base_url: Url,
    /// Timeout applied to every HTTP request.
    pub request_timeout: Duration,
    /// Fixed polling interval of the refresh scheduler.
    pub refresh_interval: Duration,
    /// Page size used when the operator does not pick one.
    pub default_page_size: PageSize,
    /// Whether refresh cycles read the distinct-years facet.
    pub year_facet: bool,
    /// `tracing` filter directive.
    pub log_level: String,
}

/// Explicit values supplied on the command line; `None` defers to the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Replacement API base URL.
    pub api_base_url: Option<String>,
    /// Replacement HTTP timeout in seconds.
    pub request_timeout_secs: Option<u64>,
    /// Replacement polling interval in seconds.
    pub refresh_interval_secs: Option<u64>,
    /// Replacement default page size.
    pub page_size: Option<u32>,
    /// Replacement year-facet flag.
    pub year_facet: Option<bool>,
}
