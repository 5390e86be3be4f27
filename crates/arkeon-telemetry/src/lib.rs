#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Telemetry primitives shared across the Arkeon workspace.
//!
//! This crate centralises logging setup and the refresh/mutation counters so
//! the console core and the CLI report through one observability story.

pub mod error;
pub mod init;
pub mod metrics;

pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_version, init_logging};
pub use metrics::{Metrics, MetricsSnapshot, MutationOutcome, RefreshOutcome};
