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

//! Environment-backed configuration for the Arkeon console.
//!
//! Layout: `model.rs` (typed settings and overrides), `defaults.rs` (baseline
//! values), `validate.rs` (parsing helpers), `loader.rs` (`ConfigLoader`).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use model::{ConfigOverrides, ConsoleConfig};
