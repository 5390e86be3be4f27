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
#![allow(clippy::module_name_repetitions)]

//! Query and synchronization core of the Arkeon console.
//!
//! Layout: `query.rs` (control state and canonical query descriptors),
//! `client.rs` (`CatalogApi` and its HTTP implementation), `store.rs` (view
//! snapshots and the stale-commit guard), `refresh.rs` (cycle runner and
//! interval scheduler), `mutations.rs` (operator writes), `console.rs` (the
//! facade wiring them together).

pub mod client;
pub mod console;
pub mod error;
pub mod mutations;
pub mod query;
pub mod refresh;
pub mod store;

#[cfg(test)]
mod testing;

pub use client::{CatalogApi, CatalogBatch, CookieUpload, HttpCatalogClient, fetch_batch};
pub use console::{Console, ConsoleSettings};
pub use error::{ConsoleError, ConsoleResult};
pub use mutations::{
    MutationCoordinator, MutationError, RestoreKind, SingleTrackForm, SourceForm,
};
pub use query::{
    ControlChange, ControlState, QueryDescriptor, QueryParseError, StatusFilter, TrackFilters,
    build_query, parse_query,
};
pub use refresh::{
    CycleReport, CycleRunner, RefreshHandle, RefreshReason, RefreshScheduler, RefreshTrigger,
};
pub use store::{
    Activity, CommitOutcome, CycleTicket, DashboardSummary, EntityKey, ViewSnapshot, ViewStore,
};
