//! Command handlers grouped by concern.

pub(crate) mod cookies;
pub(crate) mod sources;
pub(crate) mod stats;
pub(crate) mod tracks;
pub(crate) mod watch;
