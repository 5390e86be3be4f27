//! Prometheus-backed counters for refresh cycles and mutations.
//!
//! # Design
//! - Collector registration stays private; callers record typed outcomes.
//! - `MetricsSnapshot` exposes the totals the CLI prints after a watch.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex};

use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// How a refresh cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The batch was committed to the view store.
    Applied,
    /// The batch arrived after a newer cycle or for an outdated query.
    Stale,
    /// One of the batch reads failed; nothing was committed.
    Failed,
}

impl RefreshOutcome {
    /// Label value used in the counter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Stale => "stale",
            Self::Failed => "failed",
        }
    }
}

/// How a mutation request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The remote write succeeded.
    Succeeded,
    /// The remote write failed.
    Failed,
    /// The request never left the client (validation or busy).
    Rejected,
}

impl MutationOutcome {
    /// Label value used in the counter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Rejected => "rejected",
        }
    }
}

/// Prometheus-backed metrics registry shared by the console and CLI.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    refresh_cycles_total: IntCounterVec,
    mutations_total: IntCounterVec,
    last_applied_cycle: IntGauge,
    operations: Mutex<BTreeSet<&'static str>>,
}

/// Point-in-time totals of the console counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Cycles committed to the view store.
    pub refresh_applied: u64,
    /// Cycles discarded by the stale-commit guard.
    pub refresh_stale: u64,
    /// Cycles dropped because a read failed.
    pub refresh_failed: u64,
    /// Mutations whose remote write succeeded.
    pub mutations_succeeded: u64,
    /// Mutations whose remote write failed.
    pub mutations_failed: u64,
    /// Mutations rejected before any request.
    pub mutations_rejected: u64,
    /// Tag of the most recently applied cycle.
    pub last_applied_cycle: i64,
}

impl Metrics {
    /// Construct a new registry with the console collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any collector cannot be built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let refresh_cycles_total = IntCounterVec::new(
            Opts::new("refresh_cycles_total", "Refresh cycles by outcome"),
            &["outcome"],
        )
        .map_err(|source| TelemetryError::CounterBuild {
            name: "refresh_cycles_total",
            source,
        })?;
        let mutations_total = IntCounterVec::new(
            Opts::new("mutations_total", "Mutation requests by operation and outcome"),
            &["operation", "outcome"],
        )
        .map_err(|source| TelemetryError::CounterBuild {
            name: "mutations_total",
            source,
        })?;
        let last_applied_cycle = IntGauge::with_opts(Opts::new(
            "last_applied_cycle",
            "Tag of the most recently applied refresh cycle",
        ))
        .map_err(|source| TelemetryError::CounterBuild {
            name: "last_applied_cycle",
            source,
        })?;

        registry
            .register(Box::new(refresh_cycles_total.clone()))
            .map_err(|source| TelemetryError::CounterRegister {
                name: "refresh_cycles_total",
                source,
            })?;
        registry
            .register(Box::new(mutations_total.clone()))
            .map_err(|source| TelemetryError::CounterRegister {
                name: "mutations_total",
                source,
            })?;
        registry
            .register(Box::new(last_applied_cycle.clone()))
            .map_err(|source| TelemetryError::CounterRegister {
                name: "last_applied_cycle",
                source,
            })?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                refresh_cycles_total,
                mutations_total,
                last_applied_cycle,
                operations: Mutex::new(BTreeSet::new()),
            }),
        })
    }

    /// Count a finished refresh cycle.
    pub fn record_refresh(&self, outcome: RefreshOutcome) {
        self.inner
            .refresh_cycles_total
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    /// Record the tag of the cycle just committed.
    pub fn set_last_applied_cycle(&self, tag: u64) {
        self.inner
            .last_applied_cycle
            .set(i64::try_from(tag).unwrap_or(i64::MAX));
    }

    /// Count a finished mutation request.
    pub fn record_mutation(&self, operation: &'static str, outcome: MutationOutcome) {
        self.inner
            .operations
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(operation);
        self.inner
            .mutations_total
            .with_label_values(&[operation, outcome.as_str()])
            .inc();
    }

    /// Render the registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the output is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|source| TelemetryError::ExpositionEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::ExpositionUtf8 { source })
    }

    /// Take a point-in-time snapshot of the counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let refresh = |outcome: RefreshOutcome| {
            self.inner
                .refresh_cycles_total
                .with_label_values(&[outcome.as_str()])
                .get()
        };
        let operations = self
            .inner
            .operations
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        let mutations = |outcome: MutationOutcome| -> u64 {
            operations
                .iter()
                .map(|operation| {
                    self.inner
                        .mutations_total
                        .with_label_values(&[*operation, outcome.as_str()])
                        .get()
                })
                .sum()
        };
        MetricsSnapshot {
            refresh_applied: refresh(RefreshOutcome::Applied),
            refresh_stale: refresh(RefreshOutcome::Stale),
            refresh_failed: refresh(RefreshOutcome::Failed),
            mutations_succeeded: mutations(MutationOutcome::Succeeded),
            mutations_failed: mutations(MutationOutcome::Failed),
            mutations_rejected: mutations(MutationOutcome::Rejected),
            last_applied_cycle: self.inner.last_applied_cycle.get(),
        }
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_outcomes() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.record_refresh(RefreshOutcome::Applied);
        metrics.record_refresh(RefreshOutcome::Applied);
        metrics.record_refresh(RefreshOutcome::Stale);
        metrics.record_refresh(RefreshOutcome::Failed);
        metrics.set_last_applied_cycle(7);
        metrics.record_mutation("add_source", MutationOutcome::Succeeded);
        metrics.record_mutation("delete_track", MutationOutcome::Succeeded);
        metrics.record_mutation("upload_cookies", MutationOutcome::Rejected);
        metrics.record_mutation("toggle_source", MutationOutcome::Failed);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.refresh_applied, 2);
        assert_eq!(snapshot.refresh_stale, 1);
        assert_eq!(snapshot.refresh_failed, 1);
        assert_eq!(snapshot.mutations_succeeded, 2);
        assert_eq!(snapshot.mutations_failed, 1);
        assert_eq!(snapshot.mutations_rejected, 1);
        assert_eq!(snapshot.last_applied_cycle, 7);

        let rendered = metrics.render()?;
        assert!(rendered.contains("refresh_cycles_total"));
        assert!(rendered.contains("operation=\"add_source\""));
        Ok(())
    }

    #[test]
    fn snapshot_serializes_for_json_output() -> Result<()> {
        let metrics = Metrics::new()?;
        let value = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(value["refresh_applied"], 0);
        Ok(())
    }
}
