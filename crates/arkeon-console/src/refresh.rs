//! Refresh cycles and the interval scheduler that issues them.
//!
//! # Design
//! - `CycleRunner` performs one cycle: issue a ticket, read a batch, offer
//!   it to the store, record the outcome.
//! - `RefreshScheduler::start` fires a cycle immediately, on every interval
//!   tick, on every control change and on every trigger request.
//! - Cycles run concurrently; the store's stale guard orders their commits.
//! - `RefreshHandle::stop` ends the timer and waits for running cycles.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use arkeon_telemetry::{Metrics, RefreshOutcome};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::client::{CatalogApi, CatalogBatch, fetch_batch};
use crate::error::ConsoleError;
use crate::store::{CommitOutcome, CycleTicket, ViewStore};

/// Why a cycle was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    /// First cycle after the scheduler starts.
    Startup,
    /// The controls changed.
    ControlChange,
    /// A mutation completed.
    Mutation,
    /// The polling interval elapsed.
    Interval,
    /// Requested directly by the caller.
    Manual,
}

impl RefreshReason {
    /// Log/label representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::ControlChange => "control_change",
            Self::Mutation => "mutation",
            Self::Interval => "interval",
            Self::Manual => "manual",
        }
    }
}

/// Summary of a finished cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Cycle tag.
    pub tag: u64,
    /// Why the cycle ran.
    pub reason: RefreshReason,
    /// How it ended.
    pub outcome: RefreshOutcome,
}

/// Executes refresh cycles against a catalog and store.
#[derive(Clone)]
pub struct CycleRunner {
    api: Arc<dyn CatalogApi>,
    store: ViewStore,
    metrics: Metrics,
    year_facet: bool,
}

impl CycleRunner {
    /// Runner reading from `api` into `store`.
    #[must_use]
    pub fn new(
        api: Arc<dyn CatalogApi>,
        store: ViewStore,
        metrics: Metrics,
        year_facet: bool,
    ) -> Self {
        Self {
            api,
            store,
            metrics,
            year_facet,
        }
    }

    /// Store the runner commits into.
    #[must_use]
    pub const fn store(&self) -> &ViewStore {
        &self.store
    }

    /// Run one cycle to completion.
    pub async fn run(&self, reason: RefreshReason) -> CycleReport {
        self.run_checked(reason).await.0
    }

    /// Run one cycle, also handing back the read error of a failed cycle.
    pub async fn run_checked(&self, reason: RefreshReason) -> (CycleReport, Option<ConsoleError>) {
        let ticket = self.store.begin_cycle();
        let (outcome, failure) =
            match fetch_batch(self.api.as_ref(), &ticket.descriptor, self.year_facet).await {
                Err(err) => {
                    warn!(
                        tag = ticket.tag,
                        reason = reason.as_str(),
                        operation = err.operation(),
                        error = %err.describe(),
                        "refresh cycle failed"
                    );
                    (RefreshOutcome::Failed, Some(err))
                }
                Ok(batch) => (self.commit(&ticket, batch, reason), None),
            };
        self.metrics.record_refresh(outcome);
        let report = CycleReport {
            tag: ticket.tag,
            reason,
            outcome,
        };
        (report, failure)
    }

    fn commit(
        &self,
        ticket: &CycleTicket,
        batch: CatalogBatch,
        reason: RefreshReason,
    ) -> RefreshOutcome {
        match self.store.commit(ticket, batch) {
            CommitOutcome::Applied { tag } => {
                debug!(tag, reason = reason.as_str(), "refresh cycle applied");
                self.metrics.set_last_applied_cycle(tag);
                RefreshOutcome::Applied
            }
            CommitOutcome::Stale {
                tag,
                applied,
                descriptor_changed,
            } => {
                debug!(
                    tag,
                    applied = ?applied,
                    descriptor_changed,
                    reason = reason.as_str(),
                    "refresh cycle discarded as stale"
                );
                RefreshOutcome::Stale
            }
        }
    }
}

impl fmt::Debug for CycleRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CycleRunner")
            .field("year_facet", &self.year_facet)
            .finish_non_exhaustive()
    }
}

/// Cloneable handle used to request a cycle.
#[derive(Debug, Clone)]
pub struct RefreshTrigger {
    tx: mpsc::UnboundedSender<RefreshReason>,
}

impl RefreshTrigger {
    /// Queue a cycle; returns `false` once the scheduler is gone.
    pub fn request(&self, reason: RefreshReason) -> bool {
        self.tx.send(reason).is_ok()
    }
}

/// Owns the request queue until it is started or drained.
#[derive(Debug)]
pub struct RefreshScheduler {
    runner: CycleRunner,
    requests: mpsc::UnboundedReceiver<RefreshReason>,
    trigger: RefreshTrigger,
}

impl RefreshScheduler {
    /// Scheduler issuing cycles through `runner`.
    #[must_use]
    pub fn new(runner: CycleRunner) -> Self {
        let (tx, requests) = mpsc::unbounded_channel();
        Self {
            runner,
            requests,
            trigger: RefreshTrigger { tx },
        }
    }

    /// Handle for requesting cycles.
    #[must_use]
    pub fn trigger(&self) -> RefreshTrigger {
        self.trigger.clone()
    }

    /// Run every queued request inline, in order, without a timer.
    pub async fn drain_pending(&mut self) -> Vec<CycleReport> {
        let mut reports = Vec::new();
        while let Ok(reason) = self.requests.try_recv() {
            reports.push(self.runner.run(reason).await);
        }
        reports
    }

    /// Start the timer loop; the first cycle is issued immediately.
    #[must_use]
    pub fn start(self, interval: Duration) -> RefreshHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let trigger = self.trigger.clone();
        let task = tokio::spawn(self.run_loop(interval, shutdown_rx));
        info!(interval_secs = interval.as_secs(), "refresh scheduler started");
        RefreshHandle {
            shutdown: Some(shutdown_tx),
            task,
            trigger,
        }
    }

    async fn run_loop(self, period: Duration, mut shutdown: oneshot::Receiver<()>) {
        let Self {
            runner,
            mut requests,
            trigger,
        } = self;
        let mut controls = runner.store().watch_controls();
        controls.mark_unchanged();
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles = JoinSet::new();
        let mut started = false;

        loop {
            let reason = tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    if started {
                        RefreshReason::Interval
                    } else {
                        started = true;
                        RefreshReason::Startup
                    }
                }
                Some(reason) = requests.recv() => reason,
                Ok(()) = controls.changed() => RefreshReason::ControlChange,
                Some(joined) = cycles.join_next(), if !cycles.is_empty() => {
                    if let Err(err) = joined {
                        warn!(error = %err, "refresh cycle task aborted");
                    }
                    continue;
                }
            };
            let runner = runner.clone();
            cycles.spawn(async move { runner.run(reason).await });
        }

        drop(trigger);
        while let Some(joined) = cycles.join_next().await {
            if let Err(err) = joined {
                warn!(error = %err, "refresh cycle task aborted");
            }
        }
        info!("refresh scheduler stopped");
    }
}

/// Running scheduler; dropping it ends the timer without waiting for cycles.
#[derive(Debug)]
pub struct RefreshHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
    trigger: RefreshTrigger,
}

impl RefreshHandle {
    /// Handle for requesting cycles from the running loop.
    #[must_use]
    pub fn trigger(&self) -> RefreshTrigger {
        self.trigger.clone()
    }

    /// Stop the timer and wait until every running cycle has finished.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(err) = (&mut self.task).await {
            warn!(error = %err, "refresh scheduler task failed");
        }
    }
}
