//! Facade wiring catalog, store, scheduler and mutations together.

use std::sync::Arc;
use std::time::Duration;

use arkeon_api_models::{PageSize, TrackId};
use arkeon_config::ConsoleConfig;
use arkeon_telemetry::Metrics;
use tokio::sync::watch;

use crate::client::{CatalogApi, HttpCatalogClient};
use crate::error::ConsoleResult;
use crate::mutations::{MutationCoordinator, MutationError, RestoreKind};
use crate::query::{ControlChange, ControlState};
use crate::refresh::{CycleReport, CycleRunner, RefreshHandle, RefreshReason, RefreshScheduler};
use crate::store::{ViewSnapshot, ViewStore};

/// Runtime knobs of a [`Console`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleSettings {
    /// Initial page size of the listing.
    pub page_size: PageSize,
    /// Whether cycles read the year facet.
    pub year_facet: bool,
    /// Polling interval once started.
    pub refresh_interval: Duration,
}

impl From<&ConsoleConfig> for ConsoleSettings {
    fn from(config: &ConsoleConfig) -> Self {
        Self {
            page_size: config.default_page_size,
            year_facet: config.year_facet,
            refresh_interval: config.refresh_interval,
        }
    }
}

/// Browsing and management console over a catalog.
#[derive(Debug)]
pub struct Console {
    store: ViewStore,
    runner: CycleRunner,
    mutations: MutationCoordinator,
    metrics: Metrics,
    settings: ConsoleSettings,
    scheduler: Option<RefreshScheduler>,
}

impl Console {
    /// Console over any [`CatalogApi`].
    #[must_use]
    pub fn new(api: Arc<dyn CatalogApi>, settings: ConsoleSettings, metrics: Metrics) -> Self {
        let store = ViewStore::new(ControlState::with_page_size(settings.page_size));
        let runner = CycleRunner::new(
            api.clone(),
            store.clone(),
            metrics.clone(),
            settings.year_facet,
        );
        let scheduler = RefreshScheduler::new(runner.clone());
        let mutations =
            MutationCoordinator::new(api, store.clone(), scheduler.trigger(), metrics.clone());
        Self {
            store,
            runner,
            mutations,
            metrics,
            settings,
            scheduler: Some(scheduler),
        }
    }

    /// Console over the HTTP catalog described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn connect(
        config: &ConsoleConfig,
        trace_id: &str,
        metrics: Metrics,
    ) -> ConsoleResult<Self> {
        let client = HttpCatalogClient::new(config, trace_id)?;
        Ok(Self::new(Arc::new(client), config.into(), metrics))
    }

    /// Shared view store.
    #[must_use]
    pub const fn store(&self) -> &ViewStore {
        &self.store
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ViewSnapshot> {
        self.store.snapshot()
    }

    /// Receiver notified on every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<ViewSnapshot>> {
        self.store.subscribe()
    }

    /// Write operations.
    #[must_use]
    pub const fn mutations(&self) -> &MutationCoordinator {
        &self.mutations
    }

    /// Counters shared by cycles and mutations.
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Settings the console was built with.
    #[must_use]
    pub const fn settings(&self) -> ConsoleSettings {
        self.settings
    }

    /// Edit the controls; a running scheduler refreshes on change.
    pub fn set_control(&self, change: ControlChange) -> bool {
        self.store.update_controls(change)
    }

    /// Replace the controls wholesale.
    pub fn replace_controls(&self, controls: ControlState) -> bool {
        self.store.replace_controls(controls)
    }

    /// Run one cycle now, independent of the scheduler.
    pub async fn refresh_now(&self) -> CycleReport {
        self.runner.run(RefreshReason::Manual).await
    }

    /// Run one cycle now and fail if its reads failed.
    ///
    /// # Errors
    ///
    /// Returns the first failing read of the cycle.
    pub async fn refresh(&self) -> ConsoleResult<CycleReport> {
        match self.runner.run_checked(RefreshReason::Manual).await {
            (_, Some(err)) => Err(err),
            (report, None) => Ok(report),
        }
    }

    /// Run cycles requested by mutations; empty once the scheduler started.
    pub async fn drain_pending(&mut self) -> Vec<CycleReport> {
        match self.scheduler.as_mut() {
            Some(scheduler) => scheduler.drain_pending().await,
            None => Vec::new(),
        }
    }

    /// Start interval polling; `None` if it was already started.
    pub fn start(&mut self) -> Option<RefreshHandle> {
        self.scheduler
            .take()
            .map(|scheduler| scheduler.start(self.settings.refresh_interval))
    }

    /// Restore or retry a track, picking the flavour from its status in the
    /// current view.
    ///
    /// # Errors
    ///
    /// As [`MutationCoordinator::restore_track`].
    pub async fn restore_visible_track(&self, id: TrackId) -> Result<RestoreKind, MutationError> {
        self.mutations.restore_track(id, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::StatusFilter;
    use crate::testing::{FakeCatalog, track};
    use arkeon_api_models::DownloadStatus;
    use arkeon_telemetry::RefreshOutcome;

    fn console(api: &Arc<FakeCatalog>) -> Console {
        let catalog: Arc<dyn CatalogApi> = api.clone();
        Console::new(
            catalog,
            ConsoleSettings {
                page_size: PageSize::new(10).expect("size"),
                year_facet: false,
                refresh_interval: Duration::from_secs(15),
            },
            Metrics::new().expect("metrics"),
        )
    }

    #[tokio::test]
    async fn controls_start_from_configured_page_size() {
        let api = Arc::new(FakeCatalog::new());
        let console = console(&api);
        assert_eq!(console.snapshot().descriptor.get("page_size"), Some("10"));

        assert!(console.set_control(ControlChange::Status(StatusFilter::Only(
            DownloadStatus::Failed
        ))));
        let report = console.refresh().await.expect("refresh");
        assert_eq!(report.outcome, RefreshOutcome::Applied);
        assert_eq!(api.calls("list_years"), 0);

        api.fail_artists(true);
        assert!(console.refresh().await.is_err());
        assert_eq!(console.metrics().snapshot().refresh_failed, 1);
    }

    #[tokio::test]
    async fn restore_visible_track_reads_status_from_view() {
        let api = Arc::new(FakeCatalog::new());
        api.seed_track(track(8, DownloadStatus::Ignored));
        let mut console = console(&api);

        assert!(console.restore_visible_track(8).await.is_err());
        console.refresh_now().await;
        let kind = console.restore_visible_track(8).await.expect("restored");
        assert_eq!(kind, RestoreKind::Restore);

        let reports = console.drain_pending().await;
        assert_eq!(reports.len(), 1);
        assert_eq!(
            console.snapshot().track(8).map(|t| t.download_status),
            Some(DownloadStatus::Pending)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_one_shot() {
        let api = Arc::new(FakeCatalog::new());
        let mut console = console(&api);
        let handle = console.start().expect("first start");
        assert!(console.start().is_none());
        assert!(console.drain_pending().await.is_empty());
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(console.snapshot().is_loaded());
        handle.stop().await;
    }
}
