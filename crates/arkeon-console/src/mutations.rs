//! Operator writes: validate, mark the entity, call the service, request a refresh.
//!
//! # Design
//! - Nothing here edits catalog data in the store; the follow-up refresh
//!   reconciles the view.
//! - An entity with activity (in flight or awaiting refresh) rejects new
//!   mutations with [`MutationError::Busy`].
//! - Failed remote calls clear the mark and skip the refresh; forms keep
//!   their input.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use arkeon_api_models::{
    Ack, DownloadStatus, SingleDownloadRequest, Source, SourceCreateRequest, SourceId,
    SourceKind, SourceStatus, TrackId,
};
use arkeon_telemetry::{Metrics, MutationOutcome};
use thiserror::Error;
use tracing::{info, warn};

use crate::client::{CatalogApi, CookieUpload};
use crate::error::{ConsoleError, ConsoleResult};
use crate::refresh::{RefreshReason, RefreshTrigger};
use crate::store::{Activity, EntityKey, ViewStore};

/// Input of the add-source form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceForm {
    /// Feed URL.
    pub url: String,
    /// Optional label; blank picks a placeholder.
    pub name: String,
    /// Feed kind.
    pub kind: SourceKind,
}

impl SourceForm {
    /// Form pre-filled with the given values.
    #[must_use]
    pub fn new(url: impl Into<String>, name: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            kind,
        }
    }

    fn clear(&mut self) {
        self.url.clear();
        self.name.clear();
    }
}

/// Input of the single-track form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SingleTrackForm {
    /// Video URL.
    pub url: String,
}

/// Which restore flavour an operator triggered; both hit the same endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreKind {
    /// Un-ignore a suppressed track.
    Restore,
    /// Re-queue a failed download.
    Retry,
}

impl RestoreKind {
    /// Restore flavour for a track in `status`, if restorable.
    #[must_use]
    pub const fn for_status(status: DownloadStatus) -> Option<Self> {
        match status {
            DownloadStatus::Ignored => Some(Self::Restore),
            DownloadStatus::Failed => Some(Self::Retry),
            DownloadStatus::Pending | DownloadStatus::Completed => None,
        }
    }

    /// Operator-facing action label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Restore => "restore",
            Self::Retry => "retry",
        }
    }
}

/// Failures of a mutation request.
#[derive(Debug, Error)]
pub enum MutationError {
    /// The input was rejected before any request.
    #[error("mutation input rejected")]
    Validation {
        /// Operation identifier.
        operation: &'static str,
        /// Machine-readable reason.
        reason: &'static str,
    },
    /// The entity already has a mutation in progress.
    #[error("entity is busy")]
    Busy {
        /// Operation identifier.
        operation: &'static str,
        /// Targeted entity.
        entity: EntityKey,
        /// Activity blocking the request.
        activity: Activity,
    },
    /// The remote write failed.
    #[error("remote write failed")]
    Remote {
        /// Operation identifier.
        operation: &'static str,
        /// Transport error.
        source: ConsoleError,
    },
}

impl MutationError {
    /// Operation identifier of the failed request.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Validation { operation, .. }
            | Self::Busy { operation, .. }
            | Self::Remote { operation, .. } => operation,
        }
    }

    /// Operator-facing description.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Validation { operation, reason } => format!("{operation}: {reason}"),
            Self::Busy {
                operation,
                entity,
                activity: Activity::InFlight,
            } => format!("{operation}: {entity} has a request in flight"),
            Self::Busy {
                operation, entity, ..
            } => format!("{operation}: {entity} is waiting for the next refresh"),
            Self::Remote { source, .. } => source.describe(),
        }
    }
}

/// Coordinates operator writes against the catalog.
#[derive(Clone)]
pub struct MutationCoordinator {
    api: Arc<dyn CatalogApi>,
    store: ViewStore,
    trigger: RefreshTrigger,
    metrics: Metrics,
}

impl MutationCoordinator {
    /// Coordinator writing through `api` and refreshing via `trigger`.
    #[must_use]
    pub fn new(
        api: Arc<dyn CatalogApi>,
        store: ViewStore,
        trigger: RefreshTrigger,
        metrics: Metrics,
    ) -> Self {
        Self {
            api,
            store,
            trigger,
            metrics,
        }
    }

    fn reject(&self, error: MutationError) -> MutationError {
        self.metrics
            .record_mutation(error.operation(), MutationOutcome::Rejected);
        error
    }

    fn invalid(&self, operation: &'static str, reason: &'static str) -> MutationError {
        self.reject(MutationError::Validation { operation, reason })
    }

    async fn perform<T, F>(
        &self,
        operation: &'static str,
        entity: EntityKey,
        call: F,
    ) -> Result<T, MutationError>
    where
        F: Future<Output = ConsoleResult<T>>,
    {
        if let Err(activity) = self.store.try_begin(entity) {
            return Err(self.reject(MutationError::Busy {
                operation,
                entity,
                activity,
            }));
        }
        match call.await {
            Ok(value) => {
                self.store.settle(entity);
                self.metrics
                    .record_mutation(operation, MutationOutcome::Succeeded);
                info!(operation, entity = %entity, "mutation accepted");
                if !self.trigger.request(RefreshReason::Mutation) {
                    warn!(operation, "refresh scheduler unavailable after mutation");
                }
                Ok(value)
            }
            Err(source) => {
                self.store.clear(entity);
                self.metrics.record_mutation(operation, MutationOutcome::Failed);
                warn!(operation, entity = %entity, error = %source.describe(), "mutation failed");
                Err(MutationError::Remote { operation, source })
            }
        }
    }

    /// Register a new source from `form`; the form is cleared on success.
    ///
    /// # Errors
    ///
    /// Validation (blank url), busy form, or remote failure.
    pub async fn add_source(&self, form: &mut SourceForm) -> Result<Source, MutationError> {
        const OP: &str = "add_source";
        let url = form.url.trim();
        if url.is_empty() {
            return Err(self.invalid(OP, "source url is required"));
        }
        let name = match form.name.trim() {
            "" => form.kind.placeholder_name(),
            name => name,
        };
        let request = SourceCreateRequest {
            url: url.to_string(),
            name: name.to_string(),
            kind: form.kind,
        };
        let created = self
            .perform(OP, EntityKey::SourceForm, self.api.create_source(&request))
            .await?;
        form.clear();
        Ok(created)
    }

    /// Queue a single-track download; the form is cleared on success.
    ///
    /// # Errors
    ///
    /// Validation (blank url), busy form, or remote failure.
    pub async fn add_single_track(&self, form: &mut SingleTrackForm) -> Result<Ack, MutationError> {
        const OP: &str = "add_single_track";
        let url = form.url.trim();
        if url.is_empty() {
            return Err(self.invalid(OP, "track url is required"));
        }
        let request = SingleDownloadRequest {
            url: url.to_string(),
        };
        let ack = self
            .perform(OP, EntityKey::TrackForm, self.api.queue_single_download(&request))
            .await?;
        form.url.clear();
        Ok(ack)
    }

    /// Flip a source between active and paused, based on the current view.
    ///
    /// # Errors
    ///
    /// Validation when the source is not in the view, busy source, or remote failure.
    pub async fn toggle_source(&self, id: SourceId) -> Result<SourceStatus, MutationError> {
        const OP: &str = "toggle_source";
        let Some(current) = self.store.snapshot().source(id).map(|source| source.status) else {
            return Err(self.invalid(OP, "source is not in the current view"));
        };
        let next = current.toggled();
        self.perform(OP, EntityKey::Source(id), self.api.set_source_status(id, next))
            .await?;
        Ok(next)
    }

    /// Permanently delete a source.
    ///
    /// # Errors
    ///
    /// Busy source or remote failure.
    pub async fn delete_source(&self, id: SourceId) -> Result<(), MutationError> {
        self.perform("delete_source", EntityKey::Source(id), self.api.delete_source(id))
            .await
    }

    /// Suppress a track; requires explicit confirmation.
    ///
    /// # Errors
    ///
    /// Validation when unconfirmed, busy track, or remote failure.
    pub async fn delete_track(&self, id: TrackId, confirmed: bool) -> Result<(), MutationError> {
        const OP: &str = "delete_track";
        if !confirmed {
            return Err(self.invalid(OP, "track deletion was not confirmed"));
        }
        self.perform(OP, EntityKey::Track(id), self.api.delete_track(id))
            .await
    }

    /// Re-queue an ignored (restore) or failed (retry) track, using its
    /// status in the current view. `requested` pins the flavour the operator
    /// asked for; `None` accepts either.
    ///
    /// # Errors
    ///
    /// Validation when the track is not in the view, its status is not
    /// restorable or does not match `requested`; busy track; remote failure.
    pub async fn restore_track(
        &self,
        id: TrackId,
        requested: Option<RestoreKind>,
    ) -> Result<RestoreKind, MutationError> {
        const OP: &str = "restore_track";
        let Some(observed) = self.store.snapshot().track(id).map(|track| track.download_status)
        else {
            return Err(self.invalid(OP, "track is not in the current view"));
        };
        let Some(kind) = RestoreKind::for_status(observed) else {
            return Err(self.invalid(OP, "only ignored or failed tracks can be restored"));
        };
        if requested.is_some_and(|requested| requested != kind) {
            return Err(self.invalid(
                OP,
                "restore applies to ignored tracks and retry to failed tracks",
            ));
        }
        self.perform(OP, EntityKey::Track(id), self.api.restore_track(id))
            .await?;
        Ok(kind)
    }

    /// Upload a credential file; one upload at a time.
    ///
    /// # Errors
    ///
    /// Validation (not `.txt`, empty), busy credential, or remote failure.
    pub async fn upload_cookies(&self, upload: CookieUpload) -> Result<Ack, MutationError> {
        const OP: &str = "upload_cookies";
        if !upload.file_name.to_ascii_lowercase().ends_with(".txt") {
            return Err(self.invalid(OP, "credential file must be a .txt file"));
        }
        if upload.bytes.is_empty() {
            return Err(self.invalid(OP, "credential file is empty"));
        }
        self.perform(OP, EntityKey::Cookies, self.api.upload_cookies(upload))
            .await
    }

    /// Delete the credential file; a missing file counts as deleted.
    ///
    /// # Errors
    ///
    /// Busy credential or remote failure other than not-found.
    pub async fn delete_cookies(&self) -> Result<(), MutationError> {
        let call = async {
            match self.api.delete_cookies().await {
                Err(err) if err.is_not_found() => Ok(()),
                other => other,
            }
        };
        self.perform("delete_cookies", EntityKey::Cookies, call).await
    }
}

impl fmt::Debug for MutationCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationCoordinator").finish_non_exhaustive()
    }
}
