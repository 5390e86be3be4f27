//! View state store: the single place committed catalog data lives.
//!
//! # Design
//! - Readers get immutable `Arc<ViewSnapshot>` values or a `watch` receiver.
//! - A committed cycle replaces every catalog field at once.
//! - Commits pass the stale-commit guard: the cycle tag must be newer than
//!   the last applied tag and its descriptor must match the current controls.
//! - Per-entity mutation activity is tracked here so refresh commits can
//!   release entities that were awaiting a post-mutation refresh.
//! - The mutex is never held across an await.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use arkeon_api_models::{
    CookieStatus, DownloadStatus, Source, SourceId, SourceStatus, Track, TrackId, TrackPage,
    TrackStats,
};
use serde::Serialize;
use tokio::sync::watch;

use crate::client::CatalogBatch;
use crate::query::{ControlChange, ControlState, QueryDescriptor, build_query};

/// Entity a mutation can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKey {
    /// An existing source.
    Source(SourceId),
    /// An existing track.
    Track(TrackId),
    /// The add-source form.
    SourceForm,
    /// The single-track form.
    TrackForm,
    /// The credential file.
    Cookies,
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source(id) => write!(f, "source {id}"),
            Self::Track(id) => write!(f, "track {id}"),
            Self::SourceForm => f.write_str("source form"),
            Self::TrackForm => f.write_str("track form"),
            Self::Cookies => f.write_str("cookies"),
        }
    }
}

/// Mutation progress of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    /// The remote call has not returned yet.
    InFlight,
    /// The call succeeded; cleared once a cycle issued after `after` applies.
    AwaitingRefresh {
        /// Last cycle tag issued before the mutation completed.
        after: u64,
    },
}

/// Immutable view published to readers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewSnapshot {
    /// Sources keyed by id.
    pub sources: BTreeMap<SourceId, Source>,
    /// Current track page.
    pub tracks: TrackPage,
    /// Artist facet.
    pub artists: Vec<String>,
    /// Year facet.
    pub years: Vec<String>,
    /// Global per-status counts.
    pub stats: TrackStats,
    /// Credential file presence.
    pub cookies: CookieStatus,
    /// Controls the next cycle will query with.
    pub controls: ControlState,
    /// Canonical query of `controls`.
    pub descriptor: QueryDescriptor,
    /// Tag of the last applied cycle; `None` before the first commit.
    pub applied_tag: Option<u64>,
    /// Entities with a mutation in progress.
    pub activity: BTreeMap<EntityKey, Activity>,
}

impl ViewSnapshot {
    /// Whether at least one cycle has been applied.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.applied_tag.is_some()
    }

    /// Source by id.
    #[must_use]
    pub fn source(&self, id: SourceId) -> Option<&Source> {
        self.sources.get(&id)
    }

    /// Track on the current page by id.
    #[must_use]
    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.items.iter().find(|track| track.id == id)
    }

    /// Mutation activity of `key`.
    #[must_use]
    pub fn activity(&self, key: EntityKey) -> Option<Activity> {
        self.activity.get(&key).copied()
    }

    /// Whether `key` currently rejects new mutations.
    #[must_use]
    pub fn is_busy(&self, key: EntityKey) -> bool {
        self.activity.contains_key(&key)
    }

    /// Dashboard totals derived from the snapshot.
    #[must_use]
    pub fn dashboard(&self) -> DashboardSummary {
        DashboardSummary {
            total_tracks: self.stats.total(),
            completed: self.stats.count(DownloadStatus::Completed),
            pending: self.stats.count(DownloadStatus::Pending),
            failed: self.stats.count(DownloadStatus::Failed),
            ignored: self.stats.count(DownloadStatus::Ignored),
            active_sources: self
                .sources
                .values()
                .filter(|source| source.status == SourceStatus::Active)
                .count(),
            total_sources: self.sources.len(),
            cookies_present: self.cookies.exists,
        }
    }
}

/// Headline numbers shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DashboardSummary {
    /// Tracks across every status.
    pub total_tracks: u64,
    /// Completed downloads.
    pub completed: u64,
    /// Queued downloads.
    pub pending: u64,
    /// Failed downloads.
    pub failed: u64,
    /// Suppressed tracks.
    pub ignored: u64,
    /// Sources currently polled.
    pub active_sources: usize,
    /// All registered sources.
    pub total_sources: usize,
    /// Whether a credential file is stored.
    pub cookies_present: bool,
}

/// Identity of an issued refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleTicket {
    /// Monotonic cycle number.
    pub tag: u64,
    /// Query the cycle was built from.
    pub descriptor: QueryDescriptor,
}

/// Result of offering a batch to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The batch replaced the view.
    Applied {
        /// Tag of the applied cycle.
        tag: u64,
    },
    /// The batch was discarded.
    Stale {
        /// Tag of the discarded cycle.
        tag: u64,
        /// Tag applied at the time of the attempt.
        applied: Option<u64>,
        /// Whether the controls moved on since the cycle was issued.
        descriptor_changed: bool,
    },
}

struct StoreInner {
    snapshot: ViewSnapshot,
    issued: u64,
}

/// Shared handle to the view state.
#[derive(Clone)]
pub struct ViewStore {
    inner: Arc<Mutex<StoreInner>>,
    published: Arc<watch::Sender<Arc<ViewSnapshot>>>,
    controls: Arc<watch::Sender<QueryDescriptor>>,
}

impl ViewStore {
    /// Empty store starting from `controls`.
    #[must_use]
    pub fn new(controls: ControlState) -> Self {
        let descriptor = build_query(&controls);
        let snapshot = ViewSnapshot {
            controls,
            descriptor: descriptor.clone(),
            ..ViewSnapshot::default()
        };
        let (published, _) = watch::channel(Arc::new(snapshot.clone()));
        let (controls_tx, _) = watch::channel(descriptor);
        Self {
            inner: Arc::new(Mutex::new(StoreInner {
                snapshot,
                issued: 0,
            })),
            published: Arc::new(published),
            controls: Arc::new(controls_tx),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, snapshot: &ViewSnapshot) {
        self.published.send_replace(Arc::new(snapshot.clone()));
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ViewSnapshot> {
        self.published.borrow().clone()
    }

    /// Receiver notified on every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<ViewSnapshot>> {
        self.published.subscribe()
    }

    /// Receiver notified whenever the query descriptor changes.
    #[must_use]
    pub fn watch_controls(&self) -> watch::Receiver<QueryDescriptor> {
        self.controls.subscribe()
    }

    /// Current controls.
    #[must_use]
    pub fn controls(&self) -> ControlState {
        self.lock().snapshot.controls.clone()
    }

    /// Apply one control edit; returns whether the controls changed.
    pub fn update_controls(&self, change: ControlChange) -> bool {
        self.edit_controls(|controls| controls.apply(change))
    }

    /// Replace the controls wholesale; returns whether they changed.
    pub fn replace_controls(&self, next: ControlState) -> bool {
        self.edit_controls(|controls| {
            let changed = *controls != next;
            *controls = next;
            changed
        })
    }

    fn edit_controls(&self, edit: impl FnOnce(&mut ControlState) -> bool) -> bool {
        let mut inner = self.lock();
        if !edit(&mut inner.snapshot.controls) {
            return false;
        }
        let descriptor = build_query(&inner.snapshot.controls);
        inner.snapshot.descriptor = descriptor.clone();
        self.publish(&inner.snapshot);
        drop(inner);
        self.controls.send_replace(descriptor);
        true
    }

    /// Issue a new cycle against the current controls.
    pub fn begin_cycle(&self) -> CycleTicket {
        let mut inner = self.lock();
        inner.issued += 1;
        CycleTicket {
            tag: inner.issued,
            descriptor: inner.snapshot.descriptor.clone(),
        }
    }

    /// Tag of the most recently issued cycle.
    #[must_use]
    pub fn issued_tag(&self) -> u64 {
        self.lock().issued
    }

    /// Offer a completed batch; applied only if it passes the stale guard.
    pub fn commit(&self, ticket: &CycleTicket, batch: CatalogBatch) -> CommitOutcome {
        let mut inner = self.lock();
        let applied = inner.snapshot.applied_tag;
        let newer = applied.is_none_or(|tag| ticket.tag > tag);
        let descriptor_changed = ticket.descriptor != inner.snapshot.descriptor;
        if !newer || descriptor_changed {
            return CommitOutcome::Stale {
                tag: ticket.tag,
                applied,
                descriptor_changed,
            };
        }

        let snapshot = &mut inner.snapshot;
        snapshot.sources = batch.sources;
        snapshot.tracks = batch.tracks;
        snapshot.artists = batch.artists;
        snapshot.years = batch.years;
        snapshot.stats = batch.stats;
        snapshot.cookies = batch.cookies;
        snapshot.applied_tag = Some(ticket.tag);
        snapshot.activity.retain(|_, activity| match activity {
            Activity::InFlight => true,
            Activity::AwaitingRefresh { after } => *after >= ticket.tag,
        });
        self.publish(&inner.snapshot);
        CommitOutcome::Applied { tag: ticket.tag }
    }

    /// Mark `key` in flight, failing if it already has activity.
    ///
    /// # Errors
    ///
    /// Returns the current activity when the entity is busy.
    pub fn try_begin(&self, key: EntityKey) -> Result<(), Activity> {
        let mut inner = self.lock();
        if let Some(activity) = inner.snapshot.activity.get(&key) {
            return Err(*activity);
        }
        inner.snapshot.activity.insert(key, Activity::InFlight);
        self.publish(&inner.snapshot);
        Ok(())
    }

    /// Move `key` to awaiting-refresh after a successful remote call.
    pub fn settle(&self, key: EntityKey) {
        let mut inner = self.lock();
        let after = inner.issued;
        inner
            .snapshot
            .activity
            .insert(key, Activity::AwaitingRefresh { after });
        self.publish(&inner.snapshot);
    }

    /// Drop any activity for `key` after a failed remote call.
    pub fn clear(&self, key: EntityKey) {
        let mut inner = self.lock();
        if inner.snapshot.activity.remove(&key).is_some() {
            self.publish(&inner.snapshot);
        }
    }
}

impl fmt::Debug for ViewStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("ViewStore")
            .field("issued", &inner.issued)
            .field("applied", &inner.snapshot.applied_tag)
            .finish_non_exhaustive()
    }
}
