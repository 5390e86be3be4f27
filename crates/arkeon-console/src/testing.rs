//! In-memory `CatalogApi` used by unit tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use arkeon_api_models::{
    Ack, CookieStatus, DownloadStatus, SingleDownloadRequest, Source, SourceCreateRequest,
    SourceId, SourceKind, SourceStatus, Track, TrackId, TrackPage, TrackStats,
};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::StatusCode;
use tokio::sync::Semaphore;

use crate::client::{CatalogApi, CookieUpload};
use crate::error::{ConsoleError, ConsoleResult};
use crate::query::QueryDescriptor;

pub(crate) fn track(id: TrackId, status: DownloadStatus) -> Track {
    Track {
        id,
        youtube_id: format!("yt{id}"),
        title: format!("Track {id}"),
        source_id: None,
        source_name: None,
        source_type: None,
        file_path: (status == DownloadStatus::Completed).then(|| format!("/music/{id}.mp3")),
        download_status: status,
        created_at: NaiveDateTime::default(),
        downloaded_at: (status == DownloadStatus::Completed).then(NaiveDateTime::default),
        published_at: None,
        artist: None,
    }
}

pub(crate) fn source(id: SourceId, status: SourceStatus) -> Source {
    Source {
        id,
        url: format!("https://music.example/list/{id}"),
        name: format!("Source {id}"),
        kind: SourceKind::Playlist,
        status,
        created_at: NaiveDateTime::default(),
    }
}

#[derive(Default)]
struct FakeState {
    sources: BTreeMap<SourceId, Source>,
    tracks: BTreeMap<TrackId, Track>,
    artists: Vec<String>,
    years: Vec<String>,
    cookies: bool,
    next_id: i64,
    fail_artists: bool,
    fail_writes: bool,
    calls: Vec<&'static str>,
}

#[derive(Default)]
pub(crate) struct FakeCatalog {
    state: Mutex<FakeState>,
    gates: Mutex<HashMap<&'static str, Arc<Semaphore>>>,
}

fn rejected(operation: &'static str, status: StatusCode, detail: &str) -> ConsoleError {
    ConsoleError::HttpStatus {
        operation,
        status,
        detail: Some(detail.to_string()),
    }
}

impl FakeCatalog {
    pub(crate) fn new() -> Self {
        let catalog = Self::default();
        catalog.with(|state| state.next_id = 100);
        catalog
    }

    fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    async fn enter(&self, operation: &'static str) {
        let gate = self
            .gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(operation)
            .cloned();
        if let Some(gate) = gate {
            gate.acquire().await.expect("gate open").forget();
        }
        self.with(|state| state.calls.push(operation));
    }

    fn write_guard(&self, operation: &'static str) -> ConsoleResult<()> {
        if self.with(|state| state.fail_writes) {
            Err(rejected(
                operation,
                StatusCode::INTERNAL_SERVER_ERROR,
                "backend unavailable",
            ))
        } else {
            Ok(())
        }
    }

    /// Block `operation` until permits are added to the returned semaphore.
    pub(crate) fn hold(&self, operation: &'static str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation, gate.clone());
        gate
    }

    pub(crate) fn seed_source(&self, source: Source) {
        self.with(|state| state.sources.insert(source.id, source));
    }

    pub(crate) fn seed_track(&self, track: Track) {
        self.with(|state| state.tracks.insert(track.id, track));
    }

    pub(crate) fn set_facets(&self, artists: Vec<String>, years: Vec<String>) {
        self.with(|state| {
            state.artists = artists;
            state.years = years;
        });
    }

    pub(crate) fn set_cookies(&self, exists: bool) {
        self.with(|state| state.cookies = exists);
    }

    pub(crate) fn fail_artists(&self, fail: bool) {
        self.with(|state| state.fail_artists = fail);
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.with(|state| state.fail_writes = fail);
    }

    pub(crate) fn calls(&self, operation: &str) -> usize {
        self.with(|state| state.calls.iter().filter(|op| **op == operation).count())
    }

    pub(crate) fn write_calls(&self) -> Vec<&'static str> {
        const READS: [&str; 6] = [
            "list_sources",
            "list_tracks",
            "list_artists",
            "list_years",
            "track_stats",
            "cookie_status",
        ];
        self.with(|state| {
            state
                .calls
                .iter()
                .copied()
                .filter(|op| !READS.contains(op))
                .collect()
        })
    }

    pub(crate) fn track_status(&self, id: TrackId) -> Option<DownloadStatus> {
        self.with(|state| state.tracks.get(&id).map(|track| track.download_status))
    }
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    async fn list_sources(&self) -> ConsoleResult<Vec<Source>> {
        self.enter("list_sources").await;
        Ok(self.with(|state| state.sources.values().cloned().collect()))
    }

    async fn create_source(&self, request: &SourceCreateRequest) -> ConsoleResult<Source> {
        self.enter("create_source").await;
        self.write_guard("create_source")?;
        self.with(|state| {
            if state.sources.values().any(|s| s.url == request.url) {
                return Err(rejected(
                    "create_source",
                    StatusCode::BAD_REQUEST,
                    "Source URL already registered",
                ));
            }
            state.next_id += 1;
            let created = Source {
                id: state.next_id,
                url: request.url.clone(),
                name: request.name.clone(),
                kind: request.kind,
                status: SourceStatus::Active,
                created_at: NaiveDateTime::default(),
            };
            state.sources.insert(created.id, created.clone());
            Ok(created)
        })
    }

    async fn set_source_status(&self, id: SourceId, status: SourceStatus) -> ConsoleResult<()> {
        self.enter("set_source_status").await;
        self.write_guard("set_source_status")?;
        self.with(|state| match state.sources.get_mut(&id) {
            Some(source) => {
                source.status = status;
                Ok(())
            }
            None => Err(rejected(
                "set_source_status",
                StatusCode::NOT_FOUND,
                "Source not found",
            )),
        })
    }

    async fn delete_source(&self, id: SourceId) -> ConsoleResult<()> {
        self.enter("delete_source").await;
        self.write_guard("delete_source")?;
        self.with(|state| {
            state.sources.remove(&id).map(drop).ok_or_else(|| {
                rejected("delete_source", StatusCode::NOT_FOUND, "Source not found")
            })
        })
    }

    async fn list_tracks(&self, query: &QueryDescriptor) -> ConsoleResult<TrackPage> {
        self.enter("list_tracks").await;
        let page: usize = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
        let size: usize = query
            .get("page_size")
            .and_then(|p| p.parse().ok())
            .unwrap_or(50);
        let status = query.get("status").and_then(|s| s.parse::<DownloadStatus>().ok());
        let search = query.get("search").map(str::to_lowercase);
        let source_id = query.get("source_id").and_then(|s| s.parse::<i64>().ok());
        self.with(|state| {
            let mut matching: Vec<Track> = state
                .tracks
                .values()
                .filter(|t| status.is_none_or(|s| t.download_status == s))
                .filter(|t| {
                    search
                        .as_ref()
                        .is_none_or(|q| t.title.to_lowercase().contains(q))
                })
                .filter(|t| source_id.is_none_or(|id| t.source_id == Some(id)))
                .cloned()
                .collect();
            matching.reverse();
            let total = matching.len();
            let items = matching
                .into_iter()
                .skip((page - 1) * size)
                .take(size)
                .collect();
            Ok(TrackPage {
                items,
                total: u64::try_from(total).unwrap_or(u64::MAX),
                page: u32::try_from(page).ok(),
                pages: u32::try_from(total.div_ceil(size)).unwrap_or(u32::MAX),
            })
        })
    }

    async fn queue_single_download(
        &self,
        request: &SingleDownloadRequest,
    ) -> ConsoleResult<Ack> {
        self.enter("queue_single_download").await;
        self.write_guard("queue_single_download")?;
        self.with(|state| {
            state.next_id += 1;
            let mut queued = track(state.next_id, DownloadStatus::Pending);
            queued.youtube_id = request.url.rsplit('/').next().unwrap_or_default().to_string();
            state.tracks.insert(queued.id, queued.clone());
            Ok(Ack {
                status: "downloading".into(),
                video_id: Some(queued.youtube_id),
                ..Ack::default()
            })
        })
    }

    async fn delete_track(&self, id: TrackId) -> ConsoleResult<()> {
        self.enter("delete_track").await;
        self.write_guard("delete_track")?;
        self.with(|state| match state.tracks.get_mut(&id) {
            Some(track) => {
                track.download_status = DownloadStatus::Ignored;
                track.file_path = None;
                track.downloaded_at = None;
                Ok(())
            }
            None => Err(rejected("delete_track", StatusCode::NOT_FOUND, "Track not found")),
        })
    }

    async fn restore_track(&self, id: TrackId) -> ConsoleResult<()> {
        self.enter("restore_track").await;
        self.write_guard("restore_track")?;
        self.with(|state| match state.tracks.get_mut(&id) {
            Some(track) => {
                track.download_status = DownloadStatus::Pending;
                Ok(())
            }
            None => Err(rejected("restore_track", StatusCode::NOT_FOUND, "Track not found")),
        })
    }

    async fn list_artists(&self) -> ConsoleResult<Vec<String>> {
        self.enter("list_artists").await;
        self.with(|state| {
            if state.fail_artists {
                Err(rejected(
                    "list_artists",
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "artists unavailable",
                ))
            } else {
                Ok(state.artists.clone())
            }
        })
    }

    async fn list_years(&self) -> ConsoleResult<Vec<String>> {
        self.enter("list_years").await;
        Ok(self.with(|state| state.years.clone()))
    }

    async fn track_stats(&self) -> ConsoleResult<TrackStats> {
        self.enter("track_stats").await;
        Ok(self.with(|state| {
            let count = |status| {
                let matching = state
                    .tracks
                    .values()
                    .filter(|t| t.download_status == status)
                    .count();
                u64::try_from(matching).unwrap_or(u64::MAX)
            };
            TrackStats {
                completed: count(DownloadStatus::Completed),
                pending: count(DownloadStatus::Pending),
                failed: count(DownloadStatus::Failed),
                ignored: count(DownloadStatus::Ignored),
            }
        }))
    }

    async fn cookie_status(&self) -> ConsoleResult<CookieStatus> {
        self.enter("cookie_status").await;
        Ok(CookieStatus {
            exists: self.with(|state| state.cookies),
        })
    }

    async fn upload_cookies(&self, upload: CookieUpload) -> ConsoleResult<Ack> {
        self.enter("upload_cookies").await;
        self.write_guard("upload_cookies")?;
        if !upload.file_name.to_ascii_lowercase().ends_with(".txt") {
            return Err(rejected(
                "upload_cookies",
                StatusCode::BAD_REQUEST,
                "Only .txt files are allowed",
            ));
        }
        self.set_cookies(true);
        Ok(Ack {
            status: "success".into(),
            ..Ack::default()
        })
    }

    async fn delete_cookies(&self) -> ConsoleResult<()> {
        self.enter("delete_cookies").await;
        self.write_guard("delete_cookies")?;
        self.with(|state| {
            if state.cookies {
                state.cookies = false;
                Ok(())
            } else {
                Err(rejected("delete_cookies", StatusCode::NOT_FOUND, "No cookies stored"))
            }
        })
    }
}
