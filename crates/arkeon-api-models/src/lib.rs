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
//! Shared HTTP DTOs for the Arkeon watcher API.
//!
//! These types mirror the JSON contract of the acquisition service and are
//! re-used by the console core and the CLI so request/response encoding stays
//! deterministic. Enumerated wire values (`type`, `status`, `download_status`,
//! sort keys, page sizes) are closed enums with `as_str`/`FromStr` pairs.
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier assigned to a source by the service.
pub type SourceId = i64;
/// Identifier assigned to a track by the service.
pub type TrackId = i64;

/// Error returned when a wire value is not part of its closed set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value")]
pub struct UnknownValue {
    /// Name of the enumerated field being parsed.
    pub kind: &'static str,
    /// Offending value supplied by the caller.
    pub value: String,
}

impl UnknownValue {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Kind of feed a source monitors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// A playlist whose entries are mirrored.
    #[default]
    Playlist,
    /// An artist channel whose uploads are mirrored.
    Artist,
}

impl SourceKind {
    /// Wire representation of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Playlist => "playlist",
            Self::Artist => "artist",
        }
    }

    /// Name used when the operator leaves the source name blank.
    #[must_use]
    pub const fn placeholder_name(self) -> &'static str {
        match self {
            Self::Playlist => "New playlist",
            Self::Artist => "New artist",
        }
    }
}

impl FromStr for SourceKind {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "playlist" => Ok(Self::Playlist),
            "artist" => Ok(Self::Artist),
            other => Err(UnknownValue::new("source type", other)),
        }
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monitoring state of a source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    /// The watcher polls the source.
    #[default]
    Active,
    /// The watcher skips the source.
    Paused,
}

impl SourceStatus {
    /// Wire representation of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
        }
    }

    /// The status an operator toggle moves to.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Paused,
            Self::Paused => Self::Active,
        }
    }
}

impl FromStr for SourceStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            other => Err(UnknownValue::new("source status", other)),
        }
    }
}

impl Display for SourceStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Download lifecycle of a track, owned by the service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    /// Queued for download.
    Pending,
    /// Downloaded and stored.
    Completed,
    /// Download attempt failed.
    Failed,
    /// Suppressed by the operator; never re-downloaded.
    Ignored,
}

impl DownloadStatus {
    /// Every status in display order.
    pub const ALL: [Self; 4] = [Self::Pending, Self::Completed, Self::Failed, Self::Ignored];

    /// Wire representation of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Ignored => "ignored",
        }
    }
}

impl FromStr for DownloadStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "ignored" => Ok(Self::Ignored),
            other => Err(UnknownValue::new("download status", other)),
        }
    }
}

impl Display for DownloadStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column the track listing is ordered by.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrackSortField {
    /// Time the track was first discovered.
    #[default]
    CreatedAt,
    /// Time the download completed.
    DownloadedAt,
    /// Upstream publication date.
    PublishedAt,
}

impl TrackSortField {
    /// Wire representation of the sort key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::DownloadedAt => "downloaded_at",
            Self::PublishedAt => "published_at",
        }
    }
}

impl FromStr for TrackSortField {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_at" => Ok(Self::CreatedAt),
            "downloaded_at" => Ok(Self::DownloadedAt),
            "published_at" => Ok(Self::PublishedAt),
            other => Err(UnknownValue::new("sort field", other)),
        }
    }
}

/// Direction of the track ordering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Oldest first.
    Asc,
    /// Newest first.
    #[default]
    Desc,
}

impl SortOrder {
    /// Wire representation of the direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(UnknownValue::new("sort order", other)),
        }
    }
}

/// Number of tracks requested per page, restricted to the supported set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "u32", into = "u32")]
pub struct PageSize(u32);

impl PageSize {
    /// Page sizes offered to the operator.
    pub const OPTIONS: [u32; 4] = [10, 25, 50, 100];
    /// Page size used by the service when none is requested.
    pub const DEFAULT: Self = Self(50);

    /// Validate a raw page size against the supported set.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownValue`] when `value` is not one of [`Self::OPTIONS`].
    pub fn new(value: u32) -> Result<Self, UnknownValue> {
        if Self::OPTIONS.contains(&value) {
            Ok(Self(value))
        } else {
            Err(UnknownValue::new("page size", &value.to_string()))
        }
    }

    /// Raw number of items per page.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for PageSize {
    type Error = UnknownValue;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PageSize> for u32 {
    fn from(value: PageSize) -> Self {
        value.0
    }
}

impl FromStr for PageSize {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>()
            .map_err(|_| UnknownValue::new("page size", s))
            .and_then(Self::new)
    }
}

/// Monitored playlist or artist feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    /// Service-assigned identifier.
    pub id: SourceId,
    /// Upstream feed URL.
    pub url: String,
    /// Operator-facing label.
    pub name: String,
    /// Feed kind.
    #[serde(rename = "type")]
    pub kind: SourceKind,
    /// Monitoring state.
    pub status: SourceStatus,
    /// Registration timestamp (service local time, no offset).
    pub created_at: NaiveDateTime,
}

/// Single media item discovered from a source or requested directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Track {
    /// Service-assigned identifier.
    pub id: TrackId,
    /// Upstream video identifier.
    pub youtube_id: String,
    /// Display title.
    pub title: String,
    /// Owning source; `None` for single-track requests.
    #[serde(default)]
    pub source_id: Option<SourceId>,
    /// Denormalised name of the owning source.
    #[serde(default)]
    pub source_name: Option<String>,
    /// Denormalised kind of the owning source.
    #[serde(default)]
    pub source_type: Option<SourceKind>,
    /// Stored file location when downloaded.
    #[serde(default)]
    pub file_path: Option<String>,
    /// Download lifecycle state.
    pub download_status: DownloadStatus,
    /// Discovery timestamp.
    pub created_at: NaiveDateTime,
    /// Completion timestamp; only set for completed tracks.
    #[serde(default)]
    pub downloaded_at: Option<NaiveDateTime>,
    /// Upstream publication date as reported by the service.
    #[serde(default)]
    pub published_at: Option<String>,
    /// Artist extracted from the media metadata.
    #[serde(default)]
    pub artist: Option<String>,
}

impl Track {
    /// Whether the completion timestamp agrees with the download status.
    #[must_use]
    pub const fn completion_consistent(&self) -> bool {
        match self.download_status {
            DownloadStatus::Completed => true,
            _ => self.downloaded_at.is_none(),
        }
    }
}

/// One page of the filtered track listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TrackPage {
    /// Tracks on this page in server order.
    pub items: Vec<Track>,
    /// Tracks matching the filters across all pages.
    pub total: u64,
    /// Page number echoed by the service.
    #[serde(default)]
    pub page: Option<u32>,
    /// Number of pages for the current page size.
    pub pages: u32,
}

/// Aggregate track counts per download status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TrackStats {
    /// Completed downloads.
    #[serde(default)]
    pub completed: u64,
    /// Queued downloads.
    #[serde(default)]
    pub pending: u64,
    /// Failed downloads.
    #[serde(default)]
    pub failed: u64,
    /// Suppressed tracks.
    #[serde(default)]
    pub ignored: u64,
}

impl TrackStats {
    /// Sum across every status.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.completed + self.pending + self.failed + self.ignored
    }

    /// Count for a single status.
    #[must_use]
    pub const fn count(&self, status: DownloadStatus) -> u64 {
        match status {
            DownloadStatus::Pending => self.pending,
            DownloadStatus::Completed => self.completed,
            DownloadStatus::Failed => self.failed,
            DownloadStatus::Ignored => self.ignored,
        }
    }
}

/// Presence flag of the credential (`cookies.txt`) file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CookieStatus {
    /// Whether the service currently holds a credential file.
    #[serde(default)]
    pub exists: bool,
}

/// Body of `POST /sources`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceCreateRequest {
    /// Upstream feed URL.
    pub url: String,
    /// Operator-facing label.
    pub name: String,
    /// Feed kind.
    #[serde(rename = "type")]
    pub kind: SourceKind,
}

/// Body of `POST /tracks/download-single`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SingleDownloadRequest {
    /// Video URL to queue.
    pub url: String,
}

/// Acknowledgement document returned by write endpoints.
///
/// Only `status` is always present; the remaining fields depend on the
/// endpoint (`already_exists` downloads echo the stored `title`, queued ones
/// the `video_id`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Ack {
    /// Outcome keyword such as `success`, `downloading` or `already_exists`.
    #[serde(default)]
    pub status: String,
    /// Free-form message from the service.
    #[serde(default)]
    pub message: Option<String>,
    /// Title of an already stored track.
    #[serde(default)]
    pub title: Option<String>,
    /// Upstream identifier of a queued download.
    #[serde(default)]
    pub video_id: Option<String>,
}

impl Ack {
    /// Whether a single-track request matched an existing track.
    #[must_use]
    pub fn already_exists(&self) -> bool {
        self.status == "already_exists"
    }
}

/// Error document returned by the service on non-success responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    /// Either a message string or a list of validation entries.
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Flatten the `detail` payload into a single human-readable line.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::String(text) => Some(text.clone()),
            serde_json::Value::Array(entries) => {
                let parts: Vec<String> = entries
                    .iter()
                    .filter_map(|entry| {
                        entry
                            .get("msg")
                            .and_then(serde_json::Value::as_str)
                            .map(str::to_string)
                    })
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join("; "))
                }
            }
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}
