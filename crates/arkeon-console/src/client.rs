//! Remote catalog access: the `CatalogApi` seam and its HTTP implementation.
//!
//! # Design
//! - One trait method per service endpoint; callers depend on the trait.
//! - `fetch_batch` runs the reads of a refresh cycle concurrently and only
//!   yields a batch when every read succeeded.
//! - Service error bodies (`{"detail": ...}`) are flattened into the error.

use std::collections::{BTreeMap, BTreeSet};

use arkeon_api_models::{
    Ack, CookieStatus, ErrorBody, SingleDownloadRequest, Source, SourceCreateRequest, SourceId,
    SourceStatus, TrackId, TrackPage, TrackStats,
};
use arkeon_config::ConsoleConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::warn;
use url::Url;

use crate::error::{ConsoleError, ConsoleResult};
use crate::query::QueryDescriptor;

/// Header carrying the per-invocation trace identifier.
pub const HEADER_REQUEST_ID: &str = "x-request-id";

/// Credential file staged for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieUpload {
    /// Original file name; must end in `.txt`.
    pub file_name: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

/// Read and write operations exposed by the acquisition service.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// `GET /sources`.
    async fn list_sources(&self) -> ConsoleResult<Vec<Source>>;
    /// `POST /sources`.
    async fn create_source(&self, request: &SourceCreateRequest) -> ConsoleResult<Source>;
    /// `PUT /sources/{id}/status`.
    async fn set_source_status(&self, id: SourceId, status: SourceStatus) -> ConsoleResult<()>;
    /// `DELETE /sources/{id}`.
    async fn delete_source(&self, id: SourceId) -> ConsoleResult<()>;
    /// `GET /tracks` with the descriptor's parameters.
    async fn list_tracks(&self, query: &QueryDescriptor) -> ConsoleResult<TrackPage>;
    /// `POST /tracks/download-single`.
    async fn queue_single_download(&self, request: &SingleDownloadRequest)
    -> ConsoleResult<Ack>;
    /// `DELETE /tracks/{id}`; the service marks the track ignored.
    async fn delete_track(&self, id: TrackId) -> ConsoleResult<()>;
    /// `PUT /tracks/{id}/restore`; requeues an ignored or failed track.
    async fn restore_track(&self, id: TrackId) -> ConsoleResult<()>;
    /// `GET /tracks/artists`.
    async fn list_artists(&self) -> ConsoleResult<Vec<String>>;
    /// `GET /tracks/years`.
    async fn list_years(&self) -> ConsoleResult<Vec<String>>;
    /// `GET /tracks/stats`.
    async fn track_stats(&self) -> ConsoleResult<TrackStats>;
    /// `GET /config/cookies`.
    async fn cookie_status(&self) -> ConsoleResult<CookieStatus>;
    /// `POST /config/cookies` as multipart field `file`.
    async fn upload_cookies(&self, upload: CookieUpload) -> ConsoleResult<Ack>;
    /// `DELETE /config/cookies`.
    async fn delete_cookies(&self) -> ConsoleResult<()>;
}

/// Everything one refresh cycle reads, already normalised.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogBatch {
    /// Sources keyed by id.
    pub sources: BTreeMap<SourceId, Source>,
    /// Current track page.
    pub tracks: TrackPage,
    /// Distinct artists, ascending.
    pub artists: Vec<String>,
    /// Distinct years, newest first; empty when the facet is disabled.
    pub years: Vec<String>,
    /// Global per-status counts.
    pub stats: TrackStats,
    /// Credential file presence.
    pub cookies: CookieStatus,
}

/// Run the reads of one refresh cycle concurrently.
///
/// # Errors
///
/// Returns the first failing read; no partial batch is produced.
pub async fn fetch_batch(
    api: &dyn CatalogApi,
    query: &QueryDescriptor,
    year_facet: bool,
) -> ConsoleResult<CatalogBatch> {
    let years = async {
        if year_facet {
            api.list_years().await
        } else {
            Ok(Vec::new())
        }
    };
    let (sources, tracks, artists, years, stats, cookies) = tokio::try_join!(
        api.list_sources(),
        api.list_tracks(query),
        api.list_artists(),
        years,
        api.track_stats(),
        api.cookie_status(),
    )?;

    let requested_page = query.get("page").and_then(|raw| raw.parse().ok()).unwrap_or(1);
    if !page_is_consistent(&tracks, requested_page) {
        warn!(
            page = requested_page,
            pages = tracks.pages,
            total = tracks.total,
            received = tracks.items.len(),
            "track page emptiness disagrees with its totals"
        );
    }

    Ok(CatalogBatch {
        sources: sources.into_iter().map(|source| (source.id, source)).collect(),
        tracks: clamp_page(tracks, query.page_size()),
        artists: normalize_facet(artists, false),
        years: normalize_facet(years, true),
        stats,
        cookies,
    })
}

/// A page is empty exactly when it lies past the last page or nothing matched.
const fn page_is_consistent(page: &TrackPage, requested_page: u32) -> bool {
    let expect_empty = requested_page > page.pages || page.total == 0;
    page.items.is_empty() == expect_empty
}

fn clamp_page(mut page: TrackPage, page_size: Option<u32>) -> TrackPage {
    let Some(limit) = page_size.and_then(|size| usize::try_from(size).ok()) else {
        return page;
    };
    if page.items.len() > limit {
        warn!(
            received = page.items.len(),
            page_size = limit,
            "track page exceeded requested size; truncating"
        );
        page.items.truncate(limit);
    }
    page
}

fn normalize_facet(values: Vec<String>, descending: bool) -> Vec<String> {
    let unique: BTreeSet<String> = values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect();
    if descending {
        unique.into_iter().rev().collect()
    } else {
        unique.into_iter().collect()
    }
}

/// `reqwest`-backed [`CatalogApi`].
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    client: Client,
    base_url: Url,
}

impl HttpCatalogClient {
    /// Build a client honouring the configured timeout and tagging every
    /// request with `trace_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the trace id is not a valid header value or the
    /// HTTP client cannot be constructed.
    pub fn new(config: &ConsoleConfig, trace_id: &str) -> ConsoleResult<Self> {
        let mut headers = HeaderMap::new();
        let request_id =
            HeaderValue::from_str(trace_id).map_err(|source| ConsoleError::Header { source })?;
        headers.insert(HEADER_REQUEST_ID, request_id);

        let client = Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|source| ConsoleError::Http {
                operation: "build_client",
                source,
            })?;
        Ok(Self::with_client(client, config.api_base_url.clone()))
    }

    /// Wrap an existing client; `base_url` should end with `/`.
    #[must_use]
    pub const fn with_client(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// API root requests are resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, operation: &'static str, path: &str) -> ConsoleResult<Url> {
        self.base_url
            .join(path)
            .map_err(|source| ConsoleError::Url { operation, source })
    }

    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> ConsoleResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|source| ConsoleError::Http { operation, source })?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(classify_problem(operation, response).await)
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
    ) -> ConsoleResult<T> {
        let url = self.endpoint(operation, path)?;
        let response = self.send(operation, self.client.get(url)).await?;
        decode(operation, response).await
    }

    async fn ack(&self, operation: &'static str, request: RequestBuilder) -> ConsoleResult<Ack> {
        let response = self.send(operation, request).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|source| ConsoleError::Decode { operation, source })?;
        Ok(serde_json::from_slice(&bytes).unwrap_or_default())
    }
}

async fn decode<T: DeserializeOwned>(
    operation: &'static str,
    response: Response,
) -> ConsoleResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|source| ConsoleError::Decode { operation, source })
}

async fn classify_problem(operation: &'static str, response: Response) -> ConsoleError {
    let status = response.status();
    let bytes = response.bytes().await.unwrap_or_default();
    let detail = serde_json::from_slice::<ErrorBody>(&bytes)
        .ok()
        .and_then(|body| body.message())
        .or_else(|| {
            let text = String::from_utf8_lossy(&bytes).trim().to_string();
            (!text.is_empty()).then_some(text)
        });
    ConsoleError::HttpStatus {
        operation,
        status,
        detail,
    }
}

#[async_trait]
impl CatalogApi for HttpCatalogClient {
    async fn list_sources(&self) -> ConsoleResult<Vec<Source>> {
        self.get_json("list_sources", "sources").await
    }

    async fn create_source(&self, request: &SourceCreateRequest) -> ConsoleResult<Source> {
        const OP: &str = "create_source";
        let url = self.endpoint(OP, "sources")?;
        let response = self.send(OP, self.client.post(url).json(request)).await?;
        decode(OP, response).await
    }

    async fn set_source_status(&self, id: SourceId, status: SourceStatus) -> ConsoleResult<()> {
        const OP: &str = "set_source_status";
        let mut url = self.endpoint(OP, &format!("sources/{id}/status"))?;
        url.query_pairs_mut().append_pair("status", status.as_str());
        self.ack(OP, self.client.put(url)).await.map(drop)
    }

    async fn delete_source(&self, id: SourceId) -> ConsoleResult<()> {
        const OP: &str = "delete_source";
        let url = self.endpoint(OP, &format!("sources/{id}"))?;
        self.ack(OP, self.client.delete(url)).await.map(drop)
    }

    async fn list_tracks(&self, query: &QueryDescriptor) -> ConsoleResult<TrackPage> {
        const OP: &str = "list_tracks";
        let mut url = self.endpoint(OP, "tracks")?;
        url.query_pairs_mut()
            .extend_pairs(query.params().iter().map(|(k, v)| (*k, v.as_str())));
        let response = self.send(OP, self.client.get(url)).await?;
        decode(OP, response).await
    }

    async fn queue_single_download(
        &self,
        request: &SingleDownloadRequest,
    ) -> ConsoleResult<Ack> {
        const OP: &str = "queue_single_download";
        let url = self.endpoint(OP, "tracks/download-single")?;
        self.ack(OP, self.client.post(url).json(request)).await
    }

    async fn delete_track(&self, id: TrackId) -> ConsoleResult<()> {
        const OP: &str = "delete_track";
        let url = self.endpoint(OP, &format!("tracks/{id}"))?;
        self.ack(OP, self.client.delete(url)).await.map(drop)
    }

    async fn restore_track(&self, id: TrackId) -> ConsoleResult<()> {
        const OP: &str = "restore_track";
        let url = self.endpoint(OP, &format!("tracks/{id}/restore"))?;
        self.ack(OP, self.client.put(url)).await.map(drop)
    }

    async fn list_artists(&self) -> ConsoleResult<Vec<String>> {
        self.get_json("list_artists", "tracks/artists").await
    }

    async fn list_years(&self) -> ConsoleResult<Vec<String>> {
        self.get_json("list_years", "tracks/years").await
    }

    async fn track_stats(&self) -> ConsoleResult<TrackStats> {
        self.get_json("track_stats", "tracks/stats").await
    }

    async fn cookie_status(&self) -> ConsoleResult<CookieStatus> {
        self.get_json("cookie_status", "config/cookies").await
    }

    async fn upload_cookies(&self, upload: CookieUpload) -> ConsoleResult<Ack> {
        const OP: &str = "upload_cookies";
        let url = self.endpoint(OP, "config/cookies")?;
        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str("text/plain")
            .map_err(|source| ConsoleError::Http {
                operation: OP,
                source,
            })?;
        let form = Form::new().part("file", part);
        self.ack(OP, self.client.post(url).multipart(form)).await
    }

    async fn delete_cookies(&self) -> ConsoleResult<()> {
        const OP: &str = "delete_cookies";
        let url = self.endpoint(OP, "config/cookies")?;
        self.ack(OP, self.client.delete(url)).await.map(drop)
    }
}
