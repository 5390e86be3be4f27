//! Control state and the canonical track-list query built from it.
//!
//! # Design
//! - `ControlState` only changes through [`ControlChange`], which keeps the
//!   page-reset rule in one place.
//! - `build_query` is pure: same state, same ordered parameters.
//! - `parse_query` is the inverse for every dimension that is set.

use arkeon_api_models::{DownloadStatus, PageSize, SortOrder, SourceId, TrackSortField};
use thiserror::Error;
use url::form_urlencoded;

/// Fixed parameter order of the track-list query.
pub const PARAM_ORDER: [&str; 9] = [
    "page",
    "page_size",
    "sort_by",
    "sort_order",
    "status",
    "search",
    "artist",
    "year",
    "source_id",
];

/// Download-status filter of the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StatusFilter {
    /// No status restriction.
    #[default]
    All,
    /// Only tracks in the given status.
    Only(DownloadStatus),
}

impl StatusFilter {
    /// Parse `all` or a download status name.
    ///
    /// # Errors
    ///
    /// Returns the unknown value when it is neither.
    pub fn parse(raw: &str) -> Result<Self, arkeon_api_models::UnknownValue> {
        if raw == "all" {
            Ok(Self::All)
        } else {
            raw.parse().map(Self::Only)
        }
    }

    /// Display label of the filter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Only(status) => status.as_str(),
        }
    }
}

/// Filter dimensions of the listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TrackFilters {
    /// Status restriction.
    pub status: StatusFilter,
    /// Free-text search; empty means unset.
    pub search: String,
    /// Exact artist match.
    pub artist: Option<String>,
    /// Publication year.
    pub year: Option<String>,
    /// Owning source.
    pub source_id: Option<SourceId>,
}

impl TrackFilters {
    /// Whether every filter is at its unset default.
    #[must_use]
    pub fn is_unfiltered(&self) -> bool {
        *self == Self::default()
    }
}

/// One operator edit of the control state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlChange {
    /// Jump to a page (values below 1 clamp to 1).
    Page(u32),
    /// Change the page size.
    PageSize(PageSize),
    /// Change the sort column.
    SortBy(TrackSortField),
    /// Change the sort direction.
    SortOrder(SortOrder),
    /// Change the status filter.
    Status(StatusFilter),
    /// Change the search text.
    Search(String),
    /// Change the artist filter.
    Artist(Option<String>),
    /// Change the year filter.
    Year(Option<String>),
    /// Change the source filter.
    Source(Option<SourceId>),
    /// Clear every filter, keeping sort and page size.
    ClearFilters,
}

/// Filter, sort and pagination controls of the track listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ControlState {
    page: u32,
    page_size: PageSize,
    sort_by: TrackSortField,
    sort_order: SortOrder,
    filters: TrackFilters,
}

impl Default for ControlState {
    fn default() -> Self {
        Self::with_page_size(PageSize::DEFAULT)
    }
}

impl ControlState {
    /// Initial controls using `page_size`.
    #[must_use]
    pub fn with_page_size(page_size: PageSize) -> Self {
        Self {
            page: 1,
            page_size,
            sort_by: TrackSortField::default(),
            sort_order: SortOrder::default(),
            filters: TrackFilters::default(),
        }
    }

    /// Current 1-based page.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Current page size.
    #[must_use]
    pub const fn page_size(&self) -> PageSize {
        self.page_size
    }

    /// Current sort column.
    #[must_use]
    pub const fn sort_by(&self) -> TrackSortField {
        self.sort_by
    }

    /// Current sort direction.
    #[must_use]
    pub const fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    /// Current filters.
    #[must_use]
    pub const fn filters(&self) -> &TrackFilters {
        &self.filters
    }

    /// Apply `change`, returning whether the state differs afterwards.
    ///
    /// Every change other than [`ControlChange::Page`] moves back to page 1.
    pub fn apply(&mut self, change: ControlChange) -> bool {
        let before = self.clone();
        match change {
            ControlChange::Page(page) => {
                self.page = page.max(1);
                return *self != before;
            }
            ControlChange::PageSize(size) => self.page_size = size,
            ControlChange::SortBy(field) => self.sort_by = field,
            ControlChange::SortOrder(order) => self.sort_order = order,
            ControlChange::Status(status) => self.filters.status = status,
            ControlChange::Search(text) => self.filters.search = text.trim().to_string(),
            ControlChange::Artist(artist) => self.filters.artist = normalize_text(artist),
            ControlChange::Year(year) => self.filters.year = normalize_text(year),
            ControlChange::Source(source) => self.filters.source_id = source,
            ControlChange::ClearFilters => self.filters = TrackFilters::default(),
        }
        if *self == before {
            return false;
        }
        self.page = 1;
        true
    }

    /// Apply several changes in order, returning whether any took effect.
    pub fn apply_all(&mut self, changes: impl IntoIterator<Item = ControlChange>) -> bool {
        changes
            .into_iter()
            .fold(false, |changed, change| self.apply(change) || changed)
    }
}

fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Ordered request parameters derived from a [`ControlState`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct QueryDescriptor {
    params: Vec<(&'static str, String)>,
}

impl QueryDescriptor {
    /// Parameters in canonical order.
    #[must_use]
    pub fn params(&self) -> &[(&'static str, String)] {
        &self.params
    }

    /// Value of a single parameter.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Requested page size.
    #[must_use]
    pub fn page_size(&self) -> Option<u32> {
        self.get("page_size").and_then(|raw| raw.parse().ok())
    }

    /// URL-encoded query string without the leading `?`.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter().map(|(k, v)| (*k, v.as_str())))
            .finish()
    }
}

/// Build the canonical query for `state`; unset filters are omitted.
#[must_use]
pub fn build_query(state: &ControlState) -> QueryDescriptor {
    let filters = &state.filters;
    let mut params = vec![
        ("page", state.page.to_string()),
        ("page_size", state.page_size.get().to_string()),
        ("sort_by", state.sort_by.as_str().to_string()),
        ("sort_order", state.sort_order.as_str().to_string()),
    ];
    if let StatusFilter::Only(status) = filters.status {
        params.push(("status", status.as_str().to_string()));
    }
    if !filters.search.is_empty() {
        params.push(("search", filters.search.clone()));
    }
    if let Some(artist) = &filters.artist {
        params.push(("artist", artist.clone()));
    }
    if let Some(year) = &filters.year {
        params.push(("year", year.clone()));
    }
    if let Some(source_id) = filters.source_id {
        params.push(("source_id", source_id.to_string()));
    }
    QueryDescriptor { params }
}

/// A query parameter carried a value outside its domain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed query parameter")]
pub struct QueryParseError {
    /// Parameter name.
    pub key: &'static str,
    /// Offending value.
    pub value: String,
}

/// Rebuild a control state from a query string (with or without `?`).
///
/// Unknown keys are ignored; absent keys keep their defaults.
///
/// # Errors
///
/// Returns [`QueryParseError`] for a known key with a malformed value.
pub fn parse_query(query: &str) -> Result<ControlState, QueryParseError> {
    let mut state = ControlState::default();
    let mut page = 1;
    let query = query.strip_prefix('?').unwrap_or(query);
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        let Some(key) = PARAM_ORDER.iter().copied().find(|known| *known == key) else {
            continue;
        };
        let malformed = || QueryParseError {
            key,
            value: value.to_string(),
        };
        match key {
            "page" => {
                page = value
                    .parse::<u32>()
                    .ok()
                    .filter(|page| *page >= 1)
                    .ok_or_else(malformed)?;
            }
            "page_size" => state.page_size = value.parse().map_err(|_| malformed())?,
            "sort_by" => state.sort_by = value.parse().map_err(|_| malformed())?,
            "sort_order" => state.sort_order = value.parse().map_err(|_| malformed())?,
            "status" => {
                state.filters.status = StatusFilter::parse(&value).map_err(|_| malformed())?;
            }
            "search" => state.filters.search = value.trim().to_string(),
            "artist" => state.filters.artist = normalize_text(Some(value.to_string())),
            "year" => state.filters.year = normalize_text(Some(value.to_string())),
            "source_id" => {
                state.filters.source_id = Some(value.parse().map_err(|_| malformed())?);
            }
            _ => {}
        }
    }
    state.page = page;
    Ok(state)
}
