//! Argument parsing, console bootstrap and command dispatch.

use std::path::PathBuf;

use arkeon_api_models::{
    DownloadStatus, PageSize, SortOrder, SourceId, SourceKind, TrackId, TrackSortField,
};
use arkeon_config::{ConfigLoader, ConfigOverrides};
use arkeon_console::{
    Console, ControlChange, ControlState, RestoreKind, StatusFilter, parse_query,
};
use arkeon_telemetry::{LogFormat, LoggingConfig, Metrics, init_logging};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;
use uuid::Uuid;

use crate::client::{AppContext, CliError, CliResult};
use crate::commands::cookies::{handle_cookie_delete, handle_cookie_status, handle_cookie_upload};
use crate::commands::sources::{
    handle_source_add, handle_source_list, handle_source_remove, handle_source_toggle,
};
use crate::commands::stats::{handle_facets, handle_stats};
use crate::commands::tracks::{
    handle_track_add, handle_track_list, handle_track_remove, handle_track_restore,
};
use crate::commands::watch::handle_watch;

/// Parses CLI arguments, executes the requested command and reports errors.
/// Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let trace_id = Uuid::new_v4().to_string();
    let mut ctx = match bootstrap(&cli, &trace_id) {
        Ok(ctx) => ctx,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            return err.exit_code();
        }
    };

    match dispatch(cli.command, &mut ctx).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

fn bootstrap(cli: &Cli, trace_id: &str) -> CliResult<AppContext> {
    let config = ConfigLoader::from_env().load(&cli.overrides())?;
    init_logging(&LoggingConfig {
        level: &config.log_level,
        format: cli.log_format.unwrap_or_else(LogFormat::infer),
        build_version: env!("CARGO_PKG_VERSION"),
    })?;
    let metrics = Metrics::new()?;
    let console = Console::connect(&config, trace_id, metrics)?;
    debug!(trace_id, api = %config.api_base_url, "console connected");
    Ok(AppContext {
        console,
        output: cli.output,
    })
}

async fn dispatch(command: Command, ctx: &mut AppContext) -> CliResult<()> {
    match command {
        Command::Sources(sources) => match sources {
            SourcesCommand::Ls => handle_source_list(ctx).await,
            SourcesCommand::Add(args) => handle_source_add(ctx, args).await,
            SourcesCommand::Toggle(args) => handle_source_toggle(ctx, args).await,
            SourcesCommand::Rm(args) => handle_source_remove(ctx, args).await,
        },
        Command::Tracks(tracks) => match tracks {
            TracksCommand::Ls(args) => handle_track_list(ctx, &args).await,
            TracksCommand::Add(args) => handle_track_add(ctx, args).await,
            TracksCommand::Rm(args) => handle_track_remove(ctx, args).await,
            TracksCommand::Restore(args) => {
                handle_track_restore(ctx, args, RestoreKind::Restore).await
            }
            TracksCommand::Retry(args) => handle_track_restore(ctx, args, RestoreKind::Retry).await,
        },
        Command::Stats => handle_stats(ctx).await,
        Command::Facets => handle_facets(ctx).await,
        Command::Cookies(cookies) => match cookies {
            CookiesCommand::Status => handle_cookie_status(ctx).await,
            CookiesCommand::Upload(args) => handle_cookie_upload(ctx, args).await,
            CookiesCommand::Rm => handle_cookie_delete(ctx).await,
        },
        Command::Watch(args) => handle_watch(ctx, args).await,
    }
}

#[derive(Parser)]
#[command(
    name = "arkeon",
    version,
    about = "Browse and manage the tracks of an Arkeon watcher"
)]
pub(crate) struct Cli {
    #[arg(long, global = true, help = "API base URL (overrides ARKEON_API_URL)")]
    api_url: Option<String>,
    #[arg(long, global = true, help = "HTTP timeout in seconds")]
    timeout: Option<u64>,
    #[arg(long, global = true, help = "Polling interval in seconds used by `watch`")]
    refresh_secs: Option<u64>,
    #[arg(long, global = true, help = "Skip reading the publication-year facet")]
    no_year_facet: bool,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    output: OutputFormat,
    #[arg(long, global = true, help = "Log format: json, pretty or compact")]
    log_format: Option<LogFormat>,
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            api_base_url: self.api_url.clone(),
            request_timeout_secs: self.timeout,
            refresh_interval_secs: self.refresh_secs,
            page_size: None,
            year_facet: self.no_year_facet.then_some(false),
        }
    }
}

#[derive(Subcommand)]
pub(crate) enum Command {
    #[command(subcommand, about = "Manage monitored playlists and artists")]
    Sources(SourcesCommand),
    #[command(subcommand, about = "Browse and manage tracks")]
    Tracks(TracksCommand),
    #[command(about = "Show dashboard totals")]
    Stats,
    #[command(about = "List the artist and year filter options")]
    Facets,
    #[command(subcommand, about = "Manage the downloader credential file")]
    Cookies(CookiesCommand),
    #[command(about = "Follow the track listing as it refreshes")]
    Watch(WatchArgs),
}

#[derive(Subcommand)]
pub(crate) enum SourcesCommand {
    #[command(about = "List sources")]
    Ls,
    #[command(about = "Register a source")]
    Add(SourceAddArgs),
    #[command(about = "Pause an active source or resume a paused one")]
    Toggle(SourceIdArgs),
    #[command(about = "Delete a source")]
    Rm(SourceIdArgs),
}

#[derive(Subcommand)]
pub(crate) enum TracksCommand {
    #[command(about = "List one page of tracks")]
    Ls(TrackFilterArgs),
    #[command(about = "Download a single video by URL")]
    Add(TrackAddArgs),
    #[command(about = "Delete a track's file and ignore it from now on")]
    Rm(TrackRemoveArgs),
    #[command(about = "Re-queue an ignored track")]
    Restore(TrackIdArgs),
    #[command(about = "Re-queue a failed download")]
    Retry(TrackIdArgs),
}

#[derive(Subcommand)]
pub(crate) enum CookiesCommand {
    #[command(about = "Report whether a credential file is stored")]
    Status,
    #[command(about = "Upload a cookies .txt file")]
    Upload(CookieUploadArgs),
    #[command(about = "Delete the stored credential file")]
    Rm,
}

#[derive(Args)]
pub(crate) struct SourceAddArgs {
    #[arg(help = "Playlist or channel URL")]
    pub(crate) url: String,
    #[arg(long, help = "Display name; defaults to a placeholder")]
    pub(crate) name: Option<String>,
    #[arg(long, value_enum, default_value_t = KindArg::Playlist)]
    pub(crate) kind: KindArg,
}

#[derive(Args)]
pub(crate) struct SourceIdArgs {
    pub(crate) id: SourceId,
}

#[derive(Args)]
pub(crate) struct TrackIdArgs {
    pub(crate) id: TrackId,
}

#[derive(Args)]
pub(crate) struct TrackAddArgs {
    #[arg(help = "Video URL")]
    pub(crate) url: String,
}

#[derive(Args)]
pub(crate) struct TrackRemoveArgs {
    pub(crate) id: TrackId,
    #[arg(long, short = 'y', help = "Skip the confirmation prompt")]
    pub(crate) yes: bool,
}

#[derive(Args)]
pub(crate) struct CookieUploadArgs {
    #[arg(help = "Netscape-format cookies file (.txt)")]
    pub(crate) path: PathBuf,
}

#[derive(Args, Default)]
pub(crate) struct TrackFilterArgs {
    #[arg(long, help = "Start from a saved query string such as `page=2&status=failed`")]
    pub(crate) query: Option<String>,
    #[arg(long, help = "Page number (1-based)")]
    pub(crate) page: Option<u32>,
    #[arg(long, help = "Tracks per page: 10, 25, 50 or 100")]
    pub(crate) page_size: Option<PageSize>,
    #[arg(long, value_enum)]
    pub(crate) sort_by: Option<SortFieldArg>,
    #[arg(long, value_enum)]
    pub(crate) order: Option<OrderArg>,
    #[arg(long, value_enum)]
    pub(crate) status: Option<StatusArg>,
    #[arg(long, help = "Case-insensitive title search")]
    pub(crate) search: Option<String>,
    #[arg(long)]
    pub(crate) artist: Option<String>,
    #[arg(long)]
    pub(crate) year: Option<String>,
    #[arg(long, help = "Restrict to one source id")]
    pub(crate) source: Option<SourceId>,
}

impl TrackFilterArgs {
    /// Fold the flags into `base` (or into `--query` when given).
    ///
    /// The page is applied last since every other edit resets it to 1.
    pub(crate) fn controls(&self, base: ControlState) -> CliResult<ControlState> {
        let mut state = match &self.query {
            Some(raw) => parse_query(raw).map_err(|err| {
                CliError::validation(format!("invalid --query: {}={}", err.key, err.value))
            })?,
            None => base,
        };
        let changes = [
            self.page_size.map(ControlChange::PageSize),
            self.sort_by.map(|field| ControlChange::SortBy(field.into())),
            self.order.map(|order| ControlChange::SortOrder(order.into())),
            self.status.map(|status| ControlChange::Status(status.into())),
            self.search.clone().map(ControlChange::Search),
            self.artist.clone().map(|artist| ControlChange::Artist(Some(artist))),
            self.year.clone().map(|year| ControlChange::Year(Some(year))),
            self.source.map(|source| ControlChange::Source(Some(source))),
            self.page.map(ControlChange::Page),
        ];
        state.apply_all(changes.into_iter().flatten());
        Ok(state)
    }
}

#[derive(Args)]
pub(crate) struct WatchArgs {
    #[command(flatten)]
    pub(crate) filters: TrackFilterArgs,
    #[arg(long, help = "Stop after this many refreshed snapshots")]
    pub(crate) cycles: Option<u32>,
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub(crate) enum KindArg {
    Playlist,
    Artist,
}

impl From<KindArg> for SourceKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Playlist => Self::Playlist,
            KindArg::Artist => Self::Artist,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub(crate) enum SortFieldArg {
    CreatedAt,
    DownloadedAt,
    PublishedAt,
}

impl From<SortFieldArg> for TrackSortField {
    fn from(field: SortFieldArg) -> Self {
        match field {
            SortFieldArg::CreatedAt => Self::CreatedAt,
            SortFieldArg::DownloadedAt => Self::DownloadedAt,
            SortFieldArg::PublishedAt => Self::PublishedAt,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub(crate) enum OrderArg {
    Asc,
    Desc,
}

impl From<OrderArg> for SortOrder {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::Asc => Self::Asc,
            OrderArg::Desc => Self::Desc,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub(crate) enum StatusArg {
    All,
    Pending,
    Completed,
    Failed,
    Ignored,
}

impl From<StatusArg> for StatusFilter {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::All => Self::All,
            StatusArg::Pending => Self::Only(DownloadStatus::Pending),
            StatusArg::Completed => Self::Only(DownloadStatus::Completed),
            StatusArg::Failed => Self::Only(DownloadStatus::Failed),
            StatusArg::Ignored => Self::Only(DownloadStatus::Ignored),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arkeon_console::build_query;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("arkeon").chain(args.iter().copied()))
            .expect("arguments parse")
    }

    #[test]
    fn global_flags_become_overrides() {
        let cli = parse(&[
            "--api-url",
            "http://watcher:9000/api",
            "--timeout",
            "3",
            "--no-year-facet",
            "stats",
        ]);
        let overrides = cli.overrides();
        assert_eq!(overrides.api_base_url.as_deref(), Some("http://watcher:9000/api"));
        assert_eq!(overrides.request_timeout_secs, Some(3));
        assert_eq!(overrides.refresh_interval_secs, None);
        assert_eq!(overrides.year_facet, Some(false));
    }

    #[test]
    fn omitted_flags_defer_to_environment() {
        let overrides = parse(&["sources", "ls"]).overrides();
        assert_eq!(overrides, ConfigOverrides::default());
    }

    #[test]
    fn format_alias_selects_json() {
        let cli = parse(&["tracks", "ls", "--format", "json"]);
        assert!(matches!(cli.output, OutputFormat::Json));
    }

    #[test]
    fn filter_flags_fold_into_controls_with_page_last() {
        let cli = parse(&[
            "tracks",
            "ls",
            "--page",
            "3",
            "--status",
            "failed",
            "--search",
            "  live ",
            "--order",
            "asc",
        ]);
        let Command::Tracks(TracksCommand::Ls(args)) = cli.command else {
            panic!("expected tracks ls");
        };
        let state = args.controls(ControlState::default()).expect("controls");
        let query = build_query(&state);
        assert_eq!(query.get("page"), Some("3"));
        assert_eq!(query.get("status"), Some("failed"));
        assert_eq!(query.get("search"), Some("live"));
        assert_eq!(query.get("sort_order"), Some("asc"));
    }

    #[test]
    fn query_flag_seeds_controls() {
        let args = TrackFilterArgs {
            query: Some("?page=2&page_size=25&artist=Autechre".into()),
            year: Some("2001".into()),
            ..TrackFilterArgs::default()
        };
        let state = args.controls(ControlState::default()).expect("controls");
        assert_eq!(state.page(), 1);
        assert_eq!(state.page_size().get(), 25);
        assert_eq!(state.filters().artist.as_deref(), Some("Autechre"));
        assert_eq!(state.filters().year.as_deref(), Some("2001"));
    }

    #[test]
    fn malformed_query_flag_is_a_validation_error() {
        let args = TrackFilterArgs {
            query: Some("page_size=7".into()),
            ..TrackFilterArgs::default()
        };
        let err = args
            .controls(ControlState::default())
            .expect_err("page size 7 is not offered");
        assert_eq!(err.exit_code(), 2);
        assert!(err.display_message().contains("page_size=7"));
    }

    #[test]
    fn page_size_outside_options_is_rejected_by_parser() {
        let result = Cli::try_parse_from(["arkeon", "tracks", "ls", "--page-size", "30"]);
        assert!(result.is_err());
    }

    #[test]
    fn restore_and_retry_take_ids() {
        let cli = parse(&["tracks", "retry", "41"]);
        assert!(matches!(
            cli.command,
            Command::Tracks(TracksCommand::Retry(TrackIdArgs { id: 41 }))
        ));
    }
}
