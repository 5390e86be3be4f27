//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use arkeon_api_models::{Ack, CookieStatus, Source, Track, TrackPage};
use arkeon_console::{DashboardSummary, QueryDescriptor, ViewSnapshot};
use arkeon_telemetry::MetricsSnapshot;
use serde::Serialize;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

pub(crate) fn render_sources(snapshot: &ViewSnapshot, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let sources: Vec<&Source> = snapshot.sources.values().collect();
            print_json(&sources)?;
        }
        OutputFormat::Table => {
            println!("{:>6} {:<8} {:<7} {:<32} URL", "ID", "TYPE", "STATUS", "NAME");
            for source in snapshot.sources.values() {
                println!(
                    "{:>6} {:<8} {:<7} {:<32} {}",
                    source.id,
                    source.kind.as_str(),
                    source.status.as_str(),
                    truncate(&source.name, 32),
                    source.url
                );
            }
        }
    }
    Ok(())
}

pub(crate) fn render_source(source: &Source, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(source)?,
        OutputFormat::Table => {
            println!("id: {}", source.id);
            println!("name: {}", source.name);
            println!("type: {}", source.kind);
            println!("status: {}", source.status);
            println!("url: {}", source.url);
            println!("created: {}", source.created_at);
        }
    }
    Ok(())
}

pub(crate) fn render_track_page(
    page: &TrackPage,
    descriptor: &QueryDescriptor,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "query": descriptor.to_query_string(),
            "page": page,
        }))?,
        OutputFormat::Table => {
            println!(
                "{:>6} {:<9} {:<20} {:<24} {:<10} TITLE",
                "ID", "STATUS", "ARTIST", "SOURCE", "PUBLISHED"
            );
            for track in &page.items {
                println!(
                    "{:>6} {:<9} {:<20} {:<24} {:<10} {}",
                    track.id,
                    track.download_status.as_str(),
                    truncate(track.artist.as_deref().unwrap_or("-"), 20),
                    truncate(&source_label(track), 24),
                    track.published_at.as_deref().unwrap_or("-"),
                    track.title
                );
            }
            let current = page
                .page
                .or_else(|| descriptor.get("page").and_then(|raw| raw.parse().ok()))
                .unwrap_or(1);
            println!(
                "page {current} of {} ({} tracks)",
                page.pages.max(1),
                page.total
            );
        }
    }
    Ok(())
}

pub(crate) fn render_dashboard(summary: &DashboardSummary, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(summary)?,
        OutputFormat::Table => {
            println!("tracks: {}", summary.total_tracks);
            println!("  completed: {}", summary.completed);
            println!("  pending: {}", summary.pending);
            println!("  failed: {}", summary.failed);
            println!("  ignored: {}", summary.ignored);
            println!(
                "sources: {} active of {}",
                summary.active_sources, summary.total_sources
            );
            println!("cookies: {}", presence(summary.cookies_present));
        }
    }
    Ok(())
}

pub(crate) fn render_facets(
    artists: &[String],
    years: &[String],
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({ "artists": artists, "years": years }))?,
        OutputFormat::Table => {
            println!("artists ({}):", artists.len());
            for artist in artists {
                println!("  {artist}");
            }
            println!("years ({}):", years.len());
            for year in years {
                println!("  {year}");
            }
        }
    }
    Ok(())
}

pub(crate) fn render_cookie_status(status: &CookieStatus, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(status)?,
        OutputFormat::Table => println!("cookies: {}", presence(status.exists)),
    }
    Ok(())
}

/// Confirmation line for a completed write, with the service ack when present.
pub(crate) fn render_ack(message: &str, ack: Option<&Ack>, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({ "result": message, "ack": ack }))?,
        OutputFormat::Table => match ack.and_then(|ack| ack.message.as_deref()) {
            Some(detail) => println!("{message} ({detail})"),
            None => println!("{message}"),
        },
    }
    Ok(())
}

pub(crate) fn render_metrics(metrics: &MetricsSnapshot, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(metrics)?,
        OutputFormat::Table => {
            println!(
                "refresh cycles: {} applied, {} stale, {} failed",
                metrics.refresh_applied, metrics.refresh_stale, metrics.refresh_failed
            );
            println!(
                "mutations: {} succeeded, {} failed, {} rejected",
                metrics.mutations_succeeded, metrics.mutations_failed, metrics.mutations_rejected
            );
        }
    }
    Ok(())
}

pub(crate) fn single_track_message(ack: &Ack) -> String {
    if ack.already_exists() {
        let title = ack.title.as_deref().unwrap_or("track");
        format!("already downloaded: {title}")
    } else {
        match ack.video_id.as_deref() {
            Some(video_id) => format!("download queued for {video_id}"),
            None => "download queued".to_string(),
        }
    }
}

fn source_label(track: &Track) -> String {
    match (&track.source_name, track.source_type) {
        (Some(name), Some(kind)) => format!("{name} [{kind}]"),
        (Some(name), None) => name.clone(),
        (None, _) => "single".to_string(),
    }
}

const fn presence(exists: bool) -> &'static str {
    if exists { "present" } else { "absent" }
}

pub(crate) fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let kept: String = value.chars().take(width.saturating_sub(1)).collect();
    format!("{kept}…")
}
