//! Live listing driven by the refresh scheduler.

use anyhow::anyhow;
use tracing::info;

use crate::cli::{OutputFormat, WatchArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{render_metrics, render_track_page};

/// Re-render the track page on every applied snapshot until interrupted or
/// `--cycles` snapshots were shown, then print the cycle counters.
pub(crate) async fn handle_watch(ctx: &mut AppContext, args: WatchArgs) -> CliResult<()> {
    let controls = args.filters.controls(ctx.console.store().controls())?;
    ctx.console.replace_controls(controls);
    let mut updates = ctx.console.subscribe();
    let handle = ctx
        .console
        .start()
        .ok_or_else(|| CliError::failure(anyhow!("refresh scheduler already running")))?;
    info!(
        interval_secs = ctx.console.settings().refresh_interval.as_secs(),
        "watching track listing"
    );

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    let mut shown = 0_u32;
    let mut last_tag = None;
    let result = loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let snapshot = updates.borrow_and_update().clone();
                // Activity-only publications keep the applied tag.
                if snapshot.applied_tag.is_none() || snapshot.applied_tag == last_tag {
                    continue;
                }
                last_tag = snapshot.applied_tag;
                if matches!(ctx.output, OutputFormat::Table) {
                    println!("-- cycle {} --", snapshot.applied_tag.unwrap_or_default());
                }
                if let Err(err) =
                    render_track_page(&snapshot.tracks, &snapshot.descriptor, ctx.output)
                {
                    break Err(err);
                }
                shown += 1;
                if args.cycles.is_some_and(|limit| shown >= limit) {
                    break Ok(());
                }
            }
            _ = &mut interrupt => {
                info!("watch interrupted");
                break Ok(());
            }
        }
    };

    handle.stop().await;
    render_metrics(&ctx.console.metrics().snapshot(), ctx.output)?;
    result
}
