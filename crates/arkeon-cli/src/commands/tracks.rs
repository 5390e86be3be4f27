use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::anyhow;
use arkeon_api_models::TrackId;
use arkeon_console::{RestoreKind, SingleTrackForm};
use tracing::debug;

use crate::cli::{TrackAddArgs, TrackFilterArgs, TrackIdArgs, TrackRemoveArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{render_ack, render_track_page, single_track_message};

pub(crate) async fn handle_track_list(ctx: &AppContext, args: &TrackFilterArgs) -> CliResult<()> {
    let controls = args.controls(ctx.console.store().controls())?;
    ctx.console.replace_controls(controls);
    ctx.load().await?;
    let snapshot = ctx.console.snapshot();
    render_track_page(&snapshot.tracks, &snapshot.descriptor, ctx.output)
}

pub(crate) async fn handle_track_add(ctx: &AppContext, args: TrackAddArgs) -> CliResult<()> {
    let mut form = SingleTrackForm { url: args.url };
    let ack = ctx.console.mutations().add_single_track(&mut form).await?;
    render_ack(&single_track_message(&ack), Some(&ack), ctx.output)
}

pub(crate) async fn handle_track_remove(ctx: &AppContext, args: TrackRemoveArgs) -> CliResult<()> {
    let interactive = io::stdin().is_terminal();
    let confirmed = confirm_removal(args.id, args.yes, interactive, || {
        let mut stderr = io::stderr();
        write!(
            stderr,
            "Delete the file of track {} and never download it again? [y/N] ",
            args.id
        )?;
        stderr.flush()?;
        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(answer)
    })?;
    ctx.console
        .mutations()
        .delete_track(args.id, confirmed)
        .await?;
    render_ack(
        &format!("track {} ignored; its file was deleted", args.id),
        None,
        ctx.output,
    )
}

/// Reads a fresh snapshot first; the track's status there must match `kind`.
pub(crate) async fn handle_track_restore(
    ctx: &AppContext,
    args: TrackIdArgs,
    kind: RestoreKind,
) -> CliResult<()> {
    ctx.load().await?;
    let kind = ctx
        .console
        .mutations()
        .restore_track(args.id, Some(kind))
        .await?;
    render_ack(
        &format!("track {} queued for download ({})", args.id, kind.label()),
        None,
        ctx.output,
    )
}

/// Deletion needs `--yes` or an explicit `y` on an interactive terminal.
fn confirm_removal(
    id: TrackId,
    assume_yes: bool,
    interactive: bool,
    ask: impl FnOnce() -> io::Result<String>,
) -> CliResult<bool> {
    if assume_yes {
        return Ok(true);
    }
    if !interactive {
        return Err(CliError::validation(format!(
            "refusing to delete track {id} without --yes when stdin is not a terminal"
        )));
    }
    let answer =
        ask().map_err(|err| CliError::failure(anyhow!("failed to read confirmation: {err}")))?;
    let confirmed = matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes");
    debug!(track = id, confirmed, "deletion prompt answered");
    Ok(confirmed)
}
