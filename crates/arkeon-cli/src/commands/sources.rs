use arkeon_console::SourceForm;

use crate::cli::{SourceAddArgs, SourceIdArgs};
use crate::client::{AppContext, CliResult};
use crate::output::{render_ack, render_source, render_sources};

pub(crate) async fn handle_source_list(ctx: &AppContext) -> CliResult<()> {
    ctx.load().await?;
    render_sources(&ctx.console.snapshot(), ctx.output)
}

pub(crate) async fn handle_source_add(ctx: &AppContext, args: SourceAddArgs) -> CliResult<()> {
    let mut form = SourceForm::new(args.url, args.name.unwrap_or_default(), args.kind.into());
    let source = ctx.console.mutations().add_source(&mut form).await?;
    render_source(&source, ctx.output)
}

/// Toggling reads the current status from a fresh snapshot first.
pub(crate) async fn handle_source_toggle(ctx: &AppContext, args: SourceIdArgs) -> CliResult<()> {
    ctx.load().await?;
    let status = ctx.console.mutations().toggle_source(args.id).await?;
    render_ack(&format!("source {} is now {status}", args.id), None, ctx.output)
}

pub(crate) async fn handle_source_remove(ctx: &AppContext, args: SourceIdArgs) -> CliResult<()> {
    ctx.console.mutations().delete_source(args.id).await?;
    render_ack(&format!("source {} deleted", args.id), None, ctx.output)
}
