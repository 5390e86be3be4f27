use crate::client::{AppContext, CliResult};
use crate::output::{render_dashboard, render_facets};

pub(crate) async fn handle_stats(ctx: &AppContext) -> CliResult<()> {
    ctx.load().await?;
    render_dashboard(&ctx.console.snapshot().dashboard(), ctx.output)
}

pub(crate) async fn handle_facets(ctx: &AppContext) -> CliResult<()> {
    ctx.load().await?;
    let snapshot = ctx.console.snapshot();
    render_facets(&snapshot.artists, &snapshot.years, ctx.output)
}
