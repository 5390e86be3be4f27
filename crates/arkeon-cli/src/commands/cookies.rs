use std::fs;

use anyhow::anyhow;
use arkeon_console::CookieUpload;

use crate::cli::CookieUploadArgs;
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{render_ack, render_cookie_status};

pub(crate) async fn handle_cookie_status(ctx: &AppContext) -> CliResult<()> {
    ctx.load().await?;
    render_cookie_status(&ctx.console.snapshot().cookies, ctx.output)
}

pub(crate) async fn handle_cookie_upload(
    ctx: &AppContext,
    args: CookieUploadArgs,
) -> CliResult<()> {
    let file_name = args
        .path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| CliError::validation("cookie path must name a UTF-8 file"))?
        .to_string();
    let bytes = fs::read(&args.path).map_err(|err| {
        CliError::failure(anyhow!("failed to read {}: {err}", args.path.display()))
    })?;
    let ack = ctx
        .console
        .mutations()
        .upload_cookies(CookieUpload { file_name, bytes })
        .await?;
    render_ack("cookies uploaded", Some(&ack), ctx.output)
}

/// A missing credential file counts as deleted.
pub(crate) async fn handle_cookie_delete(ctx: &AppContext) -> CliResult<()> {
    ctx.console.mutations().delete_cookies().await?;
    render_ack("cookies deleted", None, ctx.output)
}
