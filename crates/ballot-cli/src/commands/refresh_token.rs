//! Refresh token command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use crate::cli::ApiArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct RefreshTokenArgs {}

pub async fn run(api: &ApiArgs, _args: RefreshTokenArgs) -> Result<()> {
    let client = session::connect(api)?;
    if !client.session().is_authenticated() {
        anyhow::bail!("No active session. Run 'ballot login' first.");
    }

    eprintln!("{}", "Refreshing session...".dimmed());

    let session = client
        .refresh()
        .await
        .context("Failed to refresh session")?;

    output::success("Session refreshed successfully");
    super::print_session(&session);

    Ok(())
}
