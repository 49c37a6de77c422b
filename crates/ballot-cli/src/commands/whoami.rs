//! Whoami command implementation.

use anyhow::{Result, bail};
use chrono::Utc;
use clap::Args;

use crate::cli::ApiArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct WhoamiArgs {}

pub async fn run(api: &ApiArgs, _args: WhoamiArgs) -> Result<()> {
    let client = session::connect(api)?;
    let session = client.session();

    if !session.is_authenticated() {
        bail!("No active session. Run 'ballot login' first.");
    }

    super::print_session(&session);
    if session.is_expired_at(Utc::now()) {
        output::hint("The access token has expired; it is refreshed on the next request.");
    }

    Ok(())
}
