//! Logout command implementation.

use anyhow::Result;
use clap::Args;

use crate::cli::ApiArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct LogoutArgs {}

pub async fn run(api: &ApiArgs, _args: LogoutArgs) -> Result<()> {
    let client = session::connect(api)?;

    if client.session().is_authenticated() {
        client.logout();
        output::success("Logged out");
    } else {
        output::success("No active session");
    }

    Ok(())
}
