//! Login command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use ballot_core::Credentials;

use crate::cli::ApiArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Administrator email
    #[arg(long)]
    pub email: String,

    /// Account password
    #[arg(long, env = "BALLOT_PASSWORD", hide_env_values = true)]
    pub password: String,
}

pub async fn run(api: &ApiArgs, args: LoginArgs) -> Result<()> {
    let client = session::connect(api)?;
    let credentials = Credentials::new(&args.email, &args.password);

    eprintln!("{}", "Logging in...".dimmed());

    let session = client.login(credentials).await.context("Failed to login")?;

    output::success("Logged in successfully");
    println!();
    super::print_session(&session);

    Ok(())
}
