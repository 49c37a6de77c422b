//! CLI argument definitions.

use clap::{Args, Parser, Subcommand};

use ballot_client::config::DEFAULT_SESSION_LEASE_SECS;

use crate::commands::{login, logout, query, redeem, refresh_token, whoami};

/// Command-line client for the ballot election API.
#[derive(Parser, Debug)]
#[command(name = "ballot")]
#[command(author, version = env!("BALLOT_VERSION"), about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub api: ApiArgs,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Connection settings shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct ApiArgs {
    /// Base URL of the election API (the GraphQL endpoint is <url>/graphql)
    #[arg(
        long,
        env = "BALLOT_API_URL",
        default_value = "http://localhost:4000",
        global = true
    )]
    pub api_url: String,

    /// Session lease granted at login and on every refresh, in seconds
    #[arg(
        long,
        env = "BALLOT_SESSION_LEASE_SECS",
        default_value_t = DEFAULT_SESSION_LEASE_SECS,
        global = true
    )]
    pub lease_secs: i64,

    /// Give up on a session refresh after this many seconds
    #[arg(
        long,
        env = "BALLOT_REFRESH_TIMEOUT_SECS",
        default_value_t = 30,
        global = true
    )]
    pub refresh_timeout_secs: u64,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in as an election administrator
    Login(login::LoginArgs),

    /// Display the stored session
    Whoami(whoami::WhoamiArgs),

    /// Refresh the session tokens now
    RefreshToken(refresh_token::RefreshTokenArgs),

    /// End the stored session
    Logout(logout::LogoutArgs),

    /// Check a voter code as a guest and list the ballot
    Redeem(redeem::RedeemArgs),

    /// Run an arbitrary GraphQL operation with the stored session
    Query(query::QueryArgs),
}
