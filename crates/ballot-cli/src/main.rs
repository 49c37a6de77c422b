//! ballot - Command-line client for the ballot election API.
//!
//! A thin wrapper over `ballot-client`: every command goes through the
//! same authenticated pipeline, with the session kept in a file under the
//! platform data directory.

mod cli;
mod commands;
mod output;
mod session;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json_logs);

    match cli.command {
        Commands::Login(args) => commands::login::run(&cli.api, args).await,
        Commands::Whoami(args) => commands::whoami::run(&cli.api, args).await,
        Commands::RefreshToken(args) => commands::refresh_token::run(&cli.api, args).await,
        Commands::Logout(args) => commands::logout::run(&cli.api, args).await,
        Commands::Redeem(args) => commands::redeem::run(&cli.api, args).await,
        Commands::Query(args) => commands::query::run(&cli.api, args).await,
    }
}

fn init_logging(verbosity: u8, json: bool) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr; stdout carries command output only.
    let layer = fmt::layer().with_writer(std::io::stderr);
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.with_target(false))
            .init();
    }
}
