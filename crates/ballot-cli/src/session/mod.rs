//! Building the auth client from command-line settings.

pub mod storage;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;

use ballot_client::{AuthClient, ClientConfig};
use ballot_core::{ApiUrl, LoginRedirect, RedirectReason};

use crate::cli::ApiArgs;
use crate::output;

/// Tells the user how to get a session back.
#[derive(Debug, Default)]
pub struct CliRedirect;

impl LoginRedirect for CliRedirect {
    fn redirect_to_login(&self, reason: RedirectReason) {
        match reason {
            RedirectReason::LoggedOut => {}
            reason => {
                output::error(&format!("Session ended: {}", reason));
                output::hint("Run 'ballot login' to sign in again.");
            }
        }
    }
}

fn config(api: &ApiArgs) -> Result<ClientConfig> {
    let url = ApiUrl::new(&api.api_url).context("Invalid API URL")?;
    Ok(ClientConfig::new(url)
        .with_session_lease(chrono::Duration::seconds(api.lease_secs))
        .with_refresh_timeout(Duration::from_secs(api.refresh_timeout_secs)))
}

/// A client backed by the stored session file.
pub fn connect(api: &ApiArgs) -> Result<AuthClient> {
    let persistence = storage::persistence()?;
    debug!(path = %persistence.path().display(), "Using session file");

    AuthClient::builder(config(api)?)
        .persistence(Arc::new(persistence))
        .redirect(Arc::new(CliRedirect))
        .build()
        .context("Failed to load session")
}

/// A guest client whose session lives in memory only.
pub fn guest(api: &ApiArgs) -> Result<AuthClient> {
    let client = AuthClient::builder(config(api)?)
        .redirect(Arc::new(CliRedirect))
        .build()
        .context("Failed to create client")?;
    client.enter_guest();
    Ok(client)
}
