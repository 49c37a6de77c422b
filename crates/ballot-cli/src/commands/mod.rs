//! Subcommand implementations.

pub mod login;
pub mod logout;
pub mod query;
pub mod redeem;
pub mod refresh_token;
pub mod whoami;

use ballot_core::Session;

use crate::output;

/// Print the fields of a session.
pub(crate) fn print_session(session: &Session) {
    output::field("Mode", &format!("{:?}", session.mode()).to_lowercase());
    if let Some(identity) = session.identity() {
        output::field("Email", identity);
    }
    if let Some(expires_at) = session.expires_at() {
        output::field("Expires", &expires_at.to_rfc3339());
    }
}
