//! Host navigation signal.

use std::fmt;

/// Why the host is being sent back to the login entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    /// Explicit logout.
    LoggedOut,
    /// The refresh exchange failed.
    RefreshFailed,
    /// The backend kept rejecting the session after a refresh.
    Rejected,
    /// A protected operation was dispatched without a session.
    NotAuthenticated,
}

impl fmt::Display for RedirectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            RedirectReason::LoggedOut => "logged out",
            RedirectReason::RefreshFailed => "session refresh failed",
            RedirectReason::Rejected => "session rejected",
            RedirectReason::NotAuthenticated => "not authenticated",
        };
        f.write_str(reason)
    }
}

/// Implemented by the host application to navigate to its login page.
///
/// The pipeline shows no user-facing message of its own; presenting one is
/// up to the implementation.
pub trait LoginRedirect: Send + Sync {
    fn redirect_to_login(&self, reason: RedirectReason);
}
