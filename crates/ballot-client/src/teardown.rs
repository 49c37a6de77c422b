//! Session teardown: clear, cancel, redirect.

use std::sync::Arc;

use tracing::{debug, info};

use ballot_core::{LoginRedirect, RedirectReason, Session};

use crate::refresh::InFlight;
use crate::store::SessionStore;

/// Ends the current session.
///
/// Idempotent: only the call that actually clears an active session
/// cancels the pending refresh and signals the host, so concurrent callers
/// produce a single redirect.
pub struct SessionTeardown {
    store: Arc<SessionStore>,
    in_flight: Arc<InFlight>,
    redirect: Arc<dyn LoginRedirect>,
}

impl SessionTeardown {
    pub(crate) fn new(
        store: Arc<SessionStore>,
        in_flight: Arc<InFlight>,
        redirect: Arc<dyn LoginRedirect>,
    ) -> Self {
        Self {
            store,
            in_flight,
            redirect,
        }
    }

    /// Tear down unconditionally. Returns true if this call did the work.
    pub fn run(&self, reason: RedirectReason) -> bool {
        self.run_if(|_| true, reason)
    }

    /// Tear down only if `condition` holds for the current session.
    ///
    /// Used by callers that observed a particular session and must not end
    /// a newer one created by a login in the meantime.
    pub fn run_if<F>(&self, condition: F, reason: RedirectReason) -> bool
    where
        F: FnOnce(&Session) -> bool,
    {
        if !self.store.clear_if(condition) {
            debug!(%reason, "Teardown skipped, session already ended or replaced");
            return false;
        }

        if let Some(ticket) = self.in_flight.cancel() {
            debug!(ticket = ticket.id(), "Cancelled pending refresh");
        }

        info!(%reason, "Session torn down");
        self.redirect.redirect_to_login(reason);
        true
    }
}

impl std::fmt::Debug for SessionTeardown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTeardown").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use ballot_core::{AccessToken, RefreshToken};
    use chrono::Utc;

    use crate::store::MemoryPersistence;

    #[derive(Default)]
    struct RecordingRedirect(Mutex<Vec<RedirectReason>>);

    impl LoginRedirect for RecordingRedirect {
        fn redirect_to_login(&self, reason: RedirectReason) {
            self.0.lock().unwrap().push(reason);
        }
    }

    fn teardown() -> (SessionTeardown, Arc<SessionStore>, Arc<RecordingRedirect>) {
        let store = Arc::new(SessionStore::new(Arc::new(MemoryPersistence::new())));
        store.replace(Session::authenticated(
            "admin@example.com",
            AccessToken::new("a"),
            RefreshToken::new("r"),
            Utc::now(),
        ));
        let redirect = Arc::new(RecordingRedirect::default());
        let teardown = SessionTeardown::new(
            store.clone(),
            Arc::new(InFlight::default()),
            redirect.clone(),
        );
        (teardown, store, redirect)
    }

    #[test]
    fn repeated_teardown_signals_once() {
        let (teardown, store, redirect) = teardown();

        assert!(teardown.run(RedirectReason::Rejected));
        assert!(!teardown.run(RedirectReason::Rejected));
        assert!(!teardown.run(RedirectReason::LoggedOut));

        assert_eq!(store.read(), Session::unauthenticated());
        assert_eq!(*redirect.0.lock().unwrap(), vec![RedirectReason::Rejected]);
    }

    #[test]
    fn concurrent_teardown_signals_once() {
        let (teardown, _, redirect) = teardown();
        let teardown = Arc::new(teardown);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let teardown = teardown.clone();
                std::thread::spawn(move || teardown.run(RedirectReason::RefreshFailed))
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(redirect.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn guest_session_can_be_logged_out() {
        let (teardown, store, redirect) = teardown();
        store.replace(Session::guest());

        assert!(teardown.run(RedirectReason::LoggedOut));
        assert_eq!(*redirect.0.lock().unwrap(), vec![RedirectReason::LoggedOut]);
    }
}
