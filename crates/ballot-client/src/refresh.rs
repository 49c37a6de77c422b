//! Single-flight session refresh.
//!
//! At most one refresh exchange runs at a time. Callers that discover a
//! stale session while one is pending join its [`RefreshTicket`] instead of
//! starting their own, because two exchanges presenting the same refresh
//! token race at the backend and the loser's session is revoked.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use ballot_core::error::{AuthError, Error, ProtocolError};
use ballot_core::{
    AccessToken, RedirectReason, RefreshToken, Result, Session, SessionUpdate, Transport,
};

use crate::config::ClientConfig;
use crate::graphql::endpoints::{REFRESH_TOKEN, TokenPair, refresh_operation};
use crate::store::SessionStore;
use crate::teardown::SessionTeardown;

/// Lifecycle of one refresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketState {
    Pending,
    Succeeded,
    Failed,
}

/// A handle on one in-flight or settled refresh attempt.
///
/// Cloning a ticket adds a waiter; every clone observes the same outcome.
#[derive(Clone)]
pub struct RefreshTicket {
    inner: Arc<TicketInner>,
}

struct TicketInner {
    id: u64,
    state: watch::Sender<TicketState>,
}

impl RefreshTicket {
    fn new(id: u64) -> Self {
        let (state, _) = watch::channel(TicketState::Pending);
        Self {
            inner: Arc::new(TicketInner { id, state }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn state(&self) -> TicketState {
        *self.inner.state.borrow()
    }

    /// Wait until the ticket leaves `Pending`.
    pub async fn wait(&self) -> TicketState {
        let mut rx = self.inner.state.subscribe();
        match rx.wait_for(|state| *state != TicketState::Pending).await {
            Ok(state) => *state,
            Err(_) => TicketState::Failed,
        }
    }

    /// Settle the ticket. Only the first call has any effect.
    pub(crate) fn settle(&self, outcome: TicketState) -> bool {
        self.inner.state.send_if_modified(|state| {
            if *state == TicketState::Pending {
                *state = outcome;
                true
            } else {
                false
            }
        })
    }

    fn same(&self, other: &RefreshTicket) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for RefreshTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshTicket")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}

/// The slot holding the pending ticket, shared with teardown.
#[derive(Default)]
pub(crate) struct InFlight {
    slot: Mutex<Option<RefreshTicket>>,
    next_id: AtomicU64,
}

impl InFlight {
    fn lock(&self) -> MutexGuard<'_, Option<RefreshTicket>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fail and forget the pending ticket, if any.
    pub(crate) fn cancel(&self) -> Option<RefreshTicket> {
        let ticket = self.lock().take()?;
        ticket.settle(TicketState::Failed);
        Some(ticket)
    }
}

/// Runs refresh exchanges, one at a time.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    store: Arc<SessionStore>,
    transport: Arc<dyn Transport>,
    teardown: Arc<SessionTeardown>,
    in_flight: Arc<InFlight>,
    lease: chrono::Duration,
    timeout: Duration,
    exchanges: AtomicU64,
}

impl RefreshCoordinator {
    pub(crate) fn new(
        store: Arc<SessionStore>,
        transport: Arc<dyn Transport>,
        teardown: Arc<SessionTeardown>,
        in_flight: Arc<InFlight>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                store,
                transport,
                teardown,
                in_flight,
                lease: config.session_lease(),
                timeout: config.refresh_timeout(),
                exchanges: AtomicU64::new(0),
            }),
        }
    }

    /// Join the pending refresh, or start one.
    ///
    /// Must be called from within a Tokio runtime; the exchange runs on a
    /// spawned task so it completes even if every waiter is dropped.
    pub fn request_refresh(&self) -> RefreshTicket {
        let mut slot = self.inner.in_flight.lock();
        match slot.as_ref() {
            Some(ticket) => ticket.clone(),
            None => self.start(&mut slot),
        }
    }

    /// Like [`request_refresh`](Self::request_refresh), but only if the
    /// session still holds `observed`.
    ///
    /// Returns `None` when the token has already been replaced (or the
    /// session cleared) since the caller read it; the caller should just
    /// re-read the store.
    pub fn request_refresh_if_current(&self, observed: &AccessToken) -> Option<RefreshTicket> {
        let mut slot = self.inner.in_flight.lock();
        if let Some(ticket) = slot.as_ref() {
            debug!(ticket = ticket.id(), "Joining pending refresh");
            return Some(ticket.clone());
        }

        // Completion writes the store while holding the slot, so this read
        // cannot fall between a ticket settling and its write landing.
        if self.inner.store.read().bearer() != Some(observed) {
            debug!("Session already refreshed");
            return None;
        }

        Some(self.start(&mut slot))
    }

    /// The pending ticket, if a refresh is running.
    pub fn pending(&self) -> Option<RefreshTicket> {
        self.inner.in_flight.lock().clone()
    }

    /// Number of exchanges started so far.
    pub fn exchanges(&self) -> u64 {
        self.inner.exchanges.load(Ordering::SeqCst)
    }

    fn start(&self, slot: &mut Option<RefreshTicket>) -> RefreshTicket {
        let id = self.inner.in_flight.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let ticket = RefreshTicket::new(id);
        *slot = Some(ticket.clone());
        self.inner.exchanges.fetch_add(1, Ordering::SeqCst);

        let coordinator = self.clone();
        let running = ticket.clone();
        tokio::spawn(async move { coordinator.run(running).await });

        ticket
    }

    #[instrument(skip(self, ticket), fields(ticket = ticket.id()))]
    async fn run(&self, ticket: RefreshTicket) {
        info!("Refreshing session");

        let session = self.inner.store.read();
        let outcome = match tokio::time::timeout(self.inner.timeout, self.exchange(&session)).await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(AuthError::RefreshFailed {
                reason: format!("timed out after {}ms", self.inner.timeout.as_millis()),
            }
            .into()),
        };

        self.complete(&ticket, &session, outcome);
    }

    /// One refresh round trip: old refresh token in, new token pair out.
    async fn exchange(&self, session: &Session) -> Result<(AccessToken, RefreshToken)> {
        if !session.is_authenticated() {
            return Err(AuthError::NotAuthenticated.into());
        }
        let refresh_token = session
            .refresh_token()
            .ok_or(AuthError::MissingRefreshToken)?;
        let identity = session.identity().unwrap_or_default();

        let operation = refresh_operation(identity, refresh_token)?;
        let response = self.inner.transport.execute(&operation, None).await?;

        TokenPair::from_response(&response, REFRESH_TOKEN)
            .map(TokenPair::into_tokens)
            .ok_or_else(|| {
                let message = response
                    .errors
                    .first()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "response is missing the token pair".to_string());
                Error::Protocol(ProtocolError::new(200, None, Some(message)))
            })
    }

    fn complete(
        &self,
        ticket: &RefreshTicket,
        used: &Session,
        outcome: Result<(AccessToken, RefreshToken)>,
    ) {
        let mut slot = self.inner.in_flight.lock();
        if !slot.as_ref().is_some_and(|current| current.same(ticket)) {
            // Teardown already cancelled this ticket.
            debug!("Discarding refresh result for cancelled ticket");
            ticket.settle(TicketState::Failed);
            return;
        }

        match outcome {
            Ok((access_token, refresh_token)) => {
                let expires_at = Utc::now() + self.inner.lease;
                let written = self.inner.store.write_if(
                    |current| {
                        current.is_authenticated() && current.refresh_token() == used.refresh_token()
                    },
                    SessionUpdate::refreshed(access_token, refresh_token, expires_at),
                );
                slot.take();

                if written.is_some() {
                    info!(%expires_at, "Session refreshed");
                    ticket.settle(TicketState::Succeeded);
                } else if self.inner.store.read().is_authenticated() {
                    // A new login replaced the session mid-exchange; its
                    // tokens are fresh, so waiters may proceed with them.
                    debug!("Session replaced during refresh");
                    ticket.settle(TicketState::Succeeded);
                } else {
                    ticket.settle(TicketState::Failed);
                }
            }
            Err(e) => {
                warn!(error = %e, "Session refresh failed");
                slot.take();
                drop(slot);

                self.inner.teardown.run_if(
                    |current| {
                        current.is_authenticated()
                            && current.refresh_token() == used.refresh_token()
                    },
                    RedirectReason::RefreshFailed,
                );
                ticket.settle(TicketState::Failed);
            }
        }
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("pending", &self.pending())
            .field("exchanges", &self.exchanges())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use ballot_core::{
        GraphQlResponse, LoginRedirect, Operation, PersistedSession, SessionMode,
    };
    use serde_json::json;
    use tokio::sync::Notify;

    use crate::store::MemoryPersistence;

    /// Transport that parks refresh calls until released.
    struct GatedTransport {
        gate: Notify,
        calls: AtomicUsize,
        succeed: bool,
    }

    #[async_trait]
    impl Transport for GatedTransport {
        async fn execute(
            &self,
            operation: &Operation,
            _bearer: Option<&AccessToken>,
        ) -> Result<GraphQlResponse> {
            assert_eq!(operation.name(), REFRESH_TOKEN);
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            if self.succeed {
                Ok(GraphQlResponse {
                    data: Some(json!({
                        "refreshToken": { "accessToken": "a2", "refreshToken": "r2" }
                    })),
                    errors: vec![],
                })
            } else {
                Ok(GraphQlResponse {
                    data: Some(json!({ "refreshToken": { "accessToken": "a2" } })),
                    errors: vec![],
                })
            }
        }
    }

    #[derive(Default)]
    struct CountingRedirect(AtomicUsize);

    impl LoginRedirect for CountingRedirect {
        fn redirect_to_login(&self, _reason: RedirectReason) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Fixture {
        coordinator: RefreshCoordinator,
        transport: Arc<GatedTransport>,
        store: Arc<SessionStore>,
        teardown: Arc<SessionTeardown>,
        redirect: Arc<CountingRedirect>,
    }

    fn fixture(succeed: bool) -> Fixture {
        let persistence = Arc::new(MemoryPersistence::new());
        let store = Arc::new(SessionStore::new(persistence));
        store.replace(Session::authenticated(
            "admin@example.com",
            AccessToken::new("a1"),
            RefreshToken::new("r1"),
            Utc::now(),
        ));

        let transport = Arc::new(GatedTransport {
            gate: Notify::new(),
            calls: AtomicUsize::new(0),
            succeed,
        });
        let redirect = Arc::new(CountingRedirect::default());
        let in_flight = Arc::new(InFlight::default());
        let teardown = Arc::new(SessionTeardown::new(
            store.clone(),
            in_flight.clone(),
            redirect.clone(),
        ));
        let config = ClientConfig::new(ballot_core::ApiUrl::new("http://localhost:1").unwrap());
        let coordinator = RefreshCoordinator::new(
            store.clone(),
            transport.clone(),
            teardown.clone(),
            in_flight,
            &config,
        );

        Fixture {
            coordinator,
            transport,
            store,
            teardown,
            redirect,
        }
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_ticket() {
        let f = fixture(true);

        let first = f.coordinator.request_refresh();
        let tickets: Vec<_> = (0..9).map(|_| f.coordinator.request_refresh()).collect();
        assert!(tickets.iter().all(|t| t.same(&first)));
        assert_eq!(first.state(), TicketState::Pending);

        tokio::task::yield_now().await;
        f.transport.gate.notify_one();

        for ticket in &tickets {
            assert_eq!(ticket.wait().await, TicketState::Succeeded);
        }
        assert_eq!(f.transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.coordinator.exchanges(), 1);
        assert!(f.coordinator.pending().is_none());

        let session = f.store.read();
        assert_eq!(session.bearer().map(AccessToken::as_str), Some("a2"));
        assert_eq!(session.refresh_token().map(RefreshToken::as_str), Some("r2"));
        assert!(session.expires_at().unwrap() > Utc::now());
    }

    #[tokio::test]
    async fn stale_observation_skips_refresh() {
        let f = fixture(true);
        let ticket = f.coordinator.request_refresh();
        tokio::task::yield_now().await;
        f.transport.gate.notify_one();
        ticket.wait().await;

        assert!(
            f.coordinator
                .request_refresh_if_current(&AccessToken::new("a1"))
                .is_none()
        );
        assert_eq!(f.coordinator.exchanges(), 1);
    }

    #[tokio::test]
    async fn malformed_payload_fails_and_tears_down_once() {
        let f = fixture(false);

        let tickets: Vec<_> = (0..5).map(|_| f.coordinator.request_refresh()).collect();
        tokio::task::yield_now().await;
        f.transport.gate.notify_one();

        for ticket in &tickets {
            assert_eq!(ticket.wait().await, TicketState::Failed);
        }
        assert_eq!(f.redirect.0.load(Ordering::SeqCst), 1);
        assert_eq!(f.store.read().mode(), SessionMode::Unauthenticated);
    }

    #[tokio::test]
    async fn teardown_cancels_waiters() {
        let f = fixture(true);

        let ticket = f.coordinator.request_refresh();
        tokio::task::yield_now().await;
        assert!(f.teardown.run(RedirectReason::LoggedOut));
        assert_eq!(ticket.wait().await, TicketState::Failed);

        // The exchange finishing later must not resurrect the session.
        f.transport.gate.notify_one();
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert_eq!(f.store.read(), Session::unauthenticated());
        assert_eq!(f.redirect.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_refresh_token_fails() {
        let f = fixture(true);
        let record = PersistedSession {
            mode: SessionMode::Authenticated,
            access_token: Some("a1".to_string()),
            ..Default::default()
        };
        f.store.replace(record.into_session().unwrap());

        let ticket = f.coordinator.request_refresh();
        assert_eq!(ticket.wait().await, TicketState::Failed);
        assert_eq!(f.transport.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.redirect.0.load(Ordering::SeqCst), 1);
    }
}
