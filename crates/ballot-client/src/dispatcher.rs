//! The authenticated dispatcher every outbound operation goes through.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use ballot_core::error::{AuthError, Error};
use ballot_core::{
    Credentials, GraphQlResponse, LoginRedirect, Operation, RedirectReason, Result, Session,
    SessionMode, SessionPersistence, Transport,
};

use crate::classifier::{Classification, ErrorClassifier};
use crate::config::ClientConfig;
use crate::graphql::GraphQlClient;
use crate::graphql::endpoints::{LOGIN, TokenPair, login_operation};
use crate::refresh::{InFlight, RefreshCoordinator, TicketState};
use crate::store::{MemoryPersistence, SessionStore};
use crate::teardown::SessionTeardown;

/// Redirect handler used when the host does not install one: it only logs.
#[derive(Debug, Default)]
pub struct LogRedirect;

impl LoginRedirect for LogRedirect {
    fn redirect_to_login(&self, reason: RedirectReason) {
        info!(%reason, "Login required");
    }
}

/// An operation captured with enough context to retry it once.
struct PendingOperation<'a> {
    operation: &'a Operation,
    retried: bool,
    /// The session snapshot the last attempt was sent with.
    sent_with: Session,
}

/// The client-side auth pipeline.
///
/// Attaches credentials to outbound operations, refreshes the session when
/// it expires or is rejected, retries once, and ends the session when
/// nothing else helps. Cheap to clone; clones share all state.
///
/// # Example
///
/// ```no_run
/// use ballot_client::{AuthClient, ClientConfig};
/// use ballot_core::{ApiUrl, Credentials, Operation};
///
/// # async fn example() -> Result<(), ballot_core::Error> {
/// let config = ClientConfig::new(ApiUrl::new("https://api.example.com")?);
/// let client = AuthClient::builder(config).build()?;
///
/// client.login(Credentials::new("admin@example.com", "secret")).await?;
/// let elections = client
///     .dispatch(&Operation::new("getElections", "query getElections { getElections { id name } }"))
///     .await?;
/// println!("{:?}", elections.data);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    store: Arc<SessionStore>,
    transport: Arc<dyn Transport>,
    classifier: ErrorClassifier,
    coordinator: RefreshCoordinator,
    teardown: Arc<SessionTeardown>,
    redirect: Arc<dyn LoginRedirect>,
}

/// Builder for [`AuthClient`].
pub struct AuthClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    persistence: Option<Arc<dyn SessionPersistence>>,
    redirect: Option<Arc<dyn LoginRedirect>>,
}

impl AuthClientBuilder {
    /// Use a custom transport instead of the default HTTP client.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Persist the session somewhere durable. Defaults to memory only.
    pub fn persistence(mut self, persistence: Arc<dyn SessionPersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Install the host's login redirect.
    pub fn redirect(mut self, redirect: Arc<dyn LoginRedirect>) -> Self {
        self.redirect = Some(redirect);
        self
    }

    /// Build the client, restoring any persisted session.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted session cannot be read or the
    /// HTTP client cannot be created.
    pub fn build(self) -> Result<AuthClient> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(GraphQlClient::new(self.config.api_url().clone())?),
        };
        let persistence = self
            .persistence
            .unwrap_or_else(|| Arc::new(MemoryPersistence::new()));
        let redirect = self.redirect.unwrap_or_else(|| Arc::new(LogRedirect));

        let store = Arc::new(SessionStore::restore(persistence)?);
        let in_flight = Arc::new(InFlight::default());
        let teardown = Arc::new(SessionTeardown::new(
            store.clone(),
            in_flight.clone(),
            redirect.clone(),
        ));
        let coordinator = RefreshCoordinator::new(
            store.clone(),
            transport.clone(),
            teardown.clone(),
            in_flight,
            &self.config,
        );
        let classifier = ErrorClassifier::new(self.config.token_keywords());

        Ok(AuthClient {
            inner: Arc::new(ClientInner {
                config: self.config,
                store,
                transport,
                classifier,
                coordinator,
                teardown,
                redirect,
            }),
        })
    }
}

impl AuthClient {
    pub fn builder(config: ClientConfig) -> AuthClientBuilder {
        AuthClientBuilder {
            config,
            transport: None,
            persistence: None,
            redirect: None,
        }
    }

    /// A snapshot of the current session.
    pub fn session(&self) -> Session {
        self.inner.store.read()
    }

    pub fn store(&self) -> &SessionStore {
        &self.inner.store
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.inner.coordinator
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Log in and seed an authenticated session.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the credentials or is unreachable.
    #[instrument(skip(self, credentials), fields(email = %credentials.email()))]
    pub async fn login(&self, credentials: Credentials) -> Result<Session> {
        info!("Logging in");

        let operation = login_operation(credentials.email(), credentials.password())?;
        let response = self.inner.transport.execute(&operation, None).await?;

        let (access_token, refresh_token) = TokenPair::from_response(&response, LOGIN)
            .map(TokenPair::into_tokens)
            .ok_or_else(|| {
                let message = response
                    .errors
                    .first()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "login response is missing the token pair".to_string());
                AuthError::InvalidCredentials(message)
            })?;

        let expires_at = Utc::now() + self.inner.config.session_lease();
        let session = self.inner.store.replace(Session::authenticated(
            credentials.email(),
            access_token,
            refresh_token,
            expires_at,
        ));

        debug!(%expires_at, "Logged in");
        Ok(session)
    }

    /// Switch to an anonymous guest session (ballot redemption).
    pub fn enter_guest(&self) -> Session {
        info!("Entering guest session");
        self.inner.store.replace(Session::guest())
    }

    /// End the session and send the host to login.
    pub fn logout(&self) {
        self.inner.teardown.run(RedirectReason::LoggedOut);
    }

    /// Refresh the session now, joining a pending refresh if there is one.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no authenticated session or the
    /// refresh fails (in which case the session has been torn down).
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Session> {
        if !self.inner.store.read().is_authenticated() {
            return Err(AuthError::NotAuthenticated.into());
        }

        let ticket = self.inner.coordinator.request_refresh();
        match ticket.wait().await {
            TicketState::Succeeded => self.current_authenticated(),
            _ => Err(refresh_failed()),
        }
    }

    /// Send one operation through the pipeline.
    ///
    /// Business errors come back untouched, either as `Ok` with GraphQL
    /// `errors` or as a protocol/transport `Err`. Only auth failures are
    /// acted on here.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] variants when no usable session exists or it
    /// could not be recovered, and passes other failures through.
    #[instrument(skip(self, operation), fields(operation = %operation.name()))]
    pub async fn dispatch(&self, operation: &Operation) -> Result<GraphQlResponse> {
        let session = self.inner.store.read();

        match session.mode() {
            SessionMode::Guest => {
                debug!("Guest dispatch");
                return self.inner.transport.execute(operation, None).await;
            }
            SessionMode::Unauthenticated => {
                if self.inner.config.is_public(operation.name()) {
                    debug!("Public dispatch");
                    return self.inner.transport.execute(operation, None).await;
                }
                debug!("Refusing dispatch without a session");
                self.inner
                    .redirect
                    .redirect_to_login(RedirectReason::NotAuthenticated);
                return Err(AuthError::NotAuthenticated.into());
            }
            SessionMode::Authenticated => {}
        }

        let session = if session.bearer().is_none() {
            debug!("No access token, refreshing before dispatch");
            self.await_refresh(&session).await?
        } else if session.is_expired_at(Utc::now()) {
            debug!("Access token expired, refreshing before dispatch");
            self.await_refresh(&session).await?
        } else {
            session
        };

        let mut pending = PendingOperation {
            operation,
            retried: false,
            sent_with: session,
        };
        let outcome = self.send(&pending).await;

        match self.inner.classifier.classify(&outcome) {
            Classification::Ok | Classification::OtherError => outcome,
            Classification::AuthInvalid => {
                self.teardown_for(&pending.sent_with, RedirectReason::RefreshFailed);
                outcome
            }
            Classification::AuthExpired => {
                debug!("Operation rejected, refreshing and retrying");
                pending.sent_with = self.await_refresh(&pending.sent_with).await?;
                pending.retried = true;
                self.retry(&pending).await
            }
        }
    }

    async fn send(&self, pending: &PendingOperation<'_>) -> Result<GraphQlResponse> {
        let bearer = pending.sent_with.bearer();
        self.inner.transport.execute(pending.operation, bearer).await
    }

    async fn retry(&self, pending: &PendingOperation<'_>) -> Result<GraphQlResponse> {
        debug_assert!(pending.retried);
        let outcome = self.send(pending).await;

        match self.inner.classifier.classify(&outcome) {
            Classification::Ok | Classification::OtherError => outcome,
            Classification::AuthInvalid => {
                self.teardown_for(&pending.sent_with, RedirectReason::RefreshFailed);
                outcome
            }
            Classification::AuthExpired => {
                debug!("Retried operation rejected again");
                self.teardown_for(&pending.sent_with, RedirectReason::Rejected);
                Err(AuthError::SessionExpired.into())
            }
        }
    }

    /// Wait for a session newer than `observed`, refreshing if needed.
    async fn await_refresh(&self, observed: &Session) -> Result<Session> {
        let ticket = match observed.bearer() {
            Some(token) => self.inner.coordinator.request_refresh_if_current(token),
            None if observed.is_authenticated() => Some(self.inner.coordinator.request_refresh()),
            None => return Err(AuthError::SessionTerminated.into()),
        };

        if let Some(ticket) = ticket {
            if ticket.wait().await != TicketState::Succeeded {
                self.teardown_for(observed, RedirectReason::RefreshFailed);
                return Err(refresh_failed());
            }
        }

        self.current_authenticated()
    }

    fn current_authenticated(&self) -> Result<Session> {
        let session = self.inner.store.read();
        if session.bearer().is_none() {
            return Err(AuthError::SessionTerminated.into());
        }
        Ok(session)
    }

    /// Tear down only if the store still holds the session `observed` came from.
    fn teardown_for(&self, observed: &Session, reason: RedirectReason) {
        self.inner.teardown.run_if(
            |current| {
                current.is_authenticated() && current.refresh_token() == observed.refresh_token()
            },
            reason,
        );
    }
}

fn refresh_failed() -> Error {
    AuthError::RefreshFailed {
        reason: "refresh exchange did not succeed".to_string(),
    }
    .into()
}

impl std::fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthClient")
            .field("api", &self.inner.config.api_url())
            .field("session", &self.inner.store.read())
            .finish_non_exhaustive()
    }
}
