//! The session store: sole owner of the process-wide [`Session`].

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, warn};

use ballot_core::error::StorageError;
use ballot_core::{PersistedSession, Session, SessionPersistence, SessionUpdate};

/// Thread-safe holder of the current session.
///
/// Every mutation computes the next snapshot, persists it and swaps it in
/// while holding the write lock, so readers observe either the old session
/// or the new one, never a mix.
pub struct SessionStore {
    session: RwLock<Session>,
    persistence: Arc<dyn SessionPersistence>,
}

impl SessionStore {
    /// Create an empty (unauthenticated) store.
    pub fn new(persistence: Arc<dyn SessionPersistence>) -> Self {
        Self {
            session: RwLock::new(Session::unauthenticated()),
            persistence,
        }
    }

    /// Create a store seeded from whatever `persistence` holds.
    ///
    /// A record that cannot be parsed is discarded and the store starts
    /// unauthenticated.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    pub fn restore(persistence: Arc<dyn SessionPersistence>) -> Result<Self, StorageError> {
        let loaded = persistence
            .load()
            .and_then(|record| record.map(PersistedSession::into_session).transpose());

        let session = match loaded {
            Ok(Some(session)) => session,
            Ok(None) => Session::unauthenticated(),
            Err(StorageError::Corrupt { message }) => {
                warn!(%message, "Discarding corrupt session record");
                if let Err(e) = persistence.clear() {
                    warn!(error = %e, "Failed to clear corrupt session record");
                }
                Session::unauthenticated()
            }
            Err(e) => return Err(e),
        };
        debug!(mode = ?session.mode(), "Restored session");

        Ok(Self {
            session: RwLock::new(session),
            persistence,
        })
    }

    /// A snapshot of the current session.
    pub fn read(&self) -> Session {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply a partial update and return the resulting session.
    pub fn write(&self, update: SessionUpdate) -> Session {
        let mut guard = self.session.write().unwrap_or_else(PoisonError::into_inner);
        let next = guard.apply(update);
        self.persist(&next);
        *guard = next.clone();
        next
    }

    /// Apply `update` only if `condition` holds for the current session.
    ///
    /// The check and the write happen under one lock acquisition.
    pub fn write_if<F>(&self, condition: F, update: SessionUpdate) -> Option<Session>
    where
        F: FnOnce(&Session) -> bool,
    {
        let mut guard = self.session.write().unwrap_or_else(PoisonError::into_inner);
        if !condition(&guard) {
            return None;
        }
        let next = guard.apply(update);
        self.persist(&next);
        *guard = next.clone();
        Some(next)
    }

    /// Replace the whole session (login, guest entry).
    pub fn replace(&self, session: Session) -> Session {
        let mut guard = self.session.write().unwrap_or_else(PoisonError::into_inner);
        self.persist(&session);
        *guard = session.clone();
        session
    }

    /// Reset to unauthenticated.
    ///
    /// Returns false if the store was already empty, which lets callers
    /// run their side effects only once.
    pub fn clear(&self) -> bool {
        self.clear_if(|_| true)
    }

    /// Reset to unauthenticated if `condition` holds for the current session.
    ///
    /// Returns true only if an active session was actually cleared.
    pub fn clear_if<F>(&self, condition: F) -> bool
    where
        F: FnOnce(&Session) -> bool,
    {
        let mut guard = self.session.write().unwrap_or_else(PoisonError::into_inner);
        if *guard == Session::unauthenticated() || !condition(&guard) {
            return false;
        }

        if let Err(e) = self.persistence.clear() {
            warn!(error = %e, "Failed to clear persisted session");
        }
        *guard = Session::unauthenticated();
        true
    }

    // A failed write leaves the in-memory session authoritative: tokens
    // have already rotated server-side and dropping them would end the
    // session.
    //
    // Runs synchronously under the write guard, on whatever thread mutates
    // the store (a runtime worker included). Persistence backends must not
    // block for long: the file backend bounds its lock wait.
    fn persist(&self, session: &Session) {
        if let Err(e) = self.persistence.save(&PersistedSession::from(session)) {
            warn!(error = %e, "Failed to persist session");
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("session", &self.read())
            .finish_non_exhaustive()
    }
}

/// Non-durable persistence, for hosts without storage and for tests.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    record: Mutex<Option<PersistedSession>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `record` already stored.
    pub fn with_record(record: PersistedSession) -> Self {
        Self {
            record: Mutex::new(Some(record)),
        }
    }

    /// The currently stored record.
    pub fn snapshot(&self) -> Option<PersistedSession> {
        self.record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SessionPersistence for MemoryPersistence {
    fn load(&self) -> Result<Option<PersistedSession>, StorageError> {
        Ok(self.snapshot())
    }

    fn save(&self, record: &PersistedSession) -> Result<(), StorageError> {
        *self.record.lock().unwrap_or_else(PoisonError::into_inner) = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.record.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
