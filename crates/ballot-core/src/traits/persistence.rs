//! Durable session storage trait.

use crate::error::StorageError;
use crate::session::PersistedSession;

/// Durable storage for the session record.
///
/// Calls are made while the session store holds its write lock, so
/// implementations must be quick and must not call back into the store.
pub trait SessionPersistence: Send + Sync {
    /// Load the stored record, if any.
    fn load(&self) -> Result<Option<PersistedSession>, StorageError>;

    /// Replace the stored record as a whole.
    fn save(&self, record: &PersistedSession) -> Result<(), StorageError>;

    /// Remove the stored record.
    fn clear(&self) -> Result<(), StorageError>;
}
