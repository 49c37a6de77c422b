//! ballot-file - File-backed session persistence.
//!
//! Keeps the session record in a single JSON file so a login survives
//! process restarts. Writes are atomic and serialized across processes.

mod store;

pub use store::FileSessionPersistence;
