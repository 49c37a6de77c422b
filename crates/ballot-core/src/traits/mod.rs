//! Seams between the pipeline and its collaborators.

mod persistence;
mod redirect;
mod transport;

pub use persistence::SessionPersistence;
pub use redirect::{LoginRedirect, RedirectReason};
pub use transport::Transport;
