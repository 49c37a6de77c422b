//! Location of the stored session.

use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use ballot_file::FileSessionPersistence;

/// Get the session file path.
pub fn session_path() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("", "", "ballot").context("Could not determine data directory")?;

    Ok(dirs.data_dir().join("session.json"))
}

/// File persistence for the stored session.
pub fn persistence() -> Result<FileSessionPersistence> {
    Ok(FileSessionPersistence::new(session_path()?))
}
