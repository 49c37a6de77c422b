//! JSON file storage for the session record.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use fs2::FileExt;
use tracing::{debug, instrument};

use ballot_core::error::StorageError;
use ballot_core::{PersistedSession, SessionPersistence};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// How often, and how long apart, to retry a contended lock (one second total).
const LOCK_ATTEMPTS: u32 = 50;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy)]
enum LockKind {
    Shared,
    Exclusive,
}

/// Take `kind` on `file`, giving up after [`LOCK_ATTEMPTS`] contended tries.
///
/// Callers run on async runtime threads, so the wait has to stay short.
fn acquire(file: &File, kind: LockKind) -> Result<(), StorageError> {
    let contended = fs2::lock_contended_error();
    for _ in 0..LOCK_ATTEMPTS {
        let attempt = match kind {
            LockKind::Shared => FileExt::try_lock_shared(file),
            LockKind::Exclusive => FileExt::try_lock_exclusive(file),
        };
        match attempt {
            Ok(()) => return Ok(()),
            Err(e) if e.raw_os_error() == contended.raw_os_error() => {
                thread::sleep(LOCK_RETRY_DELAY);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(StorageError::Io {
        message: "timed out waiting for the session lock".to_string(),
    })
}

fn corrupt(err: serde_json::Error) -> StorageError {
    StorageError::Corrupt {
        message: err.to_string(),
    }
}

/// Stores the session record as JSON at a fixed path.
///
/// A sibling `.lock` file serializes access between processes sharing the
/// same record (two CLI invocations, say). Saves go to a temporary file
/// that is renamed into place, so a crash never leaves a half-written
/// record behind. On Unix the record is readable by its owner only.
#[derive(Debug, Clone)]
pub struct FileSessionPersistence {
    path: PathBuf,
}

impl FileSessionPersistence {
    /// Store the record at `path`. Parent directories are created on save.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the session record.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("tmp")
    }

    fn open_lock(&self) -> Result<File, StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;
        Ok(file)
    }
}

impl SessionPersistence for FileSessionPersistence {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn load(&self) -> Result<Option<PersistedSession>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let lock = self.open_lock()?;
        acquire(&lock, LockKind::Shared)?;

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            // Cleared between the existence check and taking the lock.
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        lock.unlock()?;

        let record: PersistedSession = serde_json::from_str(&content).map_err(corrupt)?;
        debug!(mode = ?record.mode, "Loaded session record");
        Ok(Some(record))
    }

    #[instrument(skip(self, record), fields(path = %self.path.display()))]
    fn save(&self, record: &PersistedSession) -> Result<(), StorageError> {
        let content = serde_json::to_string_pretty(record).map_err(corrupt)?;

        let lock = self.open_lock()?;
        acquire(&lock, LockKind::Exclusive)?;

        let temp_path = self.temp_path();
        let mut file = File::create(&temp_path)?;

        #[cfg(unix)]
        {
            let mut perms = file.metadata()?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&temp_path, perms)?;
        }

        file.write_all(content.as_bytes())?;
        file.sync_data()?;
        drop(file);
        fs::rename(&temp_path, &self.path)?;

        lock.unlock()?;

        debug!(mode = ?record.mode, "Saved session record");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn clear(&self) -> Result<(), StorageError> {
        let lock = self.open_lock()?;
        acquire(&lock, LockKind::Exclusive)?;

        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed session record"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        lock.unlock()?;
        Ok(())
    }
}
