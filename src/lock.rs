//! Cross-process locking and atomic file replacement
//!
//! The record store rewrites its whole snapshot on every mutation. Two
//! pieces make that safe when more than one process points at the same
//! data directory:
//! - an exclusive advisory lock (fs2/flock) on a sibling `.lock` file,
//!   held for the whole load -> mutate -> save cycle
//! - an atomic write (temp file in the same directory + rename), so a
//!   reader never observes a half-written snapshot

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::{Error, Result};

/// Default lock timeout in milliseconds
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

/// Retry interval while waiting for a contended lock
const LOCK_RETRY_INTERVAL_MS: u64 = 25;

fn is_lock_contended(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::WouldBlock {
        return true;
    }

    // Windows reports sharing/lock violations as raw OS errors 32/33.
    #[cfg(windows)]
    {
        matches!(err.raw_os_error(), Some(32) | Some(33))
    }
    #[cfg(not(windows))]
    {
        false
    }
}

/// Path of the lock file guarding `path` (`tasks.json` -> `tasks.json.lock`)
pub fn lock_path_for(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.lock", path.display()))
}

fn open_lock_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| Error::storage_io(parent, err))?;
    }

    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|err| Error::storage_io(path, err))
}

/// An exclusive file lock, released on drop
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Acquire an exclusive lock, waiting at most `timeout_ms`
    ///
    /// The lock file is created if missing. Fails with `LockFailed` when
    /// another holder keeps the lock past the timeout.
    pub fn acquire(path: impl AsRef<Path>, timeout_ms: u64) -> Result<Self> {
        let path = path.as_ref();
        let file = open_lock_file(path)?;

        let start = Instant::now();
        let timeout = Duration::from_millis(timeout_ms);
        let retry_interval = Duration::from_millis(LOCK_RETRY_INTERVAL_MS);

        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    return Ok(FileLock {
                        file,
                        path: path.to_path_buf(),
                    });
                }
                Err(err) if is_lock_contended(&err) => {
                    if start.elapsed() >= timeout {
                        return Err(Error::LockFailed(path.to_path_buf()));
                    }
                    std::thread::sleep(retry_interval);
                }
                Err(err) => return Err(Error::storage_io(path, err)),
            }
        }
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Atomically replace `path` with `data`
///
/// Writes a temp file next to the target, syncs it and renames it over the
/// target. Does NOT take the lock; callers that race with other writers
/// must hold a `FileLock` first.
pub fn write_atomic(path: impl AsRef<Path>, data: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| Error::storage_io(parent, err))?;
    }

    // Same directory so the rename never crosses a filesystem.
    let temp_path = path.with_extension(format!(
        "{}.tmp.{}",
        path.extension().and_then(|e| e.to_str()).unwrap_or(""),
        std::process::id()
    ));

    let write = || -> io::Result<()> {
        let mut temp_file = File::create(&temp_path)?;
        temp_file.write_all(data)?;
        temp_file.sync_all()?;
        drop(temp_file);
        fs::rename(&temp_path, path)
    };

    write().map_err(|err| {
        let _ = fs::remove_file(&temp_path);
        Error::storage_io(path, err)
    })
}
