//! Storage layout for tasktrack
//!
//! All persistent state lives in one data directory:
//!
//! ```text
//! data/                  # configurable, see `[storage] data_dir`
//!   tasks.json           # snapshot: the full task collection
//!   tasks.json.lock      # advisory lock guarding snapshot rewrites
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};
use crate::lock;

/// Default data directory, relative to the working directory
pub const DEFAULT_DATA_DIR: &str = "data";

/// Default snapshot file name
pub const DEFAULT_TASKS_FILE: &str = "tasks.json";

/// Storage manager for the data directory
#[derive(Debug, Clone)]
pub struct Storage {
    /// Directory holding the snapshot and its lock file
    data_dir: PathBuf,
    /// File name of the snapshot within `data_dir`
    tasks_file: String,
}

impl Storage {
    pub fn new(data_dir: impl Into<PathBuf>, tasks_file: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            tasks_file: tasks_file.into(),
        }
    }

    /// Storage in `data_dir` with the default snapshot file name
    pub fn for_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self::new(data_dir, DEFAULT_TASKS_FILE)
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path to the snapshot file
    pub fn tasks_file(&self) -> PathBuf {
        self.data_dir.join(&self.tasks_file)
    }

    /// Path to the lock file guarding the snapshot
    pub fn lock_file(&self) -> PathBuf {
        lock::lock_path_for(&self.tasks_file())
    }

    // =========================================================================
    // Directory initialization
    // =========================================================================

    /// Create the data directory if needed
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir).map_err(|err| Error::storage_io(&self.data_dir, err))
    }

    pub fn is_initialized(&self) -> bool {
        self.tasks_file().exists()
    }

    // =========================================================================
    // File I/O helpers
    // =========================================================================

    /// Serialize `data` as pretty JSON and replace `path` atomically
    pub fn write_json<T: Serialize + ?Sized>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        lock::write_atomic(path, json.as_bytes())
    }

    /// Read `path` into a string, mapping failures to `StorageIo`
    pub fn read_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|err| Error::storage_io(path, err))
    }

    /// Read and parse JSON; parse failures surface as `StorageCorruption`
    ///
    /// An empty or whitespace-only file yields `T::default()`.
    pub fn read_json<T: DeserializeOwned + Default>(&self, path: &Path) -> Result<T> {
        let content = self.read_string(path)?;
        if content.trim().is_empty() {
            return Ok(T::default());
        }
        serde_json::from_str(&content).map_err(|source| Error::StorageCorruption {
            path: path.to_path_buf(),
            source,
        })
    }
}
