//! File-backed record store.
//!
//! The whole task collection lives in one JSON snapshot. Every mutation is
//! a full round trip: load the file, change the collection in memory,
//! rewrite the file. There is no append log and no in-place patching.
//!
//! Writers are serialized twice over: an in-process `RwLock` (readers share
//! it, so they never see a rewrite in flight) and an fs2 lock on
//! `<snapshot>.lock` for other processes using the same data directory.
//! Ids are allocated inside that critical section.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDateTime;
use tracing::debug;

use crate::allocator::{max_id, IdAllocator};
use crate::error::{Error, Result};
use crate::lock::{FileLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::storage::Storage;
use crate::task::{Task, TaskDraft, UNASSIGNED_ID};

#[derive(Debug)]
pub struct RecordStore {
    storage: Storage,
    allocator: IdAllocator,
    guard: RwLock<()>,
    lock_timeout_ms: u64,
    rewrites: AtomicU64,
}

impl RecordStore {
    /// Open the store at `path` (`data/tasks.json`), creating it if absent
    pub fn initialize(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::InvalidArgument(format!("not a file path: {}", path.display()))
            })?;
        let data_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => Path::new(".").to_path_buf(),
        };
        Self::open(Storage::new(data_dir, file_name), DEFAULT_LOCK_TIMEOUT_MS)
    }

    /// Open the snapshot managed by `storage`
    ///
    /// Creates the data directory and writes an empty collection when the
    /// snapshot does not exist yet, then seeds the id allocator from the
    /// highest id on disk.
    pub fn open(storage: Storage, lock_timeout_ms: u64) -> Result<Self> {
        storage.init()?;
        let tasks = {
            let _lock = FileLock::acquire(storage.lock_file(), lock_timeout_ms)?;
            if !storage.is_initialized() {
                debug!(path = %storage.tasks_file().display(), "creating empty snapshot");
                storage.write_json(&storage.tasks_file(), &Vec::<Task>::new())?;
            }
            read_snapshot(&storage)?
        };

        let allocator = IdAllocator::seeded_from(&tasks);
        debug!(
            path = %storage.tasks_file().display(),
            tasks = tasks.len(),
            last_id = allocator.current(),
            "opened record store"
        );

        Ok(Self {
            storage,
            allocator,
            guard: RwLock::new(()),
            lock_timeout_ms,
            rewrites: AtomicU64::new(0),
        })
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Last id allocated or seen on disk
    pub fn last_id(&self) -> u64 {
        self.allocator.current()
    }

    /// Number of snapshot rewrites performed through this handle
    pub fn rewrites(&self) -> u64 {
        self.rewrites.load(Ordering::SeqCst)
    }

    /// Load the full collection in stored order
    pub fn load_all(&self) -> Result<Vec<Task>> {
        let _read = self.read_guard();
        read_snapshot(&self.storage)
    }

    pub fn get_by_id(&self, id: u64) -> Result<Option<Task>> {
        Ok(self.load_all()?.into_iter().find(|task| task.id == id))
    }

    /// Replace the whole snapshot with `tasks`
    pub fn save_all(&self, tasks: &[Task]) -> Result<()> {
        let _write = self.write_guard();
        let _lock = FileLock::acquire(self.storage.lock_file(), self.lock_timeout_ms)?;
        validate_unique_ids(tasks)?;
        self.write_snapshot(tasks)
    }

    /// Locked load -> mutate -> save
    ///
    /// `mutator` sees the current collection; whatever it leaves behind is
    /// written back in one rewrite. An error from `mutator` aborts without
    /// writing.
    pub fn update_with<T, F>(&self, mutator: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<Task>, &IdAllocator) -> Result<T>,
    {
        let _write = self.write_guard();
        let _lock = FileLock::acquire(self.storage.lock_file(), self.lock_timeout_ms)?;

        let mut tasks = read_snapshot(&self.storage)?;
        // Another process may have written ids this handle never allocated.
        self.allocator.observe(max_id(&tasks));

        let result = mutator(&mut tasks, &self.allocator)?;
        validate_unique_ids(&tasks)?;
        self.write_snapshot(&tasks)?;
        Ok(result)
    }

    /// Persist a new task built from `draft`, assigning the next id
    pub fn insert(&self, draft: TaskDraft, now: NaiveDateTime) -> Result<Task> {
        self.update_with(|tasks, allocator| {
            let task = Task::from_draft(allocator.next(), draft, now);
            tasks.push(task.clone());
            Ok(task)
        })
    }

    /// Replace the record with the same id in place, or append it
    ///
    /// A task without an id is appended under a freshly allocated one.
    pub fn upsert(&self, mut task: Task) -> Result<Task> {
        self.update_with(|tasks, allocator| {
            if task.id == UNASSIGNED_ID {
                task.id = allocator.next();
                tasks.push(task.clone());
                return Ok(task);
            }

            match tasks.iter().position(|existing| existing.id == task.id) {
                Some(index) => tasks[index] = task.clone(),
                None => tasks.push(task.clone()),
            }
            Ok(task)
        })
    }

    /// Remove the record with `id`; returns whether one was removed
    pub fn delete(&self, id: u64) -> Result<bool> {
        self.update_with(|tasks, _| {
            let before = tasks.len();
            tasks.retain(|task| task.id != id);
            Ok(tasks.len() != before)
        })
    }

    fn write_snapshot(&self, tasks: &[Task]) -> Result<()> {
        self.allocator.observe(max_id(tasks));
        self.storage.write_json(&self.storage.tasks_file(), tasks)?;
        self.rewrites.fetch_add(1, Ordering::SeqCst);
        debug!(
            path = %self.storage.tasks_file().display(),
            tasks = tasks.len(),
            "rewrote snapshot"
        );
        Ok(())
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, ()> {
        // The guarded value is `()`, so a poisoned lock carries no bad state.
        self.guard.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, ()> {
        self.guard.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn read_snapshot(storage: &Storage) -> Result<Vec<Task>> {
    let path = storage.tasks_file();
    let tasks: Vec<Task> = storage.read_json(&path)?;
    if let Some(problem) = id_problem(&tasks) {
        return Err(Error::StorageCorruption {
            path,
            source: serde::de::Error::custom(problem),
        });
    }
    Ok(tasks)
}

fn validate_unique_ids(tasks: &[Task]) -> Result<()> {
    match id_problem(tasks) {
        Some(problem) => Err(Error::InvalidArgument(problem)),
        None => Ok(()),
    }
}

/// First missing or repeated id in `tasks`, described
fn id_problem(tasks: &[Task]) -> Option<String> {
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if task.id == UNASSIGNED_ID {
            return Some(format!("task '{}' has no id", task.title));
        }
        if !seen.insert(task.id) {
            return Some(format!("duplicate task id: {}", task.id));
        }
    }
    None
}
