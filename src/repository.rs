//! Task repository.
//!
//! Translates task intents (create, edit, change status, import) into
//! record store round trips. Holds no state between calls besides the store
//! handle and the clock used to stamp timestamps.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::info;

use crate::error::{Error, Result};
use crate::storage::Storage;
use crate::store::RecordStore;
use crate::task::{self, sort_recent, Task, TaskDraft, TaskStatus};

/// Source of "now" for timestamps
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

pub struct TaskRepository {
    store: RecordStore,
    clock: Clock,
}

impl fmt::Debug for TaskRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRepository")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl TaskRepository {
    pub fn new(store: RecordStore) -> Self {
        Self::with_clock(store, Arc::new(task::now))
    }

    pub fn with_clock(store: RecordStore, clock: Clock) -> Self {
        Self { store, clock }
    }

    /// Open (and create if needed) the snapshot managed by `storage`
    pub fn open(storage: Storage, lock_timeout_ms: u64) -> Result<Self> {
        Ok(Self::new(RecordStore::open(storage, lock_timeout_ms)?))
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    // =========================================================================
    // Writes
    // =========================================================================

    pub fn create(&self, draft: TaskDraft) -> Result<Task> {
        draft.validate()?;
        self.store.insert(draft, self.now())
    }

    /// Overwrite the editable fields of task `id` with `patch`
    pub fn update(&self, id: u64, patch: TaskDraft) -> Result<Task> {
        patch.validate()?;
        let now = self.now();
        self.store.update_with(|tasks, _| {
            let task = find_mut(tasks, id)?;
            task.apply_patch(patch, now);
            Ok(task.clone())
        })
    }

    pub fn set_status(&self, id: u64, status: TaskStatus) -> Result<Task> {
        let now = self.now();
        self.store.update_with(|tasks, _| {
            let task = find_mut(tasks, id)?;
            task.transition(status, now);
            Ok(task.clone())
        })
    }

    /// Remove task `id`; unknown ids are not an error
    pub fn delete(&self, id: u64) -> Result<bool> {
        self.store.delete(id)
    }

    /// Empty the collection in one rewrite; returns how many were removed
    pub fn delete_all(&self) -> Result<usize> {
        let removed = self.store.update_with(|tasks, _| {
            let removed = tasks.len();
            tasks.clear();
            Ok(removed)
        })?;
        info!(removed, "cleared all tasks");
        Ok(removed)
    }

    /// Append `batch` in one rewrite, renumbering every record
    ///
    /// Ids carried by the batch are ignored: each record gets the next
    /// allocator value in batch order. A blank title anywhere rejects the
    /// whole batch before the store is touched.
    pub fn import_batch(&self, batch: Vec<Task>) -> Result<Vec<Task>> {
        for (index, task) in batch.iter().enumerate() {
            if task.title.trim().is_empty() {
                return Err(Error::Import(format!(
                    "record {}: title is required",
                    index + 1
                )));
            }
        }
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let imported = self.store.update_with(|tasks, allocator| {
            let mut imported = Vec::with_capacity(batch.len());
            for mut task in batch {
                task.id = allocator.next();
                task.normalize_imported();
                tasks.push(task.clone());
                imported.push(task);
            }
            Ok(imported)
        })?;
        info!(count = imported.len(), "imported tasks");
        Ok(imported)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// All tasks in stored order
    pub fn list(&self) -> Result<Vec<Task>> {
        self.store.load_all()
    }

    /// All tasks, newest first by creation time
    pub fn list_recent(&self) -> Result<Vec<Task>> {
        let mut tasks = self.list()?;
        sort_recent(&mut tasks);
        Ok(tasks)
    }

    pub fn get_by_id(&self, id: u64) -> Result<Option<Task>> {
        self.store.get_by_id(id)
    }

    /// Like `get_by_id`, but an unknown id is `NotFound`
    pub fn get(&self, id: u64) -> Result<Task> {
        self.get_by_id(id)?.ok_or(Error::NotFound(id))
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.list()?.len())
    }
}

fn find_mut(tasks: &mut [Task], id: u64) -> Result<&mut Task> {
    tasks
        .iter_mut()
        .find(|task| task.id == id)
        .ok_or(Error::NotFound(id))
}
