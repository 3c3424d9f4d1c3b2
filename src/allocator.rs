//! Task id allocation.
//!
//! The counter lives only in memory. It is reseeded from the highest id in
//! the snapshot every time a store is opened, so nothing besides the
//! snapshot itself has to survive a restart.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::task::Task;

#[derive(Debug, Default)]
pub struct IdAllocator {
    current: AtomicU64,
}

impl IdAllocator {
    /// Allocator whose next id is `last + 1`
    pub fn starting_after(last: u64) -> Self {
        Self {
            current: AtomicU64::new(last),
        }
    }

    /// Seed from the maximum id present in `tasks` (0 when empty)
    pub fn seeded_from(tasks: &[Task]) -> Self {
        Self::starting_after(max_id(tasks))
    }

    /// Hand out the next id
    pub fn next(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Make sure `id` is never handed out again
    pub fn observe(&self, id: u64) {
        self.current.fetch_max(id, Ordering::SeqCst);
    }

    /// Last id handed out or observed
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}

pub fn max_id(tasks: &[Task]) -> u64 {
    tasks.iter().map(|task| task.id).max().unwrap_or(0)
}
