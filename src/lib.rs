//! tasktrack - file-backed task tracking
//!
//! Tasks live in a single JSON snapshot that is rewritten in full on every
//! change. On top of the store sit a repository for task intents and a set
//! of analytics over the live collection.
//!
//! # Module Organization
//!
//! - `task`: Task model, status/priority enums, drafts and timestamps
//! - `allocator`: In-memory id allocation seeded from the snapshot
//! - `store`: Record store (locked load -> mutate -> save)
//! - `repository`: Create/edit/status/delete/import operations
//! - `analytics`: Counts, completion rate, averages, recent activity
//! - `transfer`: JSON and CSV export/import codec
//! - `config`: Configuration loading from `.tasktrack.toml`
//! - `storage`: Data directory layout and JSON helpers
//! - `lock`: File locking and atomic writes
//! - `output`: CLI output envelope
//! - `cli`: Command-line interface using clap
//! - `error`: Error types and result aliases

pub mod allocator;
pub mod analytics;
pub mod cli;
pub mod config;
pub mod error;
pub mod lock;
pub mod output;
pub mod repository;
pub mod storage;
pub mod store;
pub mod task;
pub mod transfer;

pub use error::{Error, Result};
pub use repository::TaskRepository;
pub use store::RecordStore;
pub use task::{Task, TaskDraft, TaskPriority, TaskStatus};
