//! Command-line interface for tasktrack
//!
//! This module defines the CLI structure using clap derive macros.
//! Commands are implemented in submodules grouped by area.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::Result;
use crate::output::OutputOptions;
use crate::repository::TaskRepository;

mod init;
mod report;
mod task;
mod transfer;

/// tasktrack - local task tracking
///
/// Keeps tasks in a JSON snapshot on disk and reports completion
/// statistics over them.
#[derive(Parser, Debug)]
#[command(name = "tasktrack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding the task snapshot (overrides the config file)
    #[arg(long, global = true, env = "TASKTRACK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Path to the config file (defaults to ./.tasktrack.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data directory, an empty snapshot and a default config
    Init,

    /// Create a task
    Add {
        /// Task title
        title: String,

        /// Longer description
        #[arg(short, long)]
        description: Option<String>,

        /// Initial status: pending, in-progress, completed
        #[arg(short, long)]
        status: Option<String>,

        /// Priority: low, medium, high
        #[arg(short, long)]
        priority: Option<String>,

        /// Due date (YYYY-MM-DD, YYYY-MM-DD HH:MM or ISO-8601)
        #[arg(long)]
        due: Option<String>,
    },

    /// Edit a task's fields
    Edit {
        /// Task id
        id: u64,

        /// New title
        #[arg(short, long)]
        title: Option<String>,

        /// New description
        #[arg(short, long, conflicts_with = "clear_description")]
        description: Option<String>,

        /// Remove the description
        #[arg(long)]
        clear_description: bool,

        /// New status: pending, in-progress, completed
        #[arg(short, long)]
        status: Option<String>,

        /// New priority: low, medium, high
        #[arg(short, long)]
        priority: Option<String>,

        /// New due date
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,

        /// Remove the due date
        #[arg(long)]
        clear_due: bool,
    },

    /// Mark a task as in progress
    Start {
        /// Task id
        id: u64,
    },

    /// Mark a task as completed
    Complete {
        /// Task id
        id: u64,
    },

    /// Set a task's status
    Status {
        /// Task id
        id: u64,

        /// New status: pending, in-progress, completed
        status: String,
    },

    /// Show one task
    Show {
        /// Task id
        id: u64,
    },

    /// List tasks
    List {
        /// Only tasks with this status
        #[arg(short, long)]
        status: Option<String>,

        /// Only tasks with this priority
        #[arg(short, long)]
        priority: Option<String>,

        /// Newest first by creation time
        #[arg(long)]
        recent: bool,

        /// Show at most this many tasks
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Delete a task
    Rm {
        /// Task id
        id: u64,
    },

    /// Delete every task
    Clear {
        /// Confirm deleting all tasks
        #[arg(long)]
        yes: bool,
    },

    /// Completion statistics over all tasks
    Stats,

    /// Recently created and completed tasks
    Activity {
        /// Number of entries (defaults to analytics.recent_activity_limit)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Write all tasks to a JSON or CSV file
    Export {
        /// Destination file (.json or .csv)
        path: PathBuf,

        /// Format, when it cannot be taken from the extension
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Append tasks from a JSON or CSV file
    Import {
        /// Source file (.json or .csv)
        path: PathBuf,

        /// Format, when it cannot be taken from the extension
        #[arg(short, long)]
        format: Option<String>,
    },
}

/// Flags shared by every command
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

impl GlobalOptions {
    pub fn output(&self) -> OutputOptions {
        OutputOptions {
            json: self.json,
            quiet: self.quiet,
        }
    }

    /// Resolve the effective config: file (if any), then flag overrides
    pub fn load_config(&self) -> Result<Config> {
        let cwd = std::env::current_dir()?;
        let mut config = match self.config.as_deref() {
            Some(path) => Config::load(path)?,
            None => Config::load_from_dir(&cwd)?,
        };
        if let Some(data_dir) = self.data_dir.as_ref() {
            config.storage.data_dir = data_dir.clone();
            config.validate()?;
        }
        Ok(config)
    }
}

pub(crate) struct Context {
    pub repository: TaskRepository,
    pub config: Config,
}

pub(crate) fn load_context(global: &GlobalOptions) -> Result<Context> {
    let config = global.load_config()?;
    let storage = config.storage(&std::env::current_dir()?);
    let repository = TaskRepository::open(storage, config.storage.lock_timeout_ms)?;
    Ok(Context { repository, config })
}

impl Cli {
    fn global(&self) -> GlobalOptions {
        GlobalOptions {
            data_dir: self.data_dir.clone(),
            config: self.config.clone(),
            json: self.json,
            quiet: self.quiet,
        }
    }

    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let global = self.global();
        match self.command {
            Commands::Init => init::run(global),
            Commands::Add { title, description, status, priority, due } => {
                task::run_add(task::AddOptions {
                    title,
                    description,
                    status,
                    priority,
                    due,
                    global,
                })
            }
            Commands::Edit {
                id,
                title,
                description,
                clear_description,
                status,
                priority,
                due,
                clear_due,
            } => task::run_edit(task::EditOptions {
                id,
                title,
                description,
                clear_description,
                status,
                priority,
                due,
                clear_due,
                global,
            }),
            Commands::Start { id } => task::run_set_status(task::StatusOptions {
                id,
                status: "in-progress".to_string(),
                command: "start",
                global,
            }),
            Commands::Complete { id } => task::run_set_status(task::StatusOptions {
                id,
                status: "completed".to_string(),
                command: "complete",
                global,
            }),
            Commands::Status { id, status } => task::run_set_status(task::StatusOptions {
                id,
                status,
                command: "status",
                global,
            }),
            Commands::Show { id } => task::run_show(task::ShowOptions { id, global }),
            Commands::List { status, priority, recent, limit } => {
                task::run_list(task::ListOptions {
                    status,
                    priority,
                    recent,
                    limit,
                    global,
                })
            }
            Commands::Rm { id } => task::run_rm(task::RmOptions { id, global }),
            Commands::Clear { yes } => task::run_clear(task::ClearOptions { yes, global }),
            Commands::Stats => report::run_stats(report::StatsOptions { global }),
            Commands::Activity { limit } => {
                report::run_activity(report::ActivityOptions { limit, global })
            }
            Commands::Export { path, format } => {
                transfer::run_export(transfer::ExportOptions { path, format, global })
            }
            Commands::Import { path, format } => {
                transfer::run_import(transfer::ImportOptions { path, format, global })
            }
        }
    }
}
