//! tasktrack init command implementation
//!
//! Creates the data directory, an empty snapshot and `.tasktrack.toml`.

use std::path::PathBuf;

use crate::cli::GlobalOptions;
use crate::config::{Config, CONFIG_FILE};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::store::RecordStore;

#[derive(serde::Serialize)]
struct InitReport {
    data_dir: PathBuf,
    tasks_file: PathBuf,
    tasks: usize,
    created: InitCreated,
}

#[derive(serde::Serialize)]
struct InitCreated {
    config: bool,
    snapshot: bool,
}

pub fn run(global: GlobalOptions) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let config_path = global
        .config
        .clone()
        .unwrap_or_else(|| cwd.join(CONFIG_FILE));
    let created_config = !config_path.exists();
    let config = if created_config {
        let mut config = Config::default();
        if let Some(data_dir) = global.data_dir.as_ref() {
            config.storage.data_dir = data_dir.clone();
        }
        config.validate()?;
        config.save(&config_path)?;
        config
    } else {
        global.load_config()?
    };

    let storage = config.storage(&cwd);
    let created_snapshot = !storage.is_initialized();
    let store = RecordStore::open(storage, config.storage.lock_timeout_ms)?;
    let tasks = store.load_all()?.len();

    let report = InitReport {
        data_dir: store.storage().data_dir().to_path_buf(),
        tasks_file: store.storage().tasks_file(),
        tasks,
        created: InitCreated {
            config: created_config,
            snapshot: created_snapshot,
        },
    };

    let mut created_items = Vec::new();
    if created_config {
        created_items.push(config_path.display().to_string());
    }
    if created_snapshot {
        created_items.push(report.tasks_file.display().to_string());
    }

    let header = if created_items.is_empty() {
        "tasktrack init: nothing to do".to_string()
    } else {
        "tasktrack init: initialized".to_string()
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("data dir", report.data_dir.display().to_string());
    human.push_summary("tasks", tasks.to_string());
    human.push_summary(
        "created",
        if created_items.is_empty() {
            "none".to_string()
        } else {
            created_items.join(", ")
        },
    );
    human.push_next_step("tasktrack add \"<title>\"");

    emit_success(global.output(), "init", &report, Some(&human))
}
