mod support;

use std::collections::HashSet;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tasktrack::error::Error;
use tasktrack::lock::FileLock;
use tasktrack::storage::Storage;
use tasktrack::task::{now, Task, TaskDraft, TaskStatus};
use tasktrack::{RecordStore, TaskRepository};
use tempfile::TempDir;

use support::TestDir;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(25);
const READY_TIMEOUT: Duration = Duration::from_secs(5);

fn open_repo(data_dir: &PathBuf) -> Result<TaskRepository, Error> {
    TaskRepository::open(Storage::for_dir(data_dir), 5000)
}

#[test]
fn next_id_follows_highest_persisted_id() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let data_dir = dir.path().join("data");
    std::fs::create_dir_all(&data_dir)?;
    let tasks: Vec<Task> = [3, 7, 1]
        .into_iter()
        .map(|id| Task::from_draft(id, TaskDraft::new(format!("task {id}")), now()))
        .collect();
    std::fs::write(
        data_dir.join("tasks.json"),
        serde_json::to_string_pretty(&tasks)?,
    )?;

    let repo = open_repo(&data_dir)?;
    let created = repo.create(TaskDraft::new("next"))?;
    assert_eq!(created.id, 8);
    Ok(())
}

#[test]
fn restart_keeps_ids_increasing() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let data_dir = dir.path().join("data");

    let first_run: Vec<u64> = {
        let repo = open_repo(&data_dir)?;
        (0..5)
            .map(|n| repo.create(TaskDraft::new(format!("t{n}"))).map(|task| task.id))
            .collect::<Result<_, _>>()?
    };

    let repo = open_repo(&data_dir)?;
    repo.delete(2)?;
    let after_restart = repo.create(TaskDraft::new("later"))?;

    assert!(first_run.iter().all(|id| after_restart.id > *id));
    let ids: HashSet<u64> = repo.list()?.iter().map(|task| task.id).collect();
    assert_eq!(ids.len(), 5);
    Ok(())
}

#[test]
fn completion_and_edit_survive_restart() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let data_dir = dir.path().join("data");

    let task = {
        let repo = open_repo(&data_dir)?;
        let task = repo.create(TaskDraft::new("persist me"))?;
        repo.set_status(task.id, TaskStatus::Completed)?
    };

    let repo = open_repo(&data_dir)?;
    let loaded = repo.get(task.id)?;
    assert_eq!(loaded, task);
    assert!(loaded.completed_at.is_some_and(|at| at >= loaded.created_at));
    Ok(())
}

#[test]
fn parallel_handles_on_one_snapshot_lose_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let data_dir = Arc::new(dir.path().join("data"));
    RecordStore::open(Storage::for_dir(data_dir.as_path()), 5000)?;

    let mut handles = Vec::new();
    for worker in 0..4 {
        let data_dir = Arc::clone(&data_dir);
        handles.push(thread::spawn(move || -> Result<Vec<u64>, Error> {
            // A separate handle per thread behaves like a separate process.
            let repo = open_repo(&data_dir)?;
            (0..15)
                .map(|n| {
                    repo.create(TaskDraft::new(format!("w{worker}-{n}")))
                        .map(|task| task.id)
                })
                .collect()
        }));
    }

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.join().expect("join thread")? {
            assert!(seen.insert(id), "duplicate id {id}");
        }
    }

    let repo = open_repo(&data_dir)?;
    assert_eq!(repo.count()?, 60);
    Ok(())
}

#[test]
fn parallel_cli_adds_are_all_persisted() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TestDir::new()?;
    let count = 6;

    let mut handles = Vec::new();
    for idx in 0..count {
        let mut cmd = dir.cmd();
        cmd.args(["add", &format!("parallel {idx}"), "--quiet"]);
        handles.push(thread::spawn(move || cmd.output()));
    }
    for handle in handles {
        let output = handle.join().expect("join thread")?;
        assert!(
            output.status.success(),
            "stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    let snapshot = dir.read_snapshot()?;
    assert_eq!(snapshot.len(), count);
    let ids: HashSet<u64> = snapshot
        .iter()
        .filter_map(|task| task["id"].as_u64())
        .collect();
    assert_eq!(ids, (1..=count as u64).collect());
    Ok(())
}

#[test]
fn lock_helper_process() {
    if std::env::var("TASKTRACK_LOCK_HELPER").ok().as_deref() != Some("1") {
        return;
    }

    let path = std::env::var("TASKTRACK_LOCK_PATH").expect("TASKTRACK_LOCK_PATH");
    let ready = std::env::var("TASKTRACK_LOCK_READY").expect("TASKTRACK_LOCK_READY");

    let _lock = FileLock::acquire(&path, 5000).expect("lock helper acquire");
    std::fs::write(&ready, "ready").expect("ready write");
    thread::sleep(Duration::from_secs(2));
}

#[test]
fn writes_time_out_while_another_process_holds_the_lock(
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let storage = Storage::for_dir(dir.path().join("data"));
    let store = RecordStore::open(storage.clone(), 100)?;
    let ready_path = dir.path().join("ready");

    let mut child = Command::new(std::env::current_exe()?)
        .args(["--exact", "lock_helper_process", "--nocapture"])
        .env("TASKTRACK_LOCK_HELPER", "1")
        .env("TASKTRACK_LOCK_PATH", storage.lock_file().display().to_string())
        .env("TASKTRACK_LOCK_READY", ready_path.display().to_string())
        .spawn()?;

    let start = Instant::now();
    while !ready_path.exists() {
        if start.elapsed() > READY_TIMEOUT {
            let _ = child.kill();
            return Err("lock helper not ready".into());
        }
        thread::sleep(READY_POLL_INTERVAL);
    }

    match store.insert(TaskDraft::new("blocked"), now()) {
        Ok(_) => return Err("expected lock timeout".into()),
        Err(err) => assert!(matches!(err, Error::LockFailed(_))),
    }
    // Readers are not blocked by another process's write lock.
    assert!(store.load_all()?.is_empty());

    child.wait()?;
    store.insert(TaskDraft::new("after"), now())?;
    assert_eq!(store.load_all()?.len(), 1);
    Ok(())
}
