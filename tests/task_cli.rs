mod support;

use predicates::str::contains;
use serde_json::Value;

use support::TestDir;

#[test]
fn add_list_show_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TestDir::new()?;

    let created = dir.json(&[
        "add",
        "Write spec",
        "--description",
        "store and analytics",
        "--priority",
        "high",
        "--due",
        "2024-03-09 17:00",
    ]);
    assert_eq!(created["id"], 1);
    assert_eq!(created["status"], "PENDING");
    assert_eq!(created["priority"], "HIGH");
    assert_eq!(created["dueDate"], "2024-03-09T17:00:00");
    assert_eq!(created["createdAt"], created["updatedAt"]);

    assert_eq!(dir.add("Ship it"), 2);

    let list = dir.json(&["list"]);
    assert_eq!(list["total"], 2);
    assert_eq!(list["tasks"][0]["title"], "Write spec");

    let shown = dir.json(&["show", "1"]);
    assert_eq!(shown["description"], "store and analytics");

    let snapshot = dir.read_snapshot()?;
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[1]["title"], "Ship it");
    Ok(())
}

#[test]
fn list_filters_and_orders() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TestDir::new()?;
    dir.add("first");
    dir.add("second");
    dir.json(&["add", "third", "--priority", "low"]);
    dir.json(&["start", "2"]);

    let in_progress = dir.json(&["list", "--status", "in-progress"]);
    assert_eq!(in_progress["total"], 1);
    assert_eq!(in_progress["tasks"][0]["id"], 2);

    let low = dir.json(&["list", "--priority", "low"]);
    assert_eq!(low["tasks"][0]["title"], "third");

    let recent = dir.json(&["list", "--recent", "--limit", "1"]);
    assert_eq!(recent["total"], 1);
    assert_eq!(recent["tasks"][0]["title"], "third");
    Ok(())
}

#[test]
fn edit_overwrites_fields_and_keeps_identity() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TestDir::new()?;
    let id = dir.add("Draft");
    let before = dir.json(&["show", &id.to_string()]);

    let edited = dir.json(&[
        "edit",
        &id.to_string(),
        "--title",
        "Final",
        "--description",
        "done right",
        "--priority",
        "high",
    ]);

    assert_eq!(edited["id"], before["id"]);
    assert_eq!(edited["createdAt"], before["createdAt"]);
    assert_ne!(edited["updatedAt"], before["updatedAt"]);
    assert_eq!(edited["title"], "Final");
    assert_eq!(edited["description"], "done right");
    assert_eq!(edited["priority"], "HIGH");

    let cleared = dir.json(&["edit", &id.to_string(), "--clear-description"]);
    assert!(cleared.get("description").is_none());
    assert_eq!(cleared["title"], "Final");
    Ok(())
}

#[test]
fn complete_then_reopen_keeps_completion_time() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TestDir::new()?;
    let id = dir.add("Loop").to_string();

    let completed = dir.json(&["complete", &id]);
    assert_eq!(completed["status"], "COMPLETED");
    let completed_at = completed["completedAt"].clone();
    assert!(completed_at.is_string());

    let reopened = dir.json(&["status", &id, "in-progress"]);
    assert_eq!(reopened["status"], "IN_PROGRESS");
    assert_eq!(reopened["completedAt"], completed_at);
    Ok(())
}

#[test]
fn rm_is_idempotent_and_clear_needs_confirmation() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TestDir::new()?;
    let id = dir.add("Gone").to_string();
    dir.add("Also gone");

    assert_eq!(dir.json(&["rm", &id])["removed"], true);
    assert_eq!(dir.json(&["rm", &id])["removed"], false);

    dir.cmd()
        .arg("clear")
        .assert()
        .code(2)
        .stderr(contains("--yes"));
    assert_eq!(dir.read_snapshot()?.len(), 1);

    assert_eq!(dir.json(&["clear", "--yes"])["removed"], 1);
    assert!(dir.read_snapshot()?.is_empty());

    // A new process seeds its allocator from the now empty snapshot.
    assert_eq!(dir.add("Fresh"), 1);
    Ok(())
}

#[test]
fn blank_title_is_a_validation_error() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TestDir::new()?;

    let output = dir
        .cmd()
        .args(["add", "   ", "--json"])
        .assert()
        .code(2)
        .get_output()
        .stdout
        .clone();
    let value: Value = serde_json::from_slice(&output)?;
    assert_eq!(value["status"], "error");
    assert_eq!(value["command"], "add");
    assert_eq!(value["error"]["kind"], "validation");
    assert!(dir.read_snapshot()?.is_empty());
    Ok(())
}

#[test]
fn unknown_id_is_not_found() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TestDir::new()?;

    let output = dir
        .cmd()
        .args(["complete", "42", "--json"])
        .assert()
        .code(2)
        .get_output()
        .stdout
        .clone();
    let value: Value = serde_json::from_slice(&output)?;
    assert_eq!(value["error"]["kind"], "not_found");
    assert_eq!(value["error"]["details"]["id"], 42);
    assert_eq!(value["next_steps"][0], "tasktrack list");

    dir.cmd()
        .args(["show", "42"])
        .assert()
        .code(2)
        .stderr(contains("Task not found: 42"));
    Ok(())
}

#[test]
fn invalid_status_argument_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TestDir::new()?;
    let id = dir.add("Task").to_string();

    dir.cmd()
        .args(["status", &id, "someday"])
        .assert()
        .code(2)
        .stderr(contains("unknown task status"));
    Ok(())
}

#[test]
fn corrupt_snapshot_fails_with_operation_error() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TestDir::new()?;
    dir.write_file("data/tasks.json", "{ not json")?;

    dir.cmd()
        .arg("list")
        .assert()
        .code(4)
        .stderr(contains("is corrupt"));
    Ok(())
}

#[test]
fn duplicate_ids_on_disk_fail_with_operation_error() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TestDir::new()?;
    dir.write_file(
        "data/tasks.json",
        r#"[
  {"id": 2, "title": "a", "createdAt": "2024-03-01T09:30:00", "updatedAt": "2024-03-01T09:30:00"},
  {"id": 2, "title": "b", "createdAt": "2024-03-01T09:30:00", "updatedAt": "2024-03-01T09:30:00"}
]"#,
    )?;

    dir.cmd()
        .args(["add", "third"])
        .assert()
        .code(4)
        .stderr(contains("duplicate task id: 2"));
    Ok(())
}

#[test]
fn quiet_suppresses_human_output() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TestDir::new()?;

    dir.cmd()
        .args(["add", "Silent", "--quiet"])
        .assert()
        .success()
        .stdout("");
    assert_eq!(dir.read_snapshot()?.len(), 1);
    Ok(())
}
