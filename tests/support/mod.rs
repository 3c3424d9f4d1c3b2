#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// Scratch working directory for one test, removed on drop
pub struct TestDir {
    dir: TempDir,
}

impl TestDir {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    pub fn tasks_file(&self) -> PathBuf {
        self.data_dir().join("tasks.json")
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        self.write_file(".tasktrack.toml", contents)
    }

    /// Raw snapshot records as JSON values
    pub fn read_snapshot(&self) -> Result<Vec<Value>, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(self.tasks_file())?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// `tasktrack` running inside this directory
    pub fn cmd(&self) -> Command {
        let mut cmd = tasktrack_cmd();
        cmd.current_dir(self.path());
        cmd
    }

    /// Run `args` with `--json` and return the envelope's `data`
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let value: Value = serde_json::from_slice(&output).expect("json envelope");
        assert_eq!(value["status"], "success");
        value["data"].clone()
    }

    /// Create a task and return its id
    pub fn add(&self, title: &str) -> u64 {
        self.json(&["add", title])["id"].as_u64().expect("task id")
    }
}

pub fn tasktrack_cmd() -> Command {
    let mut cmd = Command::cargo_bin("tasktrack").expect("binary");
    cmd.env_remove("TASKTRACK_DATA_DIR").env_remove("RUST_LOG");
    cmd
}
