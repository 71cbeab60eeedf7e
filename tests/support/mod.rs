#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// Isolated questlog data directory for CLI tests.
pub struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// `questlog` pointed at this data dir with the clock pinned to `now`.
    pub fn cmd_at(&self, now: &str) -> Command {
        let mut cmd = Command::cargo_bin("questlog").expect("binary");
        cmd.env("QUESTLOG_DIR", self.dir.path())
            .env("QUESTLOG_NOW", now)
            .env_remove("QUESTLOG_EVENTS")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Run a successful `--json` command and return its `data` payload.
    pub fn json_at(&self, now: &str, args: &[&str]) -> Value {
        let output = self
            .cmd_at(now)
            .arg("--json")
            .args(args)
            .output()
            .expect("run questlog");
        assert!(
            output.status.success(),
            "questlog {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        let envelope: Value = serde_json::from_slice(&output.stdout).expect("json envelope");
        assert_eq!(envelope["status"], "success");
        envelope["data"].clone()
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&path, contents).expect("write file");
        path
    }

    pub fn read_json(&self, rel_path: &str) -> Value {
        let contents = fs::read_to_string(self.dir.path().join(rel_path)).expect("read file");
        serde_json::from_str(&contents).expect("parse json")
    }

    pub fn progress(&self) -> Value {
        self.read_json("progress.json")
    }

    /// Add a task and return its full id.
    pub fn add_task(&self, now: &str, text: &str) -> String {
        let data = self.json_at(now, &["add", text]);
        data["task"]["id"].as_str().expect("task id").to_string()
    }
}
