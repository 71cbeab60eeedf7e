//! Storage layer for questlog
//!
//! Everything lives in one data directory:
//!
//! ```text
//! <data dir>/
//!   questlog.toml       # Optional configuration
//!   progress.json       # Progression state (XP, level, streak, badges)
//!   progress.json.lock  # Lock file guarding progress.json writes
//!   tasks.json          # Task list
//!   tasks.json.lock     # Lock file guarding tasks.json writes
//!   questlog.lock       # Held for a whole command (load, update, save)
//! ```
//!
//! The default directory comes from the platform data dir
//! (`~/.local/share/questlog` on Linux); `--data-dir` or `QUESTLOG_DIR`
//! override it.

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::lock::{self, DEFAULT_LOCK_TIMEOUT};
use crate::state::ProgressionState;

/// Fallback directory when the platform gives us no data dir
pub const LOCAL_DIR: &str = ".questlog";

pub const CONFIG_FILE: &str = "questlog.toml";
const PROGRESS_FILE: &str = "progress.json";
const TASKS_FILE: &str = "tasks.json";
const SESSION_LOCK_FILE: &str = "questlog.lock";

/// Resolve the data directory: explicit path first, platform default second.
pub fn resolve_data_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    ProjectDirs::from("", "", "questlog")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(LOCAL_DIR))
}

/// Storage manager for questlog state
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn progress_file(&self) -> PathBuf {
        self.root.join(PROGRESS_FILE)
    }

    pub fn tasks_file(&self) -> PathBuf {
        self.root.join(TASKS_FILE)
    }

    /// Held by a CLI session from load to final save.
    pub fn session_lock_file(&self) -> PathBuf {
        self.root.join(SESSION_LOCK_FILE)
    }

    // =========================================================================
    // File I/O helpers (atomic, locked writes)
    // =========================================================================

    /// Write JSON atomically while holding the file's lock.
    pub fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        lock::write_locked(path, json.as_bytes(), DEFAULT_LOCK_TIMEOUT)
    }

    /// Read and decode JSON; `Ok(None)` when the file does not exist.
    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = lock::read_locked(path, DEFAULT_LOCK_TIMEOUT)?;
        Ok(Some(serde_json::from_str(&content)?))
    }
}

/// Where the engine keeps its state between sessions.
///
/// `load` hands back the raw JSON so the engine can apply field-by-field
/// defaults; a missing record is `Ok(None)`.
pub trait ProgressStore {
    fn load(&self) -> Result<Option<Value>>;
    fn save(&self, state: &ProgressionState) -> Result<()>;
}

impl ProgressStore for Storage {
    fn load(&self) -> Result<Option<Value>> {
        self.read_json(&self.progress_file())
    }

    fn save(&self, state: &ProgressionState) -> Result<()> {
        self.write_json(&self.progress_file(), state)
    }
}

impl<S: ProgressStore + ?Sized> ProgressStore for &S {
    fn load(&self) -> Result<Option<Value>> {
        (**self).load()
    }

    fn save(&self, state: &ProgressionState) -> Result<()> {
        (**self).save(state)
    }
}

/// In-process store for tests and embedding. Writes can be made to fail.
#[derive(Debug, Default)]
pub struct MemoryStore {
    record: RefCell<Option<Value>>,
    fail_writes: Cell<bool>,
    fail_reads: Cell<bool>,
    saves: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a raw persisted record.
    pub fn with_record(record: Value) -> Self {
        let store = Self::default();
        store.record.replace(Some(record));
        store
    }

    pub fn record(&self) -> Option<Value> {
        self.record.borrow().clone()
    }

    pub fn saves(&self) -> usize {
        self.saves.get()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.set(fail);
    }
}

impl ProgressStore for MemoryStore {
    fn load(&self) -> Result<Option<Value>> {
        if self.fail_reads.get() {
            return Err(Error::OperationFailed("memory store read refused".to_string()));
        }
        Ok(self.record())
    }

    fn save(&self, state: &ProgressionState) -> Result<()> {
        if self.fail_writes.get() {
            return Err(Error::OperationFailed("memory store write refused".to_string()));
        }
        self.record.replace(Some(serde_json::to_value(state)?));
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}
