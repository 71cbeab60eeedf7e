//! File locking and atomic writes
//!
//! Two `questlog` processes (say, a shell alias and a status-bar widget) may
//! touch the same data directory. Each single read or write of a data file
//! goes through [`with_lock`], which holds an exclusive `fs2` lock on the
//! sibling `<file>.lock`. Writes land in a temp file that is renamed into
//! place, so readers never observe a half-written record.
//!
//! Per-file locks alone do not make a load, update, save cycle atomic. A CLI
//! session additionally holds a [`LockGuard`] on the data directory's
//! `questlog.lock` for its whole lifetime, which serializes whole commands.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::{Error, Result};

/// How long a command waits for another process to release a data file.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

const RETRY_INTERVAL: Duration = Duration::from_millis(25);

/// Exclusive hold on a `.lock` file; released when dropped.
#[derive(Debug)]
pub struct LockGuard {
    handle: File,
    path: PathBuf,
}

impl LockGuard {
    /// Poll for the lock until `timeout` runs out.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self> {
        let started = Instant::now();
        loop {
            if let Some(guard) = Self::try_acquire(path)? {
                return Ok(guard);
            }
            if started.elapsed() >= timeout {
                tracing::warn!(path = %path.display(), ?timeout, "lock wait timed out");
                return Err(Error::LockFailed(path.to_path_buf()));
            }
            thread::sleep(RETRY_INTERVAL);
        }
    }

    /// Single attempt; `Ok(None)` while another holder has it.
    pub fn try_acquire(path: &Path) -> Result<Option<Self>> {
        let handle = open_for_locking(path)?;
        match handle.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self {
                handle,
                path: path.to_path_buf(),
            })),
            Err(err) if held_elsewhere(&err) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(err) = self.handle.unlock() {
            tracing::debug!(path = %self.path.display(), error = %err, "unlock failed");
        }
    }
}

/// `progress.json` is guarded by `progress.json.lock`.
pub fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Run `f` while holding the lock that guards `path`.
pub fn with_lock<T>(path: &Path, timeout: Duration, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let _guard = LockGuard::acquire(&lock_path_for(path), timeout)?;
    f()
}

/// Replace `path` with `data` through a temp file in the same directory.
/// Takes no lock.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    let staging = staging_path(path);
    {
        let mut out = File::create(&staging)?;
        out.write_all(data)?;
        out.sync_all()?;
    }
    if let Err(err) = fs::rename(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(err.into());
    }
    Ok(())
}

/// Atomic replace under the file's lock.
pub fn write_locked(path: &Path, data: &[u8], timeout: Duration) -> Result<()> {
    with_lock(path, timeout, || write_atomic(path, data))
}

/// Read a UTF-8 file under its lock.
pub fn read_locked(path: &Path, timeout: Duration) -> Result<String> {
    with_lock(path, timeout, || {
        let bytes = fs::read(path)?;
        String::from_utf8(bytes).map_err(|err| {
            Error::OperationFailed(format!("{} is not UTF-8: {err}", path.display()))
        })
    })
}

fn open_for_locking(path: &Path) -> Result<File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let handle = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    Ok(handle)
}

/// `progress.json` stages as `.progress.json.<pid>.tmp`.
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}

fn held_elsewhere(err: &io::Error) -> bool {
    // Windows reports sharing violations (32) and lock violations (33).
    err.kind() == io::ErrorKind::WouldBlock
        || (cfg!(windows) && matches!(err.raw_os_error(), Some(32 | 33)))
}
