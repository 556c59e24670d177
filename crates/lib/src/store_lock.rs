//! Cross-process lock on one data directory.
//!
//! Commands that write snapshots (`sync`, `snapshot delete`) hold the lock
//! exclusively and fail fast when another writer is active. Commands that
//! only read the snapshot index hold it shared, waiting briefly for a commit
//! in progress, so they never pair an index with snapshot files from a
//! different pass.
//!
//! The lock file is `{data_dir}/.lock`. A writer records itself there so a
//! contention error can name the competing pass.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::platform::paths::data_dir;

const LOCK_FILENAME: &str = ".lock";
const HOLDER_FORMAT_VERSION: u32 = 1;

/// How long readers wait for a writer to finish by default.
pub const DEFAULT_READ_WAIT: Duration = Duration::from_secs(10);
const RETRY_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockMode {
  Shared,
  Exclusive,
}

/// The writer currently holding the lock, as recorded in the lock file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockHolder {
  pub version: u32,
  pub pid: u32,
  pub command: String,
  pub started_at_unix: u64,
}

impl LockHolder {
  fn current(command: &str) -> Self {
    Self {
      version: HOLDER_FORMAT_VERSION,
      pid: std::process::id(),
      command: command.to_string(),
      started_at_unix: SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0),
    }
  }

  fn describe(&self) -> String {
    let started = UNIX_EPOCH + Duration::from_secs(self.started_at_unix);
    format!(
      "`{}` (PID {}, started {})",
      self.command,
      self.pid,
      humantime::format_rfc3339_seconds(started)
    )
  }
}

#[derive(Debug, Error)]
pub enum StoreLockError {
  #[error(
    "another qsync process is writing to this data directory: {holder}\n\
     If no qsync process is running, remove the lock file:\n  {}",
    .lock_path.display()
  )]
  Busy { holder: String, lock_path: PathBuf },

  #[error("timed out after {waited:?} waiting for a running sync to finish ({})", .lock_path.display())]
  ReadTimeout { waited: Duration, lock_path: PathBuf },

  #[error("failed to prepare lock file {}: {source}", .lock_path.display())]
  Open {
    lock_path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to record lock holder: {0}")]
  RecordHolder(#[source] io::Error),

  #[error("failed to acquire lock: {0}")]
  Lock(#[source] io::Error),
}

/// Held lock on a data directory. Released when dropped.
#[derive(Debug)]
pub struct StoreLock {
  file: File,
  lock_path: PathBuf,
  mode: LockMode,
}

impl StoreLock {
  /// Lock the default data directory for writing.
  pub fn exclusive(command: &str) -> Result<Self, StoreLockError> {
    Self::exclusive_in(&data_dir(), command)
  }

  /// Lock the default data directory for reading.
  pub fn shared() -> Result<Self, StoreLockError> {
    Self::shared_in(&data_dir(), DEFAULT_READ_WAIT)
  }

  /// Lock `dir` for writing. Fails immediately if any lock is held.
  pub fn exclusive_in(dir: &Path, command: &str) -> Result<Self, StoreLockError> {
    let (file, lock_path) = open_lock_file(dir)?;

    match try_lock(&file, LockMode::Exclusive) {
      Ok(()) => {}
      Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
        let holder = read_holder(&lock_path)
          .map(|h| h.describe())
          .unwrap_or_else(|| "a reader or an unknown process".to_string());
        return Err(StoreLockError::Busy { holder, lock_path });
      }
      Err(e) => return Err(StoreLockError::Lock(e)),
    }

    record_holder(&file, &LockHolder::current(command)).map_err(StoreLockError::RecordHolder)?;
    debug!(lock = %lock_path.display(), command, "acquired exclusive data directory lock");
    Ok(Self {
      file,
      lock_path,
      mode: LockMode::Exclusive,
    })
  }

  /// Lock `dir` for reading, waiting up to `wait` for a writer to release it.
  pub fn shared_in(dir: &Path, wait: Duration) -> Result<Self, StoreLockError> {
    let (file, lock_path) = open_lock_file(dir)?;
    let deadline = Instant::now() + wait;

    loop {
      match try_lock(&file, LockMode::Shared) {
        Ok(()) => break,
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
          if Instant::now() >= deadline {
            return Err(StoreLockError::ReadTimeout { waited: wait, lock_path });
          }
          thread::sleep(RETRY_INTERVAL);
        }
        Err(e) => return Err(StoreLockError::Lock(e)),
      }
    }

    debug!(lock = %lock_path.display(), "acquired shared data directory lock");
    Ok(Self {
      file,
      lock_path,
      mode: LockMode::Shared,
    })
  }

  pub fn lock_path(&self) -> &Path {
    &self.lock_path
  }
}

impl Drop for StoreLock {
  fn drop(&mut self) {
    // Clear the record while still holding the lock; the OS releases it with the handle.
    if self.mode == LockMode::Exclusive
      && let Err(e) = self.file.set_len(0)
    {
      debug!(error = %e, "failed to clear lock holder record");
    }
  }
}

fn open_lock_file(dir: &Path) -> Result<(File, PathBuf), StoreLockError> {
  let lock_path = dir.join(LOCK_FILENAME);
  let open_error = |source| StoreLockError::Open {
    lock_path: lock_path.clone(),
    source,
  };

  fs::create_dir_all(dir).map_err(open_error)?;
  let file = OpenOptions::new()
    .read(true)
    .write(true)
    .create(true)
    .truncate(false)
    .open(&lock_path)
    .map_err(open_error)?;
  Ok((file, lock_path))
}

fn record_holder(file: &File, holder: &LockHolder) -> io::Result<()> {
  file.set_len(0)?;
  let mut writer = io::BufWriter::new(file);
  serde_json::to_writer(&mut writer, holder).map_err(io::Error::other)?;
  writer.flush()
}

/// The recorded writer, if the lock file holds a readable record.
fn read_holder(lock_path: &Path) -> Option<LockHolder> {
  let contents = fs::read_to_string(lock_path).ok()?;
  serde_json::from_str(&contents).ok()
}

#[cfg(unix)]
fn try_lock(file: &File, mode: LockMode) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  let operation = match mode {
    LockMode::Shared => FlockOperation::NonBlockingLockShared,
    LockMode::Exclusive => FlockOperation::NonBlockingLockExclusive,
  };

  flock(file.as_fd(), operation).map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(windows)]
fn try_lock(file: &File, mode: LockMode) -> io::Result<()> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Foundation::{ERROR_LOCK_VIOLATION, HANDLE};
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, LockFileEx};

  let handle = file.as_raw_handle() as HANDLE;
  let flags = match mode {
    LockMode::Shared => LOCKFILE_FAIL_IMMEDIATELY,
    LockMode::Exclusive => LOCKFILE_FAIL_IMMEDIATELY | LOCKFILE_EXCLUSIVE_LOCK,
  };

  // SAFETY: a zeroed OVERLAPPED is valid and `handle` is an open file handle.
  let result = unsafe {
    let mut overlapped = std::mem::zeroed();
    LockFileEx(handle, flags, 0, 1, 0, &mut overlapped)
  };

  if result != 0 {
    return Ok(());
  }
  let err = io::Error::last_os_error();
  if err.raw_os_error() == Some(ERROR_LOCK_VIOLATION as i32) {
    Err(io::Error::from(io::ErrorKind::WouldBlock))
  } else {
    Err(err)
  }
}
