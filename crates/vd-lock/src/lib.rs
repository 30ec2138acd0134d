//! Cross-process mutex guarding content version switches.
//!
//! Switching the served content version touches shared on-disk state (the
//! working tree of the content repository), so only one process may do it
//! at a time. [`VersionSwitchMutex`] serializes those switches across
//! processes through an advisory lock on a well-known file in a shared
//! lock directory.
//!
//! Acquisition polls: a non-blocking lock attempt once a second until the
//! caller's wait budget runs out. On success a diagnostic line (caller
//! location, pid, timestamp) is appended to the lock file; on timeout the
//! returned error carries the file's accumulated diagnostics, so a stuck
//! holder can be identified from the error alone. The lock file is deleted
//! on unlock, and dropping a held mutex releases it.

use std::fs::{self, File, OpenOptions, TryLockError};
use std::io::{self, Write};
use std::panic::Location;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Name of the lock file; shared by every process switching versions.
const LOCK_FILE_NAME: &str = "drdplus_rules_version_switch_mutex";

/// Pause between lock attempts.
const RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Default wait budget for [`VersionSwitchMutex::lock`].
pub const DEFAULT_WAIT: Duration = Duration::from_secs(2);

/// Failure to acquire or hold the version switch lock.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum MutexError {
    /// The lock file could not be created or opened for writing.
    #[error("cannot open version switch lock file {}: {source}", path.display())]
    Unwritable {
        /// Path of the lock file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A lock attempt failed for a reason other than contention.
    #[error("version switch lock failed: {0}")]
    Io(#[from] io::Error),

    /// The lock stayed contended for the whole wait budget.
    #[error(
        "could not acquire version switch lock {} after {attempts} attempts in {elapsed:?}; held by:\n{diagnostics}",
        lock_file.display()
    )]
    Timeout {
        /// Number of lock attempts made.
        attempts: u32,
        /// Total time spent waiting.
        elapsed: Duration,
        /// Path of the contended lock file.
        lock_file: PathBuf,
        /// Diagnostic lines appended by the current and past holders.
        diagnostics: String,
    },
}

/// Advisory cross-process lock over content version switches.
///
/// The lock is tied to a lock directory: every mutex pointed at the same
/// directory contends for the same lock, across processes.
#[derive(Debug)]
pub struct VersionSwitchMutex {
    lock_dir: PathBuf,
    handle: Option<File>,
}

impl VersionSwitchMutex {
    /// Create an unlocked mutex over `lock_dir`.
    ///
    /// Without an explicit directory the system temp directory is used,
    /// which is shared by all processes on the host.
    #[must_use]
    pub fn new(lock_dir: Option<PathBuf>) -> Self {
        Self {
            lock_dir: lock_dir.unwrap_or_else(std::env::temp_dir),
            handle: None,
        }
    }

    /// Path of the lock file this mutex contends for.
    #[must_use]
    pub fn lock_file(&self) -> PathBuf {
        self.lock_dir.join(LOCK_FILE_NAME)
    }

    /// Whether this mutex currently holds the lock.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.handle.is_some()
    }

    /// Acquire the lock, polling for at most `wait`.
    ///
    /// Already holding the lock is a no-op. On timeout the error carries
    /// the lock file's diagnostics identifying the current holder.
    #[track_caller]
    pub fn lock(&mut self, wait: Duration) -> Result<(), MutexError> {
        if self.handle.is_some() {
            return Ok(());
        }
        let caller = Location::caller();

        let path = self.lock_file();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| MutexError::Unwritable {
                path: path.clone(),
                source,
            })?;

        let started = Instant::now();
        let mut attempts: u32 = 1;
        loop {
            match file.try_lock() {
                Ok(()) => break,
                Err(TryLockError::WouldBlock) => {
                    let elapsed = started.elapsed();
                    if elapsed >= wait {
                        let diagnostics = fs::read_to_string(&path).unwrap_or_default();
                        // Another process owns the file; just close our handle.
                        return Err(MutexError::Timeout {
                            attempts,
                            elapsed,
                            lock_file: path,
                            diagnostics,
                        });
                    }
                    tracing::debug!(
                        "version switch lock contended (attempt {attempts}), retrying"
                    );
                    std::thread::sleep(RETRY_INTERVAL);
                    attempts += 1;
                }
                Err(TryLockError::Error(e)) => return Err(MutexError::Io(e)),
            }
        }

        append_diagnostics(&file, caller);
        tracing::debug!("acquired version switch lock at {}", path.display());
        self.handle = Some(file);
        Ok(())
    }

    /// Release the lock and delete the lock file.
    ///
    /// Returns `false` when the mutex was not holding the lock.
    pub fn unlock(&mut self) -> bool {
        let Some(file) = self.handle.take() else {
            return false;
        };
        if let Err(e) = file.unlock() {
            tracing::warn!("failed to release version switch lock: {e}");
        }
        drop(file);
        let path = self.lock_file();
        if let Err(e) = fs::remove_file(&path) {
            tracing::warn!("failed to remove lock file {}: {e}", path.display());
        }
        true
    }
}

impl Drop for VersionSwitchMutex {
    fn drop(&mut self) {
        if self.unlock() {
            tracing::debug!("version switch lock released on drop");
        }
    }
}

/// Append a holder-identification line to the lock file.
fn append_diagnostics(mut file: &File, caller: &Location<'_>) {
    let line = format!(
        "locked by {} at {}:{} ({})\n",
        std::process::id(),
        caller.file(),
        caller.line(),
        chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, false),
    );
    if let Err(e) = file.write_all(line.as_bytes()) {
        tracing::warn!("failed to append lock diagnostics: {e}");
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use tempfile::TempDir;

    fn mutex(dir: &Path) -> VersionSwitchMutex {
        VersionSwitchMutex::new(Some(dir.to_path_buf()))
    }

    #[test]
    fn test_lock_and_unlock() {
        let tmp = TempDir::new().unwrap();
        let mut mutex = mutex(tmp.path());

        assert!(!mutex.is_locked());
        mutex.lock(Duration::ZERO).unwrap();
        assert!(mutex.is_locked());
        assert!(mutex.lock_file().exists());

        assert!(mutex.unlock());
        assert!(!mutex.is_locked());
        assert!(!mutex.lock_file().exists());
    }

    #[test]
    fn test_unlock_without_lock_returns_false() {
        let tmp = TempDir::new().unwrap();
        let mut mutex = mutex(tmp.path());
        assert!(!mutex.unlock());
    }

    #[test]
    fn test_relock_is_noop() {
        let tmp = TempDir::new().unwrap();
        let mut mutex = mutex(tmp.path());

        mutex.lock(Duration::ZERO).unwrap();
        mutex.lock(Duration::ZERO).unwrap();
        assert!(mutex.is_locked());
    }

    #[test]
    fn test_contended_lock_times_out() {
        let tmp = TempDir::new().unwrap();
        let mut holder = mutex(tmp.path());
        holder.lock(Duration::ZERO).unwrap();

        let mut waiter = mutex(tmp.path());
        let err = waiter.lock(Duration::ZERO).unwrap_err();
        match err {
            MutexError::Timeout {
                attempts,
                diagnostics,
                ..
            } => {
                assert_eq!(attempts, 1);
                // The holder's pid is in the diagnostics it appended.
                assert!(diagnostics.contains(&std::process::id().to_string()));
            }
            other => panic!("expected timeout, got {other}"),
        }
        assert!(!waiter.is_locked());
    }

    #[test]
    fn test_lock_available_after_unlock() {
        let tmp = TempDir::new().unwrap();
        let mut first = mutex(tmp.path());
        first.lock(Duration::ZERO).unwrap();
        first.unlock();

        let mut second = mutex(tmp.path());
        second.lock(Duration::ZERO).unwrap();
        assert!(second.is_locked());
    }

    #[test]
    fn test_drop_releases_lock() {
        let tmp = TempDir::new().unwrap();
        {
            let mut held = mutex(tmp.path());
            held.lock(Duration::ZERO).unwrap();
        }

        let mut next = mutex(tmp.path());
        next.lock(Duration::ZERO).unwrap();
        assert!(next.is_locked());
    }

    #[test]
    fn test_diagnostics_record_caller() {
        let tmp = TempDir::new().unwrap();
        let mut mutex = mutex(tmp.path());
        mutex.lock(Duration::ZERO).unwrap();

        let diagnostics = fs::read_to_string(mutex.lock_file()).unwrap();
        assert!(diagnostics.contains(file!()));
    }
}
