//! Soft file lock.
//!
//! The lock is held by whoever managed to create the lock file; it carries
//! no OS-level locking, so it also works on network file systems. A process
//! that dies while holding it leaves the file behind, and the lock then has
//! to be removed by hand.

use crate::{Result, WbtError};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Held lock; the lock file is removed on drop.
#[derive(Debug)]
pub struct SoftFileLock {
    path: PathBuf,
}

impl SoftFileLock {
    /// Wait until the lock file can be created.
    ///
    /// `timeout` of `None` waits forever.
    pub fn acquire<P: AsRef<Path>>(path: P, timeout: Option<Duration>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let start = Instant::now();
        let mut reported = false;

        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    // Best effort: the pid only helps whoever finds a stale lock.
                    let _ = writeln!(file, "{}", std::process::id());
                    debug!("Acquired lock {}", path.display());
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if timeout.is_some_and(|t| start.elapsed() >= t) {
                        return Err(WbtError::LockTimeout(path));
                    }
                    if !reported {
                        warn!("Waiting for lock {}", path.display());
                        reported = true;
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SoftFileLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                warn!("Failed to remove lock {}: {}", self.path.display(), e);
            }
        }
        debug!("Released lock {}", self.path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};

    #[test]
    fn test_acquire_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".wbt_lock");
        {
            let lock = SoftFileLock::acquire(&path, None).unwrap();
            assert!(lock.path().exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_timeout_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".wbt_lock");
        let _held = SoftFileLock::acquire(&path, None).unwrap();
        let err = SoftFileLock::acquire(&path, Some(Duration::from_millis(120))).unwrap_err();
        assert!(matches!(err, WbtError::LockTimeout(_)));
    }

    #[test]
    fn test_waits_for_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".wbt_lock");
        let held = SoftFileLock::acquire(&path, None).unwrap();
        let barrier = Arc::new(Barrier::new(2));

        let waiter = {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                SoftFileLock::acquire(&path, Some(Duration::from_secs(10))).map(|_| ())
            })
        };
        barrier.wait();
        thread::sleep(Duration::from_millis(100));
        drop(held);
        assert!(waiter.join().unwrap().is_ok());
    }
}
