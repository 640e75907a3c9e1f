//! Advisory lock directories
//!
//! Each lock domain is a directory holding a single lock file. Readers take a
//! shared lock and writers an exclusive one. Acquisition polls until a bounded
//! wait expires; a timeout is reported as `Ok(None)`. Locks held by a crashed
//! process are released by the operating system.

use crate::search::error::{SearchError, SearchResult};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

const LOCK_FILE: &str = "lock";
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A lock domain on disk
#[derive(Debug, Clone)]
pub struct LockDir {
    path: PathBuf,
}

/// Held lock; released on drop
#[derive(Debug)]
pub struct LockGuard {
    file: File,
    exclusive: bool,
}

impl LockGuard {
    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

impl LockDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Shared lock; concurrent readers are allowed
    pub fn acquire_read(&self, wait: Duration) -> SearchResult<Option<LockGuard>> {
        self.acquire(false, wait)
    }

    /// Exclusive lock; excludes readers and other writers
    pub fn acquire_write(&self, wait: Duration) -> SearchResult<Option<LockGuard>> {
        self.acquire(true, wait)
    }

    fn acquire(&self, exclusive: bool, wait: Duration) -> SearchResult<Option<LockGuard>> {
        std::fs::create_dir_all(&self.path).map_err(|e| SearchError::storage(&self.path, e))?;

        let lock_path = self.path.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&lock_path)
            .map_err(|e| SearchError::storage(&lock_path, e))?;

        let deadline = Instant::now() + wait;
        loop {
            let attempt = if exclusive {
                fs2::FileExt::try_lock_exclusive(&file)
            } else {
                fs2::FileExt::try_lock_shared(&file)
            };

            match attempt {
                Ok(()) => return Ok(Some(LockGuard { file, exclusive })),
                Err(e) if is_contended(&e) => {}
                Err(e) => return Err(SearchError::storage(&lock_path, e)),
            }

            let now = Instant::now();
            if now >= deadline {
                debug!(
                    lock = %self.path.display(),
                    exclusive,
                    wait_ms = wait.as_millis() as u64,
                    "Lock wait expired"
                );
                return Ok(None);
            }
            std::thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_readers_share_the_lock() {
        let dir = TempDir::new().unwrap();
        let lock = LockDir::new(dir.path().join("index-lock"));

        let first = lock.acquire_read(Duration::ZERO).unwrap();
        let second = lock.acquire_read(Duration::ZERO).unwrap();
        assert!(first.is_some());
        assert!(second.is_some());
    }

    #[test]
    fn test_writer_excludes_readers_until_dropped() {
        let dir = TempDir::new().unwrap();
        let lock = LockDir::new(dir.path().join("index-lock"));

        let writer = lock.acquire_write(Duration::ZERO).unwrap();
        assert!(writer.as_ref().is_some_and(LockGuard::is_exclusive));
        assert!(lock.acquire_read(Duration::from_millis(30)).unwrap().is_none());

        drop(writer);
        assert!(lock.acquire_read(Duration::ZERO).unwrap().is_some());
    }

    #[test]
    fn test_reader_blocks_writer() {
        let dir = TempDir::new().unwrap();
        let lock = LockDir::new(dir.path().join("queue-lock"));

        let _reader = lock.acquire_read(Duration::ZERO).unwrap();
        assert!(lock.acquire_write(Duration::from_millis(20)).unwrap().is_none());
    }
}
