//! Durable queue of pages waiting to be indexed
//!
//! The queue is a newline-delimited file of page names. It only exists while
//! the queue is non-empty. Reads take the shared queue lock and mutations the
//! exclusive one; a lock timeout drops an append or yields an empty snapshot,
//! so a stale queue is tolerated but never a blocked caller.

use crate::search::config::SearchConfig;
use crate::search::error::{SearchError, SearchResult};
use crate::search::lock::LockDir;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub const QUEUE_FILE: &str = "update-queue";
pub const QUEUE_LOCK_DIR: &str = "update-queue-lock";

/// Deduplicated, insertion-ordered set of page names persisted on disk
#[derive(Debug, Clone)]
pub struct UpdateQueue {
    path: PathBuf,
    lock: LockDir,
    append_wait: Duration,
    read_wait: Duration,
    remove_wait: Duration,
}

impl UpdateQueue {
    /// Queue stored under `cache_dir`
    pub fn new(cache_dir: &Path, config: &SearchConfig) -> Self {
        Self {
            path: cache_dir.join(QUEUE_FILE),
            lock: LockDir::new(cache_dir.join(QUEUE_LOCK_DIR)),
            append_wait: Duration::from_millis(config.queue_append_wait_ms),
            read_wait: Duration::from_millis(config.queue_read_wait_ms),
            remove_wait: Duration::from_millis(config.queue_remove_wait_ms),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add a page name; dropped with a warning if the lock is busy
    ///
    /// Empty names and names containing control characters are rejected
    /// with [`SearchError::InvalidPageName`].
    pub fn append(&self, name: &str) -> SearchResult<()> {
        if name.is_empty() || name.chars().any(char::is_control) {
            return Err(SearchError::InvalidPageName(name.to_string()));
        }
        let Some(_guard) = self.lock.acquire_write(self.append_wait)? else {
            warn!(page = %name, "Update queue is locked, dropping entry");
            return Ok(());
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| SearchError::storage(&self.path, e))?;
        writeln!(file, "{}", name).map_err(|e| SearchError::storage(&self.path, e))?;

        debug!(page = %name, "Queued page for indexing");
        Ok(())
    }

    /// Snapshot of the queued names, first occurrence order
    pub fn pages(&self) -> SearchResult<Vec<String>> {
        let Some(_guard) = self.lock.acquire_read(self.read_wait)? else {
            warn!(queue = %self.path.display(), "Update queue is locked, reading nothing");
            return Ok(Vec::new());
        };
        self.read_names()
    }

    /// Remove `names` from the queue; false if the lock could not be taken
    pub fn remove<S: AsRef<str>>(&self, names: &[S]) -> SearchResult<bool> {
        let Some(_guard) = self.lock.acquire_write(self.remove_wait)? else {
            warn!(queue = %self.path.display(), "Update queue is locked, nothing removed");
            return Ok(false);
        };

        let removed: HashSet<&str> = names.iter().map(AsRef::as_ref).collect();
        let remaining: Vec<String> = self
            .read_names()?
            .into_iter()
            .filter(|name| !removed.contains(name.as_str()))
            .collect();

        if remaining.is_empty() {
            match std::fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(SearchError::storage(&self.path, e)),
            }
        } else {
            self.rewrite(&remaining)?;
        }
        Ok(true)
    }

    fn read_names(&self) -> SearchResult<Vec<String>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SearchError::storage(&self.path, e)),
        };

        let mut seen = HashSet::new();
        Ok(content
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .filter(|line| seen.insert(*line))
            .map(str::to_string)
            .collect())
    }

    /// Replace the queue file atomically
    fn rewrite(&self, names: &[String]) -> SearchResult<()> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp =
            tempfile::NamedTempFile::new_in(parent).map_err(|e| SearchError::storage(parent, e))?;
        for name in names {
            writeln!(tmp, "{}", name).map_err(|e| SearchError::storage(tmp.path(), e))?;
        }
        tmp.persist(&self.path)
            .map_err(|e| SearchError::storage(&self.path, e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::config::SearchConfigBuilder;
    use tempfile::TempDir;

    fn queue(dir: &TempDir) -> UpdateQueue {
        let config = SearchConfigBuilder::new()
            .queue_waits_ms(50, 50, 50)
            .build();
        UpdateQueue::new(dir.path(), &config)
    }

    #[test]
    fn test_append_dedups_on_read() {
        let dir = TempDir::new().unwrap();
        let queue = queue(&dir);

        queue.append("FrontPage").unwrap();
        queue.append("FrontPage").unwrap();
        queue.append("HelpIndex").unwrap();

        assert_eq!(queue.pages().unwrap(), vec!["FrontPage", "HelpIndex"]);
    }

    #[test]
    fn test_append_rejects_line_breaks() {
        let dir = TempDir::new().unwrap();
        let queue = queue(&dir);

        for name in ["Foo\nBar", "Foo\r", "Tab\there", ""] {
            assert!(matches!(
                queue.append(name),
                Err(SearchError::InvalidPageName(_))
            ));
        }
        assert!(!queue.path().exists());

        queue.append("Foo Bar/Sub Page").unwrap();
        assert_eq!(queue.pages().unwrap(), vec!["Foo Bar/Sub Page"]);
    }

    #[test]
    fn test_remove_rewrites_remaining() {
        let dir = TempDir::new().unwrap();
        let queue = queue(&dir);

        queue.append("A").unwrap();
        queue.append("B").unwrap();
        queue.append("A").unwrap();
        assert!(queue.remove(&["A"]).unwrap());

        assert_eq!(queue.pages().unwrap(), vec!["B"]);
        let content = std::fs::read_to_string(queue.path()).unwrap();
        assert_eq!(content, "B\n");
    }

    #[test]
    fn test_empty_queue_has_no_file() {
        let dir = TempDir::new().unwrap();
        let queue = queue(&dir);

        assert!(queue.remove(&["X"]).unwrap());
        assert!(!queue.path().exists());

        queue.append("A").unwrap();
        assert!(queue.path().exists());
        queue.remove(&["A"]).unwrap();
        assert!(!queue.path().exists());
        assert!(queue.pages().unwrap().is_empty());
    }

    #[test]
    fn test_locked_queue_degrades() {
        let dir = TempDir::new().unwrap();
        let queue = queue(&dir);
        queue.append("A").unwrap();

        let lock = LockDir::new(dir.path().join(QUEUE_LOCK_DIR));
        let _writer = lock.acquire_write(Duration::ZERO).unwrap().unwrap();

        assert!(queue.pages().unwrap().is_empty());
        assert!(!queue.remove(&["A"]).unwrap());
        queue.append("B").unwrap();

        drop(_writer);
        assert_eq!(queue.pages().unwrap(), vec!["A"]);
    }
}
