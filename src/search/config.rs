//! Search configuration

use crate::search::error::SearchResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Search subsystem configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Cache root; the index, signature, queue and lock directories live here
    pub cache_dir: PathBuf,

    /// Use the prebuilt index to narrow down candidates when it is complete
    pub fast_search: bool,

    /// Index writer heap size in bytes (default: 50MB)
    pub writer_heap_size: usize,

    /// Number of queued pages indexed per incremental update
    pub update_batch_size: usize,

    /// How long incremental updates and optimize wait for the index write lock
    pub index_lock_wait_ms: u64,

    /// How long a full rebuild waits for the index write lock
    pub rebuild_lock_wait_ms: u64,

    /// How long a search waits for the index read lock
    pub search_lock_wait_ms: u64,

    /// How long appending to the update queue waits for its lock
    pub queue_append_wait_ms: u64,

    /// How long reading the update queue waits for its lock
    pub queue_read_wait_ms: u64,

    /// How long removing from the update queue waits for its lock
    pub queue_remove_wait_ms: u64,

    /// Characters of context shown around a match
    pub context_width: usize,

    /// Maximum number of context lines per hit
    pub context_max_lines: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./data/cache"),
            fast_search: true,
            writer_heap_size: 50_000_000, // 50MB
            update_batch_size: 5,
            index_lock_wait_ms: 1_000,
            rebuild_lock_wait_ms: 3_600_000,
            search_lock_wait_ms: 1_000,
            queue_append_wait_ms: 60_000,
            queue_read_wait_ms: 1_000,
            queue_remove_wait_ms: 30_000,
            context_width: 180,
            context_max_lines: 1,
        }
    }
}

impl SearchConfig {
    /// Load configuration from defaults, an optional TOML file and environment
    ///
    /// Environment variables use the `WIKI_SEARCH` prefix with `__` as the
    /// separator, e.g. `WIKI_SEARCH__CACHE_DIR=/var/cache/wiki`.
    pub fn load(path: Option<&Path>) -> SearchResult<Self> {
        let mut builder = config::Config::builder().add_source(config::Config::try_from(
            &SearchConfig::default(),
        )?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let config: SearchConfig = builder
            .add_source(
                config::Environment::with_prefix("WIKI_SEARCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make every index operation fail
    pub fn validate(&self) -> SearchResult<()> {
        use crate::search::error::SearchError;

        if self.update_batch_size == 0 {
            return Err(SearchError::InvalidConfiguration(
                "update_batch_size must be at least 1".to_string(),
            ));
        }
        // tantivy refuses writers below 15MB per thread
        if self.writer_heap_size < 15_000_000 {
            return Err(SearchError::InvalidConfiguration(format!(
                "writer_heap_size {} is below the 15MB minimum",
                self.writer_heap_size
            )));
        }
        Ok(())
    }

    pub fn index_lock_wait(&self) -> Duration {
        Duration::from_millis(self.index_lock_wait_ms)
    }

    pub fn rebuild_lock_wait(&self) -> Duration {
        Duration::from_millis(self.rebuild_lock_wait_ms)
    }

    pub fn search_lock_wait(&self) -> Duration {
        Duration::from_millis(self.search_lock_wait_ms)
    }
}

/// Builder for SearchConfig
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    pub fn cache_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = path.into();
        self
    }

    pub fn fast_search(mut self, enabled: bool) -> Self {
        self.config.fast_search = enabled;
        self
    }

    pub fn writer_heap_size(mut self, size: usize) -> Self {
        self.config.writer_heap_size = size;
        self
    }

    pub fn update_batch_size(mut self, size: usize) -> Self {
        self.config.update_batch_size = size;
        self
    }

    pub fn index_lock_wait_ms(mut self, ms: u64) -> Self {
        self.config.index_lock_wait_ms = ms;
        self
    }

    pub fn rebuild_lock_wait_ms(mut self, ms: u64) -> Self {
        self.config.rebuild_lock_wait_ms = ms;
        self
    }

    pub fn search_lock_wait_ms(mut self, ms: u64) -> Self {
        self.config.search_lock_wait_ms = ms;
        self
    }

    pub fn queue_waits_ms(mut self, append: u64, read: u64, remove: u64) -> Self {
        self.config.queue_append_wait_ms = append;
        self.config.queue_read_wait_ms = read;
        self.config.queue_remove_wait_ms = remove;
        self
    }

    pub fn context_width(mut self, width: usize) -> Self {
        self.config.context_width = width;
        self
    }

    pub fn context_max_lines(mut self, lines: usize) -> Self {
        self.config.context_max_lines = lines;
        self
    }

    pub fn build(self) -> SearchConfig {
        self.config
    }
}

impl Default for SearchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
