//! Search index management
//!
//! The index lives under the cache directory next to a zero-byte signature
//! file, the update queue and two lock directories:
//!
//! ```text
//! <cache>/index/              tantivy segments
//! <cache>/complete            present only while the index is complete
//! <cache>/update-queue        pages waiting for an incremental update
//! <cache>/index-lock/         shared for search, exclusive for mutation
//! <cache>/update-queue-lock/
//! ```
//!
//! Every mutation removes the signature first and recreates it after success,
//! so a reader that sees a half-written index sees "no index" instead.

use crate::search::config::SearchConfig;
use crate::search::document::{PageSchema, PageStore};
use crate::search::error::{SearchError, SearchResult};
use crate::search::lock::{LockDir, LockGuard};
use crate::search::queue::UpdateQueue;
use crate::search::tokenizer::{wiki_analyzer, WIKI_TOKENIZER};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tantivy::collector::DocSetCollector;
use tantivy::query::Query;
use tantivy::schema::Value;
use tantivy::{Index, IndexWriter, ReloadPolicy, Searcher, TantivyDocument, Term};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const INDEX_DIR: &str = "index";
pub const SIGNATURE_FILE: &str = "complete";
pub const INDEX_LOCK_DIR: &str = "index-lock";

/// Index statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Total number of documents (pages and attachments) in the index
    pub total_documents: u64,

    /// Index size in bytes
    pub index_size_bytes: u64,

    /// Number of segments
    pub num_segments: usize,

    /// Whether the completeness signature is present
    pub complete: bool,

    /// Pages waiting in the update queue
    pub queued_pages: usize,

    /// Last commit timestamp
    pub last_commit: Option<chrono::DateTime<chrono::Utc>>,
}

/// Version of the on-disk index, used to invalidate cached searchers
///
/// Commits and merges both rewrite `meta.json`; its digest tells generations
/// apart even when they share a coarse modification time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexGeneration {
    modified: Option<SystemTime>,
    digest: u64,
}

impl IndexGeneration {
    /// Time of the commit or merge that produced this generation
    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }
}

/// A page or attachment selected by the index
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexHit {
    pub page: String,
    /// File name when the hit is an attachment of `page`
    pub attachment: Option<String>,
}

/// Result of an index lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOutcome {
    /// Candidate pages and attachments
    Hits(Vec<IndexHit>),
    /// A writer holds the index; the caller has to fall back
    Locked,
}

/// State shared with background workers
struct IndexShared {
    config: SearchConfig,
    store: Arc<dyn PageStore>,
    index: Index,
    schema: PageSchema,
    index_dir: PathBuf,
    signature: PathBuf,
    lock: LockDir,
    queue: UpdateQueue,
    searchers: Mutex<Vec<(Searcher, IndexGeneration)>>,
    /// First failure of a worker whose handle was already dropped
    worker_error: Mutex<Option<SearchError>>,
}

/// Manages the tantivy index, its signature and the update queue
pub struct IndexManager {
    shared: Arc<IndexShared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl IndexManager {
    /// Open the index under `config.cache_dir`, creating it if needed
    pub async fn new(config: SearchConfig, store: Arc<dyn PageStore>) -> SearchResult<Self> {
        config.validate()?;

        let cache_dir = config.cache_dir.clone();
        let index_dir = cache_dir.join(INDEX_DIR);
        std::fs::create_dir_all(&index_dir).map_err(|e| {
            SearchError::IndexInitFailed(format!("Failed to create index directory: {}", e))
        })?;

        let schema = PageSchema::new();
        let index = if Self::index_exists(&index_dir) {
            Index::open_in_dir(&index_dir).map_err(|e| {
                SearchError::IndexInitFailed(format!("Failed to open existing index: {}", e))
            })?
        } else {
            Index::create_in_dir(&index_dir, schema.schema.clone()).map_err(|e| {
                SearchError::IndexInitFailed(format!("Failed to create new index: {}", e))
            })?
        };
        index.tokenizers().register(WIKI_TOKENIZER, wiki_analyzer());

        let queue = UpdateQueue::new(&cache_dir, &config);
        let shared = IndexShared {
            store,
            index,
            schema,
            index_dir,
            signature: cache_dir.join(SIGNATURE_FILE),
            lock: LockDir::new(cache_dir.join(INDEX_LOCK_DIR)),
            queue,
            searchers: Mutex::new(Vec::new()),
            worker_error: Mutex::new(None),
            config,
        };

        Ok(Self {
            shared: Arc::new(shared),
            workers: Mutex::new(Vec::new()),
        })
    }

    /// Check if tantivy metadata exists at the given path
    fn index_exists(path: &Path) -> bool {
        path.join("meta.json").exists()
    }

    /// True when the index is completely built and not being rebuilt
    pub fn exists(&self) -> bool {
        self.shared.exists()
    }

    pub fn schema(&self) -> &PageSchema {
        &self.shared.schema
    }

    pub fn queue(&self) -> &UpdateQueue {
        &self.shared.queue
    }

    pub fn config(&self) -> &SearchConfig {
        &self.shared.config
    }

    /// Queue a changed page and try to index a batch of queued pages
    ///
    /// Returns once the page is queued; indexing happens on a background
    /// worker and is skipped if the index is busy. Skipped pages stay queued.
    pub async fn update_page(&self, name: &str) -> SearchResult<()> {
        let shared = Arc::clone(&self.shared);
        let page = name.to_string();
        tokio::task::spawn_blocking(move || shared.queue.append(&page)).await??;

        let shared = Arc::clone(&self.shared);
        self.spawn_worker(move || shared.process_queue().map(|_| ()))
    }

    /// Index queued pages now, on the calling task
    pub async fn process_queue(&self) -> SearchResult<usize> {
        let shared = Arc::clone(&self.shared);
        tokio::task::spawn_blocking(move || shared.process_queue()).await?
    }

    /// Rebuild the whole index from the page store
    ///
    /// Returns false if the write lock could not be taken in time.
    pub async fn rebuild_all(&self) -> SearchResult<bool> {
        let shared = Arc::clone(&self.shared);
        tokio::task::spawn_blocking(move || shared.rebuild()).await?
    }

    /// Start a background rebuild unless the index is already complete
    ///
    /// Must be called from within a tokio runtime; returns
    /// [`SearchError::TaskFailed`] otherwise. [`IndexManager::finish`] must be
    /// awaited before shutdown.
    pub fn rebuild_all_async(&self) -> SearchResult<bool> {
        if self.exists() {
            return Ok(false);
        }
        let shared = Arc::clone(&self.shared);
        self.spawn_worker(move || shared.rebuild().map(|_| ()))?;
        Ok(true)
    }

    /// Merge all segments into one
    pub async fn optimize(&self) -> SearchResult<bool> {
        let shared = Arc::clone(&self.shared);
        tokio::task::spawn_blocking(move || shared.optimize()).await?
    }

    /// Candidate pages for a query
    pub async fn search(&self, query: Box<dyn Query>) -> SearchResult<IndexOutcome> {
        let shared = Arc::clone(&self.shared);
        tokio::task::spawn_blocking(move || shared.search(query.as_ref())).await?
    }

    /// Get index statistics
    pub async fn stats(&self) -> SearchResult<IndexStats> {
        let shared = Arc::clone(&self.shared);
        tokio::task::spawn_blocking(move || shared.stats()).await?
    }

    /// Number of searchers currently pooled
    pub fn cached_searchers(&self) -> usize {
        self.shared.searchers.lock().len()
    }

    /// Number of background workers not yet known to be finished
    pub fn pending_workers(&self) -> usize {
        self.workers.lock().len()
    }

    /// Wait for every background worker; reports the first failure
    pub async fn finish(&self) -> SearchResult<()> {
        loop {
            let workers: Vec<_> = std::mem::take(&mut *self.workers.lock());
            if workers.is_empty() {
                break;
            }
            for worker in workers {
                if let Err(e) = worker.await {
                    self.shared.record_worker_error(e.into());
                }
            }
        }
        self.shared.worker_error.lock().take().map_or(Ok(()), Err)
    }

    fn spawn_worker<F>(&self, work: F) -> SearchResult<()>
    where
        F: FnOnce() -> SearchResult<()> + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SearchError::TaskFailed(e.to_string()))?;
        let shared = Arc::clone(&self.shared);
        let handle = runtime.spawn_blocking(move || {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(work))
                .unwrap_or_else(|_| Err(SearchError::TaskFailed("index worker panicked".into())));
            if let Err(e) = result {
                warn!(error = %e, "Index worker failed");
                shared.record_worker_error(e);
            }
        });

        let mut workers = self.workers.lock();
        let before = workers.len();
        workers.retain(|worker| !worker.is_finished());
        if workers.len() < before {
            debug!(pruned = before - workers.len(), "Dropped finished index workers");
        }
        workers.push(handle);
        Ok(())
    }
}

impl IndexShared {
    fn exists(&self) -> bool {
        self.signature.exists()
    }

    fn record_worker_error(&self, error: SearchError) {
        self.worker_error.lock().get_or_insert(error);
    }

    fn sign(&self) -> SearchResult<()> {
        std::fs::File::create(&self.signature)
            .map(|_| ())
            .map_err(|e| SearchError::storage(&self.signature, e))
    }

    fn unsign(&self) -> SearchResult<()> {
        match std::fs::remove_file(&self.signature) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SearchError::storage(&self.signature, e)),
        }
    }

    fn write_lock(&self, wait: std::time::Duration) -> SearchResult<Option<LockGuard>> {
        let guard = self.lock.acquire_write(wait)?;
        if guard.is_none() {
            warn!(wait_ms = wait.as_millis() as u64, "Index is locked, skipping update");
        }
        Ok(guard)
    }

    fn writer(&self) -> SearchResult<IndexWriter> {
        self.index
            .writer(self.config.writer_heap_size)
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to create writer: {}", e)))
    }

    fn index_page(&self, writer: &mut IndexWriter, name: &str) -> SearchResult<bool> {
        let Some(page) = self.store.document(name) else {
            return Ok(false);
        };
        if !page.exists() {
            return Ok(false);
        }
        let attachments = self.store.attachments(name);
        for doc in self.schema.page_documents(page.as_ref(), &attachments) {
            writer.add_document(doc).map_err(|e| {
                SearchError::IndexingFailed(format!("Failed to add page {}: {}", name, e))
            })?;
        }
        Ok(true)
    }

    /// Index one batch of queued pages; returns the number handled
    fn process_queue(&self) -> SearchResult<usize> {
        let Some(_guard) = self.write_lock(self.config.index_lock_wait())? else {
            return Ok(0);
        };

        let batch: Vec<String> = self
            .queue
            .pages()?
            .into_iter()
            .take(self.config.update_batch_size)
            .collect();
        if batch.is_empty() {
            return Ok(0);
        }

        let signed = self.exists();
        if signed {
            self.unsign()?;
        }

        let mut writer = self.writer()?;
        for name in &batch {
            // page and attachment documents share the page name
            writer.delete_term(Term::from_field_text(self.schema.pagename, name));
            let indexed = self.index_page(&mut writer, name)?;
            debug!(page = %name, indexed, "Updated page in index");
        }
        writer
            .commit()
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to commit batch: {}", e)))?;
        self.queue.remove(&batch)?;

        if signed {
            self.sign()?;
        }
        Ok(batch.len())
    }

    fn rebuild(&self) -> SearchResult<bool> {
        let Some(_guard) = self.write_lock(self.config.rebuild_lock_wait())? else {
            return Ok(false);
        };

        let started = Instant::now();
        info!(index = %self.index_dir.display(), "Rebuilding search index");

        // pages queued before the rebuild are covered by it
        let pending = self.queue.pages()?;
        self.unsign()?;

        let mut writer = self.writer()?;
        writer
            .delete_all_documents()
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to clear index: {}", e)))?;
        let mut pages = 0usize;
        for name in self.store.page_names() {
            if self.index_page(&mut writer, &name)? {
                pages += 1;
            }
        }
        writer
            .commit()
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to commit rebuild: {}", e)))?;
        self.merge_segments(writer)?;

        self.sign()?;
        self.queue.remove(&pending)?;

        info!(
            pages,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Search index rebuilt"
        );
        Ok(true)
    }

    fn optimize(&self) -> SearchResult<bool> {
        if !self.exists() {
            return Err(SearchError::IndexNotFound(
                self.index_dir.display().to_string(),
            ));
        }
        let Some(_guard) = self.write_lock(self.config.index_lock_wait())? else {
            return Ok(false);
        };

        let started = Instant::now();
        self.unsign()?;
        let writer = self.writer()?;
        self.merge_segments(writer)?;
        self.sign()?;

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Search index optimized"
        );
        Ok(true)
    }

    /// Merge every searchable segment and wait for the merge to land
    fn merge_segments(&self, mut writer: IndexWriter) -> SearchResult<()> {
        let segment_ids = self.index.searchable_segment_ids()?;
        if segment_ids.len() > 1 {
            debug!(segments = segment_ids.len(), "Merging segments");
            writer
                .merge(&segment_ids)
                .wait()
                .map_err(|e| SearchError::IndexingFailed(format!("Failed to merge: {}", e)))?;
        }
        writer.wait_merging_threads()?;
        Ok(())
    }

    fn generation(&self) -> IndexGeneration {
        use std::hash::{Hash, Hasher};

        let meta_path = self.index_dir.join("meta.json");
        let modified = std::fs::metadata(&meta_path)
            .and_then(|meta| meta.modified())
            .ok();
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        std::fs::read(&meta_path).unwrap_or_default().hash(&mut hasher);
        IndexGeneration {
            modified,
            digest: hasher.finish(),
        }
    }

    /// Take a pooled searcher of the current generation or open a new one
    fn checkout_searcher(&self) -> SearchResult<(Searcher, IndexGeneration)> {
        let generation = self.generation();
        {
            let mut pool = self.searchers.lock();
            pool.retain(|(_, cached)| {
                let fresh = *cached == generation;
                if !fresh {
                    debug!("Discarding searcher of an outdated index generation");
                }
                fresh
            });
            if let Some(entry) = pool.pop() {
                return Ok(entry);
            }
        }

        let reader = self
            .index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| SearchError::SearchFailed(format!("Failed to create reader: {}", e)))?;
        Ok((reader.searcher(), generation))
    }

    fn search(&self, query: &dyn Query) -> SearchResult<IndexOutcome> {
        let Some(_guard) = self.lock.acquire_read(self.config.search_lock_wait())? else {
            debug!("Index is locked, search falls back");
            return Ok(IndexOutcome::Locked);
        };

        let (searcher, generation) = self.checkout_searcher()?;
        let found = searcher
            .search(query, &DocSetCollector)
            .map_err(|e| SearchError::SearchFailed(format!("Search execution failed: {}", e)));

        let hits = found.and_then(|addresses| {
            let mut addresses: Vec<_> = addresses.into_iter().collect();
            addresses.sort();

            let mut seen = std::collections::HashSet::new();
            let mut hits = Vec::new();
            for address in addresses {
                let doc: TantivyDocument = searcher.doc(address).map_err(|e| {
                    SearchError::SearchFailed(format!("Failed to retrieve doc: {}", e))
                })?;
                let page = doc
                    .get_first(self.schema.pagename)
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let attachment = doc
                    .get_first(self.schema.attachment)
                    .and_then(|v| v.as_str())
                    .filter(|name| !name.is_empty())
                    .map(str::to_string);
                let hit = IndexHit { page, attachment };
                if !hit.page.is_empty() && seen.insert(hit.clone()) {
                    hits.push(hit);
                }
            }
            Ok(hits)
        });

        self.searchers.lock().push((searcher, generation));
        hits.map(IndexOutcome::Hits)
    }

    fn stats(&self) -> SearchResult<IndexStats> {
        let (searcher, generation) = self.checkout_searcher()?;
        let total_documents = searcher.num_docs();
        let num_segments = searcher.segment_readers().len();
        self.searchers.lock().push((searcher, generation));

        let index_size_bytes = std::fs::read_dir(&self.index_dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter_map(|e| e.metadata().ok())
                    .map(|m| m.len())
                    .sum()
            })
            .unwrap_or(0);

        Ok(IndexStats {
            total_documents,
            index_size_bytes,
            num_segments,
            complete: self.exists(),
            queued_pages: self.queue.pages()?.len(),
            last_commit: generation.modified().map(chrono::DateTime::<chrono::Utc>::from),
        })
    }
}
