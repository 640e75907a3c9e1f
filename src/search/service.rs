//! Main search service implementation
//!
//! A run uses the index, when it is complete, only to pick candidate pages.
//! Every candidate is then evaluated exactly, because the index carries no
//! match positions and may lag behind the pages. Without a usable index all
//! pages passing the query's page filter are evaluated.

use crate::search::config::SearchConfig;
use crate::search::document::{AccessPolicy, Document, PageStore};
use crate::search::error::{SearchError, SearchResult};
use crate::search::expression::Expression;
use crate::search::index::{IndexHit, IndexManager, IndexOutcome};
use crate::search::matches::{Match, MatchKind};
use crate::search::query::QueryParser;
use crate::search::results::{FoundPage, SearchResults};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Attachment text seen through the page interface
struct AttachmentDocument {
    filename: String,
    content: String,
}

impl Document for AttachmentDocument {
    fn name(&self) -> &str {
        &self.filename
    }

    fn raw_body(&self) -> &str {
        &self.content
    }

    fn outgoing_links(&self) -> Vec<String> {
        Vec::new()
    }

    fn exists(&self) -> bool {
        true
    }

    fn header_text(&self, _max_len: usize) -> &str {
        ""
    }
}

/// Executes parsed queries against the page store
pub struct SearchRunner {
    store: Arc<dyn PageStore>,
    index: Option<Arc<IndexManager>>,
    parser: QueryParser,
    config: SearchConfig,
}

impl SearchRunner {
    /// Runner that always evaluates every page
    pub fn new(store: Arc<dyn PageStore>, config: SearchConfig) -> Self {
        Self {
            store,
            index: None,
            parser: QueryParser::default(),
            config,
        }
    }

    /// Use `index` to narrow down candidates when fast search is enabled
    pub fn with_index(mut self, index: Arc<IndexManager>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_parser(mut self, parser: QueryParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn parser(&self) -> &QueryParser {
        &self.parser
    }

    /// Parse and run a query string
    pub async fn search(
        &self,
        query: &str,
        access: &dyn AccessPolicy,
    ) -> SearchResult<SearchResults> {
        self.run(self.parser.parse(query), access).await
    }

    /// Run a parsed query
    ///
    /// Only storage failures are reported; an unavailable or locked index
    /// falls back to evaluating every page.
    pub async fn run(
        &self,
        query: Expression,
        access: &dyn AccessPolicy,
    ) -> SearchResult<SearchResults> {
        let started = Instant::now();

        let candidates = self.candidates(&query).await?;
        let fast = candidates.is_some();

        let store = Arc::clone(&self.store);
        let expression = query.clone();
        let (hits, page_count) = tokio::task::spawn_blocking(move || {
            let hits = match candidates {
                Some(candidates) => evaluate_candidates(store.as_ref(), &expression, candidates),
                None => evaluate_all(store.as_ref(), &expression),
            };
            (hits, store.page_count())
        })
        .await?;

        // deleted pages and pages the caller may not read never leave here
        let hits: Vec<FoundPage> = hits
            .into_iter()
            .filter(|hit| self.visible(hit, access))
            .collect();

        let elapsed = started.elapsed();
        info!(
            query = %query,
            hits = hits.len(),
            fast,
            elapsed_ms = elapsed.as_millis() as u64,
            "Search completed"
        );
        Ok(SearchResults::new(query, hits, page_count, elapsed))
    }

    /// Candidate pages from the index, `None` when every page must be read
    async fn candidates(&self, query: &Expression) -> SearchResult<Option<Vec<IndexHit>>> {
        let Some(index) = self.index.as_ref().filter(|_| self.config.fast_search) else {
            return Ok(None);
        };
        if !index.exists() {
            debug!("Index incomplete, evaluating all pages");
            return Ok(None);
        }

        match index.search(query.to_index_query(index.schema())).await {
            Ok(IndexOutcome::Hits(hits)) => {
                debug!(candidates = hits.len(), "Index selected candidates");
                Ok(Some(hits))
            }
            Ok(IndexOutcome::Locked) => {
                debug!("Index locked, evaluating all pages");
                Ok(None)
            }
            Err(e @ SearchError::Storage { .. }) => Err(e),
            Err(e) => {
                warn!(error = %e, "Index search failed, evaluating all pages");
                Ok(None)
            }
        }
    }

    fn visible(&self, hit: &FoundPage, access: &dyn AccessPolicy) -> bool {
        let exists = match (&hit.attachment, &hit.document) {
            (None, Some(document)) => document.exists(),
            _ => self
                .store
                .document(&hit.name)
                .is_some_and(|page| page.exists()),
        };
        exists && access.may_read(&hit.name)
    }
}

fn evaluate_page(store: &dyn PageStore, expression: &Expression, name: &str) -> Option<FoundPage> {
    let document = store.document(name)?;
    let matches = expression.search(document.as_ref())?;
    Some(FoundPage::new(name, matches).with_document(document))
}

fn evaluate_attachment(
    store: &dyn PageStore,
    expression: &Expression,
    page: &str,
    filename: &str,
) -> Option<FoundPage> {
    let attachment = store
        .attachments(page)
        .into_iter()
        .find(|attachment| attachment.filename == filename)?;
    let document = Arc::new(AttachmentDocument {
        filename: attachment.filename,
        content: attachment.content,
    });
    let matches = expression
        .search(document.as_ref())?
        .into_iter()
        .map(|m| match m.kind {
            MatchKind::Text => Match::attachment(m.start, m.end),
            _ => m,
        })
        .collect();
    Some(
        FoundPage::new(page, matches)
            .with_attachment(filename)
            .with_document(document),
    )
}

fn evaluate_candidates(
    store: &dyn PageStore,
    expression: &Expression,
    candidates: Vec<IndexHit>,
) -> Vec<FoundPage> {
    candidates
        .into_iter()
        .filter_map(|hit| match &hit.attachment {
            Some(filename) => evaluate_attachment(store, expression, &hit.page, filename),
            None => evaluate_page(store, expression, &hit.page),
        })
        .collect()
}

fn evaluate_all(store: &dyn PageStore, expression: &Expression) -> Vec<FoundPage> {
    let filter = expression.page_filter();
    store
        .page_names()
        .into_iter()
        .filter(|name| filter.as_ref().map_or(true, |f| f(name)))
        .filter_map(|name| evaluate_page(store, expression, &name))
        .collect()
}
