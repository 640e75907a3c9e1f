//! Full-text search for wiki pages powered by Tantivy
//!
//! This module provides the search subsystem of the wiki:
//!
//! - **Query Language**: words, `"phrases"`, `-negation`, `or`, parentheses
//!   and the `title:`, `regex:`, `case:` and `linkto:` modifiers
//! - **Exact Matching**: every hit is verified against the page itself and
//!   carries highlightable match positions
//! - **Fast Candidates**: a Tantivy index narrows down the pages to verify
//! - **Incremental Indexing**: changed pages are queued on disk and indexed
//!   in small batches by background workers
//! - **Ranking & Snippets**: title matches rank first; context lines show
//!   the matches in the page text
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │           SearchRunner                           │
//! ├─────────────────────────────────────────────────┤
//! │  - QueryParser -> Expression tree               │
//! │  - candidates from the index, exact evaluation  │
//! │  - existence / read permission filter           │
//! └─────────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────────┐
//! │           IndexManager                           │
//! ├─────────────────────────────────────────────────┤
//! │  - signature file, lock directories             │
//! │  - UpdateQueue, rebuild, optimize               │
//! │  - searcher pool keyed by index generation      │
//! └─────────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────────┐
//! │              Tantivy Index                       │
//! ├─────────────────────────────────────────────────┤
//! │  - pagename, attachment (raw, stored)           │
//! │  - title, text, link_text (wiki tokenizer)      │
//! │  - links (raw, one value per link)              │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wiki_search::search::{AllowAll, HtmlRenderer, IndexManager, SearchConfig, SearchRunner};
//! use wiki_search::store::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::new());
//!     store.put("FrontPage", "Welcome to the wiki", &["HelpIndex"]);
//!
//!     let config = SearchConfig::default();
//!     let index = Arc::new(IndexManager::new(config.clone(), store.clone()).await?);
//!     index.rebuild_all().await?;
//!
//!     let runner = SearchRunner::new(store, config).with_index(index.clone());
//!     let mut results = runner.search("welcome or linkto:HelpIndex", &AllowAll).await?;
//!     results.sort_by_weight();
//!
//!     let mut html = HtmlRenderer::new();
//!     results.page_list_with_context(&mut html, true, 180, 1);
//!     println!("{}", html.into_string());
//!
//!     index.finish().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod document;
mod error;
mod expression;
mod index;
mod lock;
mod matches;
mod query;
mod queue;
mod render;
mod results;
mod service;
mod tokenizer;

pub use config::{SearchConfig, SearchConfigBuilder};
pub use document::{AccessPolicy, AllowAll, Attachment, Document, PageSchema, PageStore};
pub use error::{SearchError, SearchResult};
pub use expression::{
    Expression, ExpressionKind, LinkSearch, PageFilter, TextSearch, TitleSearch,
    LINK_SEARCH_COST, TEXT_SEARCH_COST, TITLE_SEARCH_COST,
};
pub use index::{
    IndexGeneration, IndexHit, IndexManager, IndexOutcome, IndexStats, INDEX_DIR,
    INDEX_LOCK_DIR, SIGNATURE_FILE,
};
pub use lock::{LockDir, LockGuard};
pub use matches::{unique_matches, Match, MatchKind};
pub use query::QueryParser;
pub use queue::{UpdateQueue, QUEUE_FILE, QUEUE_LOCK_DIR};
pub use render::{HtmlRenderer, Renderer};
pub use results::{context_range, Context, ContextLine, FoundPage, SearchResults, Segment, SortOrder};
pub use service::SearchRunner;
pub use tokenizer::{tokenize, wiki_analyzer, TokenSource, Tokens, WikiToken, WikiTokenizer, WIKI_TOKENIZER};
