//! Wiki full-text search
//!
//! Query parsing, exact page matching, a lock-coordinated Tantivy index with
//! a durable update queue, and result ranking with highlighted snippets.

pub mod search;
pub mod store;

pub use search::{SearchConfig, SearchError, SearchResult, SearchRunner};
