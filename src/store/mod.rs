//! Page storage backends
//!
//! The search subsystem only reads pages through the
//! [`PageStore`](crate::search::PageStore) trait; these are the stores
//! shipped with the crate.

pub mod directory;
pub mod memory;

pub use directory::DirectoryStore;
pub use memory::MemoryStore;

use crate::search::Document;

/// A page revision held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPage {
    pub name: String,
    pub body: String,
    pub links: Vec<String>,
    /// False once the page has been deleted
    pub exists: bool,
}

impl StoredPage {
    pub fn new(name: impl Into<String>, body: impl Into<String>, links: Vec<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
            links,
            exists: true,
        }
    }
}

impl Document for StoredPage {
    fn name(&self) -> &str {
        &self.name
    }

    fn raw_body(&self) -> &str {
        &self.body
    }

    fn outgoing_links(&self) -> Vec<String> {
        self.links.clone()
    }

    fn exists(&self) -> bool {
        self.exists
    }
}
