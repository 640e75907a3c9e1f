use crate::search::{Attachment, Document, PageStore};
use crate::store::StoredPage;
use dashmap::DashMap;
use std::sync::Arc;

/// In-memory page store (for embedding and testing)
#[derive(Clone)]
pub struct MemoryStore {
    pages: Arc<DashMap<String, Arc<StoredPage>>>,
    attachments: Arc<DashMap<String, Vec<Attachment>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            pages: Arc::new(DashMap::new()),
            attachments: Arc::new(DashMap::new()),
        }
    }

    /// Create or replace a page
    pub fn put(&self, name: &str, body: &str, links: &[&str]) {
        let links = links.iter().map(|link| link.to_string()).collect();
        self.pages
            .insert(name.to_string(), Arc::new(StoredPage::new(name, body, links)));
        tracing::debug!(page = %name, "Page saved");
    }

    /// Delete a page; its name stays known, like a page with history
    pub fn delete(&self, name: &str) {
        if let Some(mut entry) = self.pages.get_mut(name) {
            let mut page = StoredPage::clone(&entry);
            page.body.clear();
            page.links.clear();
            page.exists = false;
            *entry = Arc::new(page);
            tracing::debug!(page = %name, "Page deleted");
        }
    }

    /// Attach a file with its extracted text to a page
    pub fn attach(&self, page: &str, filename: &str, content: &str) {
        let mut entry = self.attachments.entry(page.to_string()).or_default();
        entry.retain(|attachment| attachment.filename != filename);
        entry.push(Attachment {
            filename: filename.to_string(),
            content: content.to_string(),
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PageStore for MemoryStore {
    fn page_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.pages.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    fn document(&self, name: &str) -> Option<Arc<dyn Document>> {
        self.pages
            .get(name)
            .map(|entry| Arc::clone(entry.value()) as Arc<dyn Document>)
    }

    fn attachments(&self, name: &str) -> Vec<Attachment> {
        self.attachments
            .get(name)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deleted_page_keeps_name() {
        let store = MemoryStore::new();
        store.put("FrontPage", "Welcome", &["HelpIndex"]);
        store.put("Scratch", "temporary", &[]);
        store.delete("Scratch");

        assert_eq!(store.page_names(), vec!["FrontPage", "Scratch"]);
        assert_eq!(store.page_count(), 1);
        let deleted = store.document("Scratch").unwrap();
        assert!(!deleted.exists());
        assert_eq!(deleted.raw_body(), "");
    }

    #[test]
    fn test_attach_replaces_same_filename() {
        let store = MemoryStore::new();
        store.put("FrontPage", "Welcome", &[]);
        store.attach("FrontPage", "notes.txt", "first");
        store.attach("FrontPage", "notes.txt", "second");

        let attachments = store.attachments("FrontPage");
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].content, "second");
        assert!(store.attachments("Missing").is_empty());
    }
}
