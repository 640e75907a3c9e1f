//! Pages stored as files in a directory
//!
//! ```text
//! <root>/<page name, url-encoded>                       page markup
//! <root>/<page name, url-encoded>.attachments/<file>    attachment text
//! ```
//!
//! Outgoing links are the `[[Target]]` and `[[Target|label]]` references of
//! the markup.

use crate::search::{Attachment, Document, PageStore};
use crate::store::StoredPage;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

const ATTACHMENTS_SUFFIX: &str = ".attachments";

static LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\[\s*([^\]|]+?)\s*(?:\|[^\]]*)?\]\]").expect("link pattern is valid")
});

/// Read-only page store over a directory tree
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn page_path(&self, name: &str) -> PathBuf {
        self.root.join(&*urlencoding::encode(name))
    }

    /// Link targets referenced by the markup, in order, without duplicates
    pub fn parse_links(body: &str) -> Vec<String> {
        let mut links: Vec<String> = Vec::new();
        for caps in LINK_RE.captures_iter(body) {
            let target = caps[1].to_string();
            if !links.contains(&target) {
                links.push(target);
            }
        }
        links
    }
}

impl PageStore for DirectoryStore {
    fn page_names(&self) -> Vec<String> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(root = %self.root.display(), error = %e, "Cannot list pages");
                return Vec::new();
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| {
                let file_name = entry.file_name();
                let file_name = file_name.to_str()?;
                urlencoding::decode(file_name).ok().map(|name| name.into_owned())
            })
            .filter(|name| !name.starts_with('.'))
            .collect();
        names.sort();
        names
    }

    fn document(&self, name: &str) -> Option<Arc<dyn Document>> {
        let body = std::fs::read_to_string(self.page_path(name)).ok()?;
        let links = Self::parse_links(&body);
        Some(Arc::new(StoredPage::new(name, body, links)))
    }

    fn attachments(&self, name: &str) -> Vec<Attachment> {
        let mut dir = self.page_path(name).into_os_string();
        dir.push(ATTACHMENTS_SUFFIX);
        let Ok(entries) = std::fs::read_dir(PathBuf::from(dir)) else {
            return Vec::new();
        };

        let mut attachments: Vec<Attachment> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let filename = entry.file_name().to_str()?.to_string();
                let bytes = std::fs::read(entry.path()).ok()?;
                Some(Attachment {
                    filename,
                    content: String::from_utf8_lossy(&bytes).into_owned(),
                })
            })
            .collect();
        attachments.sort_by(|a, b| a.filename.cmp(&b.filename));
        attachments
    }
}
