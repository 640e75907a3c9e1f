//! Page documents, storage collaborators and the index schema

use crate::search::tokenizer::{tokenize, WIKI_TOKENIZER};
use std::sync::Arc;
use tantivy::schema::*;
use tantivy::TantivyDocument;

/// Read-only view of a stored page
pub trait Document: Send + Sync {
    /// Page name
    fn name(&self) -> &str;

    /// Raw markup of the current revision
    fn raw_body(&self) -> &str;

    /// Names of the pages this page links to
    fn outgoing_links(&self) -> Vec<String>;

    /// False for deleted pages whose history is still around
    fn exists(&self) -> bool;

    /// Leading processing-instruction block (`#format`, `#acl`, ...), at most
    /// `max_len` bytes
    fn header_text(&self, max_len: usize) -> &str {
        let body = self.raw_body();
        let mut end = 0;
        for line in body.split_inclusive('\n') {
            if !line.starts_with('#') {
                break;
            }
            end += line.len();
        }
        truncate(&body[..end], max_len)
    }

    /// Body text after the header, at most `max_len` bytes
    fn leading_text(&self, max_len: usize) -> &str {
        let body = self.raw_body();
        let header = self.header_text(usize::MAX).len();
        truncate(&body[header..], max_len)
    }
}

/// Extracted text of a file attached to a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content: String,
}

/// Storage collaborator: enumerates and opens pages
pub trait PageStore: Send + Sync {
    /// Names of all pages, including deleted ones that still have history
    fn page_names(&self) -> Vec<String>;

    /// Open a page; `None` if the name is unknown
    fn document(&self, name: &str) -> Option<Arc<dyn Document>>;

    /// Attachments of a page with their extracted text
    fn attachments(&self, name: &str) -> Vec<Attachment>;

    /// Number of existing pages, reported with search results
    fn page_count(&self) -> usize {
        self.page_names()
            .iter()
            .filter(|name| self.document(name).is_some_and(|doc| doc.exists()))
            .count()
    }
}

/// Access-control collaborator
pub trait AccessPolicy: Send + Sync {
    fn may_read(&self, name: &str) -> bool;
}

impl<F> AccessPolicy for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn may_read(&self, name: &str) -> bool {
        self(name)
    }
}

/// Policy that lets everybody read everything (used while indexing)
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn may_read(&self, _name: &str) -> bool {
        true
    }
}

/// Cut a string at `max_len` bytes without splitting a character
pub(crate) fn truncate(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Field handles of the page index
#[derive(Debug, Clone)]
pub struct PageSchema {
    pub schema: Schema,
    pub pagename: Field,
    pub attachment: Field,
    pub title: Field,
    pub text: Field,
    pub links: Field,
    pub link_text: Field,
}

impl PageSchema {
    pub fn new() -> Self {
        let mut schema_builder = Schema::builder();

        let tokenized = TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(WIKI_TOKENIZER)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        );

        // Page name - exact key for deletes, stored to map hits back to pages
        let pagename = schema_builder.add_text_field("pagename", STRING | STORED);

        // Attachment file name, empty for the page itself
        let attachment = schema_builder.add_text_field("attachment", STRING | STORED);

        let title = schema_builder.add_text_field("title", tokenized.clone());
        let text = schema_builder.add_text_field("text", tokenized.clone());

        // Link targets are indexed untokenized, one value per link
        let links = schema_builder.add_text_field("links", STRING);
        let link_text = schema_builder.add_text_field("link_text", tokenized);

        Self {
            schema: schema_builder.build(),
            pagename,
            attachment,
            title,
            text,
            links,
            link_text,
        }
    }

    /// Build the index documents of a page: the page itself plus one per
    /// attachment
    pub fn page_documents(
        &self,
        page: &dyn Document,
        attachments: &[Attachment],
    ) -> Vec<TantivyDocument> {
        let mut documents = Vec::with_capacity(1 + attachments.len());

        let links = page.outgoing_links();
        let mut doc = TantivyDocument::new();
        doc.add_text(self.pagename, page.name());
        doc.add_text(self.attachment, "");
        doc.add_text(self.title, page.name());
        doc.add_text(self.text, page.raw_body());
        for link in tokenize(&links).texts() {
            doc.add_text(self.links, &link);
        }
        doc.add_text(self.link_text, links.join(" "));
        documents.push(doc);

        for attachment in attachments {
            let mut doc = TantivyDocument::new();
            doc.add_text(self.pagename, page.name());
            doc.add_text(self.attachment, &attachment.filename);
            // the file name is the "title" of an attachment
            doc.add_text(self.title, &attachment.filename);
            doc.add_text(self.text, &attachment.content);
            documents.push(doc);
        }

        documents
    }
}

impl Default for PageSchema {
    fn default() -> Self {
        Self::new()
    }
}
