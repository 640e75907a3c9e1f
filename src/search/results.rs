//! Search results: ranking, match bookkeeping and snippets

use crate::search::document::Document;
use crate::search::expression::Expression;
use crate::search::matches::{unique_matches, Match, MatchKind};
use crate::search::render::Renderer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Current ordering of the hits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Order in which pages were found
    #[default]
    None,
    Weight,
    Name,
}

/// A run of snippet text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    Plain(String),
    Highlight(String),
}

/// One line of context around one or more matches
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContextLine {
    pub segments: Vec<Segment>,
}

impl ContextLine {
    /// Line text without highlighting
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Plain(text) | Segment::Highlight(text) => text.as_str(),
            })
            .collect()
    }
}

/// Snippet shown below a hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Context {
    /// Highlighted match context
    Lines(Vec<ContextLine>),
    /// No usable match position; start of the page instead
    Leading(String),
}

/// A page (or attachment) in a search result
#[derive(Clone)]
pub struct FoundPage {
    pub name: String,
    /// Attachment file name when the hit is an attachment of `name`
    pub attachment: Option<String>,
    pub document: Option<Arc<dyn Document>>,
    matches: Vec<Match>,
}

impl fmt::Debug for FoundPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FoundPage")
            .field("name", &self.name)
            .field("attachment", &self.attachment)
            .field("matches", &self.matches)
            .finish()
    }
}

impl FoundPage {
    pub fn new(name: impl Into<String>, matches: Vec<Match>) -> Self {
        Self {
            name: name.into(),
            attachment: None,
            document: None,
            matches,
        }
    }

    pub fn with_document(mut self, document: Arc<dyn Document>) -> Self {
        self.document = Some(document);
        self
    }

    pub fn with_attachment(mut self, filename: impl Into<String>) -> Self {
        self.attachment = Some(filename.into());
        self
    }

    pub fn add_matches(&mut self, matches: impl IntoIterator<Item = Match>) {
        self.matches.extend(matches);
    }

    /// Matches as found, duplicates included
    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    /// Unique matches sorted by position
    pub fn unique_matches(&self) -> Vec<Match> {
        unique_matches(&self.matches)
    }

    /// Unique matches of one kind sorted by position
    pub fn unique_matches_of(&self, kind: MatchKind) -> Vec<Match> {
        let mut matches = self.unique_matches();
        matches.retain(|m| m.kind == kind);
        matches
    }

    /// Sum of the unique match weights
    pub fn weight(&self) -> f64 {
        self.unique_matches().iter().map(|m| m.weight).sum()
    }

    /// Name the title matches refer to
    pub fn title(&self) -> &str {
        match &self.document {
            Some(document) => document.name(),
            None => &self.name,
        }
    }

    /// Page title split into plain and highlighted runs
    pub fn title_segments(&self) -> Vec<Segment> {
        let title = self.title();
        let matches = self.unique_matches_of(MatchKind::Title);
        let mut segments = Vec::new();
        let mut pos = 0;
        for m in &matches {
            if m.end > title.len() || pos >= m.end {
                continue;
            }
            if pos < m.start {
                segments.push(Segment::Plain(title[pos..m.start].to_string()));
            }
            segments.push(Segment::Highlight(title[pos.max(m.start)..m.end].to_string()));
            pos = m.end;
        }
        if pos < title.len() {
            segments.push(Segment::Plain(title[pos..].to_string()));
        }
        segments
    }

    /// Up to `max_lines` lines of `width` bytes of context around body matches
    pub fn context_lines(&self, width: usize, max_lines: usize) -> Vec<ContextLine> {
        let Some(document) = &self.document else {
            return Vec::new();
        };
        let body = document.raw_body();
        let matches: Vec<Match> = self
            .unique_matches()
            .into_iter()
            .filter(|m| m.kind != MatchKind::Title && !m.is_empty() && m.end <= body.len())
            .collect();
        if matches.is_empty() {
            return Vec::new();
        }

        let header_len = document.header_text(usize::MAX).len();
        let (mut i, mut start) = first_interesting_match(&matches, header_len);
        let mut lines = Vec::new();

        while i < matches.len() && lines.len() < max_lines {
            let (cstart, cend) = context_range(body, width, &matches[i], start);

            let mut j = matches
                .iter()
                .position(|m| m.start >= cstart)
                .unwrap_or(matches.len() - 1);
            let mut pos = cstart;
            let mut segments = Vec::new();
            loop {
                let m = &matches[j];
                if pos < m.end {
                    if pos < m.start {
                        segments.push(Segment::Plain(body[pos..m.start].to_string()));
                    }
                    segments.push(Segment::Highlight(body[pos.max(m.start)..m.end].to_string()));
                    pos = m.end;
                }
                // merge the next match only if it fits the window completely
                if j + 1 < matches.len() && matches[j + 1].end <= cend {
                    j += 1;
                } else {
                    break;
                }
            }
            if pos < cend {
                segments.push(Segment::Plain(body[pos..cend].to_string()));
            }

            lines.push(ContextLine { segments });
            start = pos;
            i = j + 1;
        }
        lines
    }

    /// Match context, or the start of the page if no match has a position
    pub fn context(&self, width: usize, max_lines: usize) -> Context {
        let lines = self.context_lines(width, max_lines);
        if !lines.is_empty() {
            return Context::Lines(lines);
        }
        let Some(document) = &self.document else {
            return Context::Leading(String::new());
        };
        let leading = document.leading_text(width).trim();
        if !leading.is_empty() {
            return Context::Leading(leading.to_string());
        }
        // header-only pages, e.g. redirects
        Context::Leading(document.header_text(width).to_string())
    }
}

/// Index of the first match after the page header and where context may
/// start; all matches from 0 if every match is inside the header
fn first_interesting_match(matches: &[Match], header_len: usize) -> (usize, usize) {
    match matches.iter().position(|m| m.start >= header_len) {
        Some(i) => (i, header_len),
        None => (0, 0),
    }
}

/// Window of `width` bytes around `m`, not starting before `start` unless
/// the body end leaves no room; surplus context moves to the other side
pub fn context_range(body: &str, width: usize, m: &Match, start: usize) -> (usize, usize) {
    let last = body.len() as isize;
    let context = width.saturating_sub(m.len()) as isize;
    let left = context / 2;
    let right = context - left;

    let mut cstart = m.start as isize - left;
    let mut cend = m.end as isize + right;

    if cstart < start as isize {
        cend += start as isize - cstart;
        cstart = start as isize;
    }
    if cend > last {
        cstart -= cend - last;
        cend = last;
    }
    let cstart = floor_char_boundary(body, cstart.max(0) as usize);
    let cend = floor_char_boundary(body, cend.max(0) as usize);
    (cstart, cend.max(cstart))
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Outcome of one search run
#[derive(Debug)]
pub struct SearchResults {
    pub query: Expression,
    pub hits: Vec<FoundPage>,
    /// Number of existing pages in the wiki
    pub page_count: usize,
    pub elapsed: Duration,
    pub sort: SortOrder,
}

impl SearchResults {
    pub fn new(query: Expression, hits: Vec<FoundPage>, page_count: usize, elapsed: Duration) -> Self {
        Self {
            query,
            hits,
            page_count,
            elapsed,
            sort: SortOrder::None,
        }
    }

    /// Heaviest pages first; ties broken by name, descending
    pub fn sort_by_weight(&mut self) {
        let mut weighted: Vec<(f64, FoundPage)> = std::mem::take(&mut self.hits)
            .into_iter()
            .map(|hit| (hit.weight(), hit))
            .collect();
        weighted.sort_by(|(wa, a), (wb, b)| {
            wb.total_cmp(wa)
                .then_with(|| b.name.cmp(&a.name))
                .then_with(|| b.attachment.cmp(&a.attachment))
        });
        self.hits = weighted.into_iter().map(|(_, hit)| hit).collect();
        self.sort = SortOrder::Weight;
    }

    /// Alphabetical by page name
    pub fn sort_by_name(&mut self) {
        self.hits.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.attachment.cmp(&b.attachment))
        });
        self.sort = SortOrder::Name;
    }

    /// Pass to page links so the target page can highlight the terms
    pub fn highlight(&self) -> String {
        self.query.highlight_pattern()
    }

    /// "N results out of about M pages" paragraph
    pub fn stats(&self, renderer: &mut dyn Renderer) {
        renderer.paragraph(true);
        renderer.text(&format!(
            "{} results out of about {} pages.",
            self.hits.len(),
            self.page_count
        ));
        renderer.text(&format!(" ({:.2} seconds)", self.elapsed.as_secs_f64()));
        renderer.paragraph(false);
    }

    /// Plain list of found pages
    pub fn page_list(&self, renderer: &mut dyn Renderer, info: bool, numbered: bool) {
        let highlight = self.highlight();
        renderer.container(true);
        if !self.hits.is_empty() {
            renderer.list(true, numbered);
            for hit in &self.hits {
                renderer.list_item(true);
                render_title(renderer, hit, &highlight);
                if info {
                    render_info(renderer, hit);
                }
                renderer.list_item(false);
            }
            renderer.list(false, numbered);
        }
        renderer.container(false);
    }

    /// Found pages with highlighted context below each one
    pub fn page_list_with_context(
        &self,
        renderer: &mut dyn Renderer,
        info: bool,
        width: usize,
        max_lines: usize,
    ) {
        let highlight = self.highlight();
        renderer.container(true);
        if !self.hits.is_empty() {
            renderer.definition_list(true);
            for hit in &self.hits {
                renderer.definition_term(true);
                render_title(renderer, hit, &highlight);
                if info {
                    render_info(renderer, hit);
                }
                renderer.definition_term(false);

                renderer.definition_desc(true);
                match hit.context(width, max_lines) {
                    Context::Lines(lines) => {
                        for line in lines {
                            renderer.text("...");
                            render_segments(renderer, &line.segments);
                            renderer.text("...");
                            renderer.line_break();
                        }
                    }
                    Context::Leading(text) => renderer.text(&text),
                }
                renderer.definition_desc(false);
            }
            renderer.definition_list(false);
        }
        renderer.container(false);
    }
}

fn render_segments(renderer: &mut dyn Renderer, segments: &[Segment]) {
    for segment in segments {
        match segment {
            Segment::Plain(text) => renderer.text(text),
            Segment::Highlight(text) => {
                renderer.strong(true);
                renderer.text(text);
                renderer.strong(false);
            }
        }
    }
}

fn render_title(renderer: &mut dyn Renderer, hit: &FoundPage, highlight: &str) {
    renderer.page_link(true, &hit.name, Some(highlight));
    match &hit.attachment {
        Some(filename) => {
            renderer.text(&hit.name);
            renderer.text("/");
            // title matches of an attachment refer to its file name
            if hit.title() == filename {
                render_segments(renderer, &hit.title_segments());
            } else {
                renderer.text(filename);
            }
        }
        None => render_segments(renderer, &hit.title_segments()),
    }
    renderer.page_link(false, &hit.name, None);
}

fn render_info(renderer: &mut dyn Renderer, hit: &FoundPage) {
    let count = hit.unique_matches().len();
    let label = if count == 1 { "match" } else { "matches" };
    renderer.info(&format!(" . . . {} {}", count, label));
}
