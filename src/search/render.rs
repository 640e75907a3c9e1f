//! Output renderers for search results
//!
//! [`SearchResults`](crate::search::SearchResults) drives a [`Renderer`]
//! through open/close calls; the renderer decides the markup.

/// Markup sink used by the result views
pub trait Renderer {
    fn text(&mut self, text: &str);
    fn strong(&mut self, on: bool);
    /// Link to a page; `highlight` is passed along when opening
    fn page_link(&mut self, on: bool, page: &str, highlight: Option<&str>);
    fn list(&mut self, on: bool, numbered: bool);
    fn list_item(&mut self, on: bool);
    fn definition_list(&mut self, on: bool);
    fn definition_term(&mut self, on: bool);
    fn definition_desc(&mut self, on: bool);
    fn paragraph(&mut self, on: bool);
    fn line_break(&mut self);
    /// Secondary information such as match counts
    fn info(&mut self, text: &str);
    /// Wrapper around a complete result view
    fn container(&mut self, on: bool);
}

/// Renders escaped HTML into a string
#[derive(Debug, Clone, Default)]
pub struct HtmlRenderer {
    out: String,
    base_url: String,
}

impl HtmlRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix for page links, e.g. `/wiki/`
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn into_string(self) -> String {
        self.out
    }

    fn tag(&mut self, on: bool, name: &str) {
        if on {
            self.out.push('<');
        } else {
            self.out.push_str("</");
        }
        self.out.push_str(name);
        self.out.push('>');
    }

    /// Escape HTML special characters
    fn escape_html(s: &str) -> String {
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#x27;")
    }
}

impl Renderer for HtmlRenderer {
    fn text(&mut self, text: &str) {
        self.out.push_str(&Self::escape_html(text));
    }

    fn strong(&mut self, on: bool) {
        self.tag(on, "strong");
    }

    fn page_link(&mut self, on: bool, page: &str, highlight: Option<&str>) {
        if !on {
            self.out.push_str("</a>");
            return;
        }
        let mut href = format!("{}{}", self.base_url, urlencoding::encode(page));
        if let Some(pattern) = highlight.filter(|p| !p.is_empty()) {
            href.push_str("?highlight=");
            href.push_str(&urlencoding::encode(pattern));
        }
        self.out
            .push_str(&format!("<a href=\"{}\">", Self::escape_html(&href)));
    }

    fn list(&mut self, on: bool, numbered: bool) {
        self.tag(on, if numbered { "ol" } else { "ul" });
    }

    fn list_item(&mut self, on: bool) {
        self.tag(on, "li");
    }

    fn definition_list(&mut self, on: bool) {
        self.tag(on, "dl");
    }

    fn definition_term(&mut self, on: bool) {
        self.tag(on, "dt");
    }

    fn definition_desc(&mut self, on: bool) {
        self.tag(on, "dd");
    }

    fn paragraph(&mut self, on: bool) {
        self.tag(on, "p");
    }

    fn line_break(&mut self) {
        self.out.push_str("<br>");
    }

    fn info(&mut self, text: &str) {
        self.out.push_str("<span class=\"info\">");
        self.text(text);
        self.out.push_str("</span>");
    }

    fn container(&mut self, on: bool) {
        if on {
            self.out.push_str("<div class=\"searchresults\">\n");
        } else {
            self.out.push_str("\n</div>");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::expression::Expression;
    use crate::search::matches::Match;
    use crate::search::results::{FoundPage, SearchResults};
    use std::time::Duration;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            HtmlRenderer::escape_html("<a href=\"x\">&'"),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#x27;"
        );
    }

    #[test]
    fn test_page_link_carries_highlight() {
        let mut renderer = HtmlRenderer::new().with_base_url("/wiki/");
        renderer.page_link(true, "Front Page", Some("(foo)"));
        renderer.text("Front Page");
        renderer.page_link(false, "Front Page", None);
        assert_eq!(
            renderer.as_str(),
            "<a href=\"/wiki/Front%20Page?highlight=%28foo%29\">Front Page</a>"
        );
    }

    #[test]
    fn test_page_list_marks_title_matches() {
        let results = SearchResults::new(
            Expression::title("Page", false, false),
            vec![FoundPage::new("FrontPage", vec![Match::title(5, 9)])],
            3,
            Duration::from_millis(10),
        );
        let mut renderer = HtmlRenderer::new();
        results.page_list(&mut renderer, true, true);
        let html = renderer.into_string();

        assert!(html.starts_with("<div class=\"searchresults\">"));
        assert!(html.contains("<ol><li><a href=\"FrontPage?highlight=%28Page%29\">"));
        assert!(html.contains("Front<strong>Page</strong></a>"));
        assert!(html.contains("<span class=\"info\"> . . . 1 match</span>"));
    }

    #[test]
    fn test_stats_line() {
        let results = SearchResults::new(Expression::nothing(), Vec::new(), 42, Duration::from_millis(1500));
        let mut renderer = HtmlRenderer::new();
        results.stats(&mut renderer);
        assert_eq!(
            renderer.as_str(),
            "<p>0 results out of about 42 pages. (1.50 seconds)</p>"
        );
    }
}
