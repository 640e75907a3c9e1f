//! Query expression tree
//!
//! A parsed query is a tree of [`Expression`] nodes. Leaves search page names
//! (`TitleSearch`), page text (`TextSearch`) or the outgoing link list
//! (`LinkSearch`); inner nodes combine their children with AND or OR.
//!
//! Every node can be evaluated exactly against a [`Document`], estimate its
//! own cost, offer a cheap page-name filter, produce a highlight pattern and
//! translate itself into a tantivy query that selects candidate pages.

use crate::search::document::{Document, PageSchema};
use crate::search::matches::Match;
use regex::{Regex, RegexBuilder};
use std::fmt;
use tantivy::query::{
    AllQuery, BooleanQuery, BoostQuery, EmptyQuery, Occur, Query, RegexQuery,
    TermQuery,
};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::Term;

/// Relative evaluation cost of a title search
pub const TITLE_SEARCH_COST: u64 = 100;
/// Relative evaluation cost of a link search
pub const LINK_SEARCH_COST: u64 = 5_000;
/// Relative evaluation cost of a text search
pub const TEXT_SEARCH_COST: u64 = 10_000;

/// Page-name predicate used to narrow the page list before evaluation
pub type PageFilter<'a> = Box<dyn Fn(&str) -> bool + Send + Sync + 'a>;

/// A compiled search pattern
#[derive(Debug, Clone)]
struct Pattern {
    /// Regular expression source actually used
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compile `pattern`; text that is not meant as (or is not) a valid
    /// regular expression is matched literally.
    fn compile(pattern: &str, use_regex: bool, case_sensitive: bool) -> Self {
        if use_regex {
            if let Ok(regex) = RegexBuilder::new(pattern)
                .case_insensitive(!case_sensitive)
                .build()
            {
                return Self {
                    source: pattern.to_string(),
                    regex,
                };
            }
        }
        let source = regex::escape(pattern);
        let regex = RegexBuilder::new(&source)
            .case_insensitive(!case_sensitive)
            .build()
            .expect("escaped literal is a valid regex");
        Self { source, regex }
    }
}

/// Accept/reject decision shared by all leaf terms
fn decide(negated: bool, matches: Vec<Match>) -> Option<Vec<Match>> {
    match (negated, matches.is_empty()) {
        (false, true) | (true, false) => None,
        (false, false) => Some(matches),
        // a negated term that found nothing is true but has nothing to show
        (true, true) => Some(vec![Match::empty()]),
    }
}

/// Search in page names only
#[derive(Debug, Clone)]
pub struct TitleSearch {
    pattern: String,
    use_regex: bool,
    case_sensitive: bool,
    compiled: Pattern,
}

impl TitleSearch {
    pub fn new(pattern: impl Into<String>, use_regex: bool, case_sensitive: bool) -> Self {
        let pattern = pattern.into();
        let compiled = Pattern::compile(&pattern, use_regex, case_sensitive);
        Self {
            pattern,
            use_regex,
            case_sensitive,
            compiled,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn use_regex(&self) -> bool {
        self.use_regex
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    fn find(&self, name: &str) -> Vec<Match> {
        self.compiled
            .regex
            .find_iter(name)
            .map(|m| Match::title(m.start(), m.end()))
            .collect()
    }

    fn search(&self, doc: &dyn Document, negated: bool) -> Option<Vec<Match>> {
        decide(negated, self.find(doc.name()))
    }

    fn highlight_pattern(&self) -> String {
        format!("({})", self.compiled.source)
    }

    fn index_query(&self, schema: &PageSchema) -> Box<dyn Query> {
        if self.use_regex {
            return term_regex_query(schema.title, &self.pattern);
        }
        boolean_or_all(literal_clauses(schema.title, &self.pattern))
    }
}

/// Search in page text and page name
#[derive(Debug, Clone)]
pub struct TextSearch {
    pattern: String,
    use_regex: bool,
    case_sensitive: bool,
    compiled: Pattern,
    title: TitleSearch,
}

impl TextSearch {
    pub fn new(pattern: impl Into<String>, use_regex: bool, case_sensitive: bool) -> Self {
        let pattern = pattern.into();
        let compiled = Pattern::compile(&pattern, use_regex, case_sensitive);
        let title = TitleSearch::new(pattern.clone(), use_regex, case_sensitive);
        Self {
            pattern,
            use_regex,
            case_sensitive,
            compiled,
            title,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn use_regex(&self) -> bool {
        self.use_regex
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    fn search(&self, doc: &dyn Document, negated: bool) -> Option<Vec<Match>> {
        let mut matches = self.title.find(doc.name());
        matches.extend(
            self.compiled
                .regex
                .find_iter(doc.raw_body())
                .map(|m| Match::text(m.start(), m.end())),
        );
        decide(negated, matches)
    }

    fn highlight_pattern(&self) -> String {
        format!("({})", self.compiled.source)
    }

    fn index_query(&self, schema: &PageSchema) -> Box<dyn Query> {
        let text_query = if self.use_regex {
            let mut pattern = self.pattern.as_str();
            pattern = pattern.strip_prefix('^').unwrap_or(pattern);
            pattern = pattern.strip_prefix(r"\b").unwrap_or(pattern);
            term_regex_query(schema.text, pattern)
        } else {
            boolean_or_all(literal_clauses(schema.text, &self.pattern))
        };

        Box::new(BooleanQuery::new(vec![
            (Occur::Should, self.title.index_query(schema)),
            (Occur::Should, text_query),
        ]))
    }
}

/// Search pages linking to a page
#[derive(Debug, Clone)]
pub struct LinkSearch {
    pattern: String,
    text_pattern: String,
    use_regex: bool,
    case_sensitive: bool,
    /// `None` when the pattern is compared literally
    link_regex: Option<Regex>,
    text: TextSearch,
}

impl LinkSearch {
    pub fn new(pattern: impl Into<String>, use_regex: bool, case_sensitive: bool) -> Self {
        let pattern = pattern.into().replace('_', " ");

        // subpage links "Parent/Child" are mentioned in the text as either part
        let alternatives: Vec<String> = if use_regex {
            pattern.split('/').map(str::to_string).collect()
        } else {
            pattern.split('/').map(regex::escape).collect()
        };
        let text_pattern = format!("({})", alternatives.join("|"));

        let link_regex = if use_regex {
            RegexBuilder::new(&format!("^(?:{})", pattern))
                .case_insensitive(!case_sensitive)
                .build()
                .ok()
        } else {
            None
        };

        let text = TextSearch::new(text_pattern.clone(), true, case_sensitive);
        Self {
            pattern,
            text_pattern,
            use_regex,
            case_sensitive,
            link_regex,
            text,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Pattern used to find inlined mentions of the link target
    pub fn text_pattern(&self) -> &str {
        &self.text_pattern
    }

    pub fn use_regex(&self) -> bool {
        self.use_regex
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    fn links_to(&self, link: &str) -> bool {
        match &self.link_regex {
            Some(regex) => regex.is_match(link),
            None => link == self.pattern,
        }
    }

    fn search(&self, doc: &dyn Document, negated: bool) -> Option<Vec<Match>> {
        let mut matches = Vec::new();
        if doc.outgoing_links().iter().any(|link| self.links_to(link)) {
            match self.text.search(doc, false) {
                Some(found) => matches.extend(found),
                // linked without naming the target, e.g. through a navigation macro
                None => matches.push(Match::text(0, 0)),
            }
        }
        decide(negated, matches)
    }

    fn highlight_pattern(&self) -> String {
        format!("({})", self.text_pattern)
    }

    fn index_query(&self, schema: &PageSchema) -> Box<dyn Query> {
        if self.link_regex.is_some() {
            let pattern = self.pattern.strip_prefix('^').unwrap_or(&self.pattern);
            let pattern = if self.case_sensitive {
                format!("(?:{}).*", pattern)
            } else {
                format!("(?i)(?:{}).*", pattern)
            };
            return match RegexQuery::from_pattern(&pattern, schema.links) {
                Ok(query) => Box::new(query),
                Err(_) => Box::new(AllQuery),
            };
        }
        let term = Term::from_field_text(schema.links, &self.pattern);
        Box::new(BoostQuery::new(
            Box::new(TermQuery::new(term, IndexRecordOption::Basic)),
            10.0,
        ))
    }
}

/// Variant data of an expression node
#[derive(Debug, Clone)]
pub enum ExpressionKind {
    /// Matches nothing; the result of parsing an empty query
    Nothing,
    Title(TitleSearch),
    Text(TextSearch),
    Link(LinkSearch),
    /// All subterms must match; kept sorted by ascending cost
    And(Vec<Expression>),
    /// Any subterm may match; kept sorted by ascending cost
    Or(Vec<Expression>),
}

/// A node of the query expression tree
#[derive(Debug, Clone)]
pub struct Expression {
    negated: bool,
    kind: ExpressionKind,
}

impl Expression {
    pub fn nothing() -> Self {
        Self::from_kind(ExpressionKind::Nothing)
    }

    pub fn title(pattern: impl Into<String>, use_regex: bool, case_sensitive: bool) -> Self {
        Self::from_kind(ExpressionKind::Title(TitleSearch::new(
            pattern,
            use_regex,
            case_sensitive,
        )))
    }

    pub fn text(pattern: impl Into<String>, use_regex: bool, case_sensitive: bool) -> Self {
        Self::from_kind(ExpressionKind::Text(TextSearch::new(
            pattern,
            use_regex,
            case_sensitive,
        )))
    }

    pub fn link(pattern: impl Into<String>, use_regex: bool, case_sensitive: bool) -> Self {
        Self::from_kind(ExpressionKind::Link(LinkSearch::new(
            pattern,
            use_regex,
            case_sensitive,
        )))
    }

    pub fn and(subterms: Vec<Expression>) -> Self {
        let mut expression = Self::from_kind(ExpressionKind::And(subterms));
        expression.sort_by_cost();
        expression
    }

    pub fn or(subterms: Vec<Expression>) -> Self {
        let mut expression = Self::from_kind(ExpressionKind::Or(subterms));
        expression.sort_by_cost();
        expression
    }

    fn from_kind(kind: ExpressionKind) -> Self {
        Self {
            negated: false,
            kind,
        }
    }

    pub fn kind(&self) -> &ExpressionKind {
        &self.kind
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Mark the term as negated. Negating twice leaves it negated.
    pub fn negate(&mut self) {
        self.negated = true;
    }

    /// Children of an AND/OR node in evaluation order, empty for leaves
    pub fn subterms(&self) -> &[Expression] {
        match &self.kind {
            ExpressionKind::And(terms) | ExpressionKind::Or(terms) => terms,
            _ => &[],
        }
    }

    /// Add a subterm to an AND/OR node; returns false for leaves
    pub fn push(&mut self, expression: Expression) -> bool {
        match &mut self.kind {
            ExpressionKind::And(terms) | ExpressionKind::Or(terms) => {
                terms.push(expression);
                self.sort_by_cost();
                true
            }
            _ => false,
        }
    }

    fn sort_by_cost(&mut self) {
        if let ExpressionKind::And(terms) | ExpressionKind::Or(terms) = &mut self.kind {
            // stable: equal costs keep query order
            terms.sort_by_key(Expression::cost);
        }
    }

    /// Relative evaluation cost, used only to order subterms
    pub fn cost(&self) -> u64 {
        match &self.kind {
            ExpressionKind::Nothing => 0,
            ExpressionKind::Title(_) => TITLE_SEARCH_COST,
            ExpressionKind::Link(_) => LINK_SEARCH_COST,
            ExpressionKind::Text(_) => TEXT_SEARCH_COST,
            ExpressionKind::And(terms) | ExpressionKind::Or(terms) => {
                terms.iter().map(Expression::cost).sum()
            }
        }
    }

    /// Evaluate against a page
    ///
    /// Returns the matches when the expression holds, `None` otherwise. A
    /// satisfied expression may carry only a zero-length match.
    pub fn search(&self, doc: &dyn Document) -> Option<Vec<Match>> {
        match &self.kind {
            ExpressionKind::Nothing => decide(self.negated, Vec::new()),
            ExpressionKind::Title(term) => term.search(doc, self.negated),
            ExpressionKind::Text(term) => term.search(doc, self.negated),
            ExpressionKind::Link(term) => term.search(doc, self.negated),
            ExpressionKind::And(terms) => {
                let mut matches = Vec::new();
                let mut holds = true;
                for term in terms {
                    match term.search(doc) {
                        Some(found) => matches.extend(found),
                        None => {
                            holds = false;
                            break;
                        }
                    }
                }
                self.compound_result(holds, matches)
            }
            ExpressionKind::Or(terms) => {
                let mut matches = Vec::new();
                for term in terms {
                    if let Some(found) = term.search(doc) {
                        matches.extend(found);
                    }
                }
                let holds = !matches.is_empty();
                self.compound_result(holds, matches)
            }
        }
    }

    fn compound_result(&self, holds: bool, matches: Vec<Match>) -> Option<Vec<Match>> {
        match (self.negated, holds) {
            (false, true) => Some(matches),
            (true, false) => Some(vec![Match::empty()]),
            _ => None,
        }
    }

    /// Cheap page-name predicate implied by the expression, if any
    pub fn page_filter(&self) -> Option<PageFilter<'_>> {
        match &self.kind {
            ExpressionKind::Title(term) => {
                let negated = self.negated;
                Some(Box::new(move |name: &str| {
                    term.compiled.regex.is_match(name) != negated
                }))
            }
            ExpressionKind::And(terms) if !self.negated => {
                let filters: Vec<PageFilter<'_>> =
                    terms.iter().filter_map(Expression::page_filter).collect();
                if filters.is_empty() {
                    return None;
                }
                Some(Box::new(move |name: &str| filters.iter().all(|f| f(name))))
            }
            ExpressionKind::Or(terms) if !self.negated => {
                let filters: Option<Vec<PageFilter<'_>>> =
                    terms.iter().map(Expression::page_filter).collect();
                let filters = filters?;
                Some(Box::new(move |name: &str| filters.iter().any(|f| f(name))))
            }
            _ => None,
        }
    }

    /// Regular expression describing what to highlight on the found pages
    pub fn highlight_pattern(&self) -> String {
        match &self.kind {
            ExpressionKind::Nothing => String::new(),
            ExpressionKind::Title(term) => term.highlight_pattern(),
            ExpressionKind::Text(term) => term.highlight_pattern(),
            ExpressionKind::Link(term) => term.highlight_pattern(),
            ExpressionKind::And(terms) | ExpressionKind::Or(terms) => terms
                .iter()
                .map(Expression::highlight_pattern)
                .filter(|pattern| !pattern.is_empty())
                .collect::<Vec<_>>()
                .join("|"),
        }
    }

    /// Translate into a tantivy query selecting candidate pages
    ///
    /// Negated terms select everything: excluding an approximate match set
    /// could drop pages the exact evaluation would accept.
    pub fn to_index_query(&self, schema: &PageSchema) -> Box<dyn Query> {
        if self.negated {
            return Box::new(AllQuery);
        }
        match &self.kind {
            ExpressionKind::Nothing => Box::new(EmptyQuery),
            ExpressionKind::Title(term) => term.index_query(schema),
            ExpressionKind::Text(term) => term.index_query(schema),
            ExpressionKind::Link(term) => term.index_query(schema),
            ExpressionKind::And(terms) => boolean_or_all(
                terms
                    .iter()
                    .map(|term| (Occur::Must, term.to_index_query(schema)))
                    .collect(),
            ),
            ExpressionKind::Or(terms) => {
                if terms.is_empty() {
                    return Box::new(EmptyQuery);
                }
                Box::new(BooleanQuery::new(
                    terms
                        .iter()
                        .map(|term| (Occur::Should, term.to_index_query(schema)))
                        .collect(),
                ))
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "-")?;
        }
        let join = |f: &mut fmt::Formatter<'_>, terms: &[Expression], operator: &str| {
            write!(f, "[")?;
            for (i, term) in terms.iter().enumerate() {
                if i > 0 {
                    write!(f, "{}", operator)?;
                }
                write!(f, "{}", term)?;
            }
            write!(f, "]")
        };
        match &self.kind {
            ExpressionKind::Nothing => write!(f, "[]"),
            ExpressionKind::Title(term) => write!(f, "!\"{}\"", term.pattern),
            ExpressionKind::Text(term) => write!(f, "\"{}\"", term.pattern),
            ExpressionKind::Link(term) => write!(f, "linkto:\"{}\"", term.pattern),
            ExpressionKind::And(terms) => join(f, terms, " "),
            ExpressionKind::Or(terms) => join(f, terms, " or "),
        }
    }
}

/// Regex over the lower cased term dictionary; anything tantivy cannot
/// compile selects every document.
fn term_regex_query(field: Field, pattern: &str) -> Box<dyn Query> {
    let pattern = pattern.strip_prefix('^').unwrap_or(pattern).to_lowercase();
    match RegexQuery::from_pattern(&format!(".*(?:{}).*", pattern), field) {
        Ok(query) => Box::new(query),
        Err(_) => Box::new(AllQuery),
    }
}

/// Terms containing `token`
fn substring_query(field: Field, token: &str) -> Box<dyn Query> {
    match RegexQuery::from_pattern(&format!(".*{}.*", regex::escape(token)), field) {
        Ok(query) => Box::new(query),
        Err(_) => Box::new(AllQuery),
    }
}

/// Every alphanumeric run of a literal pattern must occur inside some term
///
/// Any such run in the page text lies within a single indexed token, so this
/// never drops a page that the exact substring search would accept.
fn literal_clauses(field: Field, pattern: &str) -> Vec<(Occur, Box<dyn Query>)> {
    pattern
        .split(|c: char| !c.is_alphanumeric())
        .filter(|piece| !piece.is_empty())
        .map(|piece| (Occur::Must, substring_query(field, &piece.to_lowercase())))
        .collect()
}

fn boolean_or_all(clauses: Vec<(Occur, Box<dyn Query>)>) -> Box<dyn Query> {
    if clauses.is_empty() {
        Box::new(AllQuery)
    } else {
        Box::new(BooleanQuery::new(clauses))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Page {
        name: &'static str,
        body: &'static str,
        links: Vec<&'static str>,
    }

    impl Document for Page {
        fn name(&self) -> &str {
            self.name
        }
        fn raw_body(&self) -> &str {
            self.body
        }
        fn outgoing_links(&self) -> Vec<String> {
            self.links.iter().map(|l| l.to_string()).collect()
        }
        fn exists(&self) -> bool {
            true
        }
    }

    fn page(name: &'static str, body: &'static str, links: Vec<&'static str>) -> Page {
        Page { name, body, links }
    }

    #[test]
    fn test_title_search_matches_name_only() {
        let doc = page("FrontPage", "nothing about the title", vec![]);
        let term = Expression::title("front", false, false);

        let matches = term.search(&doc).unwrap();
        assert_eq!(matches, vec![Match::title(0, 5)]);
        assert!(Expression::title("nothing", false, false).search(&doc).is_none());
    }

    #[test]
    fn test_negated_title_search() {
        let doc = page("FrontPage", "", vec![]);
        let mut term = Expression::title("Recent", false, false);
        term.negate();

        // no match + negated: true without a position
        assert_eq!(term.search(&doc), Some(vec![Match::empty()]));

        let mut term = Expression::title("Front", false, false);
        term.negate();
        assert!(term.search(&doc).is_none());
    }

    #[test]
    fn test_text_search_includes_title_matches() {
        let doc = page("WikiSandBox", "Play in the sandbox. SandBox rules.", vec![]);
        let matches = Expression::text("sandbox", false, false).search(&doc).unwrap();

        assert_eq!(matches[0], Match::title(4, 11));
        assert_eq!(matches[1..], [Match::text(12, 19), Match::text(21, 28)]);
    }

    #[test]
    fn test_text_search_case_sensitive() {
        let doc = page("Notes", "Rust and rust", vec![]);
        let matches = Expression::text("Rust", false, true).search(&doc).unwrap();
        assert_eq!(matches, vec![Match::text(0, 4)]);
    }

    #[test]
    fn test_text_search_without_match_is_false() {
        let doc = page("Notes", "nothing here", vec![]);
        assert!(Expression::text("absent", false, false).search(&doc).is_none());
    }

    #[test]
    fn test_invalid_regex_is_matched_literally() {
        let doc = page("Notes", "call foo(bar", vec![]);
        let term = Expression::text("foo(bar", true, false);
        assert_eq!(term.search(&doc).unwrap(), vec![Match::text(5, 12)]);
        assert_eq!(term.highlight_pattern(), r"(foo\(bar)");
    }

    #[test]
    fn test_negate_twice_stays_negated() {
        let mut term = Expression::text("foo", false, false);
        term.negate();
        term.negate();
        assert!(term.is_negated());
        assert!(term.search(&page("A", "foo", vec![])).is_none());
    }

    #[test]
    fn test_link_search_requires_link() {
        let linking = page("HomeImprovement", "see FrontPage for details", vec!["FrontPage"]);
        let mentioning = page("Other", "FrontPage is mentioned", vec![]);
        let term = Expression::link("FrontPage", false, false);

        assert_eq!(term.search(&linking).unwrap(), vec![Match::text(4, 13)]);
        assert!(term.search(&mentioning).is_none());
    }

    #[test]
    fn test_link_search_falls_back_to_empty_match() {
        let doc = page("NavPage", "<<Navigation(children)>>", vec!["Help Index"]);
        let term = Expression::link("Help_Index", false, false);
        assert_eq!(term.search(&doc).unwrap(), vec![Match::text(0, 0)]);
    }

    #[test]
    fn test_link_search_regex_is_anchored() {
        let doc = page("A", "", vec!["CategoryHelp"]);
        assert!(Expression::link("Category", true, false).search(&doc).is_some());
        assert!(Expression::link("Help", true, false).search(&doc).is_none());
    }

    #[test]
    fn test_link_text_pattern_expands_subpages() {
        let term = LinkSearch::new("Parent/Child", false, false);
        assert_eq!(term.text_pattern(), "(Parent|Child)");
    }

    #[test]
    fn test_and_short_circuits_and_concatenates() {
        let doc = page("FrontPage", "welcome home", vec![]);
        let both = Expression::and(vec![
            Expression::text("welcome", false, false),
            Expression::title("Front", false, false),
        ]);
        let matches = both.search(&doc).unwrap();
        // title search is cheaper and runs first
        assert_eq!(matches, vec![Match::title(0, 5), Match::text(0, 7)]);

        let missing = Expression::and(vec![
            Expression::text("welcome", false, false),
            Expression::text("absent", false, false),
        ]);
        assert!(missing.search(&doc).is_none());
    }

    #[test]
    fn test_or_unions_matches() {
        let doc = page("FrontPage", "welcome home", vec![]);
        let either = Expression::or(vec![
            Expression::text("absent", false, false),
            Expression::text("home", false, false),
        ]);
        assert_eq!(either.search(&doc).unwrap(), vec![Match::text(8, 12)]);

        let neither = Expression::or(vec![
            Expression::text("absent", false, false),
            Expression::text("missing", false, false),
        ]);
        assert!(neither.search(&doc).is_none());
    }

    #[test]
    fn test_cost_ordering_does_not_change_acceptance() {
        let docs = [
            page("FrontPage", "welcome home", vec!["HelpIndex"]),
            page("HelpIndex", "all help pages", vec![]),
            page("RecentChanges", "welcome back", vec!["FrontPage"]),
        ];
        let terms = || {
            vec![
                Expression::text("welcome", false, false),
                Expression::link("FrontPage", false, false),
                Expression::title("Page", false, false),
            ]
        };
        for doc in &docs {
            let sorted_and = Expression::and(terms()).search(doc).is_some();
            let unsorted_and = terms().iter().all(|t| t.search(doc).is_some());
            assert_eq!(sorted_and, unsorted_and, "AND on {}", doc.name);

            let sorted_or = Expression::or(terms()).search(doc).is_some();
            let unsorted_or = terms().iter().any(|t| t.search(doc).is_some());
            assert_eq!(sorted_or, unsorted_or, "OR on {}", doc.name);
        }
    }

    #[test]
    fn test_compound_cost_is_sum_and_children_sorted() {
        let expression = Expression::and(vec![
            Expression::text("a", false, false),
            Expression::link("b", false, false),
            Expression::title("c", false, false),
        ]);
        assert_eq!(expression.cost(), 15_100);
        let costs: Vec<u64> = expression.subterms().iter().map(Expression::cost).collect();
        assert_eq!(costs, vec![100, 5_000, 10_000]);
    }

    #[test]
    fn test_nothing_is_false_unless_negated() {
        let doc = page("A", "", vec![]);
        assert!(Expression::nothing().search(&doc).is_none());
        let mut negated = Expression::nothing();
        negated.negate();
        assert!(negated.search(&doc).is_some());
    }

    #[test]
    fn test_page_filter() {
        let expression = Expression::and(vec![
            Expression::text("welcome", false, false),
            Expression::title("Help", false, false),
        ]);
        let filter = expression.page_filter().unwrap();
        assert!(filter("HelpContents"));
        assert!(!filter("FrontPage"));

        assert!(Expression::text("x", false, false).page_filter().is_none());

        let mixed_or = Expression::or(vec![
            Expression::title("Help", false, false),
            Expression::text("x", false, false),
        ]);
        assert!(mixed_or.page_filter().is_none());
    }

    #[test]
    fn test_highlight_pattern_joins_subterms() {
        let expression = Expression::and(vec![
            Expression::text("foo", false, false),
            Expression::title("Bar", false, false),
            Expression::nothing(),
        ]);
        assert_eq!(expression.highlight_pattern(), "(Bar)|(foo)");
    }

    #[test]
    fn test_display() {
        let mut negated = Expression::text("bar", false, false);
        negated.negate();
        let expression = Expression::or(vec![
            Expression::title("Foo", false, false),
            Expression::and(vec![negated, Expression::text("quoted phrase", false, false)]),
        ]);
        assert_eq!(expression.to_string(), "[!\"Foo\" or [-\"bar\" \"quoted phrase\"]]");
    }
}
