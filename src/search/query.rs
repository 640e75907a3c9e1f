//! Search query parsing
//!
//! Grammar (informal):
//!
//! ```text
//! query    := or_expr
//! or_expr  := and_expr ("or" and_expr)*
//! and_expr := term+
//! term     := "-"? ( "(" or_expr ")" | modifier* atom )
//! modifier := prefix of one of title, regex, case, linkto, followed by ":"
//! atom     := "quoted string" | 'quoted string' | bare-token
//! ```
//!
//! The parser never fails: text it cannot make sense of becomes literal
//! search text, and an empty query yields an expression that matches nothing.
//! An unmatched `)` outside any group acts like `or`.

use crate::search::expression::Expression;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static TERM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"^(?P<neg>-?)\s*"#,
        r#"(?:(?P<op>\(|\)|or\b)|"#,
        r#"(?P<mods>(?:\w+:)*)(?P<term>"[^"]+"|'[^']+'|\S+))"#,
    ))
    .expect("term pattern is valid")
});

const MODIFIERS: [&str; 4] = ["title", "regex", "case", "linkto"];

/// Per-term flags collected from modifiers
#[derive(Debug, Clone, Copy, Default)]
struct TermFlags {
    title: bool,
    regex: bool,
    case: bool,
    linkto: bool,
}

impl TermFlags {
    /// Apply `title:regex:` style modifiers; `None` if any fragment is unknown
    fn with_modifiers(mut self, modifiers: &str) -> Option<Self> {
        for fragment in modifiers.split(':').filter(|f| !f.is_empty()) {
            let fragment = fragment.to_lowercase();
            let name = MODIFIERS.iter().find(|name| name.starts_with(&fragment))?;
            match *name {
                "title" => self.title = true,
                "regex" => self.regex = true,
                "case" => self.case = true,
                _ => self.linkto = true,
            }
        }
        Some(self)
    }
}

/// Why an AND group stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Or,
    Close,
    End,
}

/// Remaining query text; closing parentheses split off a token are pushed back
struct Cursor {
    rest: String,
}

impl Cursor {
    fn advance(&mut self, len: usize) {
        self.rest.drain(..len);
    }

    fn push_back(&mut self, text: &str) {
        self.rest.insert_str(0, text);
    }

    fn skip_whitespace(&mut self) -> bool {
        let trimmed = self.rest.len() - self.rest.trim_start().len();
        self.advance(trimmed);
        !self.rest.is_empty()
    }
}

/// Parser turning query strings into expression trees
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QueryParser {
    /// Terms without modifiers search page names only
    pub title_search: bool,
    /// Terms without modifiers are case sensitive
    pub case_sensitive: bool,
    /// Terms without modifiers are regular expressions
    pub regex: bool,
}

impl QueryParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title_search(mut self, enabled: bool) -> Self {
        self.title_search = enabled;
        self
    }

    pub fn with_case_sensitive(mut self, enabled: bool) -> Self {
        self.case_sensitive = enabled;
        self
    }

    pub fn with_regex(mut self, enabled: bool) -> Self {
        self.regex = enabled;
        self
    }

    /// Parse a query string
    pub fn parse(&self, query: &str) -> Expression {
        let mut cursor = Cursor {
            rest: query.to_string(),
        };
        let expression = self.parse_or(&mut cursor, 0).0;
        expression.unwrap_or_else(Expression::nothing)
    }

    fn defaults(&self) -> TermFlags {
        TermFlags {
            title: self.title_search,
            regex: self.regex,
            case: self.case_sensitive,
            linkto: false,
        }
    }

    fn parse_or(&self, cursor: &mut Cursor, depth: usize) -> (Option<Expression>, Stop) {
        let mut groups = Vec::new();
        let stop = loop {
            let (group, stop) = self.parse_and(cursor, depth);
            groups.extend(group);
            // an unmatched ")" at the top level separates alternatives
            let stray_close = stop == Stop::Close && depth == 0;
            if stop != Stop::Or && !stray_close {
                break stop;
            }
        };

        let expression = match groups.len() {
            0 => None,
            1 => groups.pop(),
            _ => Some(Expression::or(groups)),
        };
        (expression, stop)
    }

    fn parse_and(&self, cursor: &mut Cursor, depth: usize) -> (Option<Expression>, Stop) {
        let mut terms = Vec::new();
        let stop = loop {
            if !cursor.skip_whitespace() {
                break Stop::End;
            }
            let Some(caps) = TERM_RE.captures(&cursor.rest) else {
                break Stop::End;
            };
            let consumed = caps.get(0).map_or(0, |m| m.end());
            let negated = caps.name("neg").is_some_and(|m| !m.is_empty());

            if let Some(op) = caps.name("op").map(|m| m.as_str().to_string()) {
                match op.as_str() {
                    "(" => {
                        cursor.advance(consumed);
                        if let (Some(mut group), _) = self.parse_or(cursor, depth + 1) {
                            if negated {
                                group.negate();
                            }
                            terms.push(group);
                        }
                        continue;
                    }
                    ")" => {
                        cursor.advance(consumed);
                        break Stop::Close;
                    }
                    _ => {
                        let tail_empty = cursor.rest[consumed..].trim().is_empty();
                        if !negated && !tail_empty {
                            cursor.advance(consumed);
                            break Stop::Or;
                        }
                        // a trailing or negated "or" is just a word
                        cursor.advance(consumed);
                        let mut term = self.leaf("or", self.defaults());
                        if negated {
                            term.negate();
                        }
                        terms.push(term);
                        continue;
                    }
                }
            }

            let modifiers = caps.name("mods").map_or("", |m| m.as_str()).to_string();
            let raw = caps.name("term").map_or("", |m| m.as_str()).to_string();
            cursor.advance(consumed);

            let (mut text, quoted) = unquote(&raw);
            if depth > 0 && !quoted {
                let excess = excess_closing(&text);
                if excess > 0 {
                    text.truncate(text.len() - excess);
                    cursor.push_back(&")".repeat(excess));
                }
            }

            let (text, flags) = match self.defaults().with_modifiers(&modifiers) {
                Some(flags) => (text, flags),
                // unknown modifier: the whole token is literal text
                None => (format!("{}{}", modifiers, raw), self.defaults()),
            };
            if text.is_empty() {
                continue;
            }

            let mut term = self.leaf(&text, flags);
            if negated {
                term.negate();
            }
            terms.push(term);
        };

        let expression = match terms.len() {
            0 => None,
            1 => terms.pop(),
            _ => Some(Expression::and(terms)),
        };
        (expression, stop)
    }

    fn leaf(&self, text: &str, flags: TermFlags) -> Expression {
        if flags.linkto {
            Expression::link(text, flags.regex, flags.case)
        } else if flags.title {
            Expression::title(text, flags.regex, flags.case)
        } else {
            Expression::text(text, flags.regex, flags.case)
        }
    }
}

/// Strip matching quotes; reports whether the token was quoted
fn unquote(token: &str) -> (String, bool) {
    let bytes = token.as_bytes();
    if bytes.len() >= 2 && (bytes[0] == b'"' || bytes[0] == b'\'') && bytes[0] == bytes[bytes.len() - 1]
    {
        return (token[1..token.len() - 1].to_string(), true);
    }
    (token.to_string(), false)
}

/// Number of trailing ')' that close groups opened outside the token
fn excess_closing(token: &str) -> usize {
    let opening = token.matches('(').count();
    let closing = token.matches(')').count();
    let trailing = token.len() - token.trim_end_matches(')').len();
    trailing.min(closing.saturating_sub(opening))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::expression::ExpressionKind;

    fn parse(query: &str) -> Expression {
        QueryParser::new().parse(query)
    }

    #[test]
    fn test_single_term_is_unwrapped() {
        let expression = parse("wiki");
        assert!(matches!(expression.kind(), ExpressionKind::Text(t) if t.pattern() == "wiki"));
    }

    #[test]
    fn test_terms_are_anded() {
        let expression = parse("help index");
        assert!(matches!(expression.kind(), ExpressionKind::And(_)));
        assert_eq!(expression.subterms().len(), 2);
    }

    #[test]
    fn test_or_with_title_and_negation() {
        let expression = parse(r#"title:Foo or -bar "quoted phrase""#);
        let ExpressionKind::Or(groups) = expression.kind() else {
            panic!("expected OR, got {}", expression);
        };
        assert!(matches!(groups[0].kind(), ExpressionKind::Title(t) if t.pattern() == "Foo"));

        let ExpressionKind::And(terms) = groups[1].kind() else {
            panic!("expected AND, got {}", groups[1]);
        };
        assert!(terms[0].is_negated());
        assert!(matches!(terms[0].kind(), ExpressionKind::Text(t) if t.pattern() == "bar"));
        assert!(!terms[1].is_negated());
        assert!(
            matches!(terms[1].kind(), ExpressionKind::Text(t) if t.pattern() == "quoted phrase")
        );
    }

    #[test]
    fn test_modifier_prefixes() {
        let expression = parse("t:re:Help");
        let ExpressionKind::Title(term) = expression.kind() else {
            panic!("expected title search, got {}", expression);
        };
        assert!(term.use_regex());
        assert!(!term.case_sensitive());

        let expression = parse("l:FrontPage");
        assert!(matches!(expression.kind(), ExpressionKind::Link(_)));

        let expression = parse("c:Wiki");
        assert!(matches!(expression.kind(), ExpressionKind::Text(t) if t.case_sensitive()));
    }

    #[test]
    fn test_unknown_modifier_is_literal() {
        let expression = parse("http://example.org");
        assert!(
            matches!(expression.kind(), ExpressionKind::Text(t) if t.pattern() == "http://example.org")
        );
        let expression = parse("foo:bar");
        assert!(matches!(expression.kind(), ExpressionKind::Text(t) if t.pattern() == "foo:bar"));
    }

    #[test]
    fn test_quoted_modifier_target() {
        let expression = parse("title:'Front Page'");
        assert!(
            matches!(expression.kind(), ExpressionKind::Title(t) if t.pattern() == "Front Page")
        );
    }

    #[test]
    fn test_parentheses_group() {
        let expression = parse("-(foo or bar) baz");
        let ExpressionKind::And(terms) = expression.kind() else {
            panic!("expected AND, got {}", expression);
        };
        // baz is a single text search and cheaper than the group
        assert!(matches!(terms[0].kind(), ExpressionKind::Text(t) if t.pattern() == "baz"));
        assert!(terms[1].is_negated());
        assert!(matches!(terms[1].kind(), ExpressionKind::Or(g) if g.len() == 2));
    }

    #[test]
    fn test_closing_paren_glued_to_token() {
        let expression = parse("(foo bar) baz");
        assert_eq!(expression.to_string(), r#"["baz" ["foo" "bar"]]"#);
    }

    #[test]
    fn test_stray_closing_paren_acts_like_or() {
        assert_eq!(parse("foo ) bar").to_string(), r#"["foo" or "bar"]"#);
        assert_eq!(parse(") foo").to_string(), r#""foo""#);
        // the cheaper alternative sorts first
        assert_eq!(parse("(a b) ) c").to_string(), r#"["c" or ["a" "b"]]"#);
    }

    #[test]
    fn test_trailing_or_is_literal() {
        let expression = parse("black or");
        assert_eq!(expression.to_string(), r#"["black" "or"]"#);
    }

    #[test]
    fn test_empty_query_matches_nothing() {
        assert!(matches!(parse("").kind(), ExpressionKind::Nothing));
        assert!(matches!(parse("   ").kind(), ExpressionKind::Nothing));
        assert!(matches!(parse("()").kind(), ExpressionKind::Nothing));
    }

    #[test]
    fn test_parser_defaults() {
        let parser = QueryParser::new().with_title_search(true).with_regex(true);
        let expression = parser.parse("^Help");
        assert!(matches!(expression.kind(), ExpressionKind::Title(t) if t.use_regex()));
    }

    #[test]
    fn test_modifier_names_have_distinct_initials() {
        for (i, a) in MODIFIERS.iter().enumerate() {
            for b in &MODIFIERS[i + 1..] {
                assert_ne!(a.chars().next(), b.chars().next());
            }
        }
    }
}
