//! Wiki text tokenizer
//!
//! Splits text into a lazy stream of lower cased tokens. At every position the
//! longest structured shape wins, in this order: company names (`AT&T`),
//! e-mail addresses, dotted host names, tokens containing digits (versions,
//! dates), acronyms (`U.S.A.`) and finally plain words. A WikiWord such as
//! `FrontPage` additionally yields its capitalized parts.
//!
//! The same tokenizer is registered with tantivy under [`WIKI_TOKENIZER`] so
//! index terms and query terms agree.

use once_cell::sync::Lazy;
use regex::{CaptureMatches, Regex};
use std::collections::VecDeque;

/// Name under which the tokenizer is registered with tantivy
pub const WIKI_TOKENIZER: &str = "wiki";

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?P<company>\w+[&@]\w+)|",
        r"(?P<email>\w+(?:[.-]\w+)*@\w+(?:[.-]\w+)*)|",
        r"(?P<hostname>\w+(?:\.\w+)+)|",
        r"(?P<num>(?:\w+[-/.,])*\w*\d\w*(?:[-/.,]\w+)*)|",
        r"(?P<acronym>(?:\w\.)+)|",
        r"(?P<word>\w+)",
    ))
    .expect("token pattern is valid")
});

static SINGLE_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\p{Lu}\p{Ll}+").expect("single word pattern is valid"));

static WIKI_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\p{Lu}\p{Ll}+){2,}$").expect("wiki word pattern is valid"));

static DOT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-_/,.]").expect("dot pattern is valid"));

static MAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-_/,.@]").expect("mail pattern is valid"));

/// Input accepted by [`tokenize`]
#[derive(Debug, Clone, Copy)]
pub enum TokenSource<'a> {
    /// Free text, scanned with the token grammar
    Text(&'a str),
    /// Already tokenized values (e.g. a link list), passed through unchanged
    List(&'a [String]),
}

impl<'a> From<&'a str> for TokenSource<'a> {
    fn from(text: &'a str) -> Self {
        TokenSource::Text(text)
    }
}

impl<'a> From<&'a String> for TokenSource<'a> {
    fn from(text: &'a String) -> Self {
        TokenSource::Text(text.as_str())
    }
}

impl<'a> From<&'a [String]> for TokenSource<'a> {
    fn from(list: &'a [String]) -> Self {
        TokenSource::List(list)
    }
}

impl<'a> From<&'a Vec<String>> for TokenSource<'a> {
    fn from(list: &'a Vec<String>) -> Self {
        TokenSource::List(list.as_slice())
    }
}

/// A token with the byte range of the text it was derived from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiToken {
    pub text: String,
    pub offset_from: usize,
    pub offset_to: usize,
}

/// Tokenize text or pass a pre-tokenized list through
///
/// The iterator is lazy; calling `tokenize` again restarts the scan.
pub fn tokenize<'a>(source: impl Into<TokenSource<'a>>) -> Tokens<'a> {
    match source.into() {
        TokenSource::Text(text) => Tokens {
            inner: Inner::Text(TOKEN_RE.captures_iter(text)),
            pending: VecDeque::new(),
        },
        TokenSource::List(list) => Tokens {
            inner: Inner::List(list.iter(), 0),
            pending: VecDeque::new(),
        },
    }
}

/// Lazy token sequence produced by [`tokenize`]
pub struct Tokens<'a> {
    inner: Inner<'a>,
    pending: VecDeque<WikiToken>,
}

enum Inner<'a> {
    Text(CaptureMatches<'static, 'a>),
    List(std::slice::Iter<'a, String>, usize),
}

impl<'a> Tokens<'a> {
    /// Same sequence, token text only
    pub fn texts(self) -> impl Iterator<Item = String> + 'a {
        self.map(|token| token.text)
    }

    fn fill_from(&mut self, caps: regex::Captures<'_>) {
        let whole = caps.get(0).expect("group 0 always participates");
        let (from, to) = (whole.start(), whole.end());
        let mut push = |text: String| {
            if !text.is_empty() {
                self.pending.push_back(WikiToken {
                    text,
                    offset_from: from,
                    offset_to: to,
                });
            }
        };

        if let Some(m) = caps.name("company") {
            push(m.as_str().to_lowercase());
        } else if let Some(m) = caps.name("email") {
            for part in MAIL_RE.split(&m.as_str().to_lowercase()) {
                push(part.to_string());
            }
        } else if let Some(m) = caps.name("hostname").or_else(|| caps.name("num")) {
            for part in DOT_RE.split(&m.as_str().to_lowercase()) {
                push(part.to_string());
            }
        } else if let Some(m) = caps.name("acronym") {
            push(m.as_str().replace('.', "").to_lowercase());
        } else if let Some(m) = caps.name("word") {
            let word = m.as_str();
            push(word.to_lowercase());
            if WIKI_WORD_RE.is_match(word) {
                for part in SINGLE_WORD_RE.find_iter(word) {
                    push(part.as_str().to_lowercase());
                }
            }
        }
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = WikiToken;

    fn next(&mut self) -> Option<WikiToken> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(token);
            }
            match &mut self.inner {
                Inner::List(iter, offset) => {
                    let value = iter.next()?;
                    let from = *offset;
                    *offset += value.len() + 1;
                    return Some(WikiToken {
                        text: value.clone(),
                        offset_from: from,
                        offset_to: from + value.len(),
                    });
                }
                Inner::Text(captures) => {
                    let caps = captures.next()?;
                    self.fill_from(caps);
                }
            }
        }
    }
}

/// tantivy adapter for the wiki tokenizer
#[derive(Clone, Default)]
pub struct WikiTokenizer {
    token: tantivy::tokenizer::Token,
}

/// Token stream handed to tantivy; positions increase by one per token
pub struct WikiTokenStream<'a> {
    tokens: Tokens<'a>,
    token: &'a mut tantivy::tokenizer::Token,
    position: usize,
}

impl tantivy::tokenizer::Tokenizer for WikiTokenizer {
    type TokenStream<'a> = WikiTokenStream<'a>;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
        self.token.reset();
        WikiTokenStream {
            tokens: tokenize(text),
            token: &mut self.token,
            position: 0,
        }
    }
}

impl<'a> tantivy::tokenizer::TokenStream for WikiTokenStream<'a> {
    fn advance(&mut self) -> bool {
        match self.tokens.next() {
            Some(next) => {
                self.token.text = next.text;
                self.token.offset_from = next.offset_from;
                self.token.offset_to = next.offset_to;
                self.token.position = self.position;
                self.token.position_length = 1;
                self.position += 1;
                true
            }
            None => false,
        }
    }

    fn token(&self) -> &tantivy::tokenizer::Token {
        self.token
    }

    fn token_mut(&mut self) -> &mut tantivy::tokenizer::Token {
        self.token
    }
}

/// Analyzer to register with an index
pub fn wiki_analyzer() -> tantivy::tokenizer::TextAnalyzer {
    tantivy::tokenizer::TextAnalyzer::builder(WikiTokenizer::default()).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<String> {
        tokenize(text).texts().collect()
    }

    #[test]
    fn test_plain_words_are_lowercased() {
        assert_eq!(words("Hello, World!"), vec!["hello", "world"]);
    }

    #[test]
    fn test_wiki_word_yields_parts() {
        assert_eq!(words("FrontPage"), vec!["frontpage", "front", "page"]);
        // a single capitalized word is not a WikiWord
        assert_eq!(words("Front"), vec!["front"]);
    }

    #[test]
    fn test_company_names_stay_whole() {
        assert_eq!(words("AT&T"), vec!["at&t"]);
        assert_eq!(words("Excite@Home"), vec!["excite@home"]);
    }

    #[test]
    fn test_email_is_split() {
        assert_eq!(
            words("john.doe@mail.example.org"),
            vec!["john", "doe", "mail", "example", "org"]
        );
    }

    #[test]
    fn test_hostname_is_split() {
        assert_eq!(words("moinmo.in"), vec!["moinmo", "in"]);
    }

    #[test]
    fn test_version_numbers_are_split() {
        assert_eq!(words("release 1.5.3"), vec!["release", "1", "5", "3"]);
        assert_eq!(words("2005-10-01"), vec!["2005", "10", "01"]);
    }

    #[test]
    fn test_acronym_dots_are_stripped() {
        assert_eq!(words("I.B.M."), vec!["i", "b", "m"]);
        assert_eq!(words("a.b."), vec!["a", "b"]);
    }

    #[test]
    fn test_unicode_case_folding() {
        assert_eq!(words("ÜBER Straße"), vec!["über", "straße"]);
    }

    #[test]
    fn test_list_passes_through_unchanged() {
        let links = vec!["FrontPage".to_string(), "Some Page/Sub".to_string()];
        let tokens: Vec<String> = tokenize(&links).texts().collect();
        assert_eq!(tokens, links);
    }

    #[test]
    fn test_tokenize_is_restartable() {
        let text = "WikiName and moinmo.in";
        assert_eq!(words(text), words(text));
    }

    #[test]
    fn test_tantivy_stream_positions() {
        use tantivy::tokenizer::{TokenStream, Tokenizer};

        let mut tokenizer = WikiTokenizer::default();
        let mut stream = tokenizer.token_stream("See FrontPage");
        let mut seen = Vec::new();
        while stream.advance() {
            let token = stream.token();
            seen.push((token.text.clone(), token.position));
        }
        assert_eq!(
            seen,
            vec![
                ("see".to_string(), 0),
                ("frontpage".to_string(), 1),
                ("front".to_string(), 2),
                ("page".to_string(), 3),
            ]
        );
    }
}
