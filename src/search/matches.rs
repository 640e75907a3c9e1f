//! Match values produced by expression evaluation

use serde::{Deserialize, Serialize};

/// Where a match was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MatchKind {
    Title,
    Text,
    Attachment,
}

/// One occurrence of a query term, as a byte range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub kind: MatchKind,
    pub start: usize,
    pub end: usize,
    pub weight: f64,
}

impl Match {
    /// Matches in page names are much more important in a wiki; this makes
    /// pages with a title match rank above pages without one.
    pub const TITLE_WEIGHT: f64 = 100.0;
    pub const DEFAULT_WEIGHT: f64 = 1.0;

    pub fn title(start: usize, end: usize) -> Self {
        Self {
            kind: MatchKind::Title,
            start,
            end,
            weight: Self::TITLE_WEIGHT,
        }
    }

    pub fn text(start: usize, end: usize) -> Self {
        Self {
            kind: MatchKind::Text,
            start,
            end,
            weight: Self::DEFAULT_WEIGHT,
        }
    }

    pub fn attachment(start: usize, end: usize) -> Self {
        Self {
            kind: MatchKind::Attachment,
            start,
            end,
            weight: Self::DEFAULT_WEIGHT,
        }
    }

    /// A satisfied term with nothing to highlight
    pub fn empty() -> Self {
        Self::text(0, 0)
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Identity used for deduplication
    pub fn key(&self) -> (MatchKind, usize, usize) {
        (self.kind, self.start, self.end)
    }
}

/// Unique matches sorted by start; the first occurrence of each key wins
pub fn unique_matches(matches: &[Match]) -> Vec<Match> {
    let mut seen = std::collections::HashSet::new();
    let mut unique: Vec<Match> = matches
        .iter()
        .filter(|m| seen.insert(m.key()))
        .copied()
        .collect();
    unique.sort_by_key(|m| (m.start, m.end));
    unique
}
