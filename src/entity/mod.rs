/*!
Shared entity representation. Every label is a half-open `[start, end)` interval of character
offsets (counted in `char`s, not bytes) into one specific text. Labels never hold the text they
point into, which keeps conversions purely geometric.
*/
use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub(crate) mod conversion;

pub use conversion::{spans_to_entity_tokens, spans_to_tokens, tokens_to_spans, OrderingError};

/// Label given to tokens that do not belong to any entity.
pub const OUTSIDE_LABEL: &str = "O";

/// An entity found in a text, identified by its type (such as `LOC`, `PER`, `EMAIL_ADDRESS`)
/// and the characters it covers.
#[derive(Debug, Hash, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpanLabel {
    pub entity_type: String,
    pub start: usize,
    pub end: usize,
}

impl SpanLabel {
    pub fn new<S: Into<String>>(entity_type: S, start: usize, end: usize) -> Self {
        SpanLabel {
            entity_type: entity_type.into(),
            start,
            end,
        }
    }

    /// Number of characters covered by the span.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Display for SpanLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.entity_type, self.start, self.end)
    }
}

/// Character interval of a single token. The token text is deliberately left out.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Token {
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn new(start: usize, end: usize) -> Self {
        Token { start, end }
    }
}

/// A token carrying an entity type. `"O"` marks a token outside any entity.
#[derive(Debug, Hash, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenLabel {
    pub entity_type: String,
    pub start: usize,
    pub end: usize,
}

impl TokenLabel {
    pub fn new<S: Into<String>>(entity_type: S, start: usize, end: usize) -> Self {
        TokenLabel {
            entity_type: entity_type.into(),
            start,
            end,
        }
    }

    pub fn from_token<S: Into<String>>(token: Token, entity_type: S) -> Self {
        Self::new(entity_type, token.start, token.end)
    }

    pub fn is_outside(&self) -> bool {
        self.entity_type == OUTSIDE_LABEL
    }
}

impl From<&TokenLabel> for Token {
    fn from(value: &TokenLabel) -> Self {
        Token::new(value.start, value.end)
    }
}

impl Display for TokenLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.entity_type, self.start, self.end)
    }
}

/// Whether segment `a` lies inside segment `b`. Segments are `(start, end)` pairs.
#[inline]
pub(crate) fn is_substring(a: (usize, usize), b: (usize, usize)) -> bool {
    a.0 >= b.0 && a.1 <= b.1
}
