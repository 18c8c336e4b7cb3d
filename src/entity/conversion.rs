/*!
Conversion between span labels and token labels. Span labels are what recognisers and dataset
readers produce; token labels are what BIO/IO tagged corpora carry.
*/
use super::{is_substring, SpanLabel, Token, TokenLabel, OUTSIDE_LABEL};
use itertools::Itertools;
use std::error::Error;
use std::fmt::Display;

/// Token labels were not given in ascending order, or two consecutive tokens overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingError {
    /// Position (in the given slice) of the first token that is not after its predecessor.
    pub position: usize,
    pub previous_start: usize,
    pub previous_end: usize,
    pub start: usize,
}

impl Display for OrderingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Token labels are not in ascending order: token {} starts at {} but the previous token spans [{}, {})",
            self.position, self.start, self.previous_start, self.previous_end
        )
    }
}
impl Error for OrderingError {}

/// Breaks span labels down to one label per token. A token takes the type of the first span
/// (in the order given) which contains it entirely. Tokens crossing a span boundary, and
/// tokens outside every span, are labelled `"O"`.
///
/// * `spans`: Span labels of the text
/// * `tokens`: Tokens of the same text
pub fn spans_to_tokens(spans: &[SpanLabel], tokens: &[Token]) -> Vec<TokenLabel> {
    tokens
        .iter()
        .map(|token| {
            let entity_type = spans
                .iter()
                .find(|span| is_substring((token.start, token.end), (span.start, span.end)))
                .map(|span| span.entity_type.as_str())
                .unwrap_or(OUTSIDE_LABEL);
            TokenLabel::from_token(*token, entity_type)
        })
        .collect()
}

/// Same as `spans_to_tokens`, but only the tokens belonging to an entity are returned.
pub fn spans_to_entity_tokens(spans: &[SpanLabel], tokens: &[Token]) -> Vec<TokenLabel> {
    spans_to_tokens(spans, tokens)
        .into_iter()
        .filter(|t| !t.is_outside())
        .collect()
}

/// Merges runs of consecutive tokens sharing the same type into span labels. `"O"` runs are
/// merged too and show up as `"O"` spans. The token labels must be sorted by non-decreasing
/// start offset and must not overlap; empty tokens may share the start of their neighbours. An
/// empty input gives an empty output.
pub fn tokens_to_spans(token_labels: &[TokenLabel]) -> Result<Vec<SpanLabel>, OrderingError> {
    check_ascending(token_labels)?;
    let mut iter = token_labels.iter();
    let first = match iter.next() {
        Some(first) => first,
        None => return Ok(vec![]),
    };
    let mut spans = Vec::new();
    let mut current = SpanLabel::new(first.entity_type.clone(), first.start, first.end);
    for next in iter {
        if next.entity_type == current.entity_type {
            current.end = next.end;
        } else {
            let finished = std::mem::replace(
                &mut current,
                SpanLabel::new(next.entity_type.clone(), next.start, next.end),
            );
            spans.push(finished);
        }
    }
    spans.push(current);
    Ok(spans)
}

fn check_ascending(token_labels: &[TokenLabel]) -> Result<(), OrderingError> {
    match token_labels
        .iter()
        .tuple_windows()
        .find_position(|(prev, next)| prev.start > next.start || prev.end > next.start)
    {
        Some((i, (prev, next))) => Err(OrderingError {
            position: i + 1,
            previous_start: prev.start,
            previous_end: prev.end,
            start: next.start,
        }),
        None => Ok(()),
    }
}
