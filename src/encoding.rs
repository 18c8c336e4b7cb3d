/**
This module encodes span labels into a dense, per-character array of integer codes. Codes come
from a `LabelMapping`; several entity types may share one code, which is how label groups are
scored as interchangeable.
*/
use crate::entity::SpanLabel;
use ahash::{AHashMap, AHashSet};
use ndarray::{s, Array1};
use std::error::Error;
use std::fmt::Display;

/// Integer code of a label.
pub type LabelCode = u32;

/// Reserved key of a mapping giving the code of characters outside any entity.
pub const DEFAULT_KEY: &str = "default";

/// Code given to characters outside any entity when the mapping has no `"default"` key.
pub const BACKGROUND_CODE: LabelCode = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// A span ends after the end of the text.
    OutOfRange { text_length: usize, end: usize },
    /// The entity type of a span is not in the mapping.
    MissingLabel(String),
    /// A label uses the background code and could not be told apart from unlabelled characters.
    ReservedCode { label: String, code: LabelCode },
    /// A span starts after its end.
    InvalidSpan(SpanLabel),
}

impl Display for EncodingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange { text_length, end } => write!(
                f,
                "Span index is out of range: text length is {} but got span index {}.",
                text_length, end
            ),
            Self::MissingLabel(label) => write!(
                f,
                "Label '{}' is not presented in the label mapping.",
                label
            ),
            Self::ReservedCode { label, code } => write!(
                f,
                "Value {} is reserved for characters outside any entity, but label '{}' is mapped to it.",
                code, label
            ),
            Self::InvalidSpan(span) => write!(f, "Span {} starts after its end.", span),
        }
    }
}
impl Error for EncodingError {}

/// Mapping between entity types and integer codes.
///
/// The background code is the value of the `"default"` key when there is one, and `0`
/// otherwise. Entity types marked as ignored are never encoded: the characters they cover keep
/// the background code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMapping {
    codes: AHashMap<String, LabelCode>,
    default: Option<LabelCode>,
    ignored: AHashSet<String>,
}

impl LabelMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the code of a label. Inserting the `"default"` key sets the
    /// background code.
    pub fn insert<S: Into<String>>(&mut self, label: S, code: LabelCode) -> Option<LabelCode> {
        let label = label.into();
        if label == DEFAULT_KEY {
            self.default.replace(code)
        } else {
            self.codes.insert(label, code)
        }
    }

    pub fn with_label<S: Into<String>>(mut self, label: S, code: LabelCode) -> Self {
        self.insert(label, code);
        self
    }

    pub fn with_default(mut self, code: LabelCode) -> Self {
        self.default = Some(code);
        self
    }

    /// Marks a label as not targeted by the evaluation.
    pub fn ignore<S: Into<String>>(mut self, label: S) -> Self {
        self.ignored.insert(label.into());
        self
    }

    pub fn get(&self, label: &str) -> Option<LabelCode> {
        self.codes.get(label).copied()
    }

    pub fn background(&self) -> LabelCode {
        self.default.unwrap_or(BACKGROUND_CODE)
    }

    pub fn is_ignored(&self, label: &str) -> bool {
        self.ignored.contains(label)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Labels of the mapping, sorted.
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.codes.keys().map(|k| k.as_str()).collect();
        labels.sort_unstable();
        labels
    }

    /// Checks that no label shares the background code.
    pub fn validate(&self) -> Result<(), EncodingError> {
        let background = self.background();
        let offending = self
            .codes
            .iter()
            .filter(|(_, code)| **code == background)
            .map(|(label, _)| label)
            .min();
        match offending {
            Some(label) => Err(EncodingError::ReservedCode {
                label: label.clone(),
                code: background,
            }),
            None => Ok(()),
        }
    }
}

impl<S: Into<String>> FromIterator<(S, LabelCode)> for LabelMapping {
    fn from_iter<T: IntoIterator<Item = (S, LabelCode)>>(iter: T) -> Self {
        let mut mapping = LabelMapping::new();
        for (label, code) in iter {
            mapping.insert(label, code);
        }
        mapping
    }
}

/// Encodes span labels into one integer code per character. Multi-tagging is not supported:
/// spans are applied in the given order and a later span overwrites the code of an earlier one
/// where they overlap.
///
/// * `text_length`: Number of characters of the text
/// * `spans`: Entities identified in the text
/// * `mapping`: Codes of the entity types
pub fn encode_labels(
    text_length: usize,
    spans: &[SpanLabel],
    mapping: &LabelMapping,
) -> Result<Array1<LabelCode>, EncodingError> {
    mapping.validate()?;
    let mut code = Array1::from_elem(text_length, mapping.background());
    for span in spans {
        if span.end > text_length {
            return Err(EncodingError::OutOfRange {
                text_length,
                end: span.end,
            });
        }
        if span.start > span.end {
            return Err(EncodingError::InvalidSpan(span.clone()));
        }
        if mapping.is_ignored(&span.entity_type) {
            continue;
        }
        let label_code = mapping
            .get(&span.entity_type)
            .ok_or_else(|| EncodingError::MissingLabel(span.entity_type.clone()))?;
        code.slice_mut(s![span.start..span.end]).fill(label_code);
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{self, TestResult};
    use rstest::rstest;

    #[test]
    fn test_encode_labels_for_multi_labels() {
        let spans = vec![
            SpanLabel::new("LOC", 5, 8),
            SpanLabel::new("PER", 10, 15),
            SpanLabel::new("PERSON", 2, 5),
        ];
        // PER and PERSON map to the same code
        let mapping = LabelMapping::from_iter([("LOC", 1), ("PER", 2), ("PERSON", 2)]);
        let actual = encode_labels(20, &spans, &mapping).unwrap();
        assert_eq!(
            actual.to_vec(),
            vec![0, 0, 2, 2, 2, 1, 1, 1, 0, 0, 2, 2, 2, 2, 2, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_encode_labels_later_span_overwrites() {
        let spans = vec![SpanLabel::new("LOC", 2, 6), SpanLabel::new("PER", 4, 8)];
        let mapping = LabelMapping::from_iter([("LOC", 1), ("PER", 2)]);
        let actual = encode_labels(10, &spans, &mapping).unwrap();
        assert_eq!(actual.to_vec(), vec![0, 0, 1, 1, 2, 2, 2, 2, 0, 0]);

        let reversed: Vec<_> = spans.into_iter().rev().collect();
        let actual = encode_labels(10, &reversed, &mapping).unwrap();
        assert_eq!(actual.to_vec(), vec![0, 0, 1, 1, 1, 1, 2, 2, 0, 0]);
    }

    #[test]
    fn test_encode_labels_for_missing_label_in_mapping() {
        let spans = vec![SpanLabel::new("LOC", 5, 8), SpanLabel::new("PER", 10, 15)];
        let mapping = LabelMapping::from_iter([("LOC", 1)]);
        let err = encode_labels(20, &spans, &mapping).unwrap_err();
        assert_eq!(err, EncodingError::MissingLabel(String::from("PER")));
        assert_eq!(
            err.to_string(),
            "Label 'PER' is not presented in the label mapping."
        );
    }

    #[test]
    fn test_encode_labels_for_span_beyond_range() {
        let spans = vec![SpanLabel::new("LOC", 3, 7)];
        let mapping = LabelMapping::from_iter([("LOC", 1)]);
        let err = encode_labels(5, &spans, &mapping).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Span index is out of range: text length is 5 but got span index 7."
        );
    }

    #[test]
    fn test_encode_labels_for_inverted_span() {
        let spans = vec![SpanLabel::new("LOC", 7, 3)];
        let mapping = LabelMapping::from_iter([("LOC", 1)]);
        assert!(matches!(
            encode_labels(10, &spans, &mapping),
            Err(EncodingError::InvalidSpan(_))
        ));
    }

    #[rstest]
    #[case(LabelMapping::from_iter([("LOC", 0)]), "LOC", 0)]
    #[case(LabelMapping::from_iter([("LOC", 1), ("PER", 0)]), "PER", 0)]
    #[case(LabelMapping::from_iter([("default", 3), ("LOC", 3)]), "LOC", 3)]
    fn test_encode_labels_for_reserved_code(
        #[case] mapping: LabelMapping,
        #[case] label: &str,
        #[case] code: LabelCode,
    ) {
        // Even without spans the mapping is rejected
        let err = encode_labels(3, &[], &mapping).unwrap_err();
        assert_eq!(
            err,
            EncodingError::ReservedCode {
                label: String::from(label),
                code
            }
        );
    }

    #[test]
    fn test_encode_labels_with_explicit_default() {
        let mapping = LabelMapping::from_iter([("default", 9), ("LOC", 0)]);
        let spans = vec![SpanLabel::new("LOC", 1, 3)];
        let actual = encode_labels(5, &spans, &mapping).unwrap();
        assert_eq!(actual.to_vec(), vec![9, 0, 0, 9, 9]);
    }

    #[test]
    fn test_encode_labels_skips_ignored_labels() {
        let mapping = LabelMapping::from_iter([("LOC", 1)]).ignore("DATE");
        let spans = vec![SpanLabel::new("DATE", 0, 2), SpanLabel::new("LOC", 3, 5)];
        let actual = encode_labels(6, &spans, &mapping).unwrap();
        assert_eq!(actual.to_vec(), vec![0, 0, 0, 1, 1, 0]);
    }

    #[test]
    fn test_mapping_labels_are_sorted() {
        let mapping = LabelMapping::from_iter([("PER", 2), ("LOC", 1), ("default", 0)]);
        assert_eq!(mapping.labels(), vec!["LOC", "PER"]);
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.background(), 0);
    }

    #[test]
    fn test_propertie_encoder_totality() {
        fn totality(text_length: u8, raw_spans: Vec<(u8, u8, bool)>) -> TestResult {
            let text_length = text_length as usize;
            if text_length == 0 {
                return TestResult::discard();
            }
            let spans: Vec<SpanLabel> = raw_spans
                .into_iter()
                .map(|(a, b, is_loc)| {
                    let (a, b) = (a as usize % (text_length + 1), b as usize % (text_length + 1));
                    let label = if is_loc { "LOC" } else { "PER" };
                    SpanLabel::new(label, a.min(b), a.max(b))
                })
                .collect();
            let mapping = LabelMapping::from_iter([("LOC", 1), ("PER", 2)]);
            let code = match encode_labels(text_length, &spans, &mapping) {
                Ok(code) => code,
                Err(_) => return TestResult::failed(),
            };
            let in_range = code.iter().all(|c| [0, 1, 2].contains(c));
            TestResult::from_bool(code.len() == text_length && in_range)
        }
        let mut qc = quickcheck::QuickCheck::new().tests(2000);
        qc.quickcheck(totality as fn(u8, Vec<(u8, u8, bool)>) -> TestResult)
    }
}
