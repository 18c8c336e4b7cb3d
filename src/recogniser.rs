/*!
Recognisers find entities in raw texts. The benchmark only needs their predictions, as span
labels with character offsets; how they find them is up to each implementation.
*/
use crate::entity::SpanLabel;
use crate::metrics::ComputationError;
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub trait Recogniser: Send + Sync {
    fn name(&self) -> &str;

    /// Entity types the recogniser can find, sorted.
    fn supported_entities(&self) -> Vec<String>;

    /// Finds the entities of the given types in `text`. Offsets are character offsets.
    fn analyse(&self, text: &str, entities: &[String]) -> Result<Vec<SpanLabel>, ComputationError>;

    /// Fails on the first requested entity type the recogniser does not support.
    fn validate_entities(&self, entities: &[String]) -> Result<(), ComputationError> {
        let supported = self.supported_entities();
        match entities.iter().find(|e| !supported.contains(e)) {
            Some(entity) => Err(ComputationError::UnsupportedEntity {
                recogniser: String::from(self.name()),
                entity: entity.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Converts the byte offsets returned by `regex` into character offsets of the same text.
struct CharOffsets(Vec<usize>);

impl CharOffsets {
    fn new(text: &str) -> Self {
        CharOffsets(text.char_indices().map(|(byte, _)| byte).collect())
    }

    /// `byte` must lie on a char boundary, or be the length of the text.
    fn char_offset(&self, byte: usize) -> usize {
        self.0.partition_point(|&b| b < byte)
    }

    fn span(&self, entity_type: &str, m: regex::Match) -> SpanLabel {
        SpanLabel::new(entity_type, self.char_offset(m.start()), self.char_offset(m.end()))
    }
}

/// Parameters of the recognisers built by `RecogniserFactory`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecogniserParams {
    /// Terms of a gazetteer, per entity type.
    #[serde(default)]
    pub terms: BTreeMap<String, Vec<String>>,
}

/// Finds known terms in the texts. A term matches when it is not part of a longer word.
/// Term patterns are compiled on the first call to `analyse`.
#[derive(Debug, Clone, Default)]
pub struct GazetteerRecogniser {
    terms: BTreeMap<String, Vec<String>>,
    patterns: OnceCell<Vec<(String, Regex)>>,
}

impl GazetteerRecogniser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_term<S: Into<String>, T: Into<String>>(mut self, entity_type: S, term: T) -> Self {
        let term = term.into();
        let terms = self.terms.entry(entity_type.into()).or_default();
        if !term.is_empty() && !terms.contains(&term) {
            terms.push(term);
        }
        self.patterns = OnceCell::new();
        self
    }

    /// Escaped term, anchored on word boundaries at the ends which are word characters.
    fn term_pattern(term: &str) -> String {
        let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
        let left = if is_word(term.chars().next()) { r"\b" } else { "" };
        let right = if is_word(term.chars().next_back()) { r"\b" } else { "" };
        format!("{}{}{}", left, regex::escape(term), right)
    }

    fn patterns(&self) -> Result<&[(String, Regex)], ComputationError> {
        self.patterns
            .get_or_try_init(|| {
                self.terms
                    .iter()
                    .flat_map(|(entity_type, terms)| terms.iter().map(move |t| (entity_type, t)))
                    .map(|(entity_type, term)| -> Result<_, ComputationError> {
                        Ok((entity_type.clone(), Regex::new(&Self::term_pattern(term))?))
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .map(Vec::as_slice)
    }
}

impl From<RecogniserParams> for GazetteerRecogniser {
    fn from(value: RecogniserParams) -> Self {
        value
            .terms
            .into_iter()
            .flat_map(|(entity_type, terms)| terms.into_iter().map(move |t| (entity_type.clone(), t)))
            .fold(GazetteerRecogniser::new(), |recogniser, (entity_type, term)| {
                recogniser.with_term(entity_type, term)
            })
    }
}

impl Recogniser for GazetteerRecogniser {
    fn name(&self) -> &str {
        "GazetteerRecogniser"
    }

    fn supported_entities(&self) -> Vec<String> {
        self.terms.keys().cloned().collect()
    }

    fn analyse(&self, text: &str, entities: &[String]) -> Result<Vec<SpanLabel>, ComputationError> {
        self.validate_entities(entities)?;
        let offsets = CharOffsets::new(text);
        let mut found = Vec::new();
        for (entity_type, pattern) in self.patterns()?.iter().filter(|(e, _)| entities.contains(e)) {
            found.extend(pattern.find_iter(text).map(|m| offsets.span(entity_type, m)));
        }
        found.sort_by_key(|span| (span.start, span.end));
        found.dedup();
        Ok(found)
    }
}

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[\w.%+-]+@[\w.-]+\.[a-zA-Z]{2,}\b").expect("valid regex")
});

/// Finds email addresses of the form `local@domain.tld`. Surrounding punctuation is left out.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailRecogniser;

impl EmailRecogniser {
    pub const ENTITY_TYPE: &'static str = "EMAIL_ADDRESS";
}

impl Recogniser for EmailRecogniser {
    fn name(&self) -> &str {
        "EmailRecogniser"
    }

    fn supported_entities(&self) -> Vec<String> {
        vec![String::from(Self::ENTITY_TYPE)]
    }

    fn analyse(&self, text: &str, entities: &[String]) -> Result<Vec<SpanLabel>, ComputationError> {
        self.validate_entities(entities)?;
        if entities.is_empty() {
            return Ok(vec![]);
        }
        let offsets = CharOffsets::new(text);
        Ok(EMAIL
            .find_iter(text)
            .map(|m| offsets.span(Self::ENTITY_TYPE, m))
            .collect())
    }
}

/// Factory for creating recognisers from names.
pub struct RecogniserFactory;

impl RecogniserFactory {
    /// Create a recogniser from a name.
    ///
    /// - `gazetteer` / `GazetteerRecogniser`: built from `params.terms`
    /// - `email` / `EmailRecogniser`
    pub fn create(
        name: &str,
        params: RecogniserParams,
    ) -> Result<Box<dyn Recogniser>, ComputationError> {
        match name.to_lowercase().as_str() {
            "gazetteer" | "gazetteerrecogniser" => Ok(Box::new(GazetteerRecogniser::from(params))),
            "email" | "emailrecogniser" => Ok(Box::new(EmailRecogniser)),
            _ => Err(ComputationError::UnknownComponent(String::from(name))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn entities(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| String::from(*n)).collect()
    }

    fn gazetteer() -> GazetteerRecogniser {
        GazetteerRecogniser::new()
            .with_term("LOC", "Melbourne")
            .with_term("LOC", "Oslo")
            .with_term("PER", "Bob Smith")
            .with_term("PER", "Bob")
    }

    #[test]
    fn test_gazetteer_finds_terms() {
        let text = "Bob Smith moved from Oslo to Melbourne, not Oslofjord.";
        let actual = gazetteer()
            .analyse(text, &entities(&["LOC", "PER"]))
            .unwrap();
        assert_eq!(
            actual,
            vec![
                SpanLabel::new("PER", 0, 3),
                SpanLabel::new("PER", 0, 9),
                SpanLabel::new("LOC", 21, 25),
                SpanLabel::new("LOC", 29, 38),
            ]
        );
    }

    #[test]
    fn test_gazetteer_only_requested_entities() {
        let actual = gazetteer()
            .analyse("Bob lives in Oslo", &entities(&["LOC"]))
            .unwrap();
        assert_eq!(actual, vec![SpanLabel::new("LOC", 13, 17)]);
    }

    #[test]
    fn test_gazetteer_character_offsets() {
        let recogniser = GazetteerRecogniser::new().with_term("LOC", "Tromsø");
        let actual = recogniser
            .analyse("Zoë flew to Tromsø.", &entities(&["LOC"]))
            .unwrap();
        assert_eq!(actual, vec![SpanLabel::new("LOC", 12, 18)]);
    }

    #[test]
    fn test_gazetteer_terms_with_punctuation() {
        let recogniser = GazetteerRecogniser::new()
            .with_term("LOC", "St. Kilda")
            .with_term("PER", "O'Brien");
        let actual = recogniser
            .analyse("O'Brien moved to St. Kilda (St. Kildare?)", &entities(&["LOC", "PER"]))
            .unwrap();
        assert_eq!(
            actual,
            vec![SpanLabel::new("PER", 0, 7), SpanLabel::new("LOC", 17, 26)]
        );
    }

    #[test]
    fn test_gazetteer_term_added_after_analyse() {
        let recogniser = GazetteerRecogniser::new().with_term("LOC", "Oslo");
        let entities = entities(&["LOC"]);
        assert_eq!(recogniser.analyse("Oslo, Perth", &entities).unwrap().len(), 1);
        let recogniser = recogniser.with_term("LOC", "Perth");
        assert_eq!(
            recogniser.analyse("Oslo, Perth", &entities).unwrap(),
            vec![SpanLabel::new("LOC", 0, 4), SpanLabel::new("LOC", 6, 11)]
        );
    }

    #[test]
    fn test_validate_entities() {
        let err = gazetteer()
            .analyse("Bob", &entities(&["PER", "EMAIL_ADDRESS"]))
            .unwrap_err();
        assert_eq!(
            err,
            ComputationError::UnsupportedEntity {
                recogniser: String::from("GazetteerRecogniser"),
                entity: String::from("EMAIL_ADDRESS")
            }
        );
    }

    #[rstest]
    #[case("Write to bob@example.com.", vec![SpanLabel::new("EMAIL_ADDRESS", 9, 24)])]
    #[case("bob@localhost is not one", vec![])]
    #[case("@example.com neither", vec![])]
    #[case("(bob@example.com)", vec![SpanLabel::new("EMAIL_ADDRESS", 1, 16)])]
    #[case("mail:bob@example.com", vec![SpanLabel::new("EMAIL_ADDRESS", 5, 20)])]
    #[case("Zoë: zoë.ek@example.com!", vec![SpanLabel::new("EMAIL_ADDRESS", 5, 23)])]
    fn test_email_recogniser(#[case] text: &str, #[case] expected: Vec<SpanLabel>) {
        let actual = EmailRecogniser
            .analyse(text, &entities(&["EMAIL_ADDRESS"]))
            .unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_factory() {
        let params = RecogniserParams {
            terms: BTreeMap::from([(String::from("LOC"), vec![String::from("Oslo")])]),
        };
        let recogniser = RecogniserFactory::create("gazetteer", params).unwrap();
        assert_eq!(recogniser.supported_entities(), entities(&["LOC"]));
        let recogniser = RecogniserFactory::create("EmailRecogniser", RecogniserParams::default())
            .unwrap();
        assert_eq!(recogniser.name(), "EmailRecogniser");
        assert!(matches!(
            RecogniserFactory::create("comprehend", RecogniserParams::default()),
            Err(ComputationError::UnknownComponent(_))
        ));
    }
}
