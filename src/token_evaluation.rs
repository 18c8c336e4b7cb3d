/*!
Token level evaluation of a recogniser. Its span predictions are broken down to the tokens of
the text and compared, token by token, with IO tagged annotations of the same tokens.
*/
use crate::entity::{spans_to_tokens, Token, TokenLabel, OUTSIDE_LABEL};
use crate::metrics::{check_beta, f_beta, ComputationError};
use crate::recogniser::Recogniser;
use crate::tokeniser::{token_text, Tokeniser};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Labels given to one token by the annotation and by the recogniser.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EvalLabel {
    pub annotated: String,
    pub predicted: String,
}

impl EvalLabel {
    pub fn new<S: Into<String>, T: Into<String>>(annotated: S, predicted: T) -> Self {
        EvalLabel {
            annotated: annotated.into(),
            predicted: predicted.into(),
        }
    }
}

/// Number of tokens per pair of annotated and predicted labels.
pub type LabelPairCounter = AHashMap<EvalLabel, usize>;

/// A token whose prediction differs from its annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenError {
    pub annotation: String,
    pub prediction: String,
    pub token: String,
}

/// Mistakes made on one text. `failed` is set when the annotation and the prediction do not
/// cover the same number of tokens, in which case nothing is counted for the text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleError {
    pub token_errors: Vec<TokenError>,
    pub full_text: String,
    pub failed: bool,
}

/// Recall, precision and F-beta score of every evaluated entity type. A recall is NaN when
/// the type is never annotated, a precision when it is never predicted, and the F-beta score
/// when either happens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenScores {
    pub recall: BTreeMap<String, f64>,
    pub precision: BTreeMap<String, f64>,
    pub fscore: BTreeMap<String, f64>,
}

/// Replaces the labels missing from `keep` by `"O"`.
pub fn mask_labels(labels: &[String], keep: &[String]) -> Vec<String> {
    labels
        .iter()
        .map(|label| {
            if keep.contains(label) {
                label.clone()
            } else {
                String::from(OUTSIDE_LABEL)
            }
        })
        .collect()
}

/// Translates the labels found in `conversion`. The others are returned unchanged.
pub fn map_labels(labels: &[String], conversion: &BTreeMap<String, String>) -> Vec<String> {
    labels
        .iter()
        .map(|label| conversion.get(label).unwrap_or(label).clone())
        .collect()
}

/// Evaluates a recogniser on IO tagged texts, one label per token of `tokeniser`.
///
/// The recogniser is asked for `target_entities`. When its labels differ from the ones of the
/// annotations (`PERSON` against `PER`, say), a label conversion translates the predictions and
/// the target entities before the comparison.
pub struct TokenEvaluator<'a> {
    recogniser: &'a dyn Recogniser,
    target_entities: Vec<String>,
    tokeniser: Box<dyn Tokeniser + Send + Sync>,
    convert_labels: Option<BTreeMap<String, String>>,
}

impl<'a> TokenEvaluator<'a> {
    pub fn new(
        recogniser: &'a dyn Recogniser,
        target_entities: Vec<String>,
        tokeniser: Box<dyn Tokeniser + Send + Sync>,
    ) -> Self {
        TokenEvaluator {
            recogniser,
            target_entities,
            tokeniser,
            convert_labels: None,
        }
    }

    pub fn with_label_conversion(mut self, convert_labels: BTreeMap<String, String>) -> Self {
        self.convert_labels = Some(convert_labels);
        self
    }

    pub fn recogniser_name(&self) -> &str {
        self.recogniser.name()
    }

    fn translate(&self, labels: &[String]) -> Vec<String> {
        match &self.convert_labels {
            Some(conversion) => map_labels(labels, conversion),
            None => labels.to_vec(),
        }
    }

    /// Target entities, under the labels of the annotations.
    pub fn evaluated_entities(&self) -> Vec<String> {
        self.translate(&self.target_entities)
    }

    /// Runs the recogniser on `text` and labels every token with the entity type of the
    /// prediction containing it. Fails when a token gets a type which was not asked for.
    pub fn token_predictions(&self, text: &str) -> Result<Vec<TokenLabel>, ComputationError> {
        let spans = self.recogniser.analyse(text, &self.target_entities)?;
        let tokens = self.tokeniser.tokenise(text);
        let token_labels = spans_to_tokens(&spans, &tokens);

        let unasked: BTreeSet<&str> = token_labels
            .iter()
            .map(|t| t.entity_type.as_str())
            .filter(|e| *e != OUTSIDE_LABEL && !self.target_entities.iter().any(|t| t == e))
            .collect();
        if !unasked.is_empty() {
            return Err(ComputationError::UnaskedEntities(
                unasked.into_iter().map(String::from).collect(),
            ));
        }
        Ok(token_labels)
    }

    /// Compares the predictions of the recogniser on `text` with the annotation of its tokens.
    /// Annotations of the entity types which are not evaluated are masked out first.
    pub fn evaluate_sample(
        &self,
        text: &str,
        annotations: &[String],
    ) -> Result<(LabelPairCounter, SampleError), ComputationError> {
        let annotations = mask_labels(annotations, &self.evaluated_entities());
        let token_labels = self.token_predictions(text)?;
        let predictions: Vec<String> = token_labels
            .iter()
            .map(|t| t.entity_type.clone())
            .collect();
        let predictions = self.translate(&predictions);

        let mut counter = LabelPairCounter::new();
        let mut sample_error = SampleError {
            full_text: String::from(text),
            ..Default::default()
        };
        if annotations.len() != predictions.len() {
            log::warn!(
                "{} annotations for {} tokens, skipping text {:?}",
                annotations.len(),
                predictions.len(),
                text
            );
            sample_error.failed = true;
            return Ok((counter, sample_error));
        }

        for ((annotation, prediction), token) in
            annotations.iter().zip(&predictions).zip(&token_labels)
        {
            *counter
                .entry(EvalLabel::new(annotation.as_str(), prediction.as_str()))
                .or_insert(0) += 1;
            if annotation != prediction {
                sample_error.token_errors.push(TokenError {
                    annotation: annotation.clone(),
                    prediction: prediction.clone(),
                    token: token_text(text, &Token::from(token)),
                });
            }
        }
        Ok((counter, sample_error))
    }

    /// Evaluates every text against its annotations. Errors name the failing text.
    pub fn evaluate_all(
        &self,
        texts: &[String],
        annotations: &[Vec<String>],
    ) -> Result<(Vec<LabelPairCounter>, Vec<SampleError>), ComputationError> {
        if texts.len() != annotations.len() {
            return Err(ComputationError::MismatchedAnnotations {
                texts: texts.len(),
                annotations: annotations.len(),
            });
        }
        let results = texts
            .iter()
            .zip(annotations)
            .enumerate()
            .map(|(i, (text, annotation))| {
                self.evaluate_sample(text, annotation)
                    .map_err(|err| err.at_text(i))
            })
            .collect::<Result<Vec<_>, _>>()?;
        log::info!("Evaluated the tokens of {} texts", results.len());
        Ok(results.into_iter().unzip())
    }

    /// Pools the counters of every text and scores each evaluated entity type.
    pub fn calculate_score(
        &self,
        counters: &[LabelPairCounter],
        beta: f64,
    ) -> Result<TokenScores, ComputationError> {
        check_beta(beta)?;
        let mut pooled = LabelPairCounter::new();
        for counter in counters {
            for (pair, count) in counter {
                *pooled.entry(pair.clone()).or_insert(0) += count;
            }
        }

        let mut scores = TokenScores::default();
        for entity in self.evaluated_entities() {
            let annotated: usize = pooled
                .iter()
                .filter(|(pair, _)| pair.annotated == entity)
                .map(|(_, count)| count)
                .sum();
            let predicted: usize = pooled
                .iter()
                .filter(|(pair, _)| pair.predicted == entity)
                .map(|(_, count)| count)
                .sum();
            let true_positives = pooled
                .get(&EvalLabel::new(entity.as_str(), entity.as_str()))
                .copied()
                .unwrap_or(0) as f64;

            let recall = if annotated > 0 {
                true_positives / annotated as f64
            } else {
                f64::NAN
            };
            let precision = if predicted > 0 {
                true_positives / predicted as f64
            } else {
                f64::NAN
            };
            let fscore = if annotated > 0 && predicted > 0 {
                f_beta(precision, recall, beta)
            } else {
                f64::NAN
            };
            scores.recall.insert(entity.clone(), recall);
            scores.precision.insert(entity.clone(), precision);
            scores.fscore.insert(entity, fscore);
        }
        Ok(scores)
    }
}
