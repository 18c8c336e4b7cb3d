/*!
This library evaluates PII (personally identifiable information) recognisers at the character
level. Predicted entities rarely share the exact boundaries of the annotated ones, so rather than
counting exact matches, every entity is scored on the characters it covers.

# Scoring
* Every predicted entity gets a precision: the share of its characters which are annotated with
  the same label.
* Every annotated entity gets a recall: the share of its characters which are predicted with the
  same label.
* Precisions and recalls are averaged per text and combined into an F-beta score. The scores of
  the texts are then averaged over the corpus. With a recall threshold, an annotated entity whose
  recall reaches the threshold counts as fully found.

# Terminology
* A label (or entity type) is what an entity is, such as `PER`, `LOC` or `EMAIL_ADDRESS`.
* A span is an entity located in a text by its character offsets, `[start, end)`. Offsets count
  `char`s, not bytes.
* A label group is a set of labels scored as interchangeable, such as `{PER, PERSON}`. All the
  labels of a group share one integer code in the `LabelMapping`.
* Non-targeted labels are present in the data but left out of the evaluation.
* A token is a span without label; a token label is a token with one. Token labels are what
  IO tagged corpora hold, and can be converted to and from spans.
*/

mod config;
mod data;
mod encoding;
mod entity;
mod metrics;
mod pipeline;
mod recogniser;
mod reporter;
mod rollup;
mod scorer;
mod token_evaluation;
mod tokeniser;
mod tracking;

// The public api starts here
pub use entity::{
    spans_to_entity_tokens, spans_to_tokens, tokens_to_spans, OrderingError, SpanLabel, Token,
    TokenLabel, OUTSIDE_LABEL,
};

pub use encoding::{
    encode_labels, EncodingError, LabelCode, LabelMapping, BACKGROUND_CODE, DEFAULT_KEY,
};

pub use metrics::{f_beta, label_precision, label_recall, ComputationError, InconsistentLengthError};

pub use scorer::{
    entity_precisions, entity_recalls, score_text, score_texts, EntityPrecision, EntityRecall,
    TextScore,
};

pub use rollup::{
    aggregate_metrics, group_name, pii_detection_fbeta, rollup_across_texts, rollup_by_group,
    LabelGroup,
};

pub use config::{EvalConfig, EvalConfigBuilder, MatchMode, MatchModeParsingError};

pub use reporter::{group_report, Average, GroupMetrics, ScoreReport};

pub use data::{write_data, Data, DataItem, DatasetReader, JsonLinesReader};

pub use recogniser::{
    EmailRecogniser, GazetteerRecogniser, Recogniser, RecogniserFactory, RecogniserParams,
};

pub use tokeniser::{
    token_text, CharTokeniser, Detokeniser, SpaceJoinDetokeniser, Tokeniser, TokeniserFactory,
    WhitespaceTokeniser, WordPunctTokeniser,
};

pub use token_evaluation::{
    map_labels, mask_labels, EvalLabel, LabelPairCounter, SampleError, TokenError, TokenEvaluator,
    TokenScores,
};

pub use tracking::{record_group_scores, LogReporter, MemoryReporter, Reporter, ReportingRun};

pub use pipeline::{
    build_label_mapping, calculate_aggregate_metrics, calculate_precisions_and_recalls,
    identify_pii_entities, run_benchmark, run_token_benchmark,
};

/// Main entrypoint of the library when the predictions are already known. This function scores
/// every text of `data` and returns the report of every label group, with the overall averages.
/// The returned structure can be used to prettyprint the results. Instead of taking in the raw
/// parameters, this function takes an `EvalConfig` struct.
///
/// * `data`: Texts with their true and predicted entities
/// * `grouped_targeted_labels`: Groups of labels scored as interchangeable
/// * `nontargeted_labels`: Labels left out of the evaluation
/// * `config`: Parameters used to score the texts.
///
/// # Example
/// ```rust
/// use piieval::{evaluate_conf, Data, DataItem, EvalConfigBuilder, MatchMode, SpanLabel};
/// use std::collections::BTreeSet;
///
/// let data = Data::from(vec![DataItem::new(
///     "Bob Smith lives in Oslo",
///     vec![SpanLabel::new("PER", 0, 9), SpanLabel::new("LOC", 19, 23)],
/// )
/// .with_predictions(vec![SpanLabel::new("PERSON", 0, 3), SpanLabel::new("LOC", 19, 23)])]);
/// let groups = vec![
///     BTreeSet::from([String::from("PER"), String::from("PERSON")]),
///     BTreeSet::from([String::from("LOC")]),
/// ];
/// let config = EvalConfigBuilder::default()
///     .match_mode(MatchMode::Partial)
///     .build()
///     .unwrap();
///
/// let report = evaluate_conf(&data, &groups, &BTreeSet::new(), config).unwrap();
/// let expected_report = "Group, Precision, Recall, Fscore, Support
/// Overall_Weighted, 1, 0.6666666666666666, 0.75, 2
/// Overall_Macro, 1, 0.6666666666666666, 0.75, 2
/// PER|PERSON, 1, 0.3333333333333333, 0.5, 1
/// LOC, 1, 1, 1, 1\n";
///
/// assert_eq!(expected_report, report.to_string());
/// ```
pub fn evaluate_conf(
    data: &Data,
    grouped_targeted_labels: &[LabelGroup],
    nontargeted_labels: &std::collections::BTreeSet<String>,
    config: EvalConfig,
) -> Result<ScoreReport, ComputationError> {
    config.validate()?;
    let scores =
        calculate_precisions_and_recalls(data, grouped_targeted_labels, nontargeted_labels, &config)?;
    group_report(&scores, grouped_targeted_labels, &config)
}
