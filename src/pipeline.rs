/*!
The PII validation pipeline: read a benchmark dataset, run a recogniser over its texts, score the
predictions against the ground truth and record the aggregate metrics.
*/
use crate::config::{EvalConfig, MatchMode};
use crate::data::{Data, DatasetReader};
use crate::encoding::{LabelCode, LabelMapping};
use crate::metrics::ComputationError;
use crate::recogniser::Recogniser;
use crate::rollup::{aggregate_metrics, rollup_by_group, LabelGroup};
use crate::scorer::{score_texts, TextScore};
use crate::token_evaluation::{SampleError, TokenEvaluator, TokenScores};
use crate::tracking::{Reporter, ReportingRun};
use enum_iterator::all;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Builds the label mapping of a benchmark. The labels of the `i`-th group share the code
/// `i + 1`, leaving `0` to the characters outside any entity. Non-targeted labels are ignored by
/// the scoring. A label listed in several groups keeps the code of the first one.
///
/// * `grouped_targeted_labels`: Groups of labels scored as interchangeable
/// * `nontargeted_labels`: Labels present in the data but not evaluated
pub fn build_label_mapping(
    grouped_targeted_labels: &[LabelGroup],
    nontargeted_labels: &BTreeSet<String>,
) -> LabelMapping {
    let mut mapping = LabelMapping::new();
    for (i, group) in grouped_targeted_labels.iter().enumerate() {
        let code = (i + 1) as LabelCode;
        for label in group {
            if mapping.get(label).is_some() {
                log::warn!("Label {} belongs to several groups, keeping the first one", label);
                continue;
            }
            if nontargeted_labels.contains(label) {
                log::warn!("Label {} is both targeted and non-targeted, it is ignored", label);
            }
            mapping.insert(label.as_str(), code);
        }
    }
    nontargeted_labels
        .iter()
        .fold(mapping, |mapping, label| mapping.ignore(label.as_str()))
}

/// Runs the recogniser over every text of the dataset, looking for all the entity types it
/// supports. The predictions replace the `pred_labels` of the items.
pub fn identify_pii_entities(
    mut data: Data,
    recogniser: &dyn Recogniser,
) -> Result<Data, ComputationError> {
    let entities = recogniser.supported_entities();
    log::info!(
        "Identifying {} entity types with {} in {} texts",
        entities.len(),
        recogniser.name(),
        data.items.len()
    );
    for (i, item) in data.items.iter_mut().enumerate() {
        let pred_labels = recogniser
            .analyse(&item.text, &entities)
            .map_err(|err| err.at_text(i))?;
        item.pred_labels = Some(pred_labels);
    }
    Ok(data)
}

/// Scores every text of the dataset. Items without predictions are scored against an empty
/// prediction.
pub fn calculate_precisions_and_recalls(
    data: &Data,
    grouped_targeted_labels: &[LabelGroup],
    nontargeted_labels: &BTreeSet<String>,
    config: &EvalConfig,
) -> Result<Vec<TextScore>, ComputationError> {
    let mapping = build_label_mapping(grouped_targeted_labels, nontargeted_labels);
    let scores = score_texts(&data.items, &mapping, config.parallel)?;
    log::info!("Scored {} texts", scores.len());
    Ok(scores)
}

/// Exact and partial match F-beta scores of the corpus. See `aggregate_metrics`.
pub fn calculate_aggregate_metrics(
    scores: &[TextScore],
    beta: f64,
) -> Result<BTreeMap<String, f64>, ComputationError> {
    aggregate_metrics(scores, beta)
}

/// Runs the whole benchmark of a recogniser within a run of `reporter` named after it. Records
/// the aggregate metrics, then the score of every label group for every `MatchMode`, and returns
/// the aggregate metrics.
#[allow(clippy::too_many_arguments)]
pub fn run_benchmark<D, R>(
    reader: &D,
    path: &Path,
    recogniser: &dyn Recogniser,
    grouped_targeted_labels: &[LabelGroup],
    nontargeted_labels: &BTreeSet<String>,
    config: &EvalConfig,
    reporter: &mut R,
) -> Result<BTreeMap<String, f64>, ComputationError>
where
    D: DatasetReader + ?Sized,
    R: Reporter + ?Sized,
{
    config.validate()?;
    let mut run = ReportingRun::start(reporter, recogniser.name());
    let data = reader.build_data(path)?;
    let data = identify_pii_entities(data, recogniser)?;
    let scores =
        calculate_precisions_and_recalls(&data, grouped_targeted_labels, nontargeted_labels, config)?;
    let metrics = calculate_aggregate_metrics(&scores, config.beta)?;
    run.record_all(&metrics);
    for mode in all::<MatchMode>() {
        let group_scores = rollup_by_group(
            &scores,
            grouped_targeted_labels,
            config.beta,
            mode.recall_threshold(),
        )?;
        run.record_group_scores(&group_scores, mode.metric_name());
    }
    log::info!("Benchmark of {} done: {:?}", recogniser.name(), metrics);
    Ok(metrics)
}

/// Evaluates the recogniser of `evaluator` token by token, within a run of `reporter` named
/// after it. Records the recall, precision and F-beta score of every evaluated entity type,
/// under `<entity>_recall`, `<entity>_precision` and `<entity>_f<beta>`, and returns them with
/// the mistakes made on every text.
pub fn run_token_benchmark<R: Reporter + ?Sized>(
    evaluator: &TokenEvaluator,
    texts: &[String],
    annotations: &[Vec<String>],
    beta: f64,
    reporter: &mut R,
) -> Result<(TokenScores, Vec<SampleError>), ComputationError> {
    let mut run = ReportingRun::start(reporter, evaluator.recogniser_name());
    let (counters, mistakes) = evaluator.evaluate_all(texts, annotations)?;
    let scores = evaluator.calculate_score(&counters, beta)?;
    run.record_entity_scores(&scores.recall, "recall");
    run.record_entity_scores(&scores.precision, "precision");
    run.record_entity_scores(&scores.fscore, &format!("f{}", beta));
    let failed = mistakes.iter().filter(|m| m.failed).count();
    if failed > 0 {
        log::warn!("{} texts could not be evaluated token by token", failed);
    }
    Ok((scores, mistakes))
}
