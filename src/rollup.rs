/*!
Rollup of entity-level scores into F-beta scores: per text, across a corpus and per label group.
*/
use crate::config::MatchMode;
use crate::metrics::{check_beta, check_recall_threshold, f_beta, ComputationError};
use crate::scorer::TextScore;
use ahash::AHashMap;
use enum_iterator::all;
use itertools::Itertools;
use ndarray::Array1;
use std::collections::{BTreeMap, BTreeSet};

/// Label groups are sets of entity types scored as interchangeable.
pub type LabelGroup = BTreeSet<String>;

/// Arithmetic mean, NaN for an empty slice.
pub(crate) fn mean(values: &[f64]) -> f64 {
    Array1::from(values.to_vec()).mean().unwrap_or(f64::NAN)
}

/// Name of a label group: its labels, sorted and joined by `|`.
pub fn group_name(group: &LabelGroup) -> String {
    group.iter().join("|")
}

/// Recalls at or above the threshold are rounded up to 1.
pub(crate) fn apply_recall_threshold(recalls: &[f64], recall_threshold: Option<f64>) -> Array1<f64> {
    let mut recalls = Array1::from(recalls.to_vec());
    if let Some(threshold) = recall_threshold {
        recalls.mapv_inplace(|r| if r >= threshold { 1.0 } else { r });
    }
    recalls
}

/// Precisions and recalls of all the texts, pooled by the label group of their entity type.
/// An entity type listed in several groups belongs to the first one.
pub(crate) fn pool_by_group(
    scores: &[TextScore],
    grouped_labels: &[LabelGroup],
) -> Vec<(Vec<f64>, Vec<f64>)> {
    let mut group_of: AHashMap<&str, usize> = AHashMap::new();
    for (i, group) in grouped_labels.iter().enumerate() {
        for label in group {
            group_of.entry(label.as_str()).or_insert(i);
        }
    }

    let mut pooled: Vec<(Vec<f64>, Vec<f64>)> = vec![(vec![], vec![]); grouped_labels.len()];
    for score in scores {
        for p in &score.precisions {
            match group_of.get(p.entity.entity_type.as_str()) {
                Some(&i) => pooled[i].0.push(p.precision),
                None => log::debug!("Skipping predicted entity {}: no label group", p.entity),
            }
        }
        for r in &score.recalls {
            match group_of.get(r.entity.entity_type.as_str()) {
                Some(&i) => pooled[i].1.push(r.recall),
                None => log::debug!("Skipping true entity {}: no label group", r.entity),
            }
        }
    }
    pooled
}

/// F-beta score of PII detection over the entity precisions and recalls of some texts.
///
/// When `recall_threshold` is given, every recall at or above it is rounded up to 1 before
/// averaging: an entity mostly covered by the predictions counts as detected. Precisions and
/// recalls are then averaged independently and combined with `f_beta`.
///
/// * `precisions`: Precisions of the predicted entities
/// * `recalls`: Recalls of the true entities
/// * `recall_threshold`: Optional threshold within `[0, 1]`
/// * `beta`: Weight of the recall
pub fn pii_detection_fbeta(
    precisions: &[f64],
    recalls: &[f64],
    recall_threshold: Option<f64>,
    beta: f64,
) -> Result<f64, ComputationError> {
    if precisions.is_empty() && recalls.is_empty() {
        return Err(ComputationError::EmptyInput(String::from(
            "(no precision and no recall to aggregate)",
        )));
    }
    check_recall_threshold(recall_threshold)?;
    check_beta(beta)?;
    let precision = mean(precisions);
    let recall = apply_recall_threshold(recalls, recall_threshold)
        .mean()
        .unwrap_or(f64::NAN);
    Ok(f_beta(precision, recall, beta))
}

/// Mean over the texts of their PII detection F-beta score. Texts without any scored entity
/// carry no signal and are skipped. A corpus left empty rolls up to 0.
pub fn rollup_across_texts(
    scores: &[TextScore],
    beta: f64,
    recall_threshold: Option<f64>,
) -> Result<f64, ComputationError> {
    let mut fbetas = Vec::with_capacity(scores.len());
    for (i, score) in scores.iter().enumerate() {
        if score.is_empty() {
            log::debug!("Skipping text {}: no entity to score", i);
            continue;
        }
        let fbeta = pii_detection_fbeta(
            &score.precision_values(),
            &score.recall_values(),
            recall_threshold,
            beta,
        )
        .map_err(|err| err.at_text(i))?;
        fbetas.push(fbeta);
    }
    if fbetas.is_empty() {
        log::warn!("No text carries any entity, the rollup across texts defaults to 0");
        return Ok(0.0);
    }
    Ok(mean(&fbetas))
}

/// PII detection F-beta score of every label group. The precisions and recalls of all the texts
/// are pooled by the group of their entity type before being averaged, unlike
/// `rollup_across_texts` which averages per text first. A group without any entity scores NaN.
/// Entities whose type belongs to no group are left out.
pub fn rollup_by_group(
    scores: &[TextScore],
    grouped_labels: &[LabelGroup],
    beta: f64,
    recall_threshold: Option<f64>,
) -> Result<BTreeMap<LabelGroup, f64>, ComputationError> {
    check_recall_threshold(recall_threshold)?;
    check_beta(beta)?;
    let pooled = pool_by_group(scores, grouped_labels);

    let mut results = BTreeMap::new();
    for (group, (precisions, recalls)) in grouped_labels.iter().zip(pooled) {
        let fbeta = if precisions.is_empty() && recalls.is_empty() {
            log::warn!("Label group {:?} has no entity, its score is undefined", group);
            f64::NAN
        } else {
            pii_detection_fbeta(&precisions, &recalls, recall_threshold, beta)?
        };
        results.insert(group.clone(), fbeta);
    }
    Ok(results)
}

/// Rollup across texts for every `MatchMode`, keyed by the name of the metric.
pub fn aggregate_metrics(
    scores: &[TextScore],
    beta: f64,
) -> Result<BTreeMap<String, f64>, ComputationError> {
    let mut results = BTreeMap::new();
    for mode in all::<MatchMode>() {
        let value = rollup_across_texts(scores, beta, mode.recall_threshold())?;
        results.insert(String::from(mode.metric_name()), value);
    }
    Ok(results)
}
