/*!
Entity-level scoring of one text. Each predicted entity gets a precision, each true entity gets
a recall, both measured on the characters of the text. Predictions and ground truth do not have
to agree on boundaries: partial overlaps give proportional scores.
*/
use crate::data::DataItem;
use crate::encoding::{encode_labels, EncodingError, LabelCode, LabelMapping};
use crate::entity::SpanLabel;
use crate::metrics::{label_precision, label_recall, ComputationError};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::slice;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityPrecision {
    pub entity: SpanLabel,
    pub precision: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecall {
    pub entity: SpanLabel,
    pub recall: f64,
}

/// Scores of a single text: one precision per predicted entity and one recall per true entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextScore {
    pub text: String,
    pub precisions: Vec<EntityPrecision>,
    pub recalls: Vec<EntityRecall>,
}

impl TextScore {
    pub fn precision_values(&self) -> Vec<f64> {
        self.precisions.iter().map(|p| p.precision).collect()
    }

    pub fn recall_values(&self) -> Vec<f64> {
        self.recalls.iter().map(|r| r.recall).collect()
    }

    /// A text without any scored entity carries no signal.
    pub fn is_empty(&self) -> bool {
        self.precisions.is_empty() && self.recalls.is_empty()
    }
}

fn targeted<'a>(
    spans: &'a [SpanLabel],
    mapping: &'a LabelMapping,
) -> impl Iterator<Item = &'a SpanLabel> + 'a {
    spans
        .iter()
        .filter(move |span| !mapping.is_ignored(&span.entity_type))
}

fn code_of(span: &SpanLabel, mapping: &LabelMapping) -> Result<LabelCode, EncodingError> {
    mapping
        .get(&span.entity_type)
        .ok_or_else(|| EncodingError::MissingLabel(span.entity_type.clone()))
}

/// Precision of every predicted entity. Each prediction is encoded on its own and compared with
/// the encoding of all the true entities, restricted to the prediction's code. A prediction
/// overlapping no true entity of its code scores 0.
///
/// * `text_length`: Number of characters of the text
/// * `true_spans`: True entities
/// * `pred_spans`: Predicted entities
/// * `mapping`: Codes of the entity types
pub fn entity_precisions(
    text_length: usize,
    true_spans: &[SpanLabel],
    pred_spans: &[SpanLabel],
    mapping: &LabelMapping,
) -> Result<Vec<EntityPrecision>, ComputationError> {
    let true_code = encode_labels(text_length, true_spans, mapping)?;
    let mut precisions = Vec::with_capacity(pred_spans.len());
    for pred_span in targeted(pred_spans, mapping) {
        let pred_span_code = encode_labels(text_length, slice::from_ref(pred_span), mapping)?;
        let precision = label_precision(&true_code, &pred_span_code, code_of(pred_span, mapping)?)?;
        precisions.push(EntityPrecision {
            entity: pred_span.clone(),
            precision,
        });
    }
    Ok(precisions)
}

/// Recall of every true entity, against the encoding of all the predictions. Several
/// predictions covering parts of one true entity add up.
pub fn entity_recalls(
    text_length: usize,
    true_spans: &[SpanLabel],
    pred_spans: &[SpanLabel],
    mapping: &LabelMapping,
) -> Result<Vec<EntityRecall>, ComputationError> {
    let pred_code = encode_labels(text_length, pred_spans, mapping)?;
    let mut recalls = Vec::with_capacity(true_spans.len());
    for true_span in targeted(true_spans, mapping) {
        let true_span_code = encode_labels(text_length, slice::from_ref(true_span), mapping)?;
        let recall = label_recall(&true_span_code, &pred_code, code_of(true_span, mapping)?)?;
        recalls.push(EntityRecall {
            entity: true_span.clone(),
            recall,
        });
    }
    Ok(recalls)
}

/// Scores the entities of a text. Offsets are character offsets, so the length of the text is
/// its number of `char`s. Entities whose type is ignored by the mapping are left out.
pub fn score_text(
    text: &str,
    true_spans: &[SpanLabel],
    pred_spans: &[SpanLabel],
    mapping: &LabelMapping,
) -> Result<TextScore, ComputationError> {
    let text_length = text.chars().count();
    let precisions = entity_precisions(text_length, true_spans, pred_spans, mapping)?;
    let recalls = entity_recalls(text_length, true_spans, pred_spans, mapping)?;
    log::debug!(
        "Scored text of {} characters: {} predicted and {} true entities",
        text_length,
        precisions.len(),
        recalls.len()
    );
    Ok(TextScore {
        text: text.to_owned(),
        precisions,
        recalls,
    })
}

fn score_item(
    index: usize,
    item: &DataItem,
    mapping: &LabelMapping,
) -> Result<(usize, TextScore), ComputationError> {
    let pred_labels = item.pred_labels.as_deref().unwrap_or_default();
    score_text(&item.text, &item.true_labels, pred_labels, mapping)
        .map(|score| (index, score))
        .map_err(|err| err.at_text(index))
}

/// Scores every item of a corpus. Items without predictions are scored against an empty
/// prediction. With `parallel`, texts are scored on the rayon thread pool; the scores are
/// returned in the order of `items` either way. Errors name the index of the failing text.
pub fn score_texts(
    items: &[DataItem],
    mapping: &LabelMapping,
    parallel: bool,
) -> Result<Vec<TextScore>, ComputationError> {
    let mut indexed: Vec<(usize, TextScore)> = if parallel {
        items
            .par_iter()
            .enumerate()
            .map(|(i, item)| score_item(i, item, mapping))
            .collect::<Result<_, _>>()?
    } else {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| score_item(i, item, mapping))
            .collect::<Result<_, _>>()?
    };
    indexed.sort_unstable_by_key(|(i, _)| *i);
    Ok(indexed.into_iter().map(|(_, score)| score).collect())
}
