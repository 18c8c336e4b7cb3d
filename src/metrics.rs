/**
This module computes label-specific precision and recall over two aligned sequences of
character codes, and combines precision and recall into an F-beta score.
*/
use crate::encoding::{EncodingError, LabelCode};
use crate::entity::OrderingError;
use core::fmt;
use ndarray::{ArrayBase, Data, Ix1, Zip};
use num::Float;
use std::error::Error;
use std::fmt::Display;

#[derive(Debug, PartialEq, Clone, Copy)]
/// Error type to represent when two code sequences are not of the same length (when they
/// should be).
pub struct InconsistentLengthError(pub usize, pub usize);

impl Display for InconsistentLengthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Inconsistent length between two code sequences. `y_true` is length {}, `y_pred` is length {}",
            self.0, self.1
        )
    }
}
impl Error for InconsistentLengthError {}

#[derive(Debug, Clone, PartialEq)]
/// Enum error encompassing the failures that can happen when scoring texts and aggregating the
/// scores.
pub enum ComputationError {
    BetaNotPositive,
    ThresholdOutOfRange(f64),
    EmptyInput(String),
    Encoding(EncodingError),
    Ordering(OrderingError),
    InconsistentLength(InconsistentLengthError),
    /// Failure while scoring the text at `index` of a corpus.
    AtText {
        index: usize,
        source: Box<ComputationError>,
    },
    Io(String),
    UnknownComponent(String),
    /// A recogniser was asked for an entity type it cannot find.
    UnsupportedEntity { recogniser: String, entity: String },
    /// A recogniser term or pattern could not be compiled.
    Pattern(regex::Error),
    /// Token predictions hold entity types the recogniser was not asked for.
    UnaskedEntities(Vec<String>),
    /// The number of texts differs from the number of annotation sequences.
    MismatchedAnnotations { texts: usize, annotations: usize },
}

impl Display for ComputationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BetaNotPositive => write!(f, "Beta value is not positive"),
            Self::ThresholdOutOfRange(t) => {
                write!(f, "Recall threshold must be within [0, 1], got {}", t)
            }
            Self::EmptyInput(which) => write!(f, "Received an empty input {}", which),
            Self::Encoding(err) => Display::fmt(err, f),
            Self::Ordering(err) => Display::fmt(err, f),
            Self::InconsistentLength(err) => Display::fmt(err, f),
            Self::AtText { index, source } => write!(f, "Text {}: {}", index, source),
            Self::Io(err) => write!(f, "Could not read the data: {}", err),
            Self::UnknownComponent(name) => write!(f, "No component is registered as `{}`", name),
            Self::UnsupportedEntity { recogniser, entity } => write!(
                f,
                "Recogniser {} does not support entity type {}",
                recogniser, entity
            ),
            Self::Pattern(err) => write!(f, "Invalid pattern: {}", err),
            Self::UnaskedEntities(entities) => write!(
                f,
                "Predictions contain unasked entities [{}]",
                entities.join(", ")
            ),
            Self::MismatchedAnnotations { texts, annotations } => write!(
                f,
                "The number of texts ({}) mismatches the number of annotations ({})",
                texts, annotations
            ),
        }
    }
}

impl Error for ComputationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Encoding(err) => Some(err),
            Self::Ordering(err) => Some(err),
            Self::InconsistentLength(err) => Some(err),
            Self::AtText { source, .. } => Some(source.as_ref()),
            Self::Pattern(err) => Some(err),
            _ => None,
        }
    }
}

impl ComputationError {
    pub(crate) fn at_text(self, index: usize) -> Self {
        Self::AtText {
            index,
            source: Box::new(self),
        }
    }
}

impl From<EncodingError> for ComputationError {
    fn from(value: EncodingError) -> Self {
        Self::Encoding(value)
    }
}

impl From<OrderingError> for ComputationError {
    fn from(value: OrderingError) -> Self {
        Self::Ordering(value)
    }
}

impl From<InconsistentLengthError> for ComputationError {
    fn from(value: InconsistentLengthError) -> Self {
        Self::InconsistentLength(value)
    }
}

impl From<regex::Error> for ComputationError {
    fn from(value: regex::Error) -> Self {
        Self::Pattern(value)
    }
}

impl From<std::io::Error> for ComputationError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

/// Checks the `beta` parameter of the F-beta score.
pub(crate) fn check_beta<F: Float>(beta: F) -> Result<(), ComputationError> {
    if beta.is_sign_negative() || beta.is_nan() {
        return Err(ComputationError::BetaNotPositive);
    }
    Ok(())
}

/// Checks that a recall threshold lies within `[0, 1]`.
pub(crate) fn check_recall_threshold(threshold: Option<f64>) -> Result<(), ComputationError> {
    match threshold {
        Some(t) if !(0.0..=1.0).contains(&t) => Err(ComputationError::ThresholdOutOfRange(t)),
        _ => Ok(()),
    }
}

/// Counts of a single label: (true positives, predicted, true).
type LabelCounts = (usize, usize, usize);

fn label_counts<S1, S2>(
    y_true: &ArrayBase<S1, Ix1>,
    y_pred: &ArrayBase<S2, Ix1>,
    label: LabelCode,
) -> Result<LabelCounts, InconsistentLengthError>
where
    S1: Data<Elem = LabelCode>,
    S2: Data<Elem = LabelCode>,
{
    if y_true.len() != y_pred.len() {
        return Err(InconsistentLengthError(y_true.len(), y_pred.len()));
    }
    let counts = Zip::from(y_true)
        .and(y_pred)
        .fold((0, 0, 0), |(tp, pred, truth), &t, &p| {
            let is_true = t == label;
            let is_pred = p == label;
            (
                tp + (is_true && is_pred) as usize,
                pred + is_pred as usize,
                truth + is_true as usize,
            )
        });
    Ok(counts)
}

/// Returns 0 when the denominator is 0.
#[inline]
fn divide_or_zero(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Precision of a single label: among the positions predicted as `label`, the share which are
/// also `label` in the ground truth. Returns 0 if `label` is never predicted.
///
/// * `y_true`: True codes
/// * `y_pred`: Predicted codes, aligned with `y_true`
/// * `label`: Code of the label
pub fn label_precision<S1, S2>(
    y_true: &ArrayBase<S1, Ix1>,
    y_pred: &ArrayBase<S2, Ix1>,
    label: LabelCode,
) -> Result<f64, InconsistentLengthError>
where
    S1: Data<Elem = LabelCode>,
    S2: Data<Elem = LabelCode>,
{
    let (tp, pred, _) = label_counts(y_true, y_pred, label)?;
    Ok(divide_or_zero(tp, pred))
}

/// Recall of a single label: among the positions which are `label` in the ground truth, the
/// share also predicted as `label`. Returns 0 if `label` never appears in the ground truth.
pub fn label_recall<S1, S2>(
    y_true: &ArrayBase<S1, Ix1>,
    y_pred: &ArrayBase<S2, Ix1>,
    label: LabelCode,
) -> Result<f64, InconsistentLengthError>
where
    S1: Data<Elem = LabelCode>,
    S2: Data<Elem = LabelCode>,
{
    let (tp, _, truth) = label_counts(y_true, y_pred, label)?;
    Ok(divide_or_zero(tp, truth))
}

/// Weighted harmonic mean of precision and recall. Returns NaN if either value is NaN, or if
/// both are exactly 0: no signal is not the same thing as a perfect failure.
///
/// * `beta`: `beta=1` for F1 and `beta=0.5` for F0.5.
pub fn f_beta<F: Float>(precision: F, recall: F, beta: F) -> F {
    if precision.is_nan() || recall.is_nan() || (precision.is_zero() && recall.is_zero()) {
        return F::nan();
    }
    let beta2 = beta.powi(2);
    ((F::one() + beta2) * precision * recall) / (beta2 * precision + recall)
}
