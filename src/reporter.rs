/**
This modules gives a few tools to prettyprint the scores of every label group and the overall
scores.
*/
use crate::config::EvalConfig;
use crate::metrics::{f_beta, ComputationError};
use crate::rollup::{apply_recall_threshold, group_name, mean, pool_by_group, LabelGroup};
use crate::scorer::TextScore;
use ndarray::Array1;
use ndarray_stats::SummaryStatisticsExt;
use serde::{Deserialize, Serialize};
use std::cmp::PartialOrd;
use std::collections::BTreeSet;
use std::fmt::Display;

/// The report holds the scores of every label group and the overall scores. It can be used to
/// display the results (i.e. prettyprint them) as if they were collected into a dataframe. The
/// report can be built with the `group_report` function.
///
/// # Example
///
/// ```rust
/// use piieval::{group_report, DataItem, EvalConfig, LabelMapping, SpanLabel, score_texts};
/// use std::collections::BTreeSet;
///
/// let items = vec![
///     DataItem::new("Bob lives in Oslo", vec![SpanLabel::new("PER", 0, 3), SpanLabel::new("LOC", 13, 17)])
///         .with_predictions(vec![SpanLabel::new("PER", 0, 3)]),
/// ];
/// let mapping = LabelMapping::from_iter([("PER", 1), ("LOC", 2)]);
/// let scores = score_texts(&items, &mapping, false).unwrap();
/// let groups = vec![BTreeSet::from([String::from("PER")]), BTreeSet::from([String::from("LOC")])];
/// let report = group_report(&scores, &groups, &EvalConfig::default()).unwrap();
///
/// let expected_report =
/// "Group, Precision, Recall, Fscore, Support
/// Overall_Weighted, 1, 0.5, 1, 2
/// Overall_Macro, 1, 0.5, 1, 2
/// PER, 1, 1, 1, 1
/// LOC, NaN, 0, NaN, 1\n";
///
/// assert_eq!(expected_report, report.to_string());
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct ScoreReport {
    pub(crate) groups: BTreeSet<GroupMetrics>,
}

impl ScoreReport {
    pub(crate) fn insert(&mut self, metrics: GroupMetrics) -> bool {
        self.groups.insert(metrics)
    }

    /// Metrics of a group, or of an overall row such as `Overall_Macro`.
    pub fn get(&self, group: &str) -> Option<&GroupMetrics> {
        self.groups.iter().find(|m| m.group == group)
    }

    /// Rows in display order: overall rows first.
    pub fn iter(&self) -> impl Iterator<Item = &GroupMetrics> {
        self.groups.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl From<ScoreReport> for Vec<GroupMetrics> {
    fn from(value: ScoreReport) -> Self {
        value.groups.into_iter().rev().collect()
    }
}

/// The ScoreReport struct acts as a dataframe when displayed.
impl Display for ScoreReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Group, Precision, Recall, Fscore, Support")?;
        for v in self.iter() {
            writeln!(f, "{}", v)?
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
/// Scores of a single label group. They implement a special version of the `Display` trait,
/// allowing them to be treated as the line of a dataframe. Two rows are equal when they share
/// their group and average, whatever their scores.
pub struct GroupMetrics {
    /// The group, such as "PER|PERSON" or "LOC".
    pub group: String,
    /// The average used to compute this row.
    pub average: Average,
    /// Mean precision of the predicted entities of the group
    pub precision: f64,
    /// Mean recall of the true entities of the group
    pub recall: f64,
    pub fscore: f64,
    /// Number of true entities of the group
    pub support: usize,
}

impl PartialEq for GroupMetrics {
    fn eq(&self, other: &Self) -> bool {
        self.group == other.group && self.average == other.average
    }
}
impl Eq for GroupMetrics {}

impl PartialOrd for GroupMetrics {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GroupMetrics {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match self.average.cmp(&other.average) {
            std::cmp::Ordering::Equal => self.group.cmp(&other.group),
            v => v,
        }
    }
}

impl GroupMetrics {
    fn new_overall(
        average: Average,
        precision: f64,
        recall: f64,
        fscore: f64,
        support: usize,
    ) -> Self {
        GroupMetrics {
            group: average.to_string(),
            average,
            precision,
            recall,
            fscore,
            support,
        }
    }
}

/// The GroupMetrics struct acts as a line in a dataframe when displayed.
impl Display for GroupMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}, {}",
            self.group, self.precision, self.recall, self.fscore, self.support
        )
    }
}

/// Averages of the report. Rows of a single group use `None`; they sort before the overall
/// rows.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Serialize, Deserialize)]
pub enum Average {
    None,
    Macro,
    Weighted,
}

impl Display for Average {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let str_content = match self {
            Self::None => "None",
            Self::Macro => "Overall_Macro",
            Self::Weighted => "Overall_Weighted",
        };
        write!(f, "{}", str_content)
    }
}

/// Mean over the rows holding a number. NaN when no row does.
fn macro_average(values: &[f64]) -> f64 {
    let defined: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    mean(&defined)
}

/// Mean over the rows holding a number, weighted by their support. NaN when no row does or when
/// they have no support.
fn weighted_average(values: &[f64], supports: &[usize]) -> f64 {
    let (defined, weights): (Vec<f64>, Vec<f64>) = values
        .iter()
        .zip(supports)
        .filter(|(v, _)| !v.is_nan())
        .map(|(v, s)| (*v, *s as f64))
        .unzip();
    if weights.iter().sum::<f64>() == 0.0 {
        return f64::NAN;
    }
    Array1::from(defined)
        .weighted_mean(&Array1::from(weights))
        .unwrap_or(f64::NAN)
}

/// Builds the report of a corpus: one row per label group, with the precisions and recalls of
/// all the texts pooled per group, then the macro average over the groups and the average
/// weighted by the support of every group. Groups without predictions have an undefined
/// precision; they are left out of the overall rows for that score.
///
/// * `scores`: Scores of every text
/// * `groups`: Label groups, as given to `build_label_mapping`
/// * `config`: Beta of the F-beta score and optional recall threshold
pub fn group_report(
    scores: &[TextScore],
    groups: &[LabelGroup],
    config: &EvalConfig,
) -> Result<ScoreReport, ComputationError> {
    config.validate()?;
    let mut report = ScoreReport::default();
    let pooled = pool_by_group(scores, groups);
    let mut precisions = Vec::with_capacity(groups.len());
    let mut recalls = Vec::with_capacity(groups.len());
    let mut fscores = Vec::with_capacity(groups.len());
    let mut supports = Vec::with_capacity(groups.len());
    for (group, (group_precisions, group_recalls)) in groups.iter().zip(pooled) {
        let precision = mean(&group_precisions);
        let recall = apply_recall_threshold(&group_recalls, config.recall_threshold)
            .mean()
            .unwrap_or(f64::NAN);
        let fscore = f_beta(precision, recall, config.beta);
        if fscore.is_nan() {
            log::warn!("Fscore of label group {} is undefined", group_name(group));
        }
        let support = group_recalls.len();
        report.insert(GroupMetrics {
            group: group_name(group),
            average: Average::None,
            precision,
            recall,
            fscore,
            support,
        });
        precisions.push(precision);
        recalls.push(recall);
        fscores.push(fscore);
        supports.push(support);
    }
    if groups.is_empty() {
        return Ok(report);
    }
    let total_support = supports.iter().sum();
    report.insert(GroupMetrics::new_overall(
        Average::Macro,
        macro_average(&precisions),
        macro_average(&recalls),
        macro_average(&fscores),
        total_support,
    ));
    report.insert(GroupMetrics::new_overall(
        Average::Weighted,
        weighted_average(&precisions, &supports),
        weighted_average(&recalls, &supports),
        weighted_average(&fscores, &supports),
        total_support,
    ));
    Ok(report)
}
