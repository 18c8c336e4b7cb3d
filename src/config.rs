/*
 * This modules contains the `EvalConfig` struct, which implements the default trait, and its
 * builder. The config can be passed to `calculate_precisions_and_recalls`, `group_report` or
 * `run_benchmark` to simplify their arguments. It also contains `MatchMode`, the two ways the
 * aggregate metrics treat partially detected entities.
*/
use crate::metrics::{check_beta, check_recall_threshold, ComputationError};
use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
/// Config struct used to simplify the inputs of the scoring and reporting functions. It
/// implements the default trait.
pub struct EvalConfig {
    /// Weight of the recall in the F-beta score. `beta=1` gives the F1 score.
    pub beta: f64,
    /// When given, a true entity whose recall reaches the threshold counts as fully detected.
    pub recall_threshold: Option<f64>,
    /// Can we use multiple cores to score the texts? This option should be benched: the
    /// texts of most corpora are short and the scoring of one text is cheap.
    pub parallel: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            beta: 1.0,
            recall_threshold: None,
            parallel: false,
        }
    }
}

impl EvalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks the beta and the recall threshold of a config built without the builder.
    pub fn validate(&self) -> Result<(), ComputationError> {
        check_beta(self.beta)?;
        check_recall_threshold(self.recall_threshold)
    }
}

impl Display for EvalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let string = format!(
            "Beta of the F-beta score: {}\n Recall threshold: {:?}\n Using parallel computations: {}",
            self.beta, self.recall_threshold, self.parallel
        );
        write!(f, "{}", string)
    }
}

/// This builder can be used to build and customize an `EvalConfig` structure.
#[derive(Clone, Copy, Debug)]
pub struct EvalConfigBuilder {
    beta: f64,
    recall_threshold: Option<f64>,
    parallel: bool,
}

impl Default for EvalConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EvalConfigBuilder {
    pub fn beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }
    pub fn recall_threshold(mut self, recall_threshold: f64) -> Self {
        self.recall_threshold = Some(recall_threshold);
        self
    }
    pub fn match_mode(mut self, mode: MatchMode) -> Self {
        self.recall_threshold = mode.recall_threshold();
        self
    }
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
    pub fn new() -> Self {
        let default = EvalConfig::default();
        Self {
            beta: default.beta,
            recall_threshold: default.recall_threshold,
            parallel: default.parallel,
        }
    }
    /// Builds the config. Fails on a negative beta or on a threshold outside of `[0, 1]`.
    pub fn build(self) -> Result<EvalConfig, ComputationError> {
        let config = EvalConfig {
            beta: self.beta,
            recall_threshold: self.recall_threshold,
            parallel: self.parallel,
        };
        config.validate()?;
        Ok(config)
    }
}

/// How partially detected entities count in the aggregate metrics. &str can be parsed to create
/// a `MatchMode`.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Sequence, Serialize, Deserialize)]
pub enum MatchMode {
    /// Recalls are used as they are.
    Exact,
    /// Recalls of at least 0.5 count as 1.
    Partial,
}

impl MatchMode {
    pub const PARTIAL_THRESHOLD: f64 = 0.5;

    pub fn recall_threshold(&self) -> Option<f64> {
        match self {
            Self::Exact => None,
            Self::Partial => Some(Self::PARTIAL_THRESHOLD),
        }
    }

    /// Key of the metric computed with this mode.
    pub fn metric_name(&self) -> &'static str {
        match self {
            Self::Exact => "exact_match_f1",
            Self::Partial => "partial_match_f1_threshold_at_50%",
        }
    }
}

impl Display for MatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromStr for MatchMode {
    type Err = MatchModeParsingError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exact" => Ok(MatchMode::Exact),
            "partial" => Ok(MatchMode::Partial),
            _ => Err(MatchModeParsingError(String::from(s))),
        }
    }
}

#[derive(Debug, PartialEq, PartialOrd, Eq, Ord, Clone)]
pub struct MatchModeParsingError(String);
impl Display for MatchModeParsingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Impossible to parse the string ({}) into a MatchMode",
            self.0
        )
    }
}
impl std::error::Error for MatchModeParsingError {}
