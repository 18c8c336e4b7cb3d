/*!
Experiment tracking. Metrics are recorded through a `Reporter`, within a run opened and closed by
a `ReportingRun`.
*/
use crate::rollup::{group_name, LabelGroup};
use std::collections::BTreeMap;

/// Destination of the metrics of a run.
pub trait Reporter {
    /// Starts a run. Metrics recorded afterward belong to it.
    fn open(&mut self, run_name: &str);
    fn record(&mut self, key: &str, value: f64);
    /// Ends the current run.
    fn close(&mut self);
}

/// A run of a `Reporter`. The run is opened on creation and closed when dropped, including when
/// the benchmark fails halfway.
pub struct ReportingRun<'a, R: Reporter + ?Sized> {
    reporter: &'a mut R,
}

impl<'a, R: Reporter + ?Sized> ReportingRun<'a, R> {
    pub fn start(reporter: &'a mut R, run_name: &str) -> Self {
        reporter.open(run_name);
        ReportingRun { reporter }
    }

    pub fn record(&mut self, key: &str, value: f64) {
        self.reporter.record(key, value)
    }

    /// Records every metric of `metrics`, under its own key.
    pub fn record_all(&mut self, metrics: &BTreeMap<String, f64>) {
        for (key, value) in metrics {
            self.reporter.record(key, *value);
        }
    }

    /// Records one metric per label group, under `<group>_<metric_name>`.
    pub fn record_group_scores(&mut self, scores: &BTreeMap<LabelGroup, f64>, metric_name: &str) {
        record_group_scores(&mut *self.reporter, scores, metric_name)
    }

    /// Records one metric per entity type, under `<entity>_<metric_name>`.
    pub fn record_entity_scores(&mut self, scores: &BTreeMap<String, f64>, metric_name: &str) {
        for (entity, score) in scores {
            let key = format!("{}_{}", entity, metric_name);
            self.reporter.record(&key, *score);
        }
    }
}

impl<R: Reporter + ?Sized> Drop for ReportingRun<'_, R> {
    fn drop(&mut self) {
        self.reporter.close()
    }
}

/// Records one metric per label group. The key of a group is its name followed by
/// `_<metric_name>`, e.g. `PER|PERSON_exact_match_f1`.
pub fn record_group_scores<R: Reporter + ?Sized>(
    reporter: &mut R,
    scores: &BTreeMap<LabelGroup, f64>,
    metric_name: &str,
) {
    for (group, score) in scores {
        let key = format!("{}_{}", group_name(group), metric_name);
        reporter.record(&key, *score);
    }
}

/// Keeps the metrics of the last run in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryReporter {
    run_name: Option<String>,
    is_open: bool,
    metrics: BTreeMap<String, f64>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_name(&self) -> Option<&str> {
        self.run_name.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn metrics(&self) -> &BTreeMap<String, f64> {
        &self.metrics
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).copied()
    }
}

impl Reporter for MemoryReporter {
    fn open(&mut self, run_name: &str) {
        self.run_name = Some(String::from(run_name));
        self.metrics.clear();
        self.is_open = true;
    }

    fn record(&mut self, key: &str, value: f64) {
        if !self.is_open {
            log::warn!("Metric {} recorded outside of a run", key);
        }
        self.metrics.insert(String::from(key), value);
    }

    fn close(&mut self) {
        self.is_open = false;
    }
}

/// Emits the metrics through the `log` facade, at info level.
#[derive(Debug, Clone, Default)]
pub struct LogReporter {
    run_name: Option<String>,
}

impl Reporter for LogReporter {
    fn open(&mut self, run_name: &str) {
        log::info!("Starting run {}", run_name);
        self.run_name = Some(String::from(run_name));
    }

    fn record(&mut self, key: &str, value: f64) {
        log::info!(
            "[{}] {} = {}",
            self.run_name.as_deref().unwrap_or("-"),
            key,
            value
        );
    }

    fn close(&mut self) {
        if let Some(run_name) = self.run_name.take() {
            log::info!("Ending run {}", run_name);
        }
    }
}
