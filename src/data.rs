/*!
Benchmark data: texts with their true entities and, once a recogniser ran, the predicted ones.
*/
use crate::entity::SpanLabel;
use crate::metrics::ComputationError;
use serde::{Deserialize, Serialize};
use serde_jsonlines::{json_lines, write_json_lines};
use std::path::Path;

/// One annotated text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataItem {
    pub text: String,
    pub true_labels: Vec<SpanLabel>,
    /// `None` until a recogniser went through the text.
    #[serde(default)]
    pub pred_labels: Option<Vec<SpanLabel>>,
}

impl DataItem {
    pub fn new<S: Into<String>>(text: S, true_labels: Vec<SpanLabel>) -> Self {
        DataItem {
            text: text.into(),
            true_labels,
            pred_labels: None,
        }
    }

    pub fn with_predictions(mut self, pred_labels: Vec<SpanLabel>) -> Self {
        self.pred_labels = Some(pred_labels);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Data {
    pub items: Vec<DataItem>,
}

impl From<Vec<DataItem>> for Data {
    fn from(items: Vec<DataItem>) -> Self {
        Data { items }
    }
}

/// Reads a benchmark dataset from a file.
pub trait DatasetReader {
    fn build_data(&self, path: &Path) -> Result<Data, ComputationError>;
}

/// Reads datasets stored as JSON lines, one `DataItem` per line:
///
/// ```text
/// {"text": "I live in Oslo", "true_labels": [{"entity_type": "LOC", "start": 10, "end": 14}]}
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLinesReader;

impl DatasetReader for JsonLinesReader {
    fn build_data(&self, path: &Path) -> Result<Data, ComputationError> {
        let items = json_lines::<DataItem, _>(path)?.collect::<Result<Vec<_>, _>>()?;
        log::info!("Read {} items from {}", items.len(), path.display());
        Ok(Data { items })
    }
}

/// Writes a dataset as JSON lines, the format read back by `JsonLinesReader`.
pub fn write_data<P: AsRef<Path>>(path: P, data: &Data) -> Result<(), ComputationError> {
    write_json_lines(path, &data.items)?;
    Ok(())
}
