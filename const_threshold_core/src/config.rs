//! Operator configuration documents.
//!
//! A configuration is a JSON object carrying the operator's attributes under
//! their graph names, plus the threshold initializer:
//!
//! ```json
//! {
//!   "op_type": "Thresholding_Binary_Search",
//!   "NumChannels": 4, "PE": 2, "numSteps": 3,
//!   "inputDataType": "INT8", "outputDataType": "INT4", "ActVal": -2,
//!   "mem_mode": "const", "numInputVectors": [1, 2, 2],
//!   "thresholds": [[1, 5, 9], [0, 0, 10], [-5, 0, 5], [2, 4, 6]]
//! }
//! ```
//!
//! Parsing only checks the document's form; [`ThresholdingConfig::build`] does
//! the validation and yields an immutable [`ThresholdingEngine`].

use std::{fs, path::Path};
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::{
  datatype::DataType,
  engine::{MemMode, OperatorKind, ThresholdingEngine},
  error::{Result, ThresholdingError},
  folding::FoldingConfig,
  table::ThresholdTable,
};

fn default_input_vectors() -> Vec<usize> { vec![1] }

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdingConfig {
  /// Operator variant (defaults to the linear `Thresholding`)
  #[serde(rename = "op_type", default)]
  pub kind: OperatorKind,

  #[serde(rename = "NumChannels")]
  pub num_channels: usize,

  #[serde(rename = "PE")]
  pub pe: usize,

  #[serde(rename = "numSteps")]
  pub num_steps: usize,

  #[serde(rename = "inputDataType")]
  pub input_type: DataType,

  /// Datatype the thresholds are declared in (defaults to `inputDataType`)
  #[serde(rename = "weightDataType", default, skip_serializing_if = "Option::is_none")]
  pub weight_type: Option<DataType>,

  #[serde(rename = "outputDataType")]
  pub output_type: DataType,

  #[serde(rename = "ActVal", default)]
  pub act_val: i64,

  #[serde(default)]
  pub mem_mode: MemMode,

  #[serde(rename = "numInputVectors", default = "default_input_vectors")]
  pub num_input_vectors: Vec<usize>,

  /// Round real-valued thresholds for integer inputs (see [`ThresholdTable::harden`]).
  /// Without an explicit `weightDataType`, the smallest type holding the result is used.
  #[serde(default)]
  pub harden: bool,

  /// One sorted row per channel, or a single row shared by every channel
  pub thresholds: Vec<Vec<f64>>,
}

impl ThresholdingConfig {
  pub fn from_json(json: &str) -> Result<Self> {
    Ok(serde_json::from_str(json)?)
  }

  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)
      .map_err(|source| ThresholdingError::Io { path: path.to_path_buf(), source })?;

    debug!(path = %path.display(), "loading thresholding configuration");
    Self::from_json(&json)
  }

  pub fn to_json(&self) -> Result<String> {
    Ok(serde_json::to_string_pretty(self)?)
  }

  /// Validate every attribute, then assemble the engine.
  pub fn build(&self) -> Result<ThresholdingEngine> {
    FoldingConfig::new(self.num_channels, self.pe)?;

    let table = match self.thresholds.as_slice() {
      [row] if self.num_channels > 1 => ThresholdTable::broadcast(row.clone(), self.num_channels)?,
      _ => ThresholdTable::new(self.thresholds.clone())?,
    };
    if table.shape() != (self.num_channels, self.num_steps) {
      return Err(ThresholdingError::configuration(format!(
        "threshold table has shape {:?}, NumChannels and numSteps declare ({}, {})",
        table.shape(), self.num_channels, self.num_steps
      )));
    }

    let table = if self.harden { table.harden(self.input_type) } else { table };
    let weight_type = match self.weight_type {
      Some(weight_type) => weight_type,
      None if self.harden && self.input_type.is_integer() => table.minimal_datatype()?,
      None => self.input_type,
    };

    if self.num_input_vectors.contains(&0) {
      return Err(ThresholdingError::configuration(format!(
        "numInputVectors {:?} contains an empty dimension", self.num_input_vectors
      )));
    }

    let engine = ThresholdingEngine::with_weight_type(
      table,
      self.pe,
      self.input_type,
      weight_type,
      self.output_type,
      self.act_val,
    )?;

    Ok(
      engine
        .with_kind(self.kind)
        .with_mem_mode(self.mem_mode)
        .with_num_input_vectors(self.num_input_vectors.clone())
    )
  }
}
