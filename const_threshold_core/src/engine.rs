//! The reference thresholding engine.
//!
//! `output = saturate(ActVal + count(thresholds <= input))`, evaluated
//! independently for every (vector, channel) pair. This is the oracle the
//! generated implementations are checked against.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use crate::{
  datatype::DataType,
  error::{Result, ThresholdingError},
  folding::{FoldingConfig, ThresholdMemory},
  stream::{self, PackedStream},
  table::ThresholdTable,
  tensor::Tensor,
};

/// `ActVal` must stay exact in an `f64` container.
const MAX_ACT_VAL: u64 = 1 << 52;

/// Which thresholding operator variant to use.
///
/// Both variants count the same thresholds; they differ only in how the
/// comparison is organised in hardware.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorKind {
  /// A bank of `numSteps` comparators whose outputs are summed.
  #[default]
  #[serde(rename = "Thresholding", alias = "Thresholding_Batch")]
  Linear,
  /// Binary search over the sorted thresholds (`log2(numSteps)` comparisons).
  #[serde(rename = "Thresholding_Binary_Search")]
  BinarySearch,
}

impl OperatorKind {
  pub const VARIANTS_LIST: &'static str = "Thresholding, Thresholding_Batch, Thresholding_Binary_Search";

  /// Operator name as it appears in a model graph.
  pub fn op_type(self) -> &'static str {
    match self {
      OperatorKind::Linear       => "Thresholding",
      OperatorKind::BinarySearch => "Thresholding_Binary_Search",
    }
  }

  /// Number of thresholds in the sorted `thresholds` that `x` reaches (inclusive).
  pub fn level(self, thresholds: &[f64], x: f64) -> usize {
    match self {
      OperatorKind::Linear       => thresholds.iter().filter(|&&t| x >= t).count(),
      OperatorKind::BinarySearch => thresholds.partition_point(|&t| t <= x),
    }
  }
}

impl FromStr for OperatorKind {
  type Err = ThresholdingError;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "Thresholding" | "Thresholding_Batch" => Ok(OperatorKind::Linear),
      "Thresholding_Binary_Search"          => Ok(OperatorKind::BinarySearch),
      _ => Err(ThresholdingError::configuration(format!(
        "unknown operator `{}` (expected one of {})", s, OperatorKind::VARIANTS_LIST
      ))),
    }
  }
}

/// Where threshold constants live in a generated implementation.
/// Has no effect on results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemMode {
  /// Baked into the implementation as constants
  #[default]
  Const,
  /// Held in replaceable storage next to the implementation
  Decoupled,
}

impl FromStr for MemMode {
  type Err = ThresholdingError;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "const"     => Ok(MemMode::Const),
      "decoupled" => Ok(MemMode::Decoupled),
      _ => Err(ThresholdingError::configuration(format!("unknown mem_mode `{}` (expected const, decoupled)", s))),
    }
  }
}

/// A validated, immutable thresholding operator.
#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdingEngine {
  kind:              OperatorKind,
  folding:           FoldingConfig,
  table:             ThresholdTable,
  input_type:        DataType,
  weight_type:       DataType,
  output_type:       DataType,
  act_val:           i64,
  mem_mode:          MemMode,
  num_input_vectors: Vec<usize>,
}

impl ThresholdingEngine {
  /// Validate and build an engine whose thresholds share the input datatype.
  /// - linear search, `const` memory, a single input vector
  pub fn new(table: ThresholdTable, pe: usize, input_type: DataType, output_type: DataType, act_val: i64) -> Result<Self> {
    Self::with_weight_type(table, pe, input_type, input_type, output_type, act_val)
  }

  /// Like [`Self::new`], with thresholds declared (and checked) as `weight_type`.
  /// Needed when hardened thresholds reach one past the input range.
  pub fn with_weight_type(
    table:       ThresholdTable,
    pe:          usize,
    input_type:  DataType,
    weight_type: DataType,
    output_type: DataType,
    act_val:     i64,
  ) -> Result<Self> {
    let (input_type, weight_type, output_type) = (input_type.validated()?, weight_type.validated()?, output_type.validated()?);
    let folding = FoldingConfig::new(table.num_channels(), pe)?;
    table.check_datatype(weight_type)?;

    if act_val.unsigned_abs() > MAX_ACT_VAL {
      return Err(ThresholdingError::configuration(format!(
        "ActVal {} overflows the output range", act_val
      )));
    }

    let engine = Self {
      kind: OperatorKind::default(),
      folding,
      table,
      input_type,
      weight_type,
      output_type,
      act_val,
      mem_mode: MemMode::default(),
      num_input_vectors: vec![1],
    };

    debug!(
      channels = engine.num_channels(),
      pe,
      fold = engine.fold(),
      steps = engine.num_steps(),
      input = %input_type,
      output = %output_type,
      act_val,
      "built thresholding engine"
    );
    Ok(engine)
  }

  /// Same operator, different search variant.
  pub fn with_kind(mut self, kind: OperatorKind) -> Self {
    self.kind = kind;
    self
  }

  /// Same operator, different folding.
  pub fn with_pe(mut self, pe: usize) -> Result<Self> {
    self.folding = FoldingConfig::new(self.num_channels(), pe)?;
    Ok(self)
  }

  pub fn with_mem_mode(mut self, mem_mode: MemMode) -> Self {
    self.mem_mode = mem_mode;
    self
  }

  pub fn with_num_input_vectors(mut self, num_input_vectors: Vec<usize>) -> Self {
    self.num_input_vectors = num_input_vectors;
    self
  }

  pub fn kind(&self) -> OperatorKind { self.kind }
  pub fn folding(&self) -> FoldingConfig { self.folding }
  pub fn table(&self) -> &ThresholdTable { &self.table }
  pub fn input_type(&self) -> DataType { self.input_type }
  pub fn weight_type(&self) -> DataType { self.weight_type }
  pub fn output_type(&self) -> DataType { self.output_type }
  pub fn act_val(&self) -> i64 { self.act_val }
  pub fn mem_mode(&self) -> MemMode { self.mem_mode }
  pub fn num_input_vectors(&self) -> &[usize] { &self.num_input_vectors }
  pub fn num_channels(&self) -> usize { self.table.num_channels() }
  pub fn num_steps(&self) -> usize { self.table.num_steps() }
  pub fn pe(&self) -> usize { self.folding.pe() }
  pub fn fold(&self) -> usize { self.folding.fold() }

  /// Shape of the tensors this operator is declared to consume and produce.
  pub fn io_shape(&self) -> Vec<usize> {
    self.num_input_vectors.iter().copied().chain([self.num_channels()]).collect()
  }

  /// Cycles to stream the declared input vectors through.
  pub fn expected_cycles(&self) -> usize {
    self.folding.expected_cycles(&self.num_input_vectors)
  }

  pub fn threshold_memory(&self) -> ThresholdMemory {
    self.folding.threshold_memory(self.num_steps(), self.weight_type)
  }

  /// Zero-based activation level of `x` in `channel`.
  /// Panics if `channel` is out of range.
  pub fn level(&self, channel: usize, x: f64) -> usize {
    self.kind.level(self.table.channel(channel), x)
  }

  /// `ActVal + level`, saturated into the output datatype.
  /// Panics if `channel` is out of range.
  pub fn activate(&self, channel: usize, x: f64) -> f64 {
    let level = self.level(channel, x) as i64;
    self.output_type.saturate((self.act_val + level) as f64)
  }

  /// Everything [`Self::execute`] checks before it touches a single element.
  pub fn check_input(&self, input: &Tensor) -> Result<()> {
    if input.inner_dim() != self.num_channels() {
      return Err(ThresholdingError::input_shape(
        format!("innermost dimension {}", self.num_channels()),
        format!("{:?}", input.shape()),
      ));
    }
    match input.data().iter().find(|&&x| !self.input_type.allowed(x)) {
      Some(&x) => Err(ThresholdingError::datatype_range("input", x, self.input_type)),
      None => Ok(()),
    }
  }

  /// Threshold every element of `input` (shape `[..., NumChannels]`), lane by lane.
  pub fn execute(&self, input: &Tensor) -> Result<Tensor> {
    self.check_input(input)?;
    trace!(vectors = input.outer_elems(), pe = self.pe(), "executing folded");

    let channels = self.num_channels();
    let mut output = vec![0.0; input.data().len()];
    for (x, y) in input.rows().zip(output.chunks_exact_mut(channels)) {
      for lane in 0..self.pe() {
        for channel in self.folding.lane_channels(lane) {
          y[channel] = self.activate(channel, x[channel]);
        }
      }
    }

    Tensor::new(input.shape().to_vec(), output)
  }

  /// [`Self::execute`] in plain channel order, ignoring the folding.
  pub fn execute_unfolded(&self, input: &Tensor) -> Result<Tensor> {
    self.check_input(input)?;
    trace!(vectors = input.outer_elems(), "executing unfolded");

    let output = input.rows()
      .flat_map(|x| x.iter().enumerate().map(|(channel, &x)| self.activate(channel, x)))
      .collect();

    Tensor::new(input.shape().to_vec(), output)
  }

  /// Input as a PE-wide stream: one word per `(vector, fold)` beat.
  pub fn pack_input(&self, input: &Tensor) -> Result<PackedStream> {
    self.check_input(input)?;
    let folded = input.clone().reshape(self.folding.folded_shape(input.outer_shape()))?;
    stream::pack(&folded, self.input_type, true)
  }

  /// Reassemble a PE-wide output stream into `outer_shape + [NumChannels]`.
  pub fn unpack_output(&self, packed: &PackedStream, outer_shape: &[usize]) -> Result<Tensor> {
    if packed.elem_type != self.output_type {
      return Err(ThresholdingError::stream(format!(
        "stream carries {}, operator produces {}", packed.elem_type, self.output_type
      )));
    }
    let folded = stream::unpack(packed, &self.folding.folded_shape(outer_shape), true)?;
    folded.reshape(outer_shape.iter().copied().chain([self.num_channels()]).collect())
  }
}
