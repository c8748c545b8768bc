//! Processing-element folding: how channels are spread over parallel lanes.

use crate::{datatype::DataType, error::{Result, ThresholdingError}};

/// `num_channels` channels shared by `pe` lanes, `fold = num_channels / pe` each.
///
/// Lane `l` owns channels `l, l + pe, l + 2*pe, ...`, the interleaved order in
/// which a hardware implementation lays out its per-lane threshold memories.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FoldingConfig {
  num_channels: usize,
  pe:           usize,
}

/// Shape of the threshold storage implied by a folding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThresholdMemory {
  /// One memory per lane
  pub lanes:      usize,
  /// Entries per memory (one per channel the lane owns)
  pub depth:      usize,
  /// Bits per entry (every threshold of one channel)
  pub width_bits: usize,
}

impl ThresholdMemory {
  pub fn total_bits(&self) -> usize {
    self.lanes * self.depth * self.width_bits
  }
}

impl FoldingConfig {
  pub fn new(num_channels: usize, pe: usize) -> Result<Self> {
    if num_channels == 0 || pe == 0 {
      return Err(ThresholdingError::configuration(format!(
        "NumChannels ({}) and PE ({}) must be positive", num_channels, pe
      )));
    }
    if num_channels % pe != 0 {
      return Err(ThresholdingError::configuration(format!(
        "PE ({}) must divide NumChannels ({})", pe, num_channels
      )));
    }

    Ok(Self { num_channels, pe })
  }

  /// Every PE value that evenly divides `num_channels`, ascending.
  pub fn valid_pe(num_channels: usize) -> Vec<usize> {
    (1..=num_channels).filter(|pe| num_channels % pe == 0).collect()
  }

  pub fn num_channels(&self) -> usize { self.num_channels }
  pub fn pe(&self) -> usize { self.pe }

  /// Channels handled in sequence by each lane.
  pub fn fold(&self) -> usize { self.num_channels / self.pe }

  /// Channels owned by `lane`, in the order that lane visits them.
  pub fn lane_channels(&self, lane: usize) -> impl Iterator<Item = usize> {
    let pe = self.pe;
    (0..self.fold()).map(move |fold_index| fold_index * pe + lane)
  }

  /// `(lane, fold_index)` holding `channel`.
  pub fn channel_slot(&self, channel: usize) -> (usize, usize) {
    (channel % self.pe, channel / self.pe)
  }

  /// `num_input_vectors + [fold, pe]`: the tensor shape a lane-parallel stream carries.
  pub fn folded_shape(&self, num_input_vectors: &[usize]) -> Vec<usize> {
    num_input_vectors.iter().copied().chain([self.fold(), self.pe]).collect()
  }

  /// Cycles to stream `num_input_vectors` vectors through at one beat per cycle.
  pub fn expected_cycles(&self, num_input_vectors: &[usize]) -> usize {
    num_input_vectors.iter().product::<usize>() * self.fold()
  }

  pub fn threshold_memory(&self, num_steps: usize, weight_type: DataType) -> ThresholdMemory {
    ThresholdMemory {
      lanes:      self.pe,
      depth:      self.fold(),
      width_bits: num_steps * weight_type.bitwidth() as usize,
    }
  }
}
