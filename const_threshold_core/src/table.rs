//! Per-channel threshold tables.

use crate::{datatype::DataType, error::{Result, ThresholdingError}};

/// Thresholds of shape `(num_channels, num_steps)`, stored row-major.
///
/// Every row is sorted non-decreasing (ties allowed) and contains no NaN.
/// A table is immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdTable {
  num_channels: usize,
  num_steps:    usize,
  values:       Vec<f64>,
}

impl ThresholdTable {
  /// Build a table from one row per channel. Rows must already be sorted.
  pub fn new(rows: Vec<Vec<f64>>) -> Result<Self> {
    let num_channels = rows.len();
    let num_steps = rows.first().map(Vec::len).unwrap_or(0);

    if let Some((channel, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != num_steps) {
      return Err(ThresholdingError::configuration(format!(
        "channel {} has {} thresholds, channel 0 has {}", channel, row.len(), num_steps
      )));
    }

    Self::from_flat(num_channels, num_steps, rows.into_iter().flatten().collect())
  }

  /// Build a table from row-major values.
  pub fn from_flat(num_channels: usize, num_steps: usize, values: Vec<f64>) -> Result<Self> {
    if num_channels == 0 || num_steps == 0 {
      return Err(ThresholdingError::configuration(format!(
        "threshold table must be non-empty, got shape ({}, {})", num_channels, num_steps
      )));
    }
    if values.len() != num_channels * num_steps {
      return Err(ThresholdingError::configuration(format!(
        "threshold table has {} values, shape ({}, {}) needs {}",
        values.len(), num_channels, num_steps, num_channels * num_steps
      )));
    }

    for (channel, row) in values.chunks_exact(num_steps).enumerate() {
      if row.iter().any(|t| t.is_nan()) {
        return Err(ThresholdingError::configuration(format!("channel {} contains a NaN threshold", channel)));
      }
      if let Some(step) = row.windows(2).position(|pair| pair[0] > pair[1]) {
        return Err(ThresholdingError::configuration(format!(
          "channel {} thresholds decrease at step {} ({} > {})", channel, step + 1, row[step], row[step + 1]
        )));
      }
    }

    Ok(Self { num_channels, num_steps, values })
  }

  /// Sort each row ascending, then build.
  pub fn sorted(mut rows: Vec<Vec<f64>>) -> Result<Self> {
    for row in rows.iter_mut() {
      row.sort_by(f64::total_cmp);
    }
    Self::new(rows)
  }

  /// Share a single row of thresholds between `num_channels` channels.
  pub fn broadcast(row: Vec<f64>, num_channels: usize) -> Result<Self> {
    let num_steps = row.len();
    let values = row.iter().copied().cycle().take(num_steps * num_channels).collect();
    Self::from_flat(num_channels, num_steps, values)
  }

  pub fn num_channels(&self) -> usize { self.num_channels }
  pub fn num_steps(&self) -> usize { self.num_steps }

  /// Shape as `(num_channels, num_steps)`.
  pub fn shape(&self) -> (usize, usize) { (self.num_channels, self.num_steps) }

  /// Sorted thresholds of one channel. Panics if `channel` is out of range.
  pub fn channel(&self, channel: usize) -> &[f64] {
    let start = channel * self.num_steps;
    &self.values[start..start + self.num_steps]
  }

  pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
    self.values.chunks_exact(self.num_steps)
  }

  pub fn to_rows(&self) -> Vec<Vec<f64>> {
    self.rows().map(<[f64]>::to_vec).collect()
  }

  /// Smallest and largest threshold in the table.
  pub fn bounds(&self) -> (f64, f64) {
    self.values.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &t| (lo.min(t), hi.max(t)))
  }

  /// Fail on the first threshold `datatype` cannot represent.
  pub fn check_datatype(&self, datatype: DataType) -> Result<()> {
    let datatype = datatype.validated()?;
    match self.values.iter().find(|&&t| !datatype.allowed(t)) {
      Some(&t) => Err(ThresholdingError::datatype_range("threshold", t, datatype)),
      None => Ok(()),
    }
  }

  /// Smallest integer datatype holding every threshold.
  pub fn minimal_datatype(&self) -> Result<DataType> {
    let (lo, hi) = self.bounds();
    DataType::smallest_containing(lo, hi)
  }

  /// Make real-valued thresholds usable against integer inputs.
  ///
  /// For an integer input `x`, `x >= t` holds exactly when `x >= ceil(t)`, and any
  /// threshold beyond `[min, max + 1]` of the input type behaves like that bound.
  /// The returned table therefore produces the same level as `self` for every
  /// representable input. Float inputs are returned unchanged.
  pub fn harden(&self, input_type: DataType) -> ThresholdTable {
    if !input_type.is_integer() {
      return self.clone();
    }

    let (lo, hi) = (input_type.min(), input_type.max() + 1.0);
    ThresholdTable {
      num_channels: self.num_channels,
      num_steps:    self.num_steps,
      values:       self.values.iter().map(|t| t.ceil().clamp(lo, hi)).collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_ragged_rows() {
    let err = ThresholdTable::new(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
    assert!(matches!(err, ThresholdingError::Configuration { .. }));
  }

  #[test]
  fn rejects_empty_and_mis_sized_tables() {
    assert!(ThresholdTable::new(vec![]).is_err());
    assert!(ThresholdTable::from_flat(2, 3, vec![0.0; 5]).is_err());
    assert!(ThresholdTable::from_flat(2, 0, vec![]).is_err());
  }

  #[test]
  fn rejects_unsorted_and_nan() {
    assert!(ThresholdTable::new(vec![vec![1.0, 0.0]]).is_err());
    assert!(ThresholdTable::new(vec![vec![f64::NAN, 0.0]]).is_err());
    // ties are fine
    assert!(ThresholdTable::new(vec![vec![0.0, 0.0, 10.0]]).is_ok());
  }

  #[test]
  fn sorted_sorts_each_row() {
    let table = ThresholdTable::sorted(vec![vec![9.0, 1.0, 5.0], vec![0.0, 10.0, 0.0]]).unwrap();
    assert_eq!(table.channel(0), &[1.0, 5.0, 9.0]);
    assert_eq!(table.channel(1), &[0.0, 0.0, 10.0]);
  }

  #[test]
  fn broadcast_repeats_row() {
    let table = ThresholdTable::broadcast(vec![-1.0, 2.0], 3).unwrap();
    assert_eq!(table.shape(), (3, 2));
    assert!(table.rows().all(|row| row == [-1.0, 2.0]));
  }

  #[test]
  fn datatype_checks() {
    let table = ThresholdTable::new(vec![vec![-8.0, 7.0], vec![0.0, 8.0]]).unwrap();
    let err = table.check_datatype(DataType::Int(4)).unwrap_err();
    assert!(matches!(err, ThresholdingError::DatatypeRange { value, .. } if value == 8.0));
    assert!(table.check_datatype(DataType::Int(5)).is_ok());
    assert_eq!(table.minimal_datatype().unwrap(), DataType::Int(5));
    assert!(matches!(table.check_datatype(DataType::Int(0)), Err(ThresholdingError::Configuration { .. })));
  }

  #[test]
  fn harden_preserves_levels_for_every_integer_input() {
    let input_type = DataType::Int(4);
    let real = ThresholdTable::new(vec![vec![-20.0, -2.5, 0.0, 3.1, 7.5, 100.0]]).unwrap();
    let hard = real.harden(input_type);

    assert_eq!(hard.channel(0), &[-8.0, -2.0, 0.0, 4.0, 8.0, 8.0]);
    for x in -8..=7 {
      let x = x as f64;
      let count = |row: &[f64]| row.iter().filter(|&&t| x >= t).count();
      assert_eq!(count(real.channel(0)), count(hard.channel(0)), "x = {}", x);
    }
  }

  #[test]
  fn harden_leaves_float_inputs_alone() {
    let real = ThresholdTable::new(vec![vec![-0.5, 0.25]]).unwrap();
    assert_eq!(real.harden(DataType::Float32), real);
  }
}
