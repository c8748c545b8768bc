//! Minimal N-dimensional tensor: row-major `f64` data plus a shape.
//!
//! Values are kept in an `f64` container whatever their datatype, which is wide
//! enough to hold every supported datatype exactly.

use crate::error::{Result, ThresholdingError};

#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
  shape: Vec<usize>,
  data:  Vec<f64>,
}

fn describe(shape: &[usize]) -> String {
  format!("{:?}", shape)
}

impl Tensor {
  pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Self> {
    if shape.is_empty() {
      return Err(ThresholdingError::input_shape("at least one dimension", "a scalar"));
    }
    let elems: usize = shape.iter().product();
    if elems != data.len() {
      return Err(ThresholdingError::input_shape(
        format!("{} values for shape {}", elems, describe(&shape)),
        format!("{} values", data.len()),
      ));
    }

    Ok(Self { shape, data })
  }

  /// A tensor with every element set to `value`.
  pub fn filled(shape: Vec<usize>, value: f64) -> Result<Self> {
    let elems = shape.iter().product();
    Self::new(shape, vec![value; elems])
  }

  pub fn shape(&self) -> &[usize] { &self.shape }
  pub fn data(&self) -> &[f64] { &self.data }
  pub fn into_data(self) -> Vec<f64> { self.data }

  /// Size of the innermost (channel) dimension.
  pub fn inner_dim(&self) -> usize {
    self.shape[self.shape.len() - 1]
  }

  /// Every dimension except the innermost.
  pub fn outer_shape(&self) -> &[usize] {
    &self.shape[..self.shape.len() - 1]
  }

  /// Product of the outer dimensions: how many innermost rows there are.
  pub fn outer_elems(&self) -> usize {
    self.outer_shape().iter().product()
  }

  /// Innermost rows, in memory order.
  pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
    // a zero-width tensor holds no data, but `chunks_exact(0)` would still panic
    self.data.chunks_exact(self.inner_dim().max(1))
  }

  /// Same data, new shape (element count must match).
  pub fn reshape(self, shape: Vec<usize>) -> Result<Self> {
    Self::new(shape, self.data)
  }

  /// `(N, C, H, W)` to `(N, H, W, C)`.
  pub fn nchw_to_nhwc(&self) -> Result<Self> {
    self.permute_4d([0, 2, 3, 1])
  }

  /// `(N, H, W, C)` to `(N, C, H, W)`.
  pub fn nhwc_to_nchw(&self) -> Result<Self> {
    self.permute_4d([0, 3, 1, 2])
  }

  /// Output dimension `d` is input dimension `axes[d]`.
  fn permute_4d(&self, axes: [usize; 4]) -> Result<Self> {
    if self.shape.len() != 4 {
      return Err(ThresholdingError::input_shape("a 4D tensor", describe(&self.shape)));
    }

    let strides = [
      self.shape[1] * self.shape[2] * self.shape[3],
      self.shape[2] * self.shape[3],
      self.shape[3],
      1,
    ];
    let shape: Vec<usize> = axes.iter().map(|&axis| self.shape[axis]).collect();
    let mut data = Vec::with_capacity(self.data.len());

    for a in 0..shape[0] {
      for b in 0..shape[1] {
        for c in 0..shape[2] {
          for d in 0..shape[3] {
            let index = [a, b, c, d].iter().zip(axes).map(|(i, axis)| i * strides[axis]).sum::<usize>();
            data.push(self.data[index]);
          }
        }
      }
    }

    Self::new(shape, data)
  }
}
