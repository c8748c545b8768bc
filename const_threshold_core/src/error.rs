//! Error types for thresholding configuration and dispatch

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for thresholding operations
pub type Result<T> = std::result::Result<T, ThresholdingError>;

/// Everything that can go wrong before evaluation starts.
///
/// Evaluation itself never fails: every check happens at construction or dispatch.
#[derive(Debug, Error)]
pub enum ThresholdingError {
  /// Folding, shape or ordering of the operator's configuration is invalid
  #[error("Invalid configuration: {reason}")]
  Configuration {
    /// What was wrong
    reason: String,
  },

  /// A threshold or input value falls outside its declared datatype
  #[error("{what} value {value} is not representable as {datatype}")]
  DatatypeRange {
    /// Which value was checked (`threshold`, `input`, ...)
    what: &'static str,
    /// Offending value
    value: f64,
    /// Declared datatype name
    datatype: String,
  },

  /// Tensor shape does not agree with the channel count or its own data
  #[error("Input shape mismatch: expected {expected}, found {found}")]
  InputShape {
    /// What the engine expected
    expected: String,
    /// What it got
    found: String,
  },

  /// Packed stream word width does not match the requested shape
  #[error("Stream error: {reason}")]
  Stream {
    /// What was wrong
    reason: String,
  },

  /// Failed to read a configuration file
  #[error("Failed to read {path}: {source}")]
  Io {
    /// File that was read
    path: PathBuf,
    /// Underlying I/O error
    source: std::io::Error,
  },

  /// Configuration document is malformed
  #[error("Malformed configuration: {0}")]
  Json(#[from] serde_json::Error),
}

impl ThresholdingError {
  /// Create a configuration error
  pub fn configuration(reason: impl Into<String>) -> Self {
    Self::Configuration { reason: reason.into() }
  }

  /// Create a datatype range error
  pub fn datatype_range(what: &'static str, value: f64, datatype: impl ToString) -> Self {
    Self::DatatypeRange { what, value, datatype: datatype.to_string() }
  }

  /// Create an input shape error
  pub fn input_shape(expected: impl Into<String>, found: impl Into<String>) -> Self {
    Self::InputShape { expected: expected.into(), found: found.into() }
  }

  /// Create a stream error
  pub fn stream(reason: impl Into<String>) -> Self {
    Self::Stream { reason: reason.into() }
  }
}
