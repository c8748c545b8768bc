//! Numeric datatypes understood by the thresholding operator.
//!
//! Names follow the quantized-network convention (`INT4`, `UINT8`, `BIPOLAR`, ...)
//! and double as the serde representation.

use core::{fmt, str::FromStr};
use serde::{Deserialize, Serialize};
use crate::error::{Result, ThresholdingError};

/// Widest integer datatype accepted. Every value of every supported datatype
/// is exactly representable in an `f64` container.
pub const MAX_INTEGER_BITS: u8 = 32;

/// A quantized (or float) element type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataType {
  /// `{0, 1}`
  Binary,
  /// `{-1, +1}`, encoded as a single bit (`0 => -1`, `1 => +1`)
  Bipolar,
  /// Two's complement signed integer of the given bit width
  Int(u8),
  /// Unsigned integer of the given bit width
  UInt(u8),
  /// IEEE-754 single precision
  Float32,
}

impl DataType {
  /// Storage width in bits.
  pub const fn bitwidth(self) -> u32 {
    match self {
      DataType::Binary | DataType::Bipolar => 1,
      DataType::Int(bits) | DataType::UInt(bits) => bits as u32,
      DataType::Float32 => 32,
    }
  }

  pub const fn signed(self) -> bool {
    matches!(self, DataType::Bipolar | DataType::Int(_) | DataType::Float32)
  }

  pub const fn is_integer(self) -> bool {
    !matches!(self, DataType::Float32)
  }

  /// Smallest representable value.
  pub fn min(self) -> f64 {
    match self {
      DataType::Binary | DataType::UInt(_) => 0.0,
      DataType::Bipolar => -1.0,
      DataType::Int(bits) => -((1i64 << (bits - 1)) as f64),
      DataType::Float32 => f32::MIN as f64,
    }
  }

  /// Largest representable value.
  pub fn max(self) -> f64 {
    match self {
      DataType::Binary | DataType::Bipolar => 1.0,
      DataType::Int(bits) => ((1i64 << (bits - 1)) - 1) as f64,
      DataType::UInt(bits) => ((1i64 << bits) - 1) as f64,
      DataType::Float32 => f32::MAX as f64,
    }
  }

  /// Is `value` exactly representable?
  pub fn allowed(self, value: f64) -> bool {
    match self {
      DataType::Float32 => value.is_finite() && (value as f32) as f64 == value,
      DataType::Bipolar => value == -1.0 || value == 1.0,
      _ => value.fract() == 0.0 && value >= self.min() && value <= self.max(),
    }
  }

  /// Number of distinct values (`None` for floats).
  pub fn num_possible_values(self) -> Option<u64> {
    match self {
      DataType::Float32 => None,
      DataType::Bipolar => Some(2),
      _ => Some(1u64 << self.bitwidth()),
    }
  }

  /// Force `value` into this datatype without wrapping.
  /// - integers clamp to `[min, max]`
  /// - bipolar maps negatives to `-1`, everything else to `+1`
  /// - float32 rounds to the nearest `f32`
  pub fn saturate(self, value: f64) -> f64 {
    match self {
      DataType::Float32 => (value as f32) as f64,
      DataType::Bipolar => if value < 0.0 { -1.0 } else { 1.0 },
      _ => value.clamp(self.min(), self.max()),
    }
  }

  /// Smallest integer datatype whose range covers `[min, max]`.
  /// Both bounds must be integral.
  pub fn smallest_containing(min: f64, max: f64) -> Result<DataType> {
    if min.fract() != 0.0 || max.fract() != 0.0 || min > max {
      return Err(ThresholdingError::configuration(format!(
        "cannot fit an integer datatype around [{}, {}]", min, max
      )));
    }

    let candidate = if min >= 0.0 {
      (1..=MAX_INTEGER_BITS)
        .map(|bits| if bits == 1 { DataType::Binary } else { DataType::UInt(bits) })
        .find(|dt| dt.max() >= max)
    } else {
      (2..=MAX_INTEGER_BITS)
        .map(DataType::Int)
        .find(|dt| dt.min() <= min && dt.max() >= max)
    };

    candidate.ok_or_else(|| ThresholdingError::configuration(format!(
      "range [{}, {}] needs more than {} bits", min, max, MAX_INTEGER_BITS
    )))
  }

  fn mask(self) -> u64 {
    (1u64 << self.bitwidth()) - 1
  }

  /// Raw bit pattern of `value`, as it sits on a hardware stream.
  /// `value` should already be allowed by this datatype.
  pub fn encode(self, value: f64) -> u64 {
    match self {
      DataType::Float32 => (value as f32).to_bits() as u64,
      DataType::Bipolar => if value > 0.0 { 1 } else { 0 },
      _ => (value as i64 as u64) & self.mask(),
    }
  }

  /// Inverse of [`DataType::encode`] (sign-extends signed integers).
  pub fn decode(self, bits: u64) -> f64 {
    let bits = bits & self.mask();
    match self {
      DataType::Float32 => f32::from_bits(bits as u32) as f64,
      DataType::Bipolar => if bits == 1 { 1.0 } else { -1.0 },
      DataType::Int(width) => {
        let shift = 64 - width as u32;
        (((bits << shift) as i64) >> shift) as f64
      },
      DataType::Binary | DataType::UInt(_) => bits as f64,
    }
  }

  /// `self`, if its bit width is supported.
  pub(crate) fn validated(self) -> Result<Self> {
    match self {
      DataType::Int(bits) if !(2..=MAX_INTEGER_BITS).contains(&bits) => Err(ThresholdingError::configuration(
        format!("INT{} is not supported (2..={} bits)", bits, MAX_INTEGER_BITS)
      )),
      DataType::UInt(bits) if !(1..=MAX_INTEGER_BITS).contains(&bits) => Err(ThresholdingError::configuration(
        format!("UINT{} is not supported (1..={} bits)", bits, MAX_INTEGER_BITS)
      )),
      dt => Ok(dt),
    }
  }
}

impl fmt::Display for DataType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DataType::Binary     => write!(f, "BINARY"),
      DataType::Bipolar    => write!(f, "BIPOLAR"),
      DataType::Int(bits)  => write!(f, "INT{}", bits),
      DataType::UInt(bits) => write!(f, "UINT{}", bits),
      DataType::Float32    => write!(f, "FLOAT32"),
    }
  }
}

impl FromStr for DataType {
  type Err = ThresholdingError;

  fn from_str(s: &str) -> Result<Self> {
    let name = s.trim().to_ascii_uppercase();
    let bits = |digits: &str| digits.parse::<u8>()
      .map_err(|_| ThresholdingError::configuration(format!("unknown datatype `{}`", s)));

    let datatype = match name.as_str() {
      "BINARY"  => DataType::Binary,
      "BIPOLAR" => DataType::Bipolar,
      "FLOAT32" => DataType::Float32,
      _ => match (name.strip_prefix("UINT"), name.strip_prefix("INT")) {
        (Some(digits), _) => DataType::UInt(bits(digits)?),
        (_, Some(digits)) => DataType::Int(bits(digits)?),
        _ => return Err(ThresholdingError::configuration(format!("unknown datatype `{}`", s))),
      }
    };

    datatype.validated()
  }
}

impl TryFrom<String> for DataType {
  type Error = ThresholdingError;
  fn try_from(value: String) -> Result<Self> { value.parse() }
}

impl From<DataType> for String {
  fn from(value: DataType) -> Self { value.to_string() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn names_round_trip() {
    for name in ["BINARY", "BIPOLAR", "INT4", "INT16", "UINT1", "UINT8", "FLOAT32"] {
      let dt: DataType = name.parse().unwrap();
      assert_eq!(dt.to_string(), name);
    }
    assert_eq!("int4".parse::<DataType>().unwrap(), DataType::Int(4));
  }

  #[test]
  fn rejects_unknown_and_unsupported_names() {
    assert!("FIXED<8,4>".parse::<DataType>().is_err());
    assert!("INT1".parse::<DataType>().is_err());
    assert!("INT64".parse::<DataType>().is_err());
    assert!("UINT".parse::<DataType>().is_err());
  }

  #[test]
  fn integer_ranges() {
    assert_eq!((DataType::Int(4).min(), DataType::Int(4).max()), (-8.0, 7.0));
    assert_eq!((DataType::UInt(4).min(), DataType::UInt(4).max()), (0.0, 15.0));
    assert_eq!((DataType::Int(16).min(), DataType::Int(16).max()), (-32768.0, 32767.0));
    assert_eq!((DataType::Bipolar.min(), DataType::Bipolar.max()), (-1.0, 1.0));
    assert_eq!(DataType::Int(4).num_possible_values(), Some(16));
    assert_eq!(DataType::Bipolar.num_possible_values(), Some(2));
    assert_eq!(DataType::Float32.num_possible_values(), None);
  }

  #[test]
  fn allowed_values() {
    assert!(DataType::Int(4).allowed(-8.0));
    assert!(!DataType::Int(4).allowed(8.0));
    assert!(!DataType::Int(4).allowed(0.5));
    assert!(!DataType::UInt(2).allowed(-1.0));
    assert!(!DataType::Bipolar.allowed(0.0));
    assert!(DataType::Float32.allowed(0.25));
    assert!(!DataType::Float32.allowed(0.1));
    assert!(!DataType::Float32.allowed(f64::NAN));
  }

  #[test]
  fn saturates_instead_of_wrapping() {
    assert_eq!(DataType::Int(4).saturate(9.0), 7.0);
    assert_eq!(DataType::Int(4).saturate(-20.0), -8.0);
    assert_eq!(DataType::UInt(2).saturate(-1.0), 0.0);
    assert_eq!(DataType::Bipolar.saturate(0.0), 1.0);
    assert_eq!(DataType::Bipolar.saturate(-2.0), -1.0);
  }

  #[test]
  fn smallest_containing_range() {
    assert_eq!(DataType::smallest_containing(0.0, 1.0).unwrap(), DataType::Binary);
    assert_eq!(DataType::smallest_containing(0.0, 15.0).unwrap(), DataType::UInt(4));
    assert_eq!(DataType::smallest_containing(-8.0, 7.0).unwrap(), DataType::Int(4));
    assert_eq!(DataType::smallest_containing(-8.0, 8.0).unwrap(), DataType::Int(5));
    assert_eq!(DataType::smallest_containing(-32768.0, 32768.0).unwrap(), DataType::Int(17));
    assert!(DataType::smallest_containing(0.5, 2.0).is_err());
  }

  #[test]
  fn bit_patterns() {
    assert_eq!(DataType::Int(4).encode(-3.0), 0b1101);
    assert_eq!(DataType::Int(4).decode(0b1101), -3.0);
    assert_eq!(DataType::UInt(4).decode(0b1101), 13.0);
    assert_eq!(DataType::Bipolar.encode(-1.0), 0);
    assert_eq!(DataType::Bipolar.decode(1), 1.0);
    assert_eq!(DataType::Float32.decode(DataType::Float32.encode(-1.5)), -1.5);
  }

  #[test]
  fn serde_uses_names() {
    let dt: DataType = serde_json::from_str("\"UINT8\"").unwrap();
    assert_eq!(dt, DataType::UInt(8));
    assert_eq!(serde_json::to_string(&DataType::Int(3)).unwrap(), "\"INT3\"");
  }
}
