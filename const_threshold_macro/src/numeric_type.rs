use proc_macro2::{Literal, TokenStream};
use quote::quote;
use const_threshold_core::{DataType, ThresholdingEngine};

/// Native types the generated code computes in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NumericType {
  I8, I16, I32, I64,
  U8, U16, U32, U64,
  F32, F64,
}

impl NumericType {
  /// Provides the token of the chosen numeric type, suitable for interpolation
  pub fn token(&self) -> TokenStream {
    match self {
      NumericType::I8  => quote! { i8 },
      NumericType::I16 => quote! { i16 },
      NumericType::I32 => quote! { i32 },
      NumericType::I64 => quote! { i64 },
      NumericType::U8  => quote! { u8 },
      NumericType::U16 => quote! { u16 },
      NumericType::U32 => quote! { u32 },
      NumericType::U64 => quote! { u64 },
      NumericType::F32 => quote! { f32 },
      NumericType::F64 => quote! { f64 },
    }
  }

  /// Provide the byte size of the chosen numeric type
  pub fn size_of(&self) -> usize {
    match self {
      NumericType::I8  | NumericType::U8                   => 1,
      NumericType::I16 | NumericType::U16                  => 2,
      NumericType::I32 | NumericType::U32 | NumericType::F32 => 4,
      NumericType::I64 | NumericType::U64 | NumericType::F64 => 8,
    }
  }

  pub fn is_float(&self) -> bool {
    matches!(self, NumericType::F32 | NumericType::F64)
  }

  /// `[MIN, MAX]` of an integer type (`None` for floats).
  pub fn integer_range(&self) -> Option<(f64, f64)> {
    match self {
      NumericType::I8  => Some((i8::MIN as f64, i8::MAX as f64)),
      NumericType::I16 => Some((i16::MIN as f64, i16::MAX as f64)),
      NumericType::I32 => Some((i32::MIN as f64, i32::MAX as f64)),
      NumericType::I64 => Some((i64::MIN as f64, i64::MAX as f64)),
      NumericType::U8  => Some((0.0, u8::MAX as f64)),
      NumericType::U16 => Some((0.0, u16::MAX as f64)),
      NumericType::U32 => Some((0.0, u32::MAX as f64)),
      NumericType::U64 => Some((0.0, u64::MAX as f64)),
      NumericType::F32 | NumericType::F64 => None,
    }
  }

  /// Smallest integer type covering `[min, max]`.
  pub fn for_range(min: f64, max: f64) -> Self {
    if min >= 0.0 {
      [(NumericType::U8, u8::MAX as f64), (NumericType::U16, u16::MAX as f64), (NumericType::U32, u32::MAX as f64)]
        .into_iter()
        .find(|&(_, hi)| max <= hi)
        .map_or(NumericType::U64, |(ty, _)| ty)
    } else {
      [
        (NumericType::I8,  i8::MIN as f64,  i8::MAX as f64),
        (NumericType::I16, i16::MIN as f64, i16::MAX as f64),
        (NumericType::I32, i32::MIN as f64, i32::MAX as f64),
      ]
        .into_iter()
        .find(|&(_, lo, hi)| min >= lo && max <= hi)
        .map_or(NumericType::I64, |(ty, _, _)| ty)
    }
  }

  /// Native container for values of `datatype`.
  pub fn for_datatype(datatype: DataType) -> Self {
    match datatype {
      DataType::Float32 => NumericType::F32,
      DataType::Bipolar => NumericType::I8,
      _ => Self::for_range(datatype.min(), datatype.max()),
    }
  }

  /// The type inputs and thresholds are compared in: every input value and
  /// every threshold converts into it losslessly.
  pub fn comparison_domain(engine: &ThresholdingEngine) -> Self {
    let (input, weight) = (engine.input_type(), engine.weight_type());
    match (input.is_integer(), weight.is_integer()) {
      (true, true) => {
        let (lo, hi) = engine.table().bounds();
        Self::for_range(lo.min(input.min()), hi.max(input.max()))
      },
      (false, false) => NumericType::F32,
      // integers up to 32 bits and every f32 fit exactly in an f64
      _ => NumericType::F64,
    }
  }

  /// `value` as a literal of this type. `value` must already fit.
  pub fn literal(&self, value: f64) -> TokenStream {
    let literal = match self {
      NumericType::F32 => Literal::f32_suffixed(value as f32),
      NumericType::F64 => Literal::f64_suffixed(value),
      _ => Literal::i64_unsuffixed(value as i64),
    };
    quote! { #literal }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn picks_smallest_integer_type() {
    assert_eq!(NumericType::for_datatype(DataType::Int(4)), NumericType::I8);
    assert_eq!(NumericType::for_datatype(DataType::Int(16)), NumericType::I16);
    assert_eq!(NumericType::for_datatype(DataType::Int(17)), NumericType::I32);
    assert_eq!(NumericType::for_datatype(DataType::UInt(8)), NumericType::U8);
    assert_eq!(NumericType::for_datatype(DataType::UInt(9)), NumericType::U16);
    assert_eq!(NumericType::for_datatype(DataType::Binary), NumericType::U8);
    assert_eq!(NumericType::for_datatype(DataType::Bipolar), NumericType::I8);
    assert_eq!(NumericType::for_datatype(DataType::Float32), NumericType::F32);
    assert_eq!(NumericType::for_range(-1.0, u32::MAX as f64), NumericType::I64);
  }

  #[test]
  fn domain_covers_hardened_thresholds() {
    use const_threshold_core::ThresholdTable;

    // INT8 inputs against a threshold one past the input range
    let table = ThresholdTable::new(vec![vec![-128.0, 128.0]]).unwrap();
    let engine = ThresholdingEngine::with_weight_type(table, 1, DataType::Int(8), DataType::Int(9), DataType::Int(4), 0).unwrap();
    assert_eq!(NumericType::comparison_domain(&engine), NumericType::I16);

    let table = ThresholdTable::new(vec![vec![0.5]]).unwrap();
    let engine = ThresholdingEngine::with_weight_type(table, 1, DataType::Int(8), DataType::Float32, DataType::Int(4), 0).unwrap();
    assert_eq!(NumericType::comparison_domain(&engine), NumericType::F64);
  }

  #[test]
  fn integer_ranges() {
    assert_eq!(NumericType::I8.integer_range(), Some((-128.0, 127.0)));
    assert_eq!(NumericType::U16.integer_range(), Some((0.0, 65535.0)));
    assert_eq!(NumericType::F32.integer_range(), None);
  }

  #[test]
  fn literals() {
    assert_eq!(NumericType::I16.literal(-5.0).to_string().replace(' ', ""), "-5");
    assert_eq!(NumericType::F32.literal(0.5).to_string(), "0.5f32");
  }
}
