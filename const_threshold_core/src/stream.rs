//! Bit-packed streams, the way tensors travel over a hardware stream interface.
//!
//! Each innermost row of a tensor becomes one word. The element at row position
//! `ii` occupies slot `i` (`n - 1 - ii` when the inner dimension is reversed), i.e.
//! bits `[i * b, (i + 1) * b)` of the word, where `b` is the element bit width.
//! Words are stored as little-endian bytes.
//!
//! A word may carry several pixels (`multi_pixel`); reversal then applies to each
//! pixel's elements separately. A stream can be replayed with [`PackedStream::repeated`].

use crate::{
  datatype::DataType,
  error::{Result, ThresholdingError},
  tensor::Tensor,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedStream {
  /// Datatype of every element in every word
  pub elem_type:  DataType,
  elems_per_word: usize,
  words:          Vec<Vec<u8>>,
}

impl PackedStream {
  pub fn elems_per_word(&self) -> usize { self.elems_per_word }

  pub fn word_bits(&self) -> usize {
    self.elems_per_word * self.elem_type.bitwidth() as usize
  }

  pub fn words(&self) -> &[Vec<u8>] { &self.words }
  pub fn len(&self) -> usize { self.words.len() }
  pub fn is_empty(&self) -> bool { self.words.is_empty() }

  /// The whole stream sent `num_reps` times back to back.
  pub fn repeated(&self, num_reps: usize) -> PackedStream {
    PackedStream {
      elem_type:      self.elem_type,
      elems_per_word: self.elems_per_word,
      words:          (0..num_reps).flat_map(|_| self.words.iter().cloned()).collect(),
    }
  }

  /// Split a repeated stream back into its `num_reps` copies.
  pub fn repetitions(&self, num_reps: usize) -> Result<Vec<PackedStream>> {
    if num_reps == 0 || self.len() % num_reps != 0 {
      return Err(ThresholdingError::stream(format!(
        "{} words cannot hold {} equal repetitions", self.len(), num_reps
      )));
    }

    Ok(
      self.words
        .chunks_exact(self.len() / num_reps)
        .map(|words| PackedStream { elem_type: self.elem_type, elems_per_word: self.elems_per_word, words: words.to_vec() })
        .collect()
    )
  }

  /// Word as a `0x`-prefixed hex literal, most significant digit first.
  pub fn word_hex(&self, index: usize) -> Option<String> {
    let word = self.words.get(index)?;
    let digits = (self.word_bits() + 3) / 4;
    let full: String = word.iter().rev().map(|byte| format!("{:02x}", byte)).collect();
    Some(format!("0x{}", &full[full.len() - digits..]))
  }
}

fn word_bytes(word_bits: usize) -> usize {
  (word_bits + 7) / 8
}

fn set_bits(word: &mut [u8], offset: usize, width: u32, value: u64) {
  for bit in 0..width {
    if (value >> bit) & 1 == 1 {
      let position = offset + bit as usize;
      word[position / 8] |= 1 << (position % 8);
    }
  }
}

fn get_bits(word: &[u8], offset: usize, width: u32) -> u64 {
  (0..width).fold(0, |value, bit| {
    let position = offset + bit as usize;
    let set = (word[position / 8] >> (position % 8)) & 1;
    value | (u64::from(set) << bit)
  })
}

/// Word slot of row position `ii`, for pixels of `pixel_elems` elements side by side.
/// Reversal never crosses a pixel boundary.
fn slot(ii: usize, pixel_elems: usize, reverse_inner: bool) -> usize {
  let (pixel, offset) = (ii / pixel_elems, ii % pixel_elems);
  pixel * pixel_elems + if reverse_inner { pixel_elems - offset - 1 } else { offset }
}

/// Elements per pixel, if `multi_pixel` evenly splits a row of `inner` elements.
fn pixel_elems(inner: usize, multi_pixel: usize) -> Result<usize> {
  if multi_pixel == 0 || inner % multi_pixel != 0 {
    return Err(ThresholdingError::stream(format!(
      "{} pixels per word do not evenly split {} elements", multi_pixel, inner
    )));
  }
  Ok(inner / multi_pixel)
}

/// Pack every innermost row of `tensor` into one word of `elem_type` elements.
pub fn pack(tensor: &Tensor, elem_type: DataType, reverse_inner: bool) -> Result<PackedStream> {
  pack_multi_pixel(tensor, elem_type, reverse_inner, 1)
}

/// [`pack`] for rows carrying `multi_pixel` pixels each: `reverse_inner` flips
/// the elements of every pixel in place, not the whole row.
pub fn pack_multi_pixel(tensor: &Tensor, elem_type: DataType, reverse_inner: bool, multi_pixel: usize) -> Result<PackedStream> {
  let elem_type = elem_type.validated()?;
  if let Some(&value) = tensor.data().iter().find(|&&v| !elem_type.allowed(v)) {
    return Err(ThresholdingError::datatype_range("stream element", value, elem_type));
  }

  let inner = tensor.inner_dim();
  let pixel = pixel_elems(inner, multi_pixel)?;
  let width = elem_type.bitwidth();
  let bytes = word_bytes(inner * width as usize);

  let words = tensor.rows()
    .map(|row| {
      let mut word = vec![0u8; bytes];
      for (ii, &value) in row.iter().enumerate() {
        set_bits(&mut word, slot(ii, pixel, reverse_inner) * width as usize, width, elem_type.encode(value));
      }
      word
    })
    .collect();

  Ok(PackedStream { elem_type, elems_per_word: inner, words })
}

/// Inverse of [`pack`]: `shape` must end in the stream's elements per word,
/// and its outer dimensions must account for every word.
pub fn unpack(stream: &PackedStream, shape: &[usize], reverse_inner: bool) -> Result<Tensor> {
  unpack_multi_pixel(stream, shape, reverse_inner, 1)
}

/// Inverse of [`pack_multi_pixel`].
pub fn unpack_multi_pixel(stream: &PackedStream, shape: &[usize], reverse_inner: bool, multi_pixel: usize) -> Result<Tensor> {
  let (inner, outer) = match shape.split_last() {
    Some((&inner, outer)) => (inner, outer.iter().product::<usize>()),
    None => return Err(ThresholdingError::stream("cannot unpack into a scalar shape")),
  };
  if inner != stream.elems_per_word {
    return Err(ThresholdingError::stream(format!(
      "shape {:?} wants {} elements per word, stream carries {}", shape, inner, stream.elems_per_word
    )));
  }
  if outer != stream.len() {
    return Err(ThresholdingError::stream(format!(
      "shape {:?} wants {} words, stream carries {}", shape, outer, stream.len()
    )));
  }

  let pixel = pixel_elems(inner, multi_pixel)?;
  let width = stream.elem_type.bitwidth();
  let mut data = Vec::with_capacity(inner * outer);
  for word in &stream.words {
    for ii in 0..inner {
      data.push(stream.elem_type.decode(get_bits(word, slot(ii, pixel, reverse_inner) * width as usize, width)));
    }
  }

  Tensor::new(shape.to_vec(), data)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn element_zero_lands_in_the_top_slot_when_reversed() {
    let tensor = Tensor::new(vec![1, 2], vec![1.0, -2.0]).unwrap();

    let reversed = pack(&tensor, DataType::Int(4), true).unwrap();
    assert_eq!(reversed.words(), &[vec![0x1eu8]]);
    assert_eq!(reversed.word_hex(0).unwrap(), "0x1e");

    let natural = pack(&tensor, DataType::Int(4), false).unwrap();
    assert_eq!(natural.words(), &[vec![0xe1u8]]);
  }

  #[test]
  fn words_span_multiple_bytes() {
    let tensor = Tensor::new(vec![2, 3], vec![1.0, 2.0, 3.0, 255.0, 0.0, 128.0]).unwrap();
    let packed = pack(&tensor, DataType::UInt(8), false).unwrap();
    assert_eq!(packed.len(), 2);
    assert_eq!(packed.word_bits(), 24);
    assert_eq!(packed.words()[0], vec![1, 2, 3]);
    assert_eq!(packed.word_hex(1).unwrap(), "0x8000ff");
    assert_eq!(unpack(&packed, &[2, 3], false).unwrap(), tensor);
  }

  #[test]
  fn hex_is_trimmed_to_word_width() {
    let tensor = Tensor::new(vec![1, 3], vec![1.0, 0.0, 1.0]).unwrap();
    let packed = pack(&tensor, DataType::Binary, true).unwrap();
    assert_eq!(packed.word_hex(0).unwrap(), "0x5");
  }

  #[test]
  fn signed_and_bipolar_values_survive() {
    let tensor = Tensor::new(vec![2, 2, 2], vec![-8.0, 7.0, -1.0, 0.0, 3.0, -3.0, 5.0, -6.0]).unwrap();
    let packed = pack(&tensor, DataType::Int(4), true).unwrap();
    assert_eq!(unpack(&packed, &[2, 2, 2], true).unwrap(), tensor);

    let bipolar = Tensor::new(vec![1, 4], vec![-1.0, 1.0, 1.0, -1.0]).unwrap();
    let packed = pack(&bipolar, DataType::Bipolar, false).unwrap();
    assert_eq!(packed.words(), &[vec![0b0110u8]]);
    assert_eq!(unpack(&packed, &[1, 4], false).unwrap(), bipolar);
  }

  #[test]
  fn multi_pixel_words_reverse_each_pixel() {
    // two pixels of three UINT4 channels per word
    let tensor = Tensor::new(vec![2, 6], (0..12).map(f64::from).collect()).unwrap();
    let packed = pack_multi_pixel(&tensor, DataType::UInt(4), true, 2).unwrap();

    // pixel 0 holds [0, 1, 2] reversed in the low slots, pixel 1 [3, 4, 5] reversed above it
    assert_eq!(packed.word_hex(0).unwrap(), "0x345012");
    assert_eq!(unpack_multi_pixel(&packed, &[2, 6], true, 2).unwrap(), tensor);

    // reversing the whole word instead scrambles the pixels
    assert_ne!(unpack(&packed, &[2, 6], true).unwrap(), tensor);

    // without reversal the pixel split changes nothing
    let natural = pack_multi_pixel(&tensor, DataType::UInt(4), false, 3).unwrap();
    assert_eq!(natural, pack(&tensor, DataType::UInt(4), false).unwrap());

    assert!(pack_multi_pixel(&tensor, DataType::UInt(4), true, 4).is_err());
    assert!(unpack_multi_pixel(&packed, &[2, 6], true, 0).is_err());
  }

  #[test]
  fn repetitions_split_back() {
    let tensor = Tensor::new(vec![2, 2], vec![1.0, 2.0, 3.0, 0.0]).unwrap();
    let once = pack(&tensor, DataType::UInt(2), true).unwrap();
    let thrice = once.repeated(3);
    assert_eq!(thrice.len(), 6);

    let copies = thrice.repetitions(3).unwrap();
    assert_eq!(copies.len(), 3);
    assert!(copies.iter().all(|copy| copy == &once));
    assert!(thrice.repetitions(4).is_err());
  }

  #[test]
  fn rejects_values_and_shapes_that_do_not_fit() {
    let tensor = Tensor::new(vec![1, 2], vec![1.0, 16.0]).unwrap();
    assert!(matches!(pack(&tensor, DataType::UInt(4), true), Err(ThresholdingError::DatatypeRange { .. })));

    let packed = pack(&Tensor::filled(vec![3, 4], 1.0).unwrap(), DataType::UInt(4), true).unwrap();
    assert!(matches!(unpack(&packed, &[3, 2], true), Err(ThresholdingError::Stream { .. })));
    assert!(matches!(unpack(&packed, &[2, 4], true), Err(ThresholdingError::Stream { .. })));
    assert!(unpack(&packed, &[], true).is_err());
    assert!(matches!(pack(&tensor, DataType::UInt(64), true), Err(ThresholdingError::Configuration { .. })));
  }
}
