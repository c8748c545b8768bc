//! Compile multi-threshold activation operators into constant, allocation-free Rust.
//!
//! An operator maps every input value `x` of channel `c` to
//! `saturate(ActVal + count(thresholds[c] <= x))`. Channels are folded onto
//! `PE` parallel lanes: lane `l` handles channels `l, l + PE, l + 2 * PE, ...`.
//!
//! - [`thresholding`] generates the implementation at compile time from a JSON config.
//! - [`ThresholdingEngine`] evaluates the same operator at runtime.

pub use const_threshold_macro::{thresholding, thresholding_binary_search};
pub use const_threshold_core::*;
