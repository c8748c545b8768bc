extern crate proc_macro;
use proc_macro::TokenStream;
use const_threshold_core::OperatorKind;
mod numeric_type;
mod search;
mod synthesis;
mod macro_core;
#[macro_use] mod invocation_parser;

/// Adds the constants and functions for a thresholding operator described by a JSON config.
/// - With `mem_mode = const` (the default), it works on any struct or enum.
/// - With `mem_mode = decoupled`, it only works on unit structs (no fields).
/// - `pe` and `mem_mode` may be overridden in the attribute: `#[thresholding("act.json", pe = 4)]`.
/// - Inputs must be values of the configured input datatype; debug builds assert it.
/// ```ignore
/// use const_threshold::thresholding;
///
/// /// Requantizes the conv layer's accumulators to 4 bits.
/// #[thresholding("./act.json")]
/// struct ConvAct;
///
/// fn main() {
///   ConvAct::evaluate(&accumulators, &mut activations);
/// }
/// ```
#[proc_macro_attribute]
pub fn thresholding(attr: TokenStream, item: TokenStream) -> TokenStream {
  let invocation = parse_invocation!(attr, item, None);
  macro_core::core(invocation)
    .unwrap_or_else(|e| e.to_compile_error())
    .into()
}

/// Identical to `#[thresholding("path/to/config.json")]`, but always searches the thresholds with a binary search.
/// - Levels match the linear search only while every threshold row is sorted ascending.
///   Unsorted rows (e.g. written through `thresholds_mut` in `mem_mode = decoupled`) give undefined levels.
#[proc_macro_attribute]
pub fn thresholding_binary_search(attr: TokenStream, item: TokenStream) -> TokenStream {
  let invocation = parse_invocation!(attr, item, Some(OperatorKind::BinarySearch));
  macro_core::core(invocation)
    .unwrap_or_else(|e| e.to_compile_error())
    .into()
}
