use proc_macro2::TokenStream;
use quote::quote;
use const_threshold_core::OperatorKind;
use crate::numeric_type::NumericType;

/// Code counting how many of the sorted `thresholds` the (already converted) `x` reaches.
/// Evaluates to a `usize`.
pub fn expression(kind: OperatorKind, steps: usize) -> TokenStream {
  match kind {
    // comparator bank: every threshold is tested, the hits are summed
    OperatorKind::Linear => quote! {
      {
        let mut level = 0usize;
        let mut step = 0usize;
        while step < #steps {
          if x >= thresholds[step] { level += 1; }
          step += 1;
        }
        level
      }
    },

    // first index whose threshold is above `x`
    OperatorKind::BinarySearch => quote! {
      {
        let mut lo = 0usize;
        let mut hi = #steps;
        while lo < hi {
          let mid = (lo + hi) / 2;
          if thresholds[mid] <= x { lo = mid + 1; } else { hi = mid; }
        }
        lo
      }
    },
  }
}

/// Can the activation be `const fn`?
/// - `true` if nothing but integers are involved
/// - `false` if any float conversion or comparison is
pub fn constness(types: &[NumericType]) -> TokenStream {
  if types.iter().any(NumericType::is_float) {
    quote! {}
  } else {
    quote! { const }
  }
}
