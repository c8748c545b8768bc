use proc_macro2::TokenStream;
use quote::quote;
use const_threshold_core::{DataType, MemMode, ThresholdingEngine};
use crate::{search, macro_core::{ConfigSource, Invocation}, numeric_type::NumericType};

/// A bundle of rust code to be interpolated in the final step
pub struct Synthesis {
  pub documentation:        TokenStream,
  pub source_tracking:      TokenStream,
  pub thresholds_field:     TokenStream,
  pub associated_constants: TokenStream,
  pub thresholds_methods:   TokenStream,
  pub activate_function:    TokenStream,
  pub evaluate_function:    TokenStream,
}

/// `ActVal + level`, forced into the output datatype without wrapping.
/// Expects `level: usize` in scope.
fn output_expression(output_type: DataType, output: NumericType) -> TokenStream {
  let output_token = output.token();

  match output_type {
    DataType::Float32 => quote! {
      (Self::ACT_VAL + level as i64) as f32
    },
    DataType::Bipolar => quote! {
      if Self::ACT_VAL + (level as i64) < 0 { -1 } else { 1 }
    },
    _ => {
      let (min, max) = (output_type.min() as i64, output_type.max() as i64);
      quote! {
        {
          let y = Self::ACT_VAL + level as i64;
          (if y < #min { #min } else if y > #max { #max } else { y }) as #output_token
        }
      }
    }
  }
}

/// Debug-build check that `x` (still in its native container) is a value of `input_type`.
/// Bounds the container already enforces are left out.
fn input_check(input_type: DataType, input: NumericType) -> TokenStream {
  let message = format!("input is not a {} value", input_type);

  match (input_type, input.integer_range()) {
    (DataType::Float32, _) | (_, None) => quote! {
      debug_assert!(x.is_finite(), #message);
    },
    (DataType::Bipolar, _) => quote! {
      debug_assert!(x == -1 || x == 1, #message);
    },
    (_, Some((native_min, native_max))) => {
      let (min, max) = (input_type.min(), input_type.max());
      let check = [
        (min > native_min).then(|| { let min = input.literal(min); quote!(x >= #min) }),
        (max < native_max).then(|| { let max = input.literal(max); quote!(x <= #max) }),
      ]
        .into_iter()
        .flatten()
        .reduce(|lower, upper| quote!(#lower && #upper));

      match check {
        Some(check) => quote! { debug_assert!(#check, #message); },
        None => quote!(),
      }
    }
  }
}

/// Load, check, and synthesize an implementation.
pub fn synthesize(invocation: &Invocation, engine: &ThresholdingEngine) -> Synthesis {
  let channels = engine.num_channels();
  let steps    = engine.num_steps();
  let pe       = engine.pe();
  let fold     = engine.fold();
  let act_val  = engine.act_val();
  let decoupled = engine.mem_mode() == MemMode::Decoupled;

  let input  = NumericType::for_datatype(engine.input_type());
  let output = NumericType::for_datatype(engine.output_type());
  let domain = NumericType::comparison_domain(engine);
  let (input_token, output_token, domain_token) = (input.token(), output.token(), domain.token());

  // the whole table, one row per channel
  let rows = engine.table().rows().map(|row| {
    let values = row.iter().map(|&t| domain.literal(t));
    quote! { [#(#values),*] }
  });
  let table_type = quote! { [[#domain_token; #steps]; #channels] };

  // editing the document should rebuild the implementation
  let source_tracking = match &invocation.config.source {
    ConfigSource::File(path) => {
      let path = path.display().to_string();
      quote! { const _: &[u8] = include_bytes!(#path); }
    },
    ConfigSource::Direct(_) => quote!(),
  };

  // generate a `thresholds` field and access methods (only if decoupled)
  let (thresholds_field, thresholds_methods) = if decoupled {
    (
      quote!(thresholds: #table_type,),
      quote!(
        /// Is every row sorted ascending?
        pub fn thresholds_sorted(thresholds: &#table_type) -> bool {
          thresholds.iter().all(|row| row.windows(2).all(|pair| pair[0] <= pair[1]))
        }

        /// Create an instance holding the given thresholds.
        /// - Every row must be sorted ascending (checked in debug builds).
        pub fn with_thresholds(thresholds: #table_type) -> Self {
          debug_assert!(Self::thresholds_sorted(&thresholds), "every threshold row must be sorted ascending");
          Self { thresholds }
        }

        /// Overwrite the held thresholds with the given ones.
        /// - Every row must be sorted ascending (checked in debug builds).
        pub fn set_thresholds(&mut self, thresholds: &#table_type) {
          debug_assert!(Self::thresholds_sorted(thresholds), "every threshold row must be sorted ascending");
          self.thresholds = *thresholds;
        }

        /// Get a reference to the held thresholds.
        pub fn thresholds(&self) -> &#table_type {
          &self.thresholds
        }

        /// Get a mutable reference to the held thresholds.
        /// - Levels are undefined (and the search variants may disagree) unless every row stays sorted ascending.
        pub fn thresholds_mut(&mut self) -> &mut #table_type {
          &mut self.thresholds
        }
      )
    )
  } else {
    (quote!(), quote!())
  };

  // dynamically generate doc comments that match _this particular operator_.
  let documentation = {
    let memory = engine.threshold_memory();
    let build_info = format!(
"- Compiled from thresholding config: {source}
- `{op_type}`: {channels} channels, {steps} threshold{steps_plural} each
- `{input_type}` in, `{output_type}` out, `ActVal = {act_val}`
- PE = {pe}, fold = {fold} ({memory_bits} bits of threshold memory)
- {mem_statement}",
      source       = invocation.config.source.describe(),
      op_type      = engine.kind().op_type(),
      steps_plural = if steps == 1 { "" } else { "s" },
      input_type   = engine.input_type(),
      output_type  = engine.output_type(),
      memory_bits  = memory.total_bits(),
      mem_statement = if decoupled {
        format!(
"Thresholds are decoupled (stateful)
  - held in the `thresholds` field: `{} bytes`
  - `Self::evaluate` must take `&self`",
          channels * steps * domain.size_of()
        )
      } else {
"Thresholds are constants
  - operator is stateless (a ZST)
  - `Self::evaluate` is static.".into()
      }
    );

    let input_declr = format!("let input = [0 as {}; {}];", input_token, channels);
    let output_declr = format!("let mut output = [0 as {}; {}];", output_token, channels);
    let call = if decoupled {
      "let op = Self::default(); // thresholds start at `Self::THRESHOLDS`\nop.evaluate(&input, &mut output);"
    } else {
      "Self::evaluate(&input, &mut output);"
    };

    quote! {
      #[doc = #build_info]
      ///
      /// ### Example usage
      /// ```ignore
      #[doc = #input_declr]
      #[doc = #output_declr]
      #[doc = #call]
      /// ```
    }
  };

  // make these numbers available to users
  let associated_constants = quote! {
    /// The number of channels. Provided for convenience (const).
    pub const CHANNELS: usize = #channels;

    /// Parallel lanes the channels are folded onto.
    pub const PE: usize = #pe;

    /// Channels per lane (`CHANNELS / PE`).
    pub const FOLD: usize = #fold;

    /// Thresholds per channel.
    pub const STEPS: usize = #steps;

    /// Output of an input below every threshold.
    pub const ACT_VAL: i64 = #act_val;

    /// Beats needed to stream one input vector through.
    pub const CYCLES_PER_VECTOR: usize = #fold;

    /// The configured thresholds, one sorted row per channel.
    pub const THRESHOLDS: #table_type = [#(#rows),*];
  };

  let constness   = search::constness(&[input, output, domain]);
  let search_expr = search::expression(engine.kind(), steps);
  let output_expr = output_expression(engine.output_type(), output);
  let input_check = input_check(engine.input_type(), input);

  let (self_argument, table) = if decoupled {
    (quote!(&self,), quote!(self.thresholds))
  } else {
    (quote!(), quote!(Self::THRESHOLDS))
  };
  let call_prefix = if decoupled { quote!(self.) } else { quote!(Self::) };

  let activate_function = quote! {
    /// Number of `channel`'s thresholds that `x` reaches.
    /// Panics if `channel` is out of range. `x` must be a value of the input datatype.
    pub #constness fn level(#self_argument channel: usize, x: #input_token) -> usize {
      #input_check
      let thresholds = &#table[channel];
      let x = x as #domain_token;
      #search_expr
    }

    /// Activation of `x` in `channel`.
    /// Panics if `channel` is out of range.
    pub #constness fn activate(#self_argument channel: usize, x: #input_token) -> #output_token {
      let level = #call_prefix level(channel, x);
      #output_expr
    }
  };

  let evaluate_function = {
    let numeric_comment = format!("- compares in `{}`, {} per threshold row", domain_token, engine.kind().op_type());
    let range_comment = format!("- every input must be a `{}` value (checked in debug builds only)", engine.input_type());

    quote! {
      /// Evaluate the operator for a single input vector, lane by lane.
      ///
      /// Properties:
      /// - allocationless, heapless, no_std compatible
      #[doc = #numeric_comment]
      #[doc = #range_comment]
      pub fn evaluate(#self_argument inputs: &[#input_token; #channels], outputs: &mut [#output_token; #channels]) {
        for fold in 0..Self::FOLD {
          for lane in 0..Self::PE {
            let channel = fold * Self::PE + lane;
            outputs[channel] = #call_prefix activate(channel, inputs[channel]);
          }
        }
      }
    }
  };

  Synthesis {
    documentation,
    source_tracking,
    thresholds_field,
    associated_constants,
    thresholds_methods,
    activate_function,
    evaluate_function,
  }
}
