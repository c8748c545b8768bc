use std::path::PathBuf;
use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::{Item, parse_quote, Fields};
use const_threshold_core::{MemMode, OperatorKind, ThresholdingConfig, ThresholdingEngine};
use crate::synthesis::{synthesize, Synthesis};

/// All the invocation information.
pub struct Invocation {
  pub config: Config,

  /// The item on which we are implementing (a struct, possibly an enum).
  pub item: Item,

  /// Operator variant forced by the attribute (`None` defers to the document)
  pub kind: Option<OperatorKind>,
}

/// Where the configuration document comes from.
pub enum ConfigSource {
  /// Given a path to a JSON file (already made absolute when possible).
  File(PathBuf),

  /// Given the JSON itself.
  Direct(String),
}

impl ConfigSource {
  pub fn describe(&self) -> String {
    match self {
      ConfigSource::File(path) => format!("`{}`", path.display()),
      ConfigSource::Direct(_) => "inline JSON".into(),
    }
  }
}

/// Details about the invocation config of the macro.
pub struct Config {
  pub source:   ConfigSource,

  /// Span of the config literal, errors about the document point here
  pub span:     Span,

  /// Overrides for the document's `PE` and `mem_mode`
  pub pe:       Option<usize>,
  pub mem_mode: Option<MemMode>,
}

/// Read the document, apply the attribute's overrides and validate the lot.
pub fn build_engine(invocation: &Invocation) -> syn::Result<ThresholdingEngine> {
  let Config { source, span, pe, mem_mode } = &invocation.config;
  let error = |e: const_threshold_core::ThresholdingError| syn::Error::new(*span, format!("Invalid thresholding configuration: {}", e));

  let mut document = match source {
    ConfigSource::File(path)  => ThresholdingConfig::load(path),
    ConfigSource::Direct(json) => ThresholdingConfig::from_json(json),
  }.map_err(error)?;

  if let Some(pe) = pe { document.pe = *pe; }
  if let Some(mem_mode) = mem_mode { document.mem_mode = *mem_mode; }
  if let Some(kind) = invocation.kind { document.kind = kind; }

  document.build().map_err(error)
}

pub fn core(invocation: Invocation) -> syn::Result<TokenStream> {
  let engine = build_engine(&invocation)?;
  let decoupled = engine.mem_mode() == MemMode::Decoupled;

  // decoupled thresholds need somewhere to live: unit structs only.
  let name = match invocation.item {
    Item::Struct(ref s) => {
      if decoupled {
        let has_fields = match &s.fields {
          Fields::Named(f)   => !f.named.is_empty(),
          Fields::Unnamed(f) => !f.unnamed.is_empty(),
          Fields::Unit       => false,
        };
        if has_fields {
          return Err(syn::Error::new_spanned(&s.ident, "`mem_mode = decoupled` stores thresholds in the struct. Only unit structs (no fields) are supported."));
        }
      }

      s.ident.clone()
    },
    Item::Enum(ref e) => {
      if decoupled {
        return Err(syn::Error::new_spanned(&e.ident, "Enums cannot hold decoupled thresholds, use a unit struct (or `mem_mode = const`)."));
      }

      e.ident.clone()
    },
    ref other => return Err(syn::Error::new_spanned(other, "Unsupported language construct (`struct` and `enum` only).")),
  };

  let Synthesis {
    documentation,
    source_tracking,
    thresholds_field,
    associated_constants,
    thresholds_methods,
    activate_function,
    evaluate_function,
  } = synthesize(&invocation, &engine);

  let (item, derives) = match invocation.item {
    // the field replaces the (empty) body, `Default` is written by hand to start from `THRESHOLDS`
    Item::Struct(mut s) if decoupled => {
      s.fields = Fields::Named(parse_quote!({ #thresholds_field }));
      (Item::Struct(s), quote!(#[derive(Clone, Copy)]))
    },
    item @ Item::Struct(_) => (item, quote!(#[derive(Clone, Copy, Default)])),
    item => (item, quote!(#[derive(Clone, Copy)])),
  };

  let default_impl = if decoupled {
    quote! {
      impl Default for #name {
        fn default() -> Self {
          Self { thresholds: Self::THRESHOLDS }
        }
      }
    }
  } else {
    quote!()
  };

  Ok(quote! {
    #source_tracking

    #documentation
    #derives
    #item

    #default_impl

    #[allow(dead_code, clippy::unnecessary_cast, clippy::manual_range_contains)]
    impl #name {
      #associated_constants
      #thresholds_methods
      #activate_function
      #evaluate_function
    }
  })
}
