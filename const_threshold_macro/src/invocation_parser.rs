use std::path::PathBuf;
use proc_macro2::Ident;
use syn::{ext::IdentExt, LitInt, LitStr, Token};
use const_threshold_core::MemMode;
use crate::macro_core::{Config, ConfigSource};

const USAGE: &str = "Usage: `#[thresholding(\"path/to/config.json\", pe = 4, mem_mode = decoupled)]` (arguments after the config are optional)";

/// Decide whether the literal is inline JSON or a path to a config file.
/// Relative paths are taken from the invoking crate's manifest directory.
fn resolve_source(literal: &str) -> ConfigSource {
  if literal.trim_start().starts_with('{') {
    return ConfigSource::Direct(literal.to_string());
  }

  let path = PathBuf::from(literal);
  match std::env::var_os("CARGO_MANIFEST_DIR") {
    Some(root) if path.is_relative() => ConfigSource::File(PathBuf::from(root).join(path)),
    _ => ConfigSource::File(path),
  }
}

impl syn::parse::Parse for Config {
  fn parse(input: syn::parse::ParseStream<'_>) -> syn::Result<Self> {
    // invoked like #[thresholding("path/to/config.json")] or #[thresholding("{ ...inline json... }")]
    let literal = input.parse::<LitStr>()
      .map_err(|e| syn::Error::new(e.span(), format!("Expected a config path or inline JSON string first. {}", USAGE)))?;

    let mut config = Config {
      source:   resolve_source(&literal.value()),
      span:     literal.span(),
      pe:       None,
      mem_mode: None,
    };

    // manually parse remaining `name = value` arguments.
    while !input.is_empty() {
      input.parse::<Token![,]>()?;
      if input.is_empty() { break; } // trailing comma

      // `const` is a keyword, so accept any identifier here
      let name = Ident::parse_any(input)?;
      input.parse::<Token![=]>()
        .map_err(|e| syn::Error::new(e.span(), format!("Expected '=' after `{}`. {}", name, USAGE)))?;

      match name.to_string().as_str() {
        "pe" => {
          let value = input.parse::<LitInt>()?;
          config.pe = Some(value.base10_parse::<usize>()?);
        },
        "mem_mode" => {
          let value = Ident::parse_any(input)?;
          let mode = value.to_string().parse::<MemMode>()
            .map_err(|e| syn::Error::new_spanned(&value, e))?;
          config.mem_mode = Some(mode);
        },
        _ => return Err(syn::Error::new_spanned(name, format!("Unknown argument. {}", USAGE))),
      }
    }

    Ok(config)
  }
}

macro_rules! parse_invocation {
  (
    $attr_stream: ident,
    $item_stream: ident,
    $kind:        expr
  ) => {
    {
      crate::macro_core::Invocation {
        config: syn::parse_macro_input!($attr_stream as crate::macro_core::Config),
        item:   syn::parse_macro_input!($item_stream as syn::Item),
        kind:   $kind
      }
    }
  };
}

#[allow(unused_imports)]
pub(crate) use parse_invocation;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_overrides() {
    let config: Config = syn::parse_str(r#""cfg/act.json", pe = 4, mem_mode = decoupled,"#).unwrap();
    assert!(matches!(config.source, ConfigSource::File(ref p) if p.ends_with("cfg/act.json")));
    assert_eq!(config.pe, Some(4));
    assert_eq!(config.mem_mode, Some(MemMode::Decoupled));

    let config: Config = syn::parse_str(r#""cfg/act.json", mem_mode = const"#).unwrap();
    assert_eq!(config.mem_mode, Some(MemMode::Const));
  }

  #[test]
  fn inline_json_is_detected() {
    let config: Config = syn::parse_str(r#"" { \"PE\": 1 }""#).unwrap();
    assert!(matches!(config.source, ConfigSource::Direct(_)));
  }

  #[test]
  fn rejects_nonsense() {
    assert!(syn::parse_str::<Config>("act_config").is_err());
    assert!(syn::parse_str::<Config>(r#""a.json", simd = 2"#).is_err());
    assert!(syn::parse_str::<Config>(r#""a.json", mem_mode = external"#).is_err());
    assert!(syn::parse_str::<Config>(r#""a.json", pe 2"#).is_err());
  }
}
