use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, Ident, LitStr, parse_macro_input, spanned::Spanned};

use crate::utils;

/// One enum variant and every spelling that selects it.
struct VariantSpec {
    ident: Ident,
    canonical: String,
    aliases: Vec<String>,
}

impl VariantSpec {
    fn spellings(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.canonical.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// Generates `parse`, `VARIANTS`, `Display` and `FromStr` for a unit-only enum used as an
/// option value.
pub fn derive_cli_value_inner(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let enum_ident = &input.ident;
    let Data::Enum(data_enum) = &input.data else {
        return Err(syn::Error::new(
            input.span(),
            "CliValue can only be derived for enums",
        ));
    };

    let option_name = option_name(&input.attrs)?
        .unwrap_or_else(|| utils::to_kebab_case(&enum_ident.to_string()));
    let specs = data_enum
        .variants
        .iter()
        .map(variant_spec)
        .collect::<syn::Result<Vec<_>>>()?;
    reject_duplicate_spellings(&specs, enum_ident.span())?;

    let lit = |value: &str| LitStr::new(value, Span::call_site());
    let canonical_lits: Vec<LitStr> = specs.iter().map(|spec| lit(&spec.canonical)).collect();
    let expected_lit = lit(&specs
        .iter()
        .map(|spec| spec.canonical.as_str())
        .collect::<Vec<_>>()
        .join("|"));
    let option_lit = lit(&option_name);

    let parse_arms = specs.iter().map(|spec| {
        let ident = &spec.ident;
        let spellings = spec.spellings().map(lit);
        quote! { #(#spellings)|* => Ok(Self::#ident), }
    });
    let display_arms = specs.iter().zip(&canonical_lits).map(|(spec, canonical)| {
        let ident = &spec.ident;
        quote! { Self::#ident => #canonical, }
    });

    Ok(quote! {
        impl #enum_ident {
            /// Canonical command-line spellings, in declaration order.
            pub const VARIANTS: &'static [&'static str] = &[#(#canonical_lits),*];

            /// Case-insensitive; accepts the canonical spelling or any alias.
            pub fn parse(raw: &str) -> crate::Result<Self> {
                match raw.to_ascii_lowercase().as_str() {
                    #(#parse_arms)*
                    _ => Err(crate::Error::invalid_input(format!(
                        "Invalid value for --{}: {} (expected {})",
                        #option_lit,
                        raw,
                        #expected_lit
                    ))),
                }
            }
        }

        impl ::std::str::FromStr for #enum_ident {
            type Err = crate::Error;

            fn from_str(raw: &str) -> crate::Result<Self> {
                Self::parse(raw)
            }
        }

        impl ::std::fmt::Display for #enum_ident {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(match self {
                    #(#display_arms)*
                })
            }
        }
    })
}

/// `#[cli_value(option = "...")]` on the enum, if present.
fn option_name(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut name = None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("cli_value")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("option") {
                name = Some(meta.value()?.parse::<LitStr>()?.value());
                return Ok(());
            }
            Err(meta.error("unsupported cli_value attribute; expected option = \"...\""))
        })?;
    }
    Ok(name)
}

fn variant_spec(variant: &syn::Variant) -> syn::Result<VariantSpec> {
    if !matches!(variant.fields, Fields::Unit) {
        return Err(syn::Error::new(
            variant.span(),
            "CliValue only supports enums with unit variants",
        ));
    }

    let mut spec = VariantSpec {
        ident: variant.ident.clone(),
        canonical: utils::to_kebab_case(&variant.ident.to_string()),
        aliases: Vec::new(),
    };
    for attr in variant.attrs.iter().filter(|attr| attr.path().is_ident("cli")) {
        attr.parse_nested_meta(|meta| {
            let value = || -> syn::Result<String> {
                Ok(meta.value()?.parse::<LitStr>()?.value().to_ascii_lowercase())
            };
            if meta.path.is_ident("name") {
                spec.canonical = value()?;
            } else if meta.path.is_ident("alias") {
                spec.aliases.push(value()?);
            } else {
                return Err(meta.error("unsupported cli attribute; expected name/alias"));
            }
            Ok(())
        })?;
    }
    Ok(spec)
}

/// Two variants answering to the same spelling would make the later one unreachable.
fn reject_duplicate_spellings(specs: &[VariantSpec], span: Span) -> syn::Result<()> {
    let mut seen = std::collections::HashSet::new();
    for spelling in specs.iter().flat_map(VariantSpec::spellings) {
        if !seen.insert(spelling) {
            return Err(syn::Error::new(
                span,
                format!("CliValue spelling `{spelling}` is used more than once"),
            ));
        }
    }
    Ok(())
}
