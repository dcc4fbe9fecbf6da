use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitInt, parse_macro_input};

/// Derives the `Flag` trait for mode and field enums.
///
/// Each variant is assigned one bit, in declaration order: the first
/// variant is `1 << 0`, the second `1 << 1` and so on. At most 32
/// variants are accepted since masks are `u32`.
///
/// Besides the trait, an inherent `const fn mask(self) -> u32` is
/// generated so the bits can be used inside `static` command tables.
///
/// # Example
///
/// ```ignore
/// use clink_macros::Flag;
///
/// #[derive(Debug, Copy, Clone, PartialEq, Eq, Flag)]
/// pub enum Mode {
///     Connected,
///     Enabled,
///     Configure,
/// }
///
/// static COMMANDS: &[CommandSpec<Conn>] = &[
///     CommandSpec::new("enable", Mode::Connected.mask(), 0, enable),
/// ];
/// ```
///
/// This generates:
///
/// ```ignore
/// impl Mode {
///     pub const fn mask(self) -> u32 {
///         match self {
///             Self::Connected => 1,
///             Self::Enabled => 2,
///             Self::Configure => 4,
///         }
///     }
/// }
///
/// impl clink::Flag for Mode {
///     fn bit(self) -> u32 { self.mask() }
///     fn from_bit(bit: u32) -> Option<Self> { /* 1 => Connected, ... */ }
///     fn as_str(&self) -> &'static str { /* "Connected", ... */ }
///     fn from_str(s: &str) -> Option<Self> { /* "Connected" => ... */ }
/// }
/// ```
///
/// # Requirements
///
/// - The type must be an enum
/// - All variants must be unit variants (no fields)
/// - No more than 32 variants
#[proc_macro_derive(Flag)]
pub fn derive_flag(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let name = &input.ident;

    let variants = match &input.data {
        Data::Enum(data_enum) => &data_enum.variants,
        _ => {
            return syn::Error::new_spanned(&input, "Flag can only be derived for enums")
                .to_compile_error()
                .into();
        }
    };

    for variant in variants {
        if !matches!(variant.fields, Fields::Unit) {
            return syn::Error::new_spanned(
                variant,
                "Flag can only be derived for enums with unit variants (no fields)",
            )
            .to_compile_error()
            .into();
        }
    }

    if variants.len() > 32 {
        return syn::Error::new_spanned(&input, "Flag supports at most 32 variants")
            .to_compile_error()
            .into();
    }

    let bits: Vec<LitInt> = (0..variants.len())
        .map(|i| LitInt::new(&format!("{}u32", 1u64 << i), Span::call_site()))
        .collect();

    let mask_arms = variants.iter().zip(&bits).map(|(variant, bit)| {
        let variant_name = &variant.ident;
        quote! {
            Self::#variant_name => #bit
        }
    });

    let from_bit_arms = variants.iter().zip(&bits).map(|(variant, bit)| {
        let variant_name = &variant.ident;
        quote! {
            #bit => Some(Self::#variant_name)
        }
    });

    let from_str_arms = variants.iter().map(|variant| {
        let variant_name = &variant.ident;
        let variant_str = variant_name.to_string();
        quote! {
            #variant_str => Some(Self::#variant_name)
        }
    });

    let as_str_arms = variants.iter().map(|variant| {
        let variant_name = &variant.ident;
        let variant_str = variant_name.to_string();
        quote! {
            Self::#variant_name => #variant_str
        }
    });

    let expanded = quote! {
        impl #name {
            /// Bit assigned to this variant.
            pub const fn mask(self) -> u32 {
                match self {
                    #(#mask_arms,)*
                }
            }
        }

        impl ::clink::Flag for #name {
            fn bit(self) -> u32 {
                self.mask()
            }

            fn from_bit(bit: u32) -> Option<Self> {
                match bit {
                    #(#from_bit_arms,)*
                    _ => None,
                }
            }

            fn as_str(&self) -> &'static str {
                match self {
                    #(#as_str_arms,)*
                }
            }

            fn from_str(s: &str) -> Option<Self> {
                match s {
                    #(#from_str_arms,)*
                    _ => None,
                }
            }
        }
    };

    TokenStream::from(expanded)
}
