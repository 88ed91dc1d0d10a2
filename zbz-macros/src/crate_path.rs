//! Crate path resolution for generated code.
//!
//! Detects whether the user depends on `zbz` (facade) or `zbz-core`
//! directly, and returns the appropriate path prefix for generated code.

use proc_macro2::TokenStream;
use proc_macro_crate::{crate_name, FoundCrate};
use quote::quote;

/// Returns the token stream for accessing `zbz_core` types.
///
/// If the user depends on `zbz`, returns `::zbz`. Otherwise `::zbz_core`.
pub fn zbz_core_path() -> TokenStream {
    if let Ok(found) = crate_name("zbz") {
        return match found {
            FoundCrate::Itself => quote!(crate),
            FoundCrate::Name(name) => {
                let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
                quote!(::#ident)
            }
        };
    }
    if let Ok(found) = crate_name("zbz-core") {
        return match found {
            FoundCrate::Itself => quote!(crate),
            FoundCrate::Name(name) => {
                let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
                quote!(::#ident)
            }
        };
    }
    // Fallback — assume zbz_core is available (keeps error messages readable).
    quote!(::zbz_core)
}
