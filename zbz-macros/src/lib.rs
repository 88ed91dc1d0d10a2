//! Procedural macros for `zbz`.
//!
//! `#[derive(Model)]` is the compile-time stand-in for the reflection pass
//! described in the metadata catalog's design notes: it walks a struct's
//! fields once, at compile time, and emits an `impl Described` that the
//! catalog calls (and caches) the first time the type is selected.

extern crate proc_macro;
use proc_macro::TokenStream;

mod crate_path;
mod model_derive;

/// Derive compile-time model metadata for the catalog (component C2).
///
/// ```ignore
/// use zbz_core::prelude::*;
///
/// #[derive(Model, serde::Serialize, serde::Deserialize)]
/// #[model(desc = "a user account")]
/// struct User {
///     #[serde(skip)]
///     base: BaseModel,
///
///     #[model(json = "name", db = "name", validate = "required,min=1")]
///     name: String,
///
///     #[model(json = "email", db = "email", scope = "read:user,write:admin", validate = "required,email")]
///     email: String,
/// }
/// ```
#[proc_macro_derive(Model, attributes(model))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    model_derive::expand(input)
}
