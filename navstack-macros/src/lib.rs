use proc_macro::TokenStream;

mod nav_params;
mod utils;

/// Derive `navstack::IntoParams` from a struct's public fields.
///
/// Each `pub` field becomes one entry keyed by the field name. Private fields
/// are ignored. Field attributes:
/// - `#[param(rename = "key")]` stores the field under a different key
/// - `#[param(skip)]` leaves a public field out of the map
#[proc_macro_derive(NavParams, attributes(param))]
pub fn nav_params_derive(input: TokenStream) -> TokenStream {
    nav_params::derive(input)
}
