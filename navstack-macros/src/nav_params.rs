use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Visibility, parse_macro_input};

use crate::utils::{get_attr_string, has_attr_flag};

pub fn derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Struct(data_struct) = &input.data else {
        return syn::Error::new_spanned(name, "NavParams can only be derived for structs")
            .to_compile_error()
            .into();
    };

    let Fields::Named(fields) = &data_struct.fields else {
        return syn::Error::new_spanned(name, "NavParams requires named fields")
            .to_compile_error()
            .into();
    };

    let mut inserts = Vec::new();

    for field in fields.named.iter() {
        // Only public members are part of the navigation contract
        if !matches!(field.vis, Visibility::Public(_)) {
            continue;
        }

        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };

        let mut key = field_name.to_string();
        let mut skip = false;

        for attr in field.attrs.iter() {
            if !attr.path().is_ident("param") {
                continue;
            }
            if has_attr_flag(attr, "skip") {
                skip = true;
            }
            if let Some(rename) = get_attr_string(attr, "rename") {
                key = rename;
            }
        }

        if skip {
            continue;
        }

        inserts.push(quote! {
            params.insert(#key, &self.#field_name)?;
        });
    }

    let expanded = quote! {
        impl #impl_generics ::navstack::IntoParams for #name #ty_generics #where_clause {
            fn into_params(self) -> ::std::result::Result<::navstack::Params, ::navstack::NavError> {
                let mut params = ::navstack::Params::new();
                #(#inserts)*
                Ok(params)
            }
        }
    };

    TokenStream::from(expanded)
}
