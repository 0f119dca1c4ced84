//! Derive macro implementation for tagconf

use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, parse_macro_input};

mod attrs;

use attrs::FieldAttrs;

/// `Config` derive macro
///
/// Implements `tagconf::Record` and `tagconf::Node` for a struct with named
/// fields, emitting one static `tagconf::FieldMeta` per field in declaration
/// order.
///
/// # Field attributes
///
/// - `#[conf(tag = literal, ...)]`: record a tag (`key`, `default`, `help`,
///   or any custom name the runtime `Settings` point at)
/// - `#[conf(required)]`: shorthand for `required = "true"`
/// - `#[conf(flatten)]`: embed the field's fields under the parent's prefix
///
/// Doc comments are kept as the field's fallback help text.
#[proc_macro_derive(Config, attributes(conf))]
pub fn derive_config(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Config only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(input, "Config only supports structs"));
        }
    };

    let mut metas = Vec::with_capacity(fields.len());
    let mut arms = Vec::with_capacity(fields.len());

    for (index, field) in fields.iter().enumerate() {
        let Some(ident) = field.ident.as_ref() else {
            return Err(syn::Error::new_spanned(field, "expected a named field"));
        };
        let attrs = FieldAttrs::from_field(field)?;

        // raw identifiers (`r#type`) are configured by their plain name
        let name = ident.to_string().trim_start_matches("r#").to_string();
        let tag_names = attrs.tags.iter().map(|(k, _)| k);
        let tag_values = attrs.tags.iter().map(|(_, v)| v);
        let embedded = attrs.flatten;
        let doc = &attrs.doc;

        metas.push(quote! {
            ::tagconf::FieldMeta {
                name: #name,
                tags: &[#((#tag_names, #tag_values)),*],
                embedded: #embedded,
                doc: #doc,
            }
        });
        arms.push(quote! {
            #index => ::core::option::Option::Some(&mut self.#ident as &mut dyn ::tagconf::Node),
        });
    }

    Ok(quote! {
        impl #impl_generics ::tagconf::Record for #struct_name #ty_generics #where_clause {
            fn fields(&self) -> &'static [::tagconf::FieldMeta] {
                const FIELDS: &[::tagconf::FieldMeta] = &[#(#metas),*];
                FIELDS
            }

            fn field_mut(
                &mut self,
                index: usize,
            ) -> ::core::option::Option<&mut dyn ::tagconf::Node> {
                match index {
                    #(#arms)*
                    _ => ::core::option::Option::None,
                }
            }
        }

        impl #impl_generics ::tagconf::Node for #struct_name #ty_generics #where_clause {
            fn slot(&mut self) -> ::tagconf::Slot<'_> {
                ::tagconf::Slot::Record(self)
            }
        }
    })
}
