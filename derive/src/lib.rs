//! Derive macro for optfig config records.
//!
//! `#[derive(Config)]` implements `optfig::Config` and `optfig::Value` for a
//! struct with named fields. See the `optfig` crate docs for the attribute
//! grammar.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Expr, Fields, Lit, Meta, UnOp, Visibility, parse_macro_input};

/// Derives `optfig::Config` (and the record's `optfig::Value` impl).
///
/// ```ignore
/// #[derive(Config, Default)]
/// pub struct Settings {
///     /// Number of worker threads
///     #[config(short = 'w', default = 4)]
///     pub workers: u32,
///     #[config(id = "db")]
///     pub database: Database,
///     internal: u64, // private: not an option
/// }
/// ```
///
/// Field attributes, all optional:
/// - `id = "..."` - identifier override (default: kebab-cased field name)
/// - `short = 'c'` - single character alias
/// - `default = "..."` - default literal; integer, float and bool literals
///   are accepted and stringified
/// - `desc = "..."` - help text (default: the field's doc comment)
/// - `hidden` - leave the option out of help output
/// - `skip` - not an option
#[proc_macro_derive(Config, attributes(config))]
pub fn derive_config(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

struct FieldSpec {
    ident: syn::Ident,
    ty: syn::Type,
    name: String,
    id: Option<String>,
    short: Option<char>,
    default: Option<String>,
    description: String,
    hidden: bool,
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Config can only be derived for structs",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Config requires a struct with named fields",
        ));
    };

    let mut specs = Vec::new();
    for field in &named.named {
        if matches!(field.vis, Visibility::Inherited) {
            continue;
        }
        if let Some(spec) = field_spec(field)? {
            specs.push(spec);
        }
    }

    let name = &input.ident;
    let name_str = name.unraw().to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let handles = specs.iter().map(|spec| {
        let ident = &spec.ident;
        let field_name = &spec.name;
        let id = spec.id.as_ref().map(|id| quote!(.id(#id)));
        let short = spec.short.map(|c| quote!(.short(#c)));
        let default = spec.default.as_ref().map(|d| quote!(.default_value(#d)));
        let description = &spec.description;
        let description = (!description.is_empty()).then(|| quote!(.description(#description)));
        let hidden = spec.hidden.then(|| quote!(.hidden()));
        quote! {
            ::optfig::Field::new(#field_name, &mut self.#ident)
                #id #short #default #description #hidden
        }
    });

    let shapes = specs.iter().map(|spec| {
        let field_name = &spec.name;
        let ty = &spec.ty;
        quote!((#field_name, <#ty as ::optfig::Value>::shape()))
    });

    let zero_checks = specs.iter().map(|spec| {
        let ident = &spec.ident;
        quote!(::optfig::Value::is_zero(&self.#ident))
    });

    Ok(quote! {
        impl #impl_generics ::optfig::Config for #name #ty_generics #where_clause {
            fn fields(&mut self) -> ::std::vec::Vec<::optfig::Field<'_>> {
                ::std::vec![#(#handles),*]
            }
        }

        impl #impl_generics ::optfig::Value for #name #ty_generics #where_clause {
            fn shape() -> ::optfig::Shape {
                ::optfig::Shape::Record {
                    name: #name_str,
                    fields: ::std::vec![#(#shapes),*],
                }
            }

            fn describe(&self) -> ::optfig::Shape {
                <Self as ::optfig::Value>::shape()
            }

            fn is_zero(&self) -> bool {
                true #(&& #zero_checks)*
            }

            fn set_text(&mut self, _raw: &str) -> ::std::result::Result<(), ::optfig::CoerceError> {
                ::std::result::Result::Err(::optfig::CoerceError::Incompatible {
                    found: ::std::string::String::from("text"),
                    target: ::std::string::String::from(#name_str),
                })
            }

            fn set_dynamic(
                &mut self,
                value: &::optfig::Dynamic,
            ) -> ::std::result::Result<(), ::optfig::CoerceError> {
                ::optfig::__private::decode_record(self, value)
            }

            fn as_config(&mut self) -> ::std::option::Option<&mut dyn ::optfig::Config> {
                ::std::option::Option::Some(self)
            }
        }
    })
}

fn field_spec(field: &syn::Field) -> syn::Result<Option<FieldSpec>> {
    let Some(ident) = field.ident.clone() else {
        return Err(syn::Error::new_spanned(field, "expected a named field"));
    };

    let mut spec = FieldSpec {
        name: ident.unraw().to_string(),
        ident,
        ty: field.ty.clone(),
        id: None,
        short: None,
        default: None,
        description: doc_comment(&field.attrs),
        hidden: false,
    };
    let mut skip = false;

    for attr in field.attrs.iter().filter(|a| a.path().is_ident("config")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                let lit: syn::LitStr = meta.value()?.parse()?;
                spec.id = Some(lit.value());
            } else if meta.path.is_ident("short") {
                let lit: Lit = meta.value()?.parse()?;
                spec.short = Some(match lit {
                    Lit::Char(c) => c.value(),
                    Lit::Str(s) if s.value().chars().count() == 1 => {
                        s.value().chars().next().unwrap_or_default()
                    }
                    other => {
                        return Err(syn::Error::new_spanned(
                            other,
                            "short must be a single character",
                        ));
                    }
                });
            } else if meta.path.is_ident("default") {
                let expr: Expr = meta.value()?.parse()?;
                spec.default = Some(default_literal(&expr)?);
            } else if meta.path.is_ident("desc") {
                let lit: syn::LitStr = meta.value()?.parse()?;
                spec.description = lit.value();
            } else if meta.path.is_ident("hidden") {
                spec.hidden = true;
            } else if meta.path.is_ident("skip") {
                skip = true;
            } else {
                return Err(meta.error("unknown config attribute"));
            }
            Ok(())
        })?;
    }

    Ok((!skip).then_some(spec))
}

fn default_literal(expr: &Expr) -> syn::Result<String> {
    match expr {
        Expr::Lit(lit) => match &lit.lit {
            Lit::Str(s) => Ok(s.value()),
            Lit::Int(i) => Ok(i.base10_digits().to_string()),
            Lit::Float(f) => Ok(f.base10_digits().to_string()),
            Lit::Bool(b) => Ok(b.value.to_string()),
            other => Err(syn::Error::new_spanned(
                other,
                "default must be a string, integer, float or bool literal",
            )),
        },
        Expr::Unary(unary) if matches!(unary.op, UnOp::Neg(_)) => {
            Ok(format!("-{}", default_literal(&unary.expr)?))
        }
        other => Err(syn::Error::new_spanned(
            other,
            "default must be a string, integer, float or bool literal",
        )),
    }
}

fn doc_comment(attrs: &[syn::Attribute]) -> String {
    attrs
        .iter()
        .filter_map(|attr| {
            if !attr.path().is_ident("doc") {
                return None;
            }
            let Meta::NameValue(meta) = &attr.meta else {
                return None;
            };
            let Expr::Lit(expr) = &meta.value else {
                return None;
            };
            let Lit::Str(lit) = &expr.lit else {
                return None;
            };
            Some(lit.value().trim().to_string())
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
