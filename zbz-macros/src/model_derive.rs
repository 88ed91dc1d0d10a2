use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Lit, Meta as SynMeta};

use crate::crate_path::zbz_core_path;

pub fn expand(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match generate(&input) {
        Ok(output) => output.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Parsed contents of one field's `#[model(...)]` attribute.
#[derive(Default)]
struct FieldAttrs {
    json: Option<String>,
    db: Option<String>,
    desc: Option<String>,
    example: Option<String>,
    validate: Option<String>,
    scope: Option<String>,
    encrypt: Option<String>,
    encrypt_algo: Option<String>,
    residency: Option<String>,
    redact: Option<String>,
    edit: Option<String>,
    skip: bool,
}

fn generate(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let name_str = name.to_string();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "#[derive(Model)] only works on structs with named fields:\n\
                     \n  #[derive(Model)]\n  struct User {\n      #[model(json = \"name\")] name: String,\n  }",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "#[derive(Model)] only works on structs — enums and unions are not supported",
            ))
        }
    };

    let krate = zbz_core_path();
    let struct_desc = struct_description(input)?;

    let mut field_entries = Vec::new();
    let mut has_base = false;

    for field in fields {
        let field_name = field.ident.as_ref().unwrap();
        let field_name_str = field_name.to_string();
        let rust_type_str = quote!(#field.ty).to_string();
        let ty_str = quote!(#field).to_string();
        let _ = ty_str; // silence unused in non-debug builds

        let rendered_ty = {
            let ty = &field.ty;
            quote!(#ty).to_string()
        };

        if is_base_model_field(&rendered_ty) {
            has_base = true;
            continue;
        }

        let is_serde_skip = field.attrs.iter().any(|a| {
            if !a.path().is_ident("serde") {
                return false;
            }
            let mut skip = false;
            let _ = a.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    skip = true;
                }
                Ok(())
            });
            skip
        });
        if is_serde_skip {
            continue;
        }

        let attrs = parse_model_attrs(field)?;
        if attrs.skip {
            continue;
        }

        let is_option = rendered_ty.trim_start().starts_with("Option <")
            || rendered_ty.trim_start().starts_with("Option<");

        let json = opt_lit(&attrs.json);
        let db = opt_lit(&attrs.db);
        let desc = opt_lit(&attrs.desc);
        let example = opt_lit(&attrs.example);
        let validate = opt_lit(&attrs.validate);
        let scope = opt_lit(&attrs.scope);
        let encrypt = opt_lit(&attrs.encrypt);
        let encrypt_algo = opt_lit(&attrs.encrypt_algo);
        let residency = opt_lit(&attrs.residency);
        let redact = opt_lit(&attrs.redact);
        let edit = opt_lit(&attrs.edit);

        field_entries.push(quote! {
            #krate::catalog::raw::RawField {
                rust_name: #field_name_str,
                rust_type: #rendered_ty,
                is_option: #is_option,
                json: #json,
                db: #db,
                desc: #desc,
                example: #example,
                validate: #validate,
                scope: #scope,
                encrypt: #encrypt,
                encrypt_algo: #encrypt_algo,
                residency: #residency,
                redact: #redact,
                edit: #edit,
            }
        });
        let _ = rust_type_str;
    }

    let desc_lit = match &struct_desc {
        Some(d) => quote! { #d },
        None => quote! { "" },
    };

    Ok(quote! {
        impl #krate::catalog::Described for #name {
            fn raw_meta() -> #krate::catalog::raw::RawMeta {
                #krate::catalog::raw::RawMeta {
                    type_name: #name_str,
                    description: #desc_lit,
                    has_base: #has_base,
                    fields: vec![#(#field_entries),*],
                }
            }
        }
    })
}

fn is_base_model_field(rendered_ty: &str) -> bool {
    let compact: String = rendered_ty.chars().filter(|c| !c.is_whitespace()).collect();
    compact.ends_with("BaseModel") || compact.ends_with("::BaseModel")
}

fn struct_description(input: &DeriveInput) -> syn::Result<Option<String>> {
    for attr in &input.attrs {
        if !attr.path().is_ident("model") {
            continue;
        }
        let mut desc = None;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("desc") {
                let value = meta.value()?;
                let lit: Lit = value.parse()?;
                if let Lit::Str(s) = lit {
                    desc = Some(s.value());
                }
            }
            Ok(())
        })?;
        return Ok(desc);
    }
    Ok(None)
}

fn parse_model_attrs(field: &syn::Field) -> syn::Result<FieldAttrs> {
    let mut attrs = FieldAttrs::default();
    for attr in &field.attrs {
        if attr.path().is_ident("model") {
            if let SynMeta::List(_) = &attr.meta {
                attr.parse_nested_meta(|meta| {
                    macro_rules! str_field {
                        ($ident:literal, $slot:expr) => {
                            if meta.path.is_ident($ident) {
                                let value = meta.value()?;
                                let lit: Lit = value.parse()?;
                                if let Lit::Str(s) = lit {
                                    *$slot = Some(s.value());
                                }
                                return Ok(());
                            }
                        };
                    }
                    str_field!("json", &mut attrs.json);
                    str_field!("db", &mut attrs.db);
                    str_field!("desc", &mut attrs.desc);
                    str_field!("example", &mut attrs.example);
                    str_field!("ex", &mut attrs.example);
                    str_field!("validate", &mut attrs.validate);
                    str_field!("scope", &mut attrs.scope);
                    str_field!("encrypt", &mut attrs.encrypt);
                    str_field!("encrypt_algo", &mut attrs.encrypt_algo);
                    str_field!("data_residency", &mut attrs.residency);
                    str_field!("redact", &mut attrs.redact);
                    str_field!("edit", &mut attrs.edit);
                    if meta.path.is_ident("skip") {
                        attrs.skip = true;
                        return Ok(());
                    }
                    Err(meta.error("unrecognized #[model(...)] key"))
                })?;
            }
        }
    }
    Ok(attrs)
}

fn opt_lit(value: &Option<String>) -> TokenStream2 {
    match value {
        Some(s) => quote! { Some(#s) },
        None => quote! { None },
    }
}
