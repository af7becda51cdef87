use super::error::derived_names;
use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::{Attribute, Expr, ItemFn, ItemStruct, Lit, Meta, Token};

/// Expands `#[api_model]`.
pub fn expand_api_model(args: TokenStream, input: ItemStruct) -> TokenStream {
    let deny_unknown_fields = match parse_deny_flag(args) {
        Ok(flag) => flag,
        Err(err) => return err.to_compile_error(),
    };

    let present = derived_names(&input.attrs);
    let mut derives = Vec::new();
    if !present.contains("Debug") {
        derives.push(quote! { Debug });
    }
    if !present.contains("Serialize") {
        derives.push(quote! { ::serde::Serialize });
    }
    if !present.contains("Deserialize") {
        derives.push(quote! { ::serde::Deserialize });
    }
    let derive_attr = if derives.is_empty() { quote!() } else { quote! { #[derive(#(#derives),*)] } };

    let schema_attr = if present.contains("ToSchema") {
        quote!()
    } else {
        quote! { #[cfg_attr(feature = "server", derive(::utoipa::ToSchema))] }
    };

    let (has_rename, has_deny) = serde_flags(&input.attrs);
    let rename_attr = if has_rename { quote!() } else { quote! { #[serde(rename_all = "camelCase")] } };
    let deny_attr = if deny_unknown_fields && !has_deny {
        quote! { #[serde(deny_unknown_fields)] }
    } else {
        quote!()
    };

    quote! {
        #derive_attr
        #schema_attr
        #rename_attr
        #deny_attr
        #input
    }
}

/// Expands `#[api_handler]`.
pub fn expand_api_handler(args: TokenStream, input: ItemFn) -> TokenStream {
    let ItemFn { attrs, vis, sig, block } = input;

    quote! {
        #(#attrs)*
        #[allow(clippy::unused_async)]
        #[cfg_attr(feature = "server", ::utoipa::path(#args))]
        #vis #sig #block
    }
}

fn parse_deny_flag(args: TokenStream) -> syn::Result<bool> {
    let metas = Punctuated::<Meta, Token![,]>::parse_terminated.parse2(args)?;
    let mut flag = None;

    for meta in metas {
        let nv = match meta {
            Meta::NameValue(nv) => nv,
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "expected `deny_unknown_fields = <bool>`",
                ));
            },
        };
        if !nv.path.is_ident("deny_unknown_fields") {
            return Err(syn::Error::new_spanned(nv.path, "unsupported api_model argument"));
        }
        let Expr::Lit(lit) = &nv.value else {
            return Err(syn::Error::new_spanned(&nv.value, "expected a boolean literal"));
        };
        let Lit::Bool(value) = &lit.lit else {
            return Err(syn::Error::new_spanned(&nv.value, "expected a boolean literal"));
        };
        if flag.replace(value.value).is_some() {
            return Err(syn::Error::new_spanned(nv, "duplicate argument"));
        }
    }

    Ok(flag.unwrap_or(true))
}

/// Reports whether `rename_all` / `deny_unknown_fields` are already set via `#[serde]`.
fn serde_flags(attrs: &[Attribute]) -> (bool, bool) {
    let mut rename = false;
    let mut deny = false;
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                rename = true;
                let _: syn::LitStr = meta.value()?.parse()?;
            } else if meta.path.is_ident("deny_unknown_fields") {
                deny = true;
            } else if meta.input.peek(Token![=]) {
                let _: Expr = meta.value()?.parse()?;
            }
            Ok(())
        });
    }
    (rename, deny)
}
