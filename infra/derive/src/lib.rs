#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Attribute macros used across the marketplace plugin workspace:
//!
//! * [`macro@main`] boots the plugin's Tokio runtime from a `mkt_runtime` profile.
//! * [`macro@mkt_error`] turns a plain enum into a context-carrying error type.
//! * [`macro@api_model`] and [`macro@api_handler`] keep resource DTOs and axum
//!   handlers consistent with the `OpenAPI` surface.
//!
//! Examples are `ignore`d here because they need the consuming crates in scope.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemFn, ItemStruct, parse_macro_input};

/// Replaces `async fn main` with a synchronous entry point that builds the
/// runtime described by the selected profile and blocks on the body.
///
/// Profiles: `plugin` (small sidecar footprint) or `default`.
///
/// ```rust,ignore
/// #[mkt_runtime::main(plugin)]
/// async fn main() -> anyhow::Result<std::process::ExitCode> {
///     Ok(std::process::ExitCode::SUCCESS)
/// }
/// ```
#[proc_macro_attribute]
pub fn main(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::runtime::expand_main(args.into(), input).into()
}

/// Declares a resource DTO.
///
/// Adds `Debug`, `Serialize` and `Deserialize` when missing, derives
/// `utoipa::ToSchema` under the consumer's `server` feature, and applies
/// `#[serde(rename_all = "camelCase")]`. Unknown fields are rejected unless
/// `deny_unknown_fields = false` is passed.
///
/// ```rust,ignore
/// #[api_model(deny_unknown_fields = false)]
/// pub struct InstallRequest {
///     pub url: String,
///     pub plugin_dir: Option<String>,
/// }
/// ```
#[proc_macro_attribute]
pub fn api_model(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    macros::api::expand_api_model(attr.into(), input).into()
}

/// Attaches `utoipa::path` metadata to an axum handler.
///
/// Arguments are forwarded verbatim to `utoipa::path` when the consumer
/// enables its `server` feature.
///
/// ```rust,ignore
/// #[api_handler(get, path = "/health", responses((status = OK, body = HealthResponse)))]
/// pub async fn health_handler() -> impl IntoResponse { /* ... */ }
/// ```
#[proc_macro_attribute]
pub fn api_handler(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::api::expand_api_handler(args.into(), input).into()
}

/// Builds a crate error type out of a struct-variant enum.
///
/// Generated items:
///
/// * `#[derive(Debug, thiserror::Error)]` unless already derived.
/// * `<Name>Ext` trait providing `.context(..)` on `Result<T, Name>` and on
///   `Result<T, Source>` for every variant wrapping a `source` error.
/// * `From<Source>` for those variants, so `?` works on upstream errors.
/// * `From<&'static str>` / `From<String>` when an `Internal { message, .. }`
///   variant exists.
/// * A private `format_context` helper for `#[error(...)]` strings.
///
/// Variants with a source must also carry `context: Option<Cow<'static, str>>`.
/// Tuple and unit variants are rejected.
///
/// ```rust,ignore
/// #[mkt_error]
/// pub enum InstallError {
///     #[error("IO error{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal error{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
/// ```
#[proc_macro_attribute]
pub fn mkt_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand(input).into()
}
