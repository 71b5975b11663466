#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Attribute macros shared by every `LeadHub` crate.
//!
//! * [`macro@leadhub_error`] turns an enum into a `thiserror` error with
//!   context support.
//! * [`macro@leadhub_slice`] turns a struct into a cheaply clonable feature
//!   slice that can be registered in the kernel state.
//!
//! The examples are `ignore`d because a proc-macro crate cannot use its own
//! macros in doctests.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemStruct, parse_macro_input};

/// Defines a domain error enum wired into the workspace conventions.
///
/// # Generated items
///
/// * `#[derive(Debug, thiserror::Error)]` unless already present.
/// * `<Name>Ext` trait adding `.context(..)` to `Result<T, Name>` and to
///   `Result<T, Source>` for each variant that wraps a source error.
/// * `From<Source>` for each variant with a `source` field (or a field
///   marked `#[source]`/`#[from]`).
/// * `From<&'static str>` and `From<String>` when an `Internal` variant
///   exists.
/// * A module-local `format_context` helper used in `#[error(..)]` strings.
///
/// # Requirements
///
/// * Only enums with named-field variants are accepted.
/// * Variants with a source must also carry `context: Option<Cow<'static, str>>`.
///
/// # Example
///
/// ```rust,ignore
/// use std::borrow::Cow;
///
/// #[leadhub_derive::leadhub_error]
/// pub enum SocketError {
///     #[error("Decode failure{}: {source}", format_context(.context))]
///     Decode { source: serde_json::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn decode(raw: &str) -> Result<serde_json::Value, SocketError> {
///     serde_json::from_str(raw).context("Decoding inbound frame")
/// }
/// ```
#[proc_macro_attribute]
pub fn leadhub_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_error(input).into()
}

/// Defines a feature slice handle.
///
/// The annotated struct becomes `<Name>Inner`; `<Name>` is generated as an
/// `Arc` wrapper with `new`, `Deref` to the inner state and a
/// `FeatureSlice` implementation for registration in `ApiState`.
///
/// # Example
/// ```rust,ignore
/// #[leadhub_derive::leadhub_slice]
/// pub struct Realtime {
///     pub relay: Relay,
/// }
///
/// let slice = Realtime::new(RealtimeInner { relay });
/// ```
#[proc_macro_attribute]
pub fn leadhub_slice(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    macros::slice::expand_slice(input).into()
}
