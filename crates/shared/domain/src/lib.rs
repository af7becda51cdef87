//! # Domain
//!
//! Plain data shared by every crate in the plugin: the configuration tree and
//! the fixed identifiers. Only `serde` is allowed here.

pub mod config;
pub mod constants;
