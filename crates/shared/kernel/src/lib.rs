//! Kernel plumbing shared by the plugin binary and its feature crates.
//!
//! * [`config`]: layered file + environment configuration loading.
//! * [`environment`]: one-time plugin environment setup.
//! * [`security`]: path validation for user-supplied names and archive entries.
//! * `server` (feature): resource-call types, the HTTP adapter, the serve
//!   loop abstraction and the shared request state.
//!
//! ```rust
//! use mkt_kernel::environment::PluginEnvironment;
//!
//! let env = PluginEnvironment::from_vars("grafana-marketplace-app", [("GF_VERSION", "11.0.0")])
//!     .unwrap();
//! assert_eq!(env.grafana_version(), Some("11.0.0"));
//! ```
pub mod config;
pub mod environment;
pub mod prelude;
pub mod security;
#[cfg(feature = "server")]
pub mod server;

pub use mkt_domain as domain;
