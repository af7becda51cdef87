pub use crate::config::load_config;
pub use crate::environment::{PluginEnvironment, setup_plugin_environment};
pub use crate::security::PathGuard;
#[cfg(feature = "server")]
pub use crate::server::{
    CallResourceHandler, CallResourceRequest, CallResourceResponse, HttpAdapter, HttpHost, Mux,
    PluginContext, RouteRegistrar, Serve, ServeError, ServeOpts, ServerState,
};
