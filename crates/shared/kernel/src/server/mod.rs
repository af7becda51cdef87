//! Resource calls and the loop that serves them.

mod adapter;
mod health;
mod host;
mod resource;
mod router;
mod serve;
mod state;

pub use adapter::{DEFAULT_BODY_LIMIT, HttpAdapter};
pub use host::HttpHost;
pub use resource::{
    CallResourceHandler, CallResourceRequest, CallResourceResponse, Headers, PluginContext,
    ResourceError, ResourceErrorExt,
};
pub use router::{Mux, RouteRegistrar, system_router};
pub use serve::{Serve, ServeError, ServeErrorExt, ServeOpts};
pub use state::{ServerState, ServerStateBuilder, ServerStateInner, StateError};
