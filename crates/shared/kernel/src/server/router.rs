use super::health;
use super::state::ServerState;
use std::fmt::Display;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

/// The plugin's HTTP multiplexer. Routes added here are documented in the
/// generated OpenAPI description.
pub type Mux = OpenApiRouter<ServerState>;

/// Attaches a feature's resource routes to the multiplexer.
///
/// Registration happens once, before serving starts.
pub trait RouteRegistrar {
    type Error: Display + Send + Sync + 'static;

    /// # Errors
    /// Implementations fail when their routes cannot be set up (for example
    /// an upstream client cannot be built).
    fn register_routes(&self, mux: Mux, state: &ServerState) -> Result<Mux, Self::Error>;
}

/// A registrar that adds nothing.
impl RouteRegistrar for () {
    type Error = std::convert::Infallible;

    fn register_routes(&self, mux: Mux, _state: &ServerState) -> Result<Mux, Self::Error> {
        Ok(mux)
    }
}

/// Routes every plugin serves regardless of its registrar.
pub fn system_router() -> Mux {
    Mux::new().routes(routes!(health::health_handler))
}
