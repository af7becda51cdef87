use crate::PluginError;
use axum::routing::get;
use axum::{Json, Router};
use mkt_kernel::server::{Mux, RouteRegistrar, ServerState, system_router};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa::openapi::OpenApi as OpenApiDoc;

#[derive(OpenApi)]
#[openapi(info(title = "Grafana Marketplace", description = "Plugin resource API"))]
struct ApiDoc;

/// Builds the multiplexer, lets `registrar` populate it and seals it with
/// `state`. The generated description is served at `/openapi.json`.
pub(crate) fn init<R>(
    state: &ServerState,
    registrar: &R,
) -> Result<(Router, OpenApiDoc), PluginError>
where
    R: RouteRegistrar + ?Sized,
{
    let mux = Mux::with_openapi(ApiDoc::openapi()).merge(system_router());
    let mux = registrar.register_routes(mux, state).map_err(|e| PluginError::Routes {
        message: e.to_string().into(),
        context: None,
    })?;

    let (router, api) =
        mux.layer(TraceLayer::new_for_http()).with_state(state.clone()).split_for_parts();

    let doc = api.clone();
    let router = router.route(
        "/openapi.json",
        get(move || {
            let doc = doc.clone();
            async move { Json(doc) }
        }),
    );

    Ok((router, api))
}
