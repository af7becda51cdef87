use super::state::ServerState;
use axum::Json;
use axum::extract::State;
use mkt_derive::{api_handler, api_model};
use mkt_domain::constants::SYSTEM_TAG;

#[api_model]
/// What the plugin backend reports about itself
pub(super) struct HealthResponse {
    /// Plugin id the backend was started for
    plugin_id: String,
    /// Backend build version
    version: String,
    /// Version of the hosting Grafana, when it announced one
    grafana_version: Option<String>,
}

#[api_handler(
    get,
    path = "/health",
    responses((status = OK, description = "Plugin backend is serving", body = HealthResponse)),
    tag = SYSTEM_TAG,
)]
pub(super) async fn health_handler(State(state): State<ServerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        plugin_id: state.plugin_id().to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        grafana_version: state.environment.grafana_version().map(str::to_owned),
    })
}

#[cfg(test)]
mod tests {
    use crate::environment::PluginEnvironment;
    use crate::server::{ServerState, system_router};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn reports_plugin_and_host_versions() {
        let environment =
            PluginEnvironment::from_vars("grafana-marketplace-app", [("GF_VERSION", "11.2.0")]).unwrap();
        let state = ServerState::builder().environment(environment).build().unwrap();
        let (router, _) = system_router().with_state(state).split_for_parts();

        let response =
            router.oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["pluginId"], "grafana-marketplace-app");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(body["grafanaVersion"], "11.2.0");
    }
}
