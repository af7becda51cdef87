use crate::Marketplace;
use crate::error::MarketplaceError;
use crate::installer::Installer;
use crate::models::{
    InstallRequest, InstallResponse, InstalledPlugin, InstalledQuery, UninstallRequest,
    UninstallResponse,
};
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, RawQuery, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use mkt_derive::api_handler;
use mkt_domain::constants::MARKETPLACE_TAG;
use serde::de::DeserializeOwned;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

pub(crate) fn router() -> OpenApiRouter<Marketplace> {
    OpenApiRouter::new()
        .routes(routes!(list_plugins))
        .routes(routes!(get_plugin))
        .routes(routes!(plugin_versions))
        .routes(routes!(installed_plugins))
        .routes(routes!(install_plugin))
        .routes(routes!(uninstall_plugin))
}

#[api_handler(
    get,
    path = "/plugins",
    responses((status = OK, description = "Catalog page from grafana.com, passed through")),
    tag = MARKETPLACE_TAG,
)]
pub(crate) async fn list_plugins(
    State(marketplace): State<Marketplace>,
    RawQuery(query): RawQuery,
) -> Result<Response, MarketplaceError> {
    let body = marketplace.catalog().plugins(query.as_deref()).await?;
    Ok(json_bytes(body))
}

#[api_handler(
    get,
    path = "/plugins/{slug}",
    params(("slug" = String, Path, description = "Plugin slug")),
    responses(
        (status = OK, description = "Plugin details from grafana.com, passed through"),
        (status = NOT_FOUND, description = "Unknown plugin"),
    ),
    tag = MARKETPLACE_TAG,
)]
pub(crate) async fn get_plugin(
    State(marketplace): State<Marketplace>,
    Path(slug): Path<String>,
) -> Result<Response, MarketplaceError> {
    let body = marketplace.catalog().plugin(&slug).await?;
    Ok(json_bytes(body))
}

#[api_handler(
    get,
    path = "/plugins/{slug}/versions",
    params(("slug" = String, Path, description = "Plugin slug")),
    responses((status = OK, description = "Version history from grafana.com, passed through")),
    tag = MARKETPLACE_TAG,
)]
pub(crate) async fn plugin_versions(
    State(marketplace): State<Marketplace>,
    Path(slug): Path<String>,
) -> Result<Response, MarketplaceError> {
    let body = marketplace.catalog().versions(&slug).await?;
    Ok(json_bytes(body))
}

#[api_handler(
    get,
    path = "/installed",
    params(InstalledQuery),
    responses((status = OK, description = "Installed plugins", body = [InstalledPlugin])),
    tag = MARKETPLACE_TAG,
)]
pub(crate) async fn installed_plugins(
    State(marketplace): State<Marketplace>,
    Query(query): Query<InstalledQuery>,
) -> Result<Json<Vec<InstalledPlugin>>, MarketplaceError> {
    let dir = marketplace.installer().resolve_dir(query.plugin_dir.as_deref());
    let plugins = blocking(move || Installer::list(&dir)).await?;
    Ok(Json(plugins))
}

#[api_handler(
    post,
    path = "/install",
    request_body = InstallRequest,
    responses(
        (status = OK, description = "Archive unpacked", body = InstallResponse),
        (status = BAD_REQUEST, description = "Bad URL, oversized or unsafe archive"),
    ),
    tag = MARKETPLACE_TAG,
)]
pub(crate) async fn install_plugin(
    State(marketplace): State<Marketplace>,
    body: Bytes,
) -> Result<Json<InstallResponse>, MarketplaceError> {
    let request: InstallRequest = parse_body(&body)?;
    let dir = marketplace.installer().resolve_dir(request.plugin_dir.as_deref());

    let archive = marketplace.catalog().download(&request.url).await?;
    let installer = marketplace.installer().clone();
    let installed = blocking(move || installer.unpack(&archive, &dir)).await?;
    Ok(Json(InstallResponse { installed }))
}

#[api_handler(
    post,
    path = "/uninstall",
    request_body = UninstallRequest,
    responses(
        (status = OK, description = "Plugin removed", body = UninstallResponse),
        (status = NOT_FOUND, description = "Plugin is not installed"),
    ),
    tag = MARKETPLACE_TAG,
)]
pub(crate) async fn uninstall_plugin(
    State(marketplace): State<Marketplace>,
    body: Bytes,
) -> Result<Json<UninstallResponse>, MarketplaceError> {
    let request: UninstallRequest = parse_body(&body)?;
    let dir = marketplace.installer().resolve_dir(request.plugin_dir.as_deref());

    let slug = request.slug;
    let removed = slug.clone();
    blocking(move || Installer::remove(&dir, &slug)).await?;
    Ok(Json(UninstallResponse { removed }))
}

fn json_bytes(body: Bytes) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

// The frontend posts JSON without always setting a content type, so bodies
// are decoded by hand instead of through `Json`.
fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, MarketplaceError> {
    serde_json::from_slice(body)
        .map_err(|e| MarketplaceError::validation(format!("request body: {e}")))
}

async fn blocking<T, F>(task: F) -> Result<T, MarketplaceError>
where
    F: FnOnce() -> Result<T, MarketplaceError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| MarketplaceError::from(format!("blocking task failed: {e}")))?
}
