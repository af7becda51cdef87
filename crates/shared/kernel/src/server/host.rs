//! Standalone HTTP transport for resource calls.
//!
//! Exposes the plugin's resources the way the host proxies them
//! (`/api/plugins/{plugin_id}/resources/...`), so the backend can run and be
//! exercised without the host's RPC handshake.

use super::adapter::headers_from;
use super::resource::{CallResourceHandler, CallResourceRequest, CallResourceResponse, PluginContext};
use super::serve::{Serve, ServeError, ServeErrorExt, ServeOpts};
use crate::environment::PluginEnvironment;
use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Json, Router};
use axum_server::Handle;
use mkt_domain::config::{ServerConfig, SslConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

const ORG_ID_HEADER: &str = "x-grafana-org-id";
const USER_HEADER: &str = "x-grafana-user";
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);
const REQUEST_BODY_LIMIT: usize = 16 * 1024 * 1024;

/// HTTP serve loop bound to [`ServerConfig::address`]:[`ServerConfig::port`].
#[derive(Debug, Clone)]
pub struct HttpHost {
    plugin_id: String,
    grafana_version: Option<String>,
    address: SocketAddr,
    ssl: Option<SslConfig>,
}

#[derive(Debug, Clone)]
struct Transport {
    plugin_id: Arc<str>,
    grafana_version: Option<Arc<str>>,
    handler: Option<Arc<dyn CallResourceHandler>>,
}

impl HttpHost {
    #[must_use]
    pub fn new(environment: &PluginEnvironment, server: &ServerConfig) -> Self {
        Self {
            plugin_id: environment.plugin_id().to_owned(),
            grafana_version: environment.grafana_version().map(str::to_owned),
            address: SocketAddr::new(server.address, server.port),
            ssl: server.ssl.clone(),
        }
    }

    #[must_use]
    pub const fn address(&self) -> SocketAddr {
        self.address
    }

    /// Router that turns inbound HTTP into resource calls for `opts`.
    #[must_use]
    pub fn transport_router(&self, opts: ServeOpts) -> Router {
        let transport = Transport {
            plugin_id: Arc::from(self.plugin_id.as_str()),
            grafana_version: self.grafana_version.as_deref().map(Arc::from),
            handler: opts.call_resource_handler,
        };

        Router::new()
            .route("/api/plugins/{plugin_id}/resources", any(forward_root))
            .route("/api/plugins/{plugin_id}/resources/{*path}", any(forward))
            .layer(TraceLayer::new_for_http())
            .with_state(transport)
    }
}

#[async_trait]
impl Serve for HttpHost {
    async fn serve(&self, opts: ServeOpts) -> Result<(), ServeError> {
        let app = self.transport_router(opts);
        let address = self.address;

        let handle = Handle::<SocketAddr>::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            if let Err(e) = shutdown_signal().await {
                error!("Error while waiting for shutdown signal: {e}");
                return;
            }
            info!("Shutdown signal received, draining resource calls");
            shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        });

        if let Some(ssl) = &self.ssl {
            info!(%address, "Serving plugin resources on https://{address}");
            let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(&ssl.cert, &ssl.key)
                .await
                .context("Loading TLS certificate and key")?;

            axum_server::bind_rustls(address, tls)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .context("HTTPS transport failed")?;
        } else {
            info!(%address, "Serving plugin resources on http://{address}");
            axum_server::bind(address)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .context("HTTP transport failed")?;
        }

        info!("Transport shut down");
        Ok(())
    }
}

async fn forward_root(
    State(transport): State<Transport>,
    Path(plugin_id): Path<String>,
    request: Request,
) -> Response {
    dispatch(transport, &plugin_id, String::new(), request).await
}

async fn forward(
    State(transport): State<Transport>,
    Path((plugin_id, path)): Path<(String, String)>,
    request: Request,
) -> Response {
    dispatch(transport, &plugin_id, path, request).await
}

async fn dispatch(transport: Transport, plugin_id: &str, path: String, request: Request) -> Response {
    if plugin_id != &*transport.plugin_id {
        return error_response(StatusCode::NOT_FOUND, format!("plugin {plugin_id:?} not found"));
    }
    let Some(handler) = transport.handler.clone() else {
        return error_response(StatusCode::NOT_IMPLEMENTED, "resource calls are not supported");
    };

    let call = match into_call(&transport, path, request).await {
        Ok(call) => call,
        Err(response) => return response,
    };

    match handler.call_resource(call).await {
        Ok(response) => into_response(response),
        Err(e) => {
            warn!(error = %e, "Resource call failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        },
    }
}

async fn into_call(
    transport: &Transport,
    path: String,
    request: Request,
) -> Result<CallResourceRequest, Response> {
    let (parts, body) = request.into_parts();

    let org_id = parts
        .headers
        .get(ORG_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(1);
    let user = parts.headers.get(USER_HEADER).and_then(|v| v.to_str().ok()).map(str::to_owned);

    let body = axum::body::to_bytes(body, REQUEST_BODY_LIMIT)
        .await
        .map_err(|e| error_response(StatusCode::PAYLOAD_TOO_LARGE, e.to_string()))?;

    let raw_path = resource_path(parts.uri.path());
    let url = match parts.uri.query() {
        Some(query) => format!("{raw_path}?{query}"),
        None => raw_path.to_owned(),
    };

    Ok(CallResourceRequest {
        plugin_context: PluginContext {
            plugin_id: transport.plugin_id.to_string(),
            org_id,
            user,
            grafana_version: transport.grafana_version.as_deref().map(str::to_owned),
        },
        path,
        method: parts.method.as_str().to_owned(),
        url,
        headers: headers_from(&parts.headers),
        body,
    })
}

/// The still percent-encoded part of `/api/plugins/{id}/resources/...` after
/// the resources prefix.
fn resource_path(uri_path: &str) -> &str {
    uri_path.splitn(6, '/').nth(5).unwrap_or_default()
}

fn into_response(call: CallResourceResponse) -> Response {
    let status = StatusCode::from_u16(call.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = Response::new(Body::from(call.body));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    for (name, values) in &call.headers {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else { continue };
        if name == header::TRANSFER_ENCODING || name == header::CONNECTION {
            continue;
        }
        for value in values {
            if let Ok(value) = HeaderValue::from_str(value) {
                headers.append(name.clone(), value);
            }
        }
    }
    response
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// Resolves on Ctrl+C or SIGTERM (the host stops plugins with SIGTERM).
async fn shutdown_signal() -> Result<(), ServeError> {
    let ctrl_c = async { signal::ctrl_c().await.context("Installing Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Installing SIGTERM handler")?
            .recv()
            .await;
        Ok::<_, ServeError>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<(), ServeError>>();

    tokio::select! {
        res = ctrl_c => res,
        res = terminate => res,
    }
}
