//! Bridges resource calls onto an axum router.

use super::resource::{
    CallResourceHandler, CallResourceRequest, CallResourceResponse, Headers, ResourceError,
    ResourceErrorExt,
};
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request};
use tower::ServiceExt;
use tracing::debug;

/// Upper bound on a buffered response body.
pub const DEFAULT_BODY_LIMIT: usize = 64 * 1024 * 1024;

/// Serves [`CallResourceRequest`]s with an HTTP multiplexer.
///
/// Each call becomes an `http::Request` whose extensions carry the caller's
/// [`PluginContext`](super::PluginContext), so handlers can extract it with
/// `Extension<PluginContext>`.
#[derive(Debug, Clone)]
pub struct HttpAdapter {
    router: Router,
    body_limit: usize,
}

impl HttpAdapter {
    #[must_use]
    pub const fn new(router: Router) -> Self {
        Self { router, body_limit: DEFAULT_BODY_LIMIT }
    }

    #[must_use]
    pub const fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }
}

#[async_trait]
impl CallResourceHandler for HttpAdapter {
    async fn call_resource(
        &self,
        request: CallResourceRequest,
    ) -> Result<CallResourceResponse, ResourceError> {
        let request = into_http_request(request)?;
        debug!(method = %request.method(), uri = %request.uri(), "Dispatching resource call");

        let response = match self.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };

        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(body, self.body_limit)
            .await
            .context("Reading handler response")?;

        Ok(CallResourceResponse {
            status: parts.status.as_u16(),
            headers: headers_from(&parts.headers),
            body,
        })
    }
}

fn into_http_request(request: CallResourceRequest) -> Result<Request<Body>, ResourceError> {
    let CallResourceRequest { plugin_context, path, method, url, headers, body } = request;

    let method = if method.is_empty() {
        Method::GET
    } else {
        Method::from_bytes(method.as_bytes()).map_err(|e| ResourceError::InvalidRequest {
            message: format!("method {method:?}: {e}").into(),
            context: None,
        })?
    };

    let target = if url.is_empty() { path } else { url };
    let uri = format!("/{}", target.trim_start_matches('/'));

    let mut builder = Request::builder().method(method).uri(uri.as_str());
    for (name, values) in &headers {
        for value in values {
            builder = builder.header(name.as_str(), value.as_str());
        }
    }

    let mut request = builder.body(Body::from(body)).map_err(|e| {
        ResourceError::InvalidRequest { message: e.to_string().into(), context: Some(uri.into()) }
    })?;
    request.extensions_mut().insert(plugin_context);
    Ok(request)
}

/// Converts an `http` header map into the multi-valued resource form.
pub(crate) fn headers_from(map: &HeaderMap) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in map {
        headers
            .entry(name.as_str().to_owned())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    headers
}
