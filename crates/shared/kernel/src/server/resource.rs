use async_trait::async_trait;
use axum::body::Bytes;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Multi-valued header map keyed by lowercase header name.
pub type Headers = BTreeMap<String, Vec<String>>;

#[mkt_derive::mkt_error]
pub enum ResourceError {
    #[error("Invalid resource request{}: {message}", format_context(.context))]
    InvalidRequest { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Resource body error{}: {source}", format_context(.context))]
    Body { source: axum::Error, context: Option<Cow<'static, str>> },

    #[error("Resource handler error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

/// Who is calling: the plugin, the organization and the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginContext {
    pub plugin_id: String,
    pub org_id: i64,
    pub user: Option<String>,
    pub grafana_version: Option<String>,
}

impl Default for PluginContext {
    fn default() -> Self {
        Self { plugin_id: String::new(), org_id: 1, user: None, grafana_version: None }
    }
}

/// An HTTP-shaped call routed through the host.
///
/// `path` is relative to the plugin's resource root and carries no leading
/// slash; `url` is the same path with its query string.
#[derive(Debug, Clone, Default)]
pub struct CallResourceRequest {
    pub plugin_context: PluginContext,
    pub path: String,
    pub method: String,
    pub url: String,
    pub headers: Headers,
    pub body: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallResourceResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Bytes,
}

impl CallResourceResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, headers: Headers::new(), body: body.into() }
    }

    /// First value of a header, looked up case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).and_then(|v| v.first()).map(String::as_str)
    }
}

/// Answers resource calls. The only capability this plugin hands to the host.
#[async_trait]
pub trait CallResourceHandler: Debug + Send + Sync {
    async fn call_resource(
        &self,
        request: CallResourceRequest,
    ) -> Result<CallResourceResponse, ResourceError>;
}
