use super::resource::CallResourceHandler;
use async_trait::async_trait;
use std::borrow::Cow;
use std::sync::Arc;

#[mkt_derive::mkt_error]
pub enum ServeError {
    #[error("Transport I/O error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Transport failure{}: {message}", format_context(.context))]
    Transport { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

/// Capabilities handed to the serve loop.
///
/// Resource calls are the only capability this plugin implements; calls for
/// anything else are answered by the transport as unimplemented.
#[derive(Debug, Clone, Default)]
pub struct ServeOpts {
    pub call_resource_handler: Option<Arc<dyn CallResourceHandler>>,
}

impl ServeOpts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn call_resource_handler(mut self, handler: impl CallResourceHandler + 'static) -> Self {
        self.call_resource_handler = Some(Arc::new(handler));
        self
    }
}

/// A transport that dispatches host calls to the configured handlers.
///
/// `serve` blocks until the transport shuts down (`Ok`) or fails (`Err`).
#[async_trait]
pub trait Serve: Send + Sync {
    async fn serve(&self, opts: ServeOpts) -> Result<(), ServeError>;
}
