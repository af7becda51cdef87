//! # Grafana Marketplace plugin backend
//!
//! Bootstraps the backend process: environment setup, server state, route
//! registration, the resource adapter and the blocking serve loop.
//!
//! ## Example
//! ```no_run
//! use mkt_kernel::prelude::*;
//! use mkt_kernel::domain::config::PluginConfig;
//! use mkt_marketplace::MarketplaceRoutes;
//! use mkt_plugin::run;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let environment = setup_plugin_environment("grafana-marketplace-app")?;
//! let config = PluginConfig::default();
//! let host = HttpHost::new(&environment, &config.server);
//!
//! let status = run(environment, config, &MarketplaceRoutes, &host).await;
//! std::process::exit(status.code());
//! # }
//! ```

mod router;

use axum::Router;
use mkt_domain::config::PluginConfig;
use mkt_kernel::environment::PluginEnvironment;
use mkt_kernel::server::{
    HttpAdapter, RouteRegistrar, Serve, ServeError, ServeOpts, ServerState, StateError,
};
use std::borrow::Cow;
use std::process::ExitCode;
use tracing::{Instrument, Span, error, info};
use utoipa::openapi::OpenApi;

#[mkt_derive::mkt_error]
pub enum PluginError {
    #[error("Server state error{}: {source}", format_context(.context))]
    State { source: StateError, context: Option<Cow<'static, str>> },

    #[error("Route registration failed{}: {message}", format_context(.context))]
    Routes { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Displayed exactly as the serve loop reported it.
    #[error("{source}{}", format_context(.context))]
    Serve { source: ServeError, context: Option<Cow<'static, str>> },
}

/// How the process ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// The serve loop returned without an error.
    Clean,
    /// Startup or the serve loop failed; the error has been logged.
    Failed,
}

impl ExitStatus {
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Clean => 0,
            Self::Failed => 1,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Clean => Self::SUCCESS,
            ExitStatus::Failed => Self::FAILURE,
        }
    }
}

/// A fluent builder for the [`Plugin`].
#[must_use = "builders do nothing unless you call .build()"]
#[derive(Debug, Default)]
pub struct PluginBuilder {
    environment: Option<PluginEnvironment>,
    config: PluginConfig,
    logger: Option<Span>,
}

impl PluginBuilder {
    pub fn environment(mut self, environment: PluginEnvironment) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn config(mut self, config: PluginConfig) -> Self {
        self.config = config;
        self
    }

    /// Span the plugin logs under; one scoped to the plugin id otherwise.
    pub fn logger(mut self, logger: Span) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Builds the server state and lets `registrar` populate the multiplexer.
    ///
    /// The registrar may register any number of routes, including none.
    ///
    /// # Errors
    /// [`PluginError::State`] without an environment, [`PluginError::Routes`]
    /// when the registrar fails.
    pub fn build<R>(self, registrar: &R) -> Result<Plugin, PluginError>
    where
        R: RouteRegistrar + ?Sized,
    {
        let mut state = ServerState::builder().config(self.config);
        if let Some(environment) = self.environment {
            state = state.environment(environment);
        }
        if let Some(logger) = self.logger {
            state = state.logger(logger);
        }
        let state = state.build().context("Building server state")?;

        let (router, api) = router::init(&state, registrar)?;
        info!(parent: &state.logger, routes = api.paths.paths.len(), "Routes registered");

        Ok(Plugin { state, router, api })
    }
}

/// A fully wired plugin ready to serve.
#[must_use = "call .serve(host).await to start serving"]
#[derive(Debug)]
pub struct Plugin {
    state: ServerState,
    router: Router,
    api: OpenApi,
}

impl Plugin {
    pub fn builder() -> PluginBuilder {
        PluginBuilder::default()
    }

    #[must_use]
    pub const fn state(&self) -> &ServerState {
        &self.state
    }

    /// The populated multiplexer.
    #[must_use]
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    #[must_use]
    pub const fn openapi(&self) -> &OpenApi {
        &self.api
    }

    /// Wraps the multiplexer in the resource adapter and blocks on `host`.
    ///
    /// # Errors
    /// [`PluginError::Serve`] with the serve loop's error, unchanged.
    pub async fn serve<S>(self, host: &S) -> Result<(), PluginError>
    where
        S: Serve + ?Sized,
    {
        let span = self.state.logger.clone();
        let opts = ServeOpts::new().call_resource_handler(HttpAdapter::new(self.router));

        info!(parent: &span, "Serving resource calls");
        host.serve(opts).instrument(span).await?;
        Ok(())
    }
}

/// Runs the plugin to completion.
///
/// Any failure is logged once at error level with its message verbatim and
/// turns into [`ExitStatus::Failed`]. Nothing is retried.
pub async fn run<R, S>(
    environment: PluginEnvironment,
    config: PluginConfig,
    registrar: &R,
    host: &S,
) -> ExitStatus
where
    R: RouteRegistrar + ?Sized,
    S: Serve + ?Sized,
{
    let span = tracing::info_span!("plugin", plugin_id = %environment.plugin_id());

    let plugin = match Plugin::builder()
        .environment(environment)
        .config(config)
        .logger(span.clone())
        .build(registrar)
    {
        Ok(plugin) => plugin,
        Err(e) => {
            error!(parent: &span, "{e}");
            return ExitStatus::Failed;
        },
    };

    match plugin.serve(host).await {
        Ok(()) => {
            info!(parent: &span, "Serve loop finished");
            ExitStatus::Clean
        },
        Err(e) => {
            error!(parent: &span, "{e}");
            ExitStatus::Failed
        },
    }
}
