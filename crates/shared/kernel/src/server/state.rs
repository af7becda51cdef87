use crate::environment::PluginEnvironment;
use axum::extract::FromRef;
use mkt_domain::config::PluginConfig;
use std::borrow::Cow;
use std::ops::Deref;
use std::sync::Arc;
use tracing::Span;

#[mkt_derive::mkt_error]
pub enum StateError {
    #[error("State validation error{}: {message}", format_context(.context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

#[derive(Debug)]
pub struct ServerStateInner {
    pub environment: PluginEnvironment,
    pub config: PluginConfig,
    /// Span every plugin-level event is recorded under.
    pub logger: Span,
}

/// Shared state handed to route registrars and extractors.
#[derive(Debug, Clone)]
pub struct ServerState {
    inner: Arc<ServerStateInner>,
}

impl ServerState {
    #[must_use]
    pub fn builder() -> ServerStateBuilder {
        ServerStateBuilder::default()
    }

    #[must_use]
    pub fn plugin_id(&self) -> &str {
        self.inner.environment.plugin_id()
    }
}

impl Deref for ServerState {
    type Target = ServerStateInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl FromRef<ServerState> for PluginConfig {
    fn from_ref(state: &ServerState) -> Self {
        state.inner.config.clone()
    }
}

impl FromRef<ServerState> for PluginEnvironment {
    fn from_ref(state: &ServerState) -> Self {
        state.inner.environment.clone()
    }
}

#[derive(Debug, Default)]
pub struct ServerStateBuilder {
    environment: Option<PluginEnvironment>,
    config: Option<PluginConfig>,
    logger: Option<Span>,
}

impl ServerStateBuilder {
    #[must_use]
    pub fn environment(mut self, environment: PluginEnvironment) -> Self {
        self.environment = Some(environment);
        self
    }

    #[must_use]
    pub fn config(mut self, config: PluginConfig) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn logger(mut self, logger: Span) -> Self {
        self.logger = Some(logger);
        self
    }

    /// # Errors
    /// Returns [`StateError::Validation`] when no environment was provided.
    pub fn build(self) -> Result<ServerState, StateError> {
        let environment = self.environment.ok_or_else(|| StateError::Validation {
            message: "PluginEnvironment not provided".into(),
            context: None,
        })?;
        let config = self.config.unwrap_or_default();
        let logger = self.logger.unwrap_or_else(|| {
            tracing::info_span!("plugin", plugin_id = %environment.plugin_id())
        });

        Ok(ServerState { inner: Arc::new(ServerStateInner { environment, config, logger }) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn environment() -> PluginEnvironment {
        PluginEnvironment::from_vars("grafana-marketplace-app", Vec::<(String, String)>::new())
            .unwrap()
    }

    #[test]
    fn environment_is_required() {
        let err = ServerState::builder().build().expect_err("environment is required");
        assert!(err.to_string().contains("PluginEnvironment"));
    }

    #[test]
    fn config_defaults_and_extractors() {
        let state = ServerState::builder().environment(environment()).build().unwrap();
        assert_eq!(state.plugin_id(), "grafana-marketplace-app");

        let config = PluginConfig::from_ref(&state);
        assert_eq!(config.server.port, 3838);
        assert_eq!(PluginEnvironment::from_ref(&state), environment());
    }
}
