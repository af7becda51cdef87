//! One-time plugin environment setup.
//!
//! The host launches each backend plugin with a handful of `GF_*` variables.
//! [`setup_plugin_environment`] validates the plugin identifier, reads those
//! variables once and returns an immutable [`PluginEnvironment`] that the
//! entry point threads to everything that needs it.

use config::{Config, Environment, Map};
use mkt_domain::constants::HOST_ENV_PREFIX;
use serde::Deserialize;
use std::borrow::Cow;
use tracing::debug;

#[mkt_derive::mkt_error]
pub enum EnvironmentError {
    #[error("Invalid plugin identifier{}: {message}", format_context(.context))]
    InvalidPluginId { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Host environment error{}: {source}", format_context(.context))]
    Host { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Variables the host exports to plugin processes (`GF_VERSION`, `GF_APP_URL`).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HostVars {
    version: Option<String>,
    app_url: Option<String>,
}

/// Immutable result of the environment setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginEnvironment {
    plugin_id: String,
    grafana_version: Option<String>,
    app_url: Option<String>,
}

impl PluginEnvironment {
    /// Builds the environment from an explicit variable set instead of the
    /// process environment.
    ///
    /// # Errors
    /// Same as [`setup_plugin_environment`].
    pub fn from_vars<I, K, V>(plugin_id: &str, vars: I) -> Result<Self, EnvironmentError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: Map<String, String> =
            vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        resolve(plugin_id, Some(vars))
    }

    #[must_use]
    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    #[must_use]
    pub fn grafana_version(&self) -> Option<&str> {
        self.grafana_version.as_deref()
    }

    #[must_use]
    pub fn app_url(&self) -> Option<&str> {
        self.app_url.as_deref()
    }
}

/// Performs the process-wide setup for `plugin_id`.
///
/// Call it once from the entry point, before anything is served.
///
/// # Errors
/// Returns [`EnvironmentError::InvalidPluginId`] when the identifier is blank
/// or contains characters other than lowercase ASCII letters, digits and `-`,
/// and [`EnvironmentError::Host`] when the host variables cannot be read.
pub fn setup_plugin_environment(plugin_id: &str) -> Result<PluginEnvironment, EnvironmentError> {
    resolve(plugin_id, None)
}

fn resolve(
    plugin_id: &str,
    vars: Option<Map<String, String>>,
) -> Result<PluginEnvironment, EnvironmentError> {
    validate_plugin_id(plugin_id)?;

    let host: HostVars = Config::builder()
        .add_source(
            Environment::with_prefix(HOST_ENV_PREFIX)
                .convert_case(config::Case::Snake)
                .source(vars),
        )
        .build()
        .context("Reading host variables")?
        .try_deserialize()
        .context("Decoding host variables")?;

    debug!(
        plugin_id,
        grafana_version = host.version.as_deref().unwrap_or("unknown"),
        "Plugin environment ready"
    );

    Ok(PluginEnvironment {
        plugin_id: plugin_id.to_owned(),
        grafana_version: host.version.filter(|v| !v.is_empty()),
        app_url: host.app_url.filter(|v| !v.is_empty()),
    })
}

fn validate_plugin_id(plugin_id: &str) -> Result<(), EnvironmentError> {
    if plugin_id.trim().is_empty() {
        return Err(EnvironmentError::InvalidPluginId {
            message: "identifier is empty".into(),
            context: None,
        });
    }
    if let Some(bad) =
        plugin_id.chars().find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
    {
        return Err(EnvironmentError::InvalidPluginId {
            message: format!("unexpected character {bad:?} in {plugin_id:?}").into(),
            context: None,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mkt_domain::constants::PLUGIN_ID;

    #[test]
    fn reads_host_variables() {
        let env = PluginEnvironment::from_vars(
            PLUGIN_ID,
            [
                ("GF_VERSION", "11.2.0"),
                ("GF_APP_URL", "http://localhost:3000/"),
                ("GF_PLUGIN_APP_CLIENT_SECRET", "ignored"),
            ],
        )
        .expect("environment");

        assert_eq!(env.plugin_id(), PLUGIN_ID);
        assert_eq!(env.grafana_version(), Some("11.2.0"));
        assert_eq!(env.app_url(), Some("http://localhost:3000/"));
    }

    #[test]
    fn missing_variables_are_absent() {
        let env = PluginEnvironment::from_vars(PLUGIN_ID, Vec::<(String, String)>::new())
            .expect("environment");
        assert_eq!(env.grafana_version(), None);
        assert_eq!(env.app_url(), None);
    }

    #[test]
    fn identifier_is_kept_verbatim_across_setups() {
        let first = PluginEnvironment::from_vars(PLUGIN_ID, [("GF_VERSION", "10.4.0")]).unwrap();
        let second = PluginEnvironment::from_vars(PLUGIN_ID, [("GF_VERSION", "11.0.0")]).unwrap();
        assert_eq!(first.plugin_id(), "grafana-marketplace-app");
        assert_eq!(first.plugin_id(), second.plugin_id());
    }

    #[test]
    fn rejects_bad_identifiers() {
        for id in ["", "   ", "Grafana-App", "../escape", "app id"] {
            let err = PluginEnvironment::from_vars(id, Vec::<(String, String)>::new())
                .expect_err("identifier must be rejected");
            assert!(matches!(err, EnvironmentError::InvalidPluginId { .. }), "{id:?}: {err}");
        }
    }
}
