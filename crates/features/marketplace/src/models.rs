use mkt_derive::api_model;
use serde::Deserialize;

#[api_model]
/// Download a plugin archive into a plugin directory
pub struct InstallRequest {
    /// Archive URL, usually a grafana.com `.../download` link
    pub url: String,
    /// Target plugin directory; the configured one when omitted
    #[serde(default)]
    pub plugin_dir: Option<String>,
}

#[api_model]
/// Remove an installed plugin
pub struct UninstallRequest {
    /// Plugin directory name, which is the plugin id
    pub slug: String,
    #[serde(default)]
    pub plugin_dir: Option<String>,
}

#[api_model]
/// Top-level directories created by an install
pub struct InstallResponse {
    pub installed: Vec<String>,
}

#[api_model]
/// Removed plugin
pub struct UninstallResponse {
    pub removed: String,
}

#[api_model]
#[derive(Clone, PartialEq, Eq)]
/// Plugin found in a local plugin directory
pub struct InstalledPlugin {
    pub id: String,
    /// `app`, `panel`, `datasource`, ...
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub version: String,
}

#[api_model(deny_unknown_fields = false)]
#[cfg_attr(feature = "server", derive(utoipa::IntoParams), into_params(parameter_in = Query))]
pub struct InstalledQuery {
    /// Plugin directory to scan; the configured one when omitted
    #[serde(default)]
    pub plugin_dir: Option<String>,
}

/// The subset of `plugin.json` the listing reports.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Manifest {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub info: ManifestInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ManifestInfo {
    pub version: String,
}

impl From<Manifest> for InstalledPlugin {
    fn from(manifest: Manifest) -> Self {
        Self {
            id: manifest.id,
            kind: manifest.kind,
            name: manifest.name,
            version: manifest.info.version,
        }
    }
}
