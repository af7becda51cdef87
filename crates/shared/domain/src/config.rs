use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Settings for the whole plugin process.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PluginConfigInner {
    pub server: ServerConfig,
    pub marketplace: MarketplaceConfig,
    pub storage: StorageConfig,
    pub log: LogConfig,
}

/// Arc-wrapped config, cheap to clone into request state.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct PluginConfig {
    #[serde(flatten, default)]
    inner: Arc<PluginConfigInner>,
}

impl Deref for PluginConfig {
    type Target = PluginConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for PluginConfig {
    fn deref_mut(&mut self) -> &mut PluginConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// Listener of the standalone resource transport.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,
    pub ssl: Option<SslConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SslConfig {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Upstream plugin catalog and download limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketplaceConfig {
    pub api_url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub max_archive_bytes: u64,
    /// Cap on the total decompressed size of an archive's entries.
    pub max_unpacked_bytes: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Used when a request does not name a plugin directory.
    pub plugin_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
    pub path: Option<PathBuf>,
}

// --- Default ---

impl Default for ServerConfig {
    fn default() -> Self {
        Self { address: IpAddr::V4(Ipv4Addr::LOCALHOST), port: 3838, ssl: None }
    }
}

impl Default for SslConfig {
    fn default() -> Self {
        Self { cert: PathBuf::from("cert.pem"), key: PathBuf::from("key.pem") }
    }
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            api_url: "https://grafana.com/api".to_owned(),
            user_agent: concat!("grafana-marketplace-app/", env!("CARGO_PKG_VERSION")).to_owned(),
            request_timeout_secs: 30,
            max_archive_bytes: 100 * 1024 * 1024,
            max_unpacked_bytes: 512 * 1024 * 1024,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { plugin_dir: PathBuf::from("/var/lib/grafana/plugins") }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_owned(), json: false, path: None }
    }
}
