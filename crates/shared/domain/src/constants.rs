/// Identifier the host uses to match this process with its plugin manifest.
pub const PLUGIN_ID: &str = "grafana-marketplace-app";

/// Base name of the optional configuration file (`marketplace.toml`, `.yaml`, ...).
pub const CONFIG_FILE_NAME: &str = "marketplace";

/// Prefix for configuration overrides (`MKT__SERVER__PORT=4000`).
pub const CONFIG_ENV_PREFIX: &str = "MKT";

/// Prefix of the variables the host exports to plugin processes.
pub const HOST_ENV_PREFIX: &str = "GF";

/// Manifest file every installed plugin ships.
pub const PLUGIN_MANIFEST: &str = "plugin.json";

pub const SYSTEM_TAG: &str = "System";
pub const MARKETPLACE_TAG: &str = "Marketplace";
