use config::{Config, Environment, File, Map};
use mkt_domain::constants::CONFIG_ENV_PREFIX;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::info;

#[mkt_derive::mkt_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Loads configuration from an optional file overlaid with environment overrides.
///
/// 1. **File**: `path` (default `marketplace`), resolved with any supported
///    extension (`.toml`, `.yaml`, `.json`, ...). The host starts plugins
///    without a working-directory config, so a missing file is not an error.
/// 2. **Environment**: variables prefixed with `MKT__`, nested with double
///    underscores (`MKT__STORAGE__PLUGIN_DIR` maps to `storage.plugin_dir`).
///
/// # Errors
/// Returns an error when a source is malformed or does not deserialize into `T`.
///
/// # Example
/// ```rust
/// use mkt_kernel::config::load_config;
/// use mkt_kernel::domain::config::PluginConfig;
///
/// let cfg: PluginConfig = load_config(Some("does/not/exist")).unwrap();
/// assert_eq!(cfg.server.port, 3838);
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    build(path, None)
}

/// Same as [`load_config`], with the environment layer read from `vars`
/// instead of the process environment.
///
/// # Errors
/// See [`load_config`].
pub fn load_config_with_vars<T, I, K, V>(
    path: Option<impl AsRef<Path>>,
    vars: I,
) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let vars: Map<String, String> = vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
    build(path, Some(vars))
}

fn build<T>(path: Option<impl AsRef<Path>>, vars: Option<Map<String, String>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let effective_path = path.map_or_else(
        || PathBuf::from(mkt_domain::constants::CONFIG_FILE_NAME),
        |p| p.as_ref().to_path_buf(),
    );

    info!("Loading config from {}", effective_path.display());

    Config::builder()
        .add_source(File::from(effective_path.as_path()).required(false))
        .add_source(
            Environment::with_prefix(CONFIG_ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .convert_case(config::Case::Snake)
                .try_parsing(true)
                .source(vars),
        )
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")
}
