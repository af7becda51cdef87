use anyhow::Context;
use mkt_domain::constants::{CONFIG_FILE_NAME, PLUGIN_ID};
use mkt_kernel::domain::config::PluginConfig;
use mkt_kernel::prelude::*;
use mkt_logger::{ConsoleFormat, LevelFilter, Logger};
use mkt_marketplace::MarketplaceRoutes;
use std::process::ExitCode;

#[mkt_runtime::main(plugin)]
async fn main() -> anyhow::Result<ExitCode> {
    let environment = setup_plugin_environment(PLUGIN_ID)?;

    let config: PluginConfig =
        load_config(Some(CONFIG_FILE_NAME)).context("Critical: Configuration is malformed")?;

    let level: LevelFilter =
        config.log.level.parse().context("Critical: Invalid log level in configuration")?;
    let console = if config.log.json { ConsoleFormat::Json } else { ConsoleFormat::Compact };
    let builder = Logger::builder().name(PLUGIN_ID).level(level).console(Some(console));
    let _logger = match &config.log.path {
        Some(path) => builder.path(path).init()?,
        None => builder.init()?,
    };

    let host = HttpHost::new(&environment, &config.server);
    let status = mkt_plugin::run(environment, config, &MarketplaceRoutes, &host).await;
    Ok(status.into())
}
