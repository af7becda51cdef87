use mkt_domain::config::{MarketplaceConfig, PluginConfig, ServerConfig, StorageConfig};
use serde_json::json;
use std::path::PathBuf;

#[test]
fn config_defaults_are_sane() {
    let server = ServerConfig::default();
    assert_eq!(server.port, 3838);
    assert!(server.address.is_loopback());
    assert!(server.ssl.is_none());

    let marketplace = MarketplaceConfig::default();
    assert_eq!(marketplace.api_url, "https://grafana.com/api");
    assert!(marketplace.user_agent.starts_with("grafana-marketplace-app/"));
    assert_eq!(marketplace.max_archive_bytes, 100 * 1024 * 1024);
    assert_eq!(marketplace.max_unpacked_bytes, 512 * 1024 * 1024);

    let storage = StorageConfig::default();
    assert_eq!(storage.plugin_dir, PathBuf::from("/var/lib/grafana/plugins"));
}

#[test]
fn plugin_config_deserializes_partial_sections() {
    let raw = json!({
        "server": { "address": "0.0.0.0", "port": 8080 },
        "marketplace": { "api_url": "http://localhost:9000/api" },
        "storage": { "plugin_dir": "/tmp/plugins" },
        "log": { "json": true }
    });

    let cfg: PluginConfig = serde_json::from_value(raw).expect("config deserialize");
    assert_eq!(cfg.server.port, 8080);
    assert_eq!(cfg.marketplace.api_url, "http://localhost:9000/api");
    assert_eq!(cfg.marketplace.request_timeout_secs, 30);
    assert_eq!(cfg.storage.plugin_dir, PathBuf::from("/tmp/plugins"));
    assert!(cfg.log.json);
    assert_eq!(cfg.log.level, "info");
}

#[test]
fn cloned_config_is_copy_on_write() {
    let original = PluginConfig::default();
    let mut changed = original.clone();
    changed.server.port = 4000;

    assert_eq!(original.server.port, 3838);
    assert_eq!(changed.server.port, 4000);
}
