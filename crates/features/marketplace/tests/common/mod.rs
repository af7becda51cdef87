#![allow(dead_code)]

use axum::Router;
use flate2::Compression;
use flate2::write::DeflateEncoder;
use mkt_domain::config::PluginConfig;
use mkt_domain::constants::PLUGIN_ID;
use mkt_kernel::environment::PluginEnvironment;
use mkt_kernel::server::{Mux, RouteRegistrar, ServerState};
use mkt_marketplace::MarketplaceRoutes;
use std::io::Write;
use std::path::Path;

const STORE: u16 = 0;
const DEFLATE: u16 = 8;

/// Minimal zip writer for archive fixtures.
#[derive(Default)]
pub struct ZipBuilder {
    local: Vec<u8>,
    central: Vec<u8>,
    count: u16,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dir(self, name: &str) -> Self {
        self.entry(name, STORE, b"", b"", 0)
    }

    pub fn file(self, name: &str, contents: &[u8]) -> Self {
        let len = u32::try_from(contents.len()).unwrap();
        self.entry(name, STORE, contents, contents, len)
    }

    pub fn deflated(self, name: &str, contents: &[u8]) -> Self {
        let len = u32::try_from(contents.len()).unwrap();
        self.deflated_claiming(name, contents, len)
    }

    /// Deflated entry whose headers declare `declared` uncompressed bytes.
    pub fn deflated_claiming(self, name: &str, contents: &[u8], declared: u32) -> Self {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(contents).unwrap();
        let compressed = encoder.finish().unwrap();
        self.entry(name, DEFLATE, contents, &compressed, declared)
    }

    /// Entry with an arbitrary compression method id and stored bytes.
    pub fn raw(self, name: &str, method: u16, contents: &[u8]) -> Self {
        let len = u32::try_from(contents.len()).unwrap();
        self.entry(name, method, contents, contents, len)
    }

    fn entry(mut self, name: &str, method: u16, plain: &[u8], stored: &[u8], plain_len: u32) -> Self {
        let mut crc = flate2::Crc::new();
        crc.update(plain);
        let crc = crc.sum();
        let offset = u32::try_from(self.local.len()).unwrap();
        let name_len = u16::try_from(name.len()).unwrap();
        let stored_len = u32::try_from(stored.len()).unwrap();

        let local = &mut self.local;
        local.extend_from_slice(&0x0403_4b50_u32.to_le_bytes());
        local.extend_from_slice(&20_u16.to_le_bytes());
        local.extend_from_slice(&0_u16.to_le_bytes());
        local.extend_from_slice(&method.to_le_bytes());
        local.extend_from_slice(&[0; 4]);
        local.extend_from_slice(&crc.to_le_bytes());
        local.extend_from_slice(&stored_len.to_le_bytes());
        local.extend_from_slice(&plain_len.to_le_bytes());
        local.extend_from_slice(&name_len.to_le_bytes());
        local.extend_from_slice(&0_u16.to_le_bytes());
        local.extend_from_slice(name.as_bytes());
        local.extend_from_slice(stored);

        let external: u32 = if name.ends_with('/') { 0x10 } else { 0 };
        let central = &mut self.central;
        central.extend_from_slice(&0x0201_4b50_u32.to_le_bytes());
        central.extend_from_slice(&20_u16.to_le_bytes());
        central.extend_from_slice(&20_u16.to_le_bytes());
        central.extend_from_slice(&0_u16.to_le_bytes());
        central.extend_from_slice(&method.to_le_bytes());
        central.extend_from_slice(&[0; 4]);
        central.extend_from_slice(&crc.to_le_bytes());
        central.extend_from_slice(&stored_len.to_le_bytes());
        central.extend_from_slice(&plain_len.to_le_bytes());
        central.extend_from_slice(&name_len.to_le_bytes());
        central.extend_from_slice(&[0; 8]);
        central.extend_from_slice(&external.to_le_bytes());
        central.extend_from_slice(&offset.to_le_bytes());
        central.extend_from_slice(name.as_bytes());

        self.count += 1;
        self
    }

    pub fn finish(self) -> Vec<u8> {
        let central_offset = u32::try_from(self.local.len()).unwrap();
        let central_len = u32::try_from(self.central.len()).unwrap();

        let mut out = self.local;
        out.extend_from_slice(&self.central);
        out.extend_from_slice(&0x0605_4b50_u32.to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&self.count.to_le_bytes());
        out.extend_from_slice(&self.count.to_le_bytes());
        out.extend_from_slice(&central_len.to_le_bytes());
        out.extend_from_slice(&central_offset.to_le_bytes());
        out.extend_from_slice(&0_u16.to_le_bytes());
        out
    }
}

/// A plugin archive shaped like the ones grafana.com serves.
pub fn plugin_archive(id: &str, version: &str) -> Vec<u8> {
    let manifest = format!(
        r#"{{"id":"{id}","type":"panel","name":"Clock","info":{{"version":"{version}"}}}}"#
    );
    ZipBuilder::new()
        .dir(&format!("{id}/"))
        .file(&format!("{id}/plugin.json"), manifest.as_bytes())
        .deflated(&format!("{id}/module.js"), "define([], function () {});\n".repeat(50).as_bytes())
        .finish()
}

/// Writes a `plugin.json` under `{dir}/{folder}/{sub}`.
pub fn write_manifest(dir: &Path, folder: &str, sub: &str, json: &str) {
    let target = dir.join(folder).join(sub);
    std::fs::create_dir_all(&target).unwrap();
    std::fs::write(target.join("plugin.json"), json).unwrap();
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn_upstream(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{address}")
}

/// The marketplace routes mounted on a fresh multiplexer.
pub fn marketplace_router(configure: impl FnOnce(&mut PluginConfig)) -> Router {
    let environment =
        PluginEnvironment::from_vars(PLUGIN_ID, Vec::<(String, String)>::new()).unwrap();
    let mut config = PluginConfig::default();
    configure(&mut config);

    let state = ServerState::builder().environment(environment).config(config).build().unwrap();
    let mux = MarketplaceRoutes.register_routes(Mux::new(), &state).unwrap();
    let (router, _api) = mux.with_state(state).split_for_parts();
    router
}
