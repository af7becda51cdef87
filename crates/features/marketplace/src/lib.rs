//! Marketplace feature: proxies the grafana.com plugin catalog and manages
//! plugins in a local plugin directory.
//!
//! [`MarketplaceRoutes`] is the route registrar the plugin binary hands to
//! its bootstrapper.

mod catalog;
mod error;
mod handlers;
mod installer;
mod models;

pub use crate::catalog::CatalogClient;
pub use crate::error::{MarketplaceError, MarketplaceErrorExt};
pub use crate::installer::Installer;
pub use crate::models::{
    InstallRequest, InstallResponse, InstalledPlugin, InstalledQuery, UninstallRequest,
    UninstallResponse,
};

use mkt_domain::config::PluginConfig;
use mkt_kernel::server::{Mux, RouteRegistrar, ServerState};
use std::sync::Arc;
use utoipa_axum::router::OpenApiRouter;

#[derive(Debug)]
struct MarketplaceInner {
    catalog: CatalogClient,
    installer: Installer,
}

/// Marketplace feature state
#[derive(Debug, Clone)]
pub struct Marketplace {
    inner: Arc<MarketplaceInner>,
}

impl Marketplace {
    /// # Errors
    /// Returns an error when the catalog client cannot be built.
    pub fn from_config(config: &PluginConfig) -> Result<Self, MarketplaceError> {
        let catalog = CatalogClient::new(&config.marketplace)?;
        let installer = Installer::new(
            config.storage.plugin_dir.clone(),
            config.marketplace.max_unpacked_bytes,
        );
        Ok(Self { inner: Arc::new(MarketplaceInner { catalog, installer }) })
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogClient {
        &self.inner.catalog
    }

    #[must_use]
    pub fn installer(&self) -> &Installer {
        &self.inner.installer
    }

    /// Marketplace routes bound to this state.
    #[must_use]
    pub fn router<S>(self) -> OpenApiRouter<S>
    where
        S: Send + Sync + Clone + 'static,
    {
        handlers::router().with_state(self)
    }
}

/// Registers the catalog and plugin directory routes.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarketplaceRoutes;

impl RouteRegistrar for MarketplaceRoutes {
    type Error = MarketplaceError;

    fn register_routes(&self, mux: Mux, state: &ServerState) -> Result<Mux, Self::Error> {
        let marketplace = Marketplace::from_config(&state.config)?;
        tracing::info!(
            parent: &state.logger,
            api_url = %state.config.marketplace.api_url,
            plugin_dir = %state.config.storage.plugin_dir.display(),
            "Marketplace routes registered"
        );
        Ok(mux.merge(marketplace.router()))
    }
}
