//! Pass-through client for the grafana.com plugin catalog.

use crate::error::{MarketplaceError, MarketplaceErrorExt};
use axum::body::Bytes;
use mkt_domain::config::MarketplaceConfig;
use mkt_kernel::security::PathGuard;
use reqwest::{Client, Response, Url};
use std::time::Duration;
use tracing::debug;

/// Longest upstream error body echoed back to the caller.
const ERROR_BODY_LIMIT: usize = 512;

#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: Client,
    api_url: String,
    max_archive_bytes: u64,
}

impl CatalogClient {
    /// # Errors
    /// Returns [`MarketplaceError::Http`] when the HTTP client cannot be built
    /// (for example no TLS backend is available).
    pub fn new(config: &MarketplaceConfig) -> Result<Self, MarketplaceError> {
        let http = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Building catalog client")?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            max_archive_bytes: config.max_archive_bytes,
        })
    }

    /// `GET {api_url}/plugins`, forwarding the caller's query string.
    ///
    /// # Errors
    /// Upstream failures as [`MarketplaceError::Upstream`] or [`MarketplaceError::Http`].
    pub async fn plugins(&self, query: Option<&str>) -> Result<Bytes, MarketplaceError> {
        let url = match query.filter(|q| !q.is_empty()) {
            Some(query) => format!("{}/plugins?{query}", self.api_url),
            None => format!("{}/plugins", self.api_url),
        };
        self.fetch(&url).await
    }

    /// `GET {api_url}/plugins/{slug}`.
    ///
    /// # Errors
    /// [`MarketplaceError::Path`] for unsafe slugs, upstream failures otherwise.
    pub async fn plugin(&self, slug: &str) -> Result<Bytes, MarketplaceError> {
        let slug = PathGuard::segment(slug)?;
        self.fetch(&format!("{}/plugins/{slug}", self.api_url)).await
    }

    /// `GET {api_url}/plugins/{slug}/versions`.
    ///
    /// # Errors
    /// [`MarketplaceError::Path`] for unsafe slugs, upstream failures otherwise.
    pub async fn versions(&self, slug: &str) -> Result<Bytes, MarketplaceError> {
        let slug = PathGuard::segment(slug)?;
        self.fetch(&format!("{}/plugins/{slug}/versions", self.api_url)).await
    }

    /// Downloads a plugin archive, refusing anything larger than the
    /// configured cap.
    ///
    /// # Errors
    /// [`MarketplaceError::Validation`] for non-HTTP URLs and oversized
    /// archives, upstream failures otherwise.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, MarketplaceError> {
        let url = Url::parse(url)
            .map_err(|e| MarketplaceError::validation(format!("download URL {url:?}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(MarketplaceError::validation(format!(
                "download URL scheme {:?} is not supported",
                url.scheme()
            )));
        }

        debug!(%url, "Downloading plugin archive");
        let mut response =
            check_status(self.http.get(url).send().await.context("Downloading plugin archive")?)
                .await?;

        let limit = self.max_archive_bytes;
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(too_large(limit));
        }

        let cap = usize::try_from(limit).unwrap_or(usize::MAX);
        let mut archive = Vec::new();
        while let Some(chunk) = response.chunk().await.context("Reading plugin archive")? {
            if archive.len().saturating_add(chunk.len()) > cap {
                return Err(too_large(limit));
            }
            archive.extend_from_slice(&chunk);
        }
        Ok(archive)
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, MarketplaceError> {
        debug!(url, "Querying plugin catalog");
        let response = self.http.get(url).send().await.context("Querying plugin catalog")?;
        check_status(response).await?.bytes().await.context("Reading catalog response")
    }
}

async fn check_status(response: Response) -> Result<Response, MarketplaceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let mut message = match response.text().await {
        Ok(text) => text,
        Err(e) => {
            debug!(%url, "Upstream error body unreadable: {e}");
            String::new()
        },
    };
    if message.len() > ERROR_BODY_LIMIT {
        let mut end = ERROR_BODY_LIMIT;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        message.truncate(end);
    }
    if message.trim().is_empty() {
        message = status.canonical_reason().unwrap_or("no response body").to_owned();
    }

    Err(MarketplaceError::Upstream {
        status: status.as_u16(),
        message: message.into(),
        context: Some(url.into()),
    })
}

fn too_large(limit: u64) -> MarketplaceError {
    MarketplaceError::validation(format!("plugin archive exceeds {limit} bytes"))
}
