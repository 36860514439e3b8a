//! Content-addressed document fetch over an IPFS HTTP gateway.

use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::config::GatewayConfig;
use crate::error::{AxonError, Result};

const IPFS_SCHEME: &str = "ipfs://";

/// Fetches JSON documents by locator (`ipfs://<cid>`, bare CID or http(s) URL).
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch_json(&self, locator: &str) -> Result<Value>;
}

#[derive(Clone)]
pub struct IpfsGateway {
    client: Client,
    base_url: String,
}

impl IpfsGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        Url::parse(&base_url)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AxonError::Gateway(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Map a metadata locator to the URL actually requested.
    pub fn resolve_uri(&self, locator: &str) -> Result<Url> {
        let locator = locator.trim();

        if let Some(rest) = locator.strip_prefix(IPFS_SCHEME) {
            let path = rest.trim_start_matches('/');
            let path = path.strip_prefix("ipfs/").unwrap_or(path);
            return self.gateway_url(path, locator);
        }

        if locator.starts_with("http://") || locator.starts_with("https://") {
            return Ok(Url::parse(locator)?);
        }

        if locator.contains("://") {
            return Err(AxonError::Validation(format!(
                "Unsupported metadata URI scheme: {locator}"
            )));
        }

        self.gateway_url(locator.trim_start_matches('/'), locator)
    }

    fn gateway_url(&self, path: &str, original: &str) -> Result<Url> {
        let cid = path.split('/').next().unwrap_or_default();
        if cid.is_empty() || !cid.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AxonError::Validation(format!(
                "Metadata URI has no valid content identifier: {original}"
            )));
        }

        Ok(Url::parse(&format!("{}/ipfs/{}", self.base_url, path))?)
    }
}

#[async_trait]
impl MetadataFetcher for IpfsGateway {
    async fn fetch_json(&self, locator: &str) -> Result<Value> {
        let url = self.resolve_uri(locator)?;
        tracing::debug!(url = %url, "Fetching persona metadata document");

        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AxonError::Timeout(format!("Content gateway request to {url} timed out"))
                } else {
                    AxonError::Gateway(format!("Content gateway unreachable: {e}"))
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok());
            tracing::warn!(url = %url, retry_after = ?retry_after, "Content gateway rate limited");
            return Err(AxonError::ApiRateLimit { retry_after });
        }

        if !status.is_success() {
            tracing::warn!(url = %url, status = %status, "Content gateway returned an error status");
            return Err(AxonError::Gateway(format!(
                "Content gateway returned {status} for {url}"
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                AxonError::Timeout(format!("Reading metadata from {url} timed out"))
            } else {
                AxonError::Gateway(format!("Failed to read metadata body: {e}"))
            }
        })?;

        serde_json::from_slice(&body)
            .map_err(|e| AxonError::Gateway(format!("Metadata document is not valid JSON: {e}")))
    }
}
