//! HTTP page fetcher.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use waypoint_core::{Error, PageFetcher, Result};

const USER_AGENT: &str = concat!("waypoint/", env!("CARGO_PKG_VERSION"));

/// [`PageFetcher`] backed by `reqwest`.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        debug!(
            subsystem = "actions",
            component = "fetch",
            url,
            status = status.as_u16(),
            "Fetched page"
        );
        if !status.is_success() {
            return Err(Error::Request(format!("GET {} returned {}", url, status)));
        }
        Ok(response.text().await?)
    }
}
