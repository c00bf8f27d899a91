use super::{
    FetchError, FrameFetcher, FrameRequest, Method, OVERLAY_HEADER, REQUESTED_WITH_HEADER,
    REQUESTED_WITH_VALUE,
};
use crate::config::ShellSettings;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;

/// Frame fetcher backed by a pooled reqwest client
pub struct HttpFetcher {
    base_url: Url,
    http_client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(settings: &ShellSettings) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;

        Self::with_custom_client(&settings.base_url, http_client)
    }

    /// Create a fetcher around an existing client
    pub fn with_custom_client(base_url: &str, http_client: reqwest::Client) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url).with_context(|| format!("Invalid base URL: {}", base_url))?;
        Ok(Self { base_url, http_client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a shell path (`/posts/?page=2`) against the base URL
    pub fn url_for(&self, path: &str) -> Result<Url, FetchError> {
        self.base_url
            .join(path)
            .map_err(|e| FetchError::network(format!("invalid path {:?}: {}", path, e)))
    }
}

#[async_trait]
impl FrameFetcher for HttpFetcher {
    async fn fetch(&self, request: FrameRequest) -> Result<Value, FetchError> {
        let url = self.url_for(&request.path)?;
        log::debug!("Fetching {} (overlay: {})", url, request.overlay);

        let mut builder = match &request.method {
            Method::Get => self.http_client.get(url.clone()),
            Method::Post(fields) => self.http_client.post(url.clone()).form(fields),
        };
        builder = builder
            .header(REQUESTED_WITH_HEADER, REQUESTED_WITH_VALUE)
            .header(reqwest::header::ACCEPT, "application/json");
        if request.overlay {
            builder = builder.header(OVERLAY_HEADER, "true");
        }

        let response = builder.send().await.map_err(|e| {
            let error = FetchError::from_reqwest_error(&e);
            log::warn!("Request to {} failed: {}", url, error);
            error
        })?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("Request to {} returned {}", url, status);
            return Err(FetchError::from_status_code(status.as_u16()));
        }

        response.json::<Value>().await.map_err(|e| {
            log::warn!("Unreadable response body from {}: {}", url, e);
            FetchError::server(Some(status.as_u16()), format!("invalid response body: {}", e))
        })
    }
}
