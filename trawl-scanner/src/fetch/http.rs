use super::{FetchStrategy, FetchedPage};
use crate::config::CrawlerConfig;
use crate::error::{Result, ScanError};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// Plain HTTP GET. No script execution; link discovery is left to the extractor.
pub struct StaticFetcher {
    client: Client,
}

impl StaticFetcher {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let timeout = config.request_timeout();
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(timeout)
            .connect_timeout(timeout / 2)
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl FetchStrategy for StaticFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        debug!("Fetching {}", url);

        let start = Instant::now();
        let response = self
            .client
            .get(url.clone())
            .header(
                ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .send()
            .await
            .map_err(|e| ScanError::fetch(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::fetch(url.as_str(), format!("HTTP {}", status)));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let html = response
            .text()
            .await
            .map_err(|e| ScanError::fetch(url.as_str(), e))?;

        debug!("Fetched {} ({}) in {:?}", url, status.as_u16(), start.elapsed());

        Ok(FetchedPage {
            html,
            links: None,
            status_code: status.as_u16(),
            content_type,
        })
    }
}
