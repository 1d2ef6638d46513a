use crate::config::{CrawlerConfig, FetchStrategyKind};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

#[cfg(feature = "browser")]
pub mod browser;
pub mod http;

#[cfg(feature = "browser")]
pub use browser::RenderedFetcher;
pub use http::StaticFetcher;

/// What a strategy hands back for one URL.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub html: String,
    /// Absolute links enumerated by the strategy itself, or `None` to
    /// defer discovery to the extractor.
    pub links: Option<Vec<Url>>,
    pub status_code: u16,
    pub content_type: Option<String>,
}

/// Capability interface the crawl engine depends on.
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Acquire long-lived resources. Called once before a session's first fetch.
    async fn open(&self) -> Result<()> {
        Ok(())
    }

    async fn fetch(&self, url: &Url) -> Result<FetchedPage>;

    /// Release whatever `open` acquired. Must be safe to call more than once.
    async fn close(&self) -> Result<()> {
        Ok(())
    }

    /// Whether pages come from an executed, rendered DOM.
    fn rendered(&self) -> bool {
        false
    }
}

/// Resolve the configured strategy once for a session.
pub fn build_strategy(config: &CrawlerConfig) -> Result<Arc<dyn FetchStrategy>> {
    match config.strategy {
        FetchStrategyKind::Static => Ok(Arc::new(StaticFetcher::new(config)?)),
        #[cfg(feature = "browser")]
        FetchStrategyKind::Rendered => Ok(Arc::new(RenderedFetcher::new(config))),
        #[cfg(not(feature = "browser"))]
        FetchStrategyKind::Rendered => Err(crate::error::ScanError::UnsupportedStrategy(
            "rendered fetching requires the `browser` feature".to_string(),
        )),
    }
}
