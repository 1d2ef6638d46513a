use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = concat!("trawl/", env!("CARGO_PKG_VERSION"));

/// Which fetch strategy a session uses. Resolved once per crawl, never per page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStrategyKind {
    #[default]
    Static,
    Rendered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlMode {
    /// Batched dispatch bounded by `max_concurrent_requests`
    #[default]
    Concurrent,
    /// One page at a time, no batching
    Sequential,
}

/// How the rendered strategy decides a page has finished loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitPolicy {
    #[default]
    NetworkIdle,
    Selector,
    Delay,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub wait: WaitPolicy,
    /// Used when `wait` is `selector`
    pub wait_selector: String,
    /// Fixed delay after the wait policy is satisfied (and the whole wait for `delay`)
    pub settle_ms: u64,
    pub timeout_secs: u64,
    pub executable_path: Option<String>,
    pub headless: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            wait: WaitPolicy::NetworkIdle,
            wait_selector: "body".to_string(),
            settle_ms: 0,
            timeout_secs: 30,
            executable_path: None,
            headless: true,
        }
    }
}

impl BrowserConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Options consumed by the crawl engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    pub user_agent: String,
    pub request_timeout_secs: u64,
    /// Pause after every fetch, inside the concurrency permit
    pub crawl_delay_ms: u64,
    pub max_concurrent_requests: usize,
    pub batch_size: usize,
    pub stay_in_domain: bool,
    pub skip_extensions: Vec<String>,
    pub ignore_patterns: Vec<String>,
    pub strategy: FetchStrategyKind,
    pub mode: CrawlMode,
    pub save_html: bool,
    pub browser: BrowserConfig,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 10,
            crawl_delay_ms: 1000,
            max_concurrent_requests: 5,
            batch_size: 5,
            stay_in_domain: true,
            skip_extensions: [".pdf", ".jpg", ".png", ".gif", ".zip", ".exe"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ignore_patterns: ["login", "signup", "cart", "checkout", "account"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            strategy: FetchStrategyKind::Static,
            mode: CrawlMode::Concurrent,
            save_html: false,
            browser: BrowserConfig::default(),
        }
    }
}

impl CrawlerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn crawl_delay(&self) -> Duration {
        Duration::from_millis(self.crawl_delay_ms)
    }

    pub fn with_mode(mut self, mode: CrawlMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_strategy(mut self, strategy: FetchStrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_crawl_delay_ms(mut self, delay_ms: u64) -> Self {
        self.crawl_delay_ms = delay_ms;
        self
    }

    pub fn with_concurrency(mut self, max_concurrent_requests: usize, batch_size: usize) -> Self {
        self.max_concurrent_requests = max_concurrent_requests;
        self.batch_size = batch_size;
        self
    }

    pub fn with_stay_in_domain(mut self, stay_in_domain: bool) -> Self {
        self.stay_in_domain = stay_in_domain;
        self
    }

    pub fn with_save_html(mut self, save_html: bool) -> Self {
        self.save_html = save_html;
        self
    }
}
