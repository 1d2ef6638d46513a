use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{info, warn};
use trawl_scanner::{CrawlFailure, Crawler, CrawlerConfig, PageRecord, ScanError};
use url::Url;

/// Options for a crawl over one or more seed URLs
pub struct CrawlOptions {
    pub urls: Vec<String>,
    pub max_pages: usize,
    pub max_depth: usize,
    pub config: CrawlerConfig,
    pub show_progress_bars: bool,
}

/// Callback for reporting orchestration messages (one line each)
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// A seed that produced no session at all.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedSeed {
    pub url: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct CrawlSummary {
    /// Records of every seed, in seed order
    pub pages: Vec<PageRecord>,
    pub failures: Vec<CrawlFailure>,
    pub rejected_seeds: Vec<RejectedSeed>,
}

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Crawl every seed in `options.urls` with one engine.
///
/// Only a configuration the engine cannot run with is an error. A seed that
/// fails is reported through `progress_callback` and the next seed is crawled.
pub async fn execute_crawl(
    options: CrawlOptions,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<CrawlSummary, ScanError> {
    let crawler = Crawler::new(options.config.clone())?;
    Ok(execute_crawl_with(crawler, options, progress_callback).await)
}

/// Same as [`execute_crawl`] with a caller-built engine.
pub async fn execute_crawl_with(
    crawler: Crawler,
    options: CrawlOptions,
    progress_callback: Option<CrawlProgressCallback>,
) -> CrawlSummary {
    let CrawlOptions {
        urls,
        max_pages,
        max_depth,
        show_progress_bars,
        ..
    } = options;

    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Starting crawl...");
        Some(pb)
    } else {
        None
    };

    let dispatched = Arc::new(AtomicUsize::new(0));
    let crawler = {
        let pb = progress_bar.clone();
        let dispatched = dispatched.clone();
        crawler.with_progress_callback(Arc::new(move |depth: usize, url: String| {
            let count = dispatched.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(ref pb) = pb {
                pb.set_message(format!(
                    "Crawling... {} pages dispatched (depth {}) {}",
                    count,
                    depth,
                    extract_url_path(&url)
                ));
            }
        }))
    };

    let mut summary = CrawlSummary::default();
    for (idx, url) in urls.iter().enumerate() {
        if let Some(ref callback) = progress_callback
            && urls.len() > 1
        {
            callback(format!("Crawling host {}/{}: {}", idx + 1, urls.len(), url));
        }

        crawler.reset();
        match crawler.crawl_session(url, max_pages, max_depth).await {
            Ok(outcome) => {
                info!("{}: {} pages", url, outcome.pages.len());
                summary.pages.extend(outcome.pages);
                summary.failures.extend(outcome.failures);
            }
            Err(e) => {
                warn!("Failed to crawl {}: {}", url, e);
                if let Some(ref callback) = progress_callback {
                    callback(format!("[!] Failed to crawl {}: {}", url, e));
                }
                summary.rejected_seeds.push(RejectedSeed {
                    url: url.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if let Some(ref pb) = progress_bar {
        pb.finish_with_message(format!(
            "Crawl complete! {} pages from {} dispatched",
            summary.pages.len(),
            dispatched.load(Ordering::Relaxed)
        ));
    }

    summary
}
