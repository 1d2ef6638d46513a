use crate::config::{CrawlMode, CrawlerConfig};
use crate::error::{Result, ScanError};
use crate::extract::ContentExtractor;
use crate::fetch::{FetchStrategy, FetchedPage, build_strategy};
use crate::frontier::{CrawlSession, FrontierEntry};
use crate::links::{self, LinkFilter};
use crate::result::{PageMetadata, PageRecord};
use chrono::Utc;
use futures::FutureExt;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::panic::{AssertUnwindSafe, resume_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;

/// Called with `(depth, url)` as each frontier entry is dispatched.
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

/// A page that was dequeued but produced no record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlFailure {
    pub url: String,
    pub depth: usize,
    pub reason: String,
}

/// Everything a session produced.
#[derive(Debug, Default)]
pub struct CrawlOutcome {
    pub pages: Vec<PageRecord>,
    pub failures: Vec<CrawlFailure>,
    /// Size of the visited set when the session ended
    pub visited: usize,
}

struct Visit {
    record: PageRecord,
    links: Vec<Url>,
}

/// Breadth-first crawl engine.
///
/// Each call to [`crawl`](Self::crawl) owns a fresh [`CrawlSession`]; no
/// frontier or visited state is shared between calls.
pub struct Crawler {
    config: CrawlerConfig,
    fetcher: Arc<dyn FetchStrategy>,
    extractor: Arc<ContentExtractor>,
    filter: LinkFilter,
    progress_callback: Option<ProgressCallback>,
    last_visited: AtomicUsize,
}

impl Crawler {
    /// Build an engine with the strategy selected by `config.strategy`.
    pub fn new(config: CrawlerConfig) -> Result<Self> {
        let fetcher = build_strategy(&config)?;
        Self::with_fetcher(config, fetcher)
    }

    /// Build an engine around an explicit fetch strategy.
    pub fn with_fetcher(mut config: CrawlerConfig, fetcher: Arc<dyn FetchStrategy>) -> Result<Self> {
        if config.max_concurrent_requests == 0 {
            warn!("max_concurrent_requests of 0 clamped to 1");
            config.max_concurrent_requests = 1;
        }
        if config.batch_size == 0 {
            warn!("batch_size of 0 clamped to 1");
            config.batch_size = 1;
        }

        Ok(Self {
            filter: LinkFilter::from_config(&config),
            extractor: Arc::new(ContentExtractor::new()?),
            config,
            fetcher,
            progress_callback: None,
            last_visited: AtomicUsize::new(0),
        })
    }

    pub fn with_extractor(mut self, extractor: ContentExtractor) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Crawl from `start_url`, returning at most `max_pages` records.
    ///
    /// Links found at `max_depth` are extracted but never followed. Only an
    /// unusable seed URL (or a strategy that cannot start) is an error;
    /// individual page failures are logged and skipped.
    pub async fn crawl(
        &self,
        start_url: &str,
        max_pages: usize,
        max_depth: usize,
    ) -> Result<Vec<PageRecord>> {
        Ok(self.crawl_session(start_url, max_pages, max_depth).await?.pages)
    }

    /// Same as [`crawl`](Self::crawl), also reporting skipped pages.
    pub async fn crawl_session(
        &self,
        start_url: &str,
        max_pages: usize,
        max_depth: usize,
    ) -> Result<CrawlOutcome> {
        let seed = parse_seed(start_url)?;
        let domain = links::authority(&seed)
            .ok_or_else(|| ScanError::InvalidSeedUrl(start_url.to_string()))?;

        info!(
            "Starting {:?} crawl of {} (max_pages={}, max_depth={})",
            self.config.mode, seed, max_pages, max_depth
        );

        self.fetcher.open().await?;

        let mut session = CrawlSession::new(seed, domain);
        let mut failures = Vec::new();

        let run = AssertUnwindSafe(self.run(&mut session, &mut failures, max_pages, max_depth))
            .catch_unwind()
            .await;

        if let Err(e) = self.fetcher.close().await {
            warn!("Failed to release fetch strategy: {}", e);
        }
        if let Err(panic) = run {
            resume_unwind(panic);
        }

        let visited = session.frontier.visited_count();
        self.last_visited.store(visited, Ordering::Relaxed);
        info!(
            "Crawl complete. {} pages, {} skipped, {} URLs visited",
            session.results.len(),
            failures.len(),
            visited
        );

        Ok(CrawlOutcome {
            pages: session.results,
            failures,
            visited,
        })
    }

    /// Visited-set size of the most recent session.
    pub fn visited_count(&self) -> usize {
        self.last_visited.load(Ordering::Relaxed)
    }

    /// Forget bookkeeping retained from the previous session.
    pub fn reset(&self) {
        self.last_visited.store(0, Ordering::Relaxed);
    }

    async fn run(
        &self,
        session: &mut CrawlSession,
        failures: &mut Vec<CrawlFailure>,
        max_pages: usize,
        max_depth: usize,
    ) {
        match self.config.mode {
            CrawlMode::Concurrent => {
                self.run_concurrent(session, failures, max_pages, max_depth)
                    .await
            }
            CrawlMode::Sequential => {
                self.run_sequential(session, failures, max_pages, max_depth)
                    .await
            }
        }
    }

    async fn run_concurrent(
        &self,
        session: &mut CrawlSession,
        failures: &mut Vec<CrawlFailure>,
        max_pages: usize,
        max_depth: usize,
    ) {
        let limiter = Semaphore::new(self.config.max_concurrent_requests);
        let domain = session.domain.clone();

        while !session.frontier.is_empty() && session.results.len() < max_pages {
            // Every entry in the batch was claimed at enqueue time, before any fetch starts.
            let batch = session.frontier.next_batch(self.config.batch_size);
            debug!(
                "Dispatching batch of {} ({} still queued)",
                batch.len(),
                session.frontier.pending()
            );

            let visits = join_all(
                batch
                    .iter()
                    .map(|entry| self.visit(entry, &domain, &limiter)),
            )
            .await;

            for (entry, visit) in batch.into_iter().zip(visits) {
                accept(session, failures, entry, visit, max_pages, max_depth);
            }
        }
    }

    async fn run_sequential(
        &self,
        session: &mut CrawlSession,
        failures: &mut Vec<CrawlFailure>,
        max_pages: usize,
        max_depth: usize,
    ) {
        let limiter = Semaphore::new(1);
        let domain = session.domain.clone();

        while session.results.len() < max_pages {
            let Some(entry) = session.frontier.pop() else {
                break;
            };
            let visit = self.visit(&entry, &domain, &limiter).await;
            accept(session, failures, entry, visit, max_pages, max_depth);
        }
    }

    async fn visit(&self, entry: &FrontierEntry, domain: &str, limiter: &Semaphore) -> Result<Visit> {
        if let Some(ref callback) = self.progress_callback {
            callback(entry.depth, entry.url.to_string());
        }

        let fetched = {
            let _permit = limiter
                .acquire()
                .await
                .map_err(|e| ScanError::fetch(entry.url.as_str(), e))?;

            let fetched = self.fetcher.fetch(&entry.url).await;
            let delay = self.config.crawl_delay();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            fetched?
        };

        Ok(self.build_visit(entry, fetched, domain))
    }

    fn build_visit(&self, entry: &FrontierEntry, fetched: FetchedPage, domain: &str) -> Visit {
        let FetchedPage {
            html,
            links: strategy_links,
            status_code,
            content_type,
        } = fetched;

        let (title, content, discovered) = match strategy_links {
            Some(found) => {
                let (title, content) = self.extractor.extract(&html);
                let found = found
                    .iter()
                    .filter_map(|url| links::normalize(url.as_str(), &entry.url))
                    .collect();
                (title, content, found)
            }
            None => self.extractor.extract_with_links(&html, &entry.url),
        };

        let discovered_count = discovered.len();
        let accepted = self.filter.filter(discovered, domain);
        debug!(
            "{}: {} links found, {} accepted",
            entry.url,
            discovered_count,
            accepted.len()
        );

        let record = PageRecord {
            url: entry.url.to_string(),
            title,
            content,
            html: self.config.save_html.then_some(html),
            metadata: PageMetadata {
                depth: entry.depth,
                status_code,
                content_type,
                fetched_at: Utc::now(),
                rendered: self.fetcher.rendered(),
            },
        };

        Visit {
            record,
            links: accepted,
        }
    }
}

/// Fold one dispatched entry's outcome into the session.
///
/// Outcomes beyond `max_pages` are discarded with their links, so a batch
/// never emits more than the remaining page budget.
fn accept(
    session: &mut CrawlSession,
    failures: &mut Vec<CrawlFailure>,
    entry: FrontierEntry,
    visit: Result<Visit>,
    max_pages: usize,
    max_depth: usize,
) {
    match visit {
        Ok(visit) => {
            if session.results.len() >= max_pages {
                debug!("Page budget spent, discarding {}", entry.url);
                return;
            }
            if entry.depth < max_depth {
                let mut queued = 0;
                for link in visit.links {
                    if session.frontier.enqueue(link, entry.depth + 1) {
                        queued += 1;
                    }
                }
                debug!("Queued {} new links from {}", queued, entry.url);
            }
            session.results.push(visit.record);
        }
        Err(e) => {
            warn!("Skipping {}: {}", entry.url, e);
            failures.push(CrawlFailure {
                url: entry.url.to_string(),
                depth: entry.depth,
                reason: e.to_string(),
            });
        }
    }
}

fn parse_seed(start_url: &str) -> Result<Url> {
    let parsed = Url::parse(start_url.trim())
        .map_err(|e| ScanError::InvalidSeedUrl(format!("{}: {}", start_url, e)))?;
    if parsed.host_str().is_none() {
        return Err(ScanError::InvalidSeedUrl(format!("{}: missing host", start_url)));
    }
    links::normalize(parsed.as_str(), &parsed)
        .ok_or_else(|| ScanError::InvalidSeedUrl(format!("{}: not an http(s) URL", start_url)))
}

impl std::fmt::Debug for Crawler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crawler")
            .field("config", &self.config)
            .field("rendered", &self.fetcher.rendered())
            .finish()
    }
}
