pub mod config;
pub mod crawler;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod frontier;
pub mod links;
pub mod result;

pub use config::{BrowserConfig, CrawlMode, CrawlerConfig, FetchStrategyKind, WaitPolicy};
pub use crawler::{CrawlFailure, CrawlOutcome, Crawler, ProgressCallback};
pub use error::ScanError;
pub use extract::{ContentExtractor, ListBlock, ListKind, StructuredContent, Table};
pub use fetch::{FetchStrategy, FetchedPage, StaticFetcher};
pub use frontier::{CrawlSession, Frontier, FrontierEntry};
pub use links::LinkFilter;
pub use result::{PageMetadata, PageRecord};
