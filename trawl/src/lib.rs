pub mod commands;
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{CrawlFlags, load_urls_from_file, load_urls_from_source, parse_url_line};

// Re-export crawl functionality from trawl-core
pub use trawl_core::crawl::{CrawlOptions, CrawlProgressCallback, execute_crawl, extract_url_path};
pub use trawl_core::report::{ReportFormat, generate_report};
