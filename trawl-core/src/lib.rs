pub mod config;
pub mod crawl;
pub mod relevance;
pub mod report;

use colored::Colorize;

pub use config::{ConfigError, Settings};
pub use crawl::{CrawlOptions, CrawlProgressCallback, CrawlSummary, execute_crawl};
pub use relevance::{AnnotatedPage, OracleError, RelevanceAnalysis, RelevanceOracle};
pub use report::ReportFormat;

const BANNER: &str = r#"
  _                        _
 | |_ _ __ __ ___      __ | |
 | __| '__/ _` \ \ /\ / / | |
 | |_| | | (_| |\ V  V /  | |
  \__|_|  \__,_| \_/\_/   |_|
"#;

/// Written to stderr so a report on stdout stays machine-readable.
pub fn print_banner() {
    eprintln!("{}", BANNER.bright_cyan().bold());
    eprintln!(
        "  {} {}\n",
        "structured-content crawler".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}
