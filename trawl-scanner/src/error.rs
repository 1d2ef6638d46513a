use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid seed URL: {0}")]
    InvalidSeedUrl(String),

    #[error("Fetch failed for {url}: {cause}")]
    Fetch { url: String, cause: String },

    #[error("Render failed for {url}: {cause}")]
    Render { url: String, cause: String },

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Unsupported fetch strategy: {0}")]
    UnsupportedStrategy(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanError {
    pub fn fetch(url: impl Into<String>, cause: impl ToString) -> Self {
        ScanError::Fetch {
            url: url.into(),
            cause: cause.to_string(),
        }
    }

    pub fn render(url: impl Into<String>, cause: impl ToString) -> Self {
        ScanError::Render {
            url: url.into(),
            cause: cause.to_string(),
        }
    }

    /// Session-level preconditions abort a crawl; everything else only skips a page.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScanError::InvalidSeedUrl(_) | ScanError::UnsupportedStrategy(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
