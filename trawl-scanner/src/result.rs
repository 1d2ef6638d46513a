use crate::extract::StructuredContent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub depth: usize,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub rendered: bool,
}

/// One crawled page. Immutable once handed to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub title: String,
    pub content: StructuredContent,
    /// Raw HTML, kept only when `save_html` is set
    pub html: Option<String>,
    pub metadata: PageMetadata,
}

impl PageRecord {
    pub fn host(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str) -> PageRecord {
        PageRecord {
            url: url.to_string(),
            title: "T".to_string(),
            content: StructuredContent::default(),
            html: None,
            metadata: PageMetadata {
                depth: 1,
                status_code: 200,
                content_type: Some("text/html".to_string()),
                fetched_at: Utc::now(),
                rendered: false,
            },
        }
    }

    #[test]
    fn test_host() {
        assert_eq!(
            record("https://docs.example.com/a").host().as_deref(),
            Some("docs.example.com")
        );
        assert_eq!(record("not a url").host(), None);
    }

    #[test]
    fn test_serializes_metadata() {
        let json = serde_json::to_value(record("https://example.com/")).unwrap();
        assert_eq!(json["metadata"]["depth"], 1);
        assert_eq!(json["metadata"]["rendered"], false);
        assert!(json["html"].is_null());
    }
}
