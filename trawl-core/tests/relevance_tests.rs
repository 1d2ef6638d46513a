// Tests for the relevance oracle boundary

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;
use trawl_core::relevance::{
    OracleError, RelevanceAnalysis, RelevanceOracle, annotate_pages, split_text,
};
use trawl_scanner::{PageMetadata, PageRecord, StructuredContent};

fn page(url: &str, text: &str) -> PageRecord {
    PageRecord {
        url: url.to_string(),
        title: "T".to_string(),
        content: StructuredContent {
            clean_text: text.to_string(),
            ..StructuredContent::default()
        },
        html: None,
        metadata: PageMetadata {
            depth: 0,
            status_code: 200,
            content_type: None,
            fetched_at: Utc::now(),
            rendered: false,
        },
    }
}

/// Scores pages by whether their text mentions the instructions.
struct KeywordOracle {
    seen: Mutex<Vec<String>>,
}

#[async_trait]
impl RelevanceOracle for KeywordOracle {
    async fn assess(
        &self,
        page: &PageRecord,
        instructions: &str,
    ) -> Result<RelevanceAnalysis, OracleError> {
        self.seen.lock().unwrap().push(page.url.clone());
        if page.content.clean_text.contains("boom") {
            return Err(OracleError::Unavailable("rate limited".to_string()));
        }
        let hit = page.content.clean_text.contains(instructions);
        Ok(RelevanceAnalysis {
            score: if hit { 3.0 } else { 0.0 },
            excerpt: hit.then(|| instructions.to_string()),
        })
    }
}

#[tokio::test]
async fn test_annotate_pages_isolates_failures() {
    let oracle = KeywordOracle {
        seen: Mutex::new(Vec::new()),
    };
    let pages = vec![
        page("https://a.test/1", "pricing plans"),
        page("https://a.test/2", "boom"),
        page("https://a.test/3", "about us"),
    ];

    let annotated = annotate_pages(&oracle, pages, "pricing").await;

    assert_eq!(annotated.len(), 3);
    assert_eq!(oracle.seen.lock().unwrap().len(), 3);

    let first = annotated[0].relevance.as_ref().unwrap();
    assert_eq!(first.score, 1.0, "scores are clamped to [0, 1]");
    assert_eq!(first.excerpt.as_deref(), Some("pricing"));

    assert!(annotated[1].relevance.is_none());
    assert_eq!(annotated[2].relevance.as_ref().unwrap().score, 0.0);
    assert_eq!(annotated[2].page.url, "https://a.test/3");
}

#[tokio::test]
async fn test_annotate_empty() {
    let oracle = KeywordOracle {
        seen: Mutex::new(Vec::new()),
    };
    assert!(annotate_pages(&oracle, Vec::new(), "x").await.is_empty());
}

#[test]
fn test_annotated_page_serializes_flat() {
    let annotated = trawl_core::AnnotatedPage {
        page: page("https://a.test/", "text"),
        relevance: None,
    };
    let json = serde_json::to_value(&annotated).unwrap();
    assert_eq!(json["url"], "https://a.test/");
    assert!(json["relevance"].is_null());
}

#[test]
fn test_split_text_chunks_page_text() {
    let text = (0..50)
        .map(|i| format!("line number {}", i))
        .collect::<Vec<_>>()
        .join("\n");
    let chunks = split_text(&text, 100);

    assert!(chunks.len() > 1);
    assert!(chunks.iter().all(|c| c.len() <= 100));
    assert_eq!(chunks.join("\n"), text);
}
