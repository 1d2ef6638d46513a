//! Boundary to an external relevance scorer.
//!
//! Nothing here ranks pages. An oracle implementation scores each page
//! against free-text instructions; [`annotate_pages`] attaches what it
//! returns and carries on past pages it fails on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use trawl_scanner::PageRecord;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle unavailable: {0}")]
    Unavailable(String),

    #[error("malformed oracle response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceAnalysis {
    /// 0.0 (unrelated) to 1.0
    pub score: f32,
    pub excerpt: Option<String>,
}

#[async_trait]
pub trait RelevanceOracle: Send + Sync {
    async fn assess(
        &self,
        page: &PageRecord,
        instructions: &str,
    ) -> Result<RelevanceAnalysis, OracleError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedPage {
    #[serde(flatten)]
    pub page: PageRecord,
    pub relevance: Option<RelevanceAnalysis>,
}

/// Ask `oracle` about each page in order. A failed assessment leaves that
/// page with `relevance: None`.
pub async fn annotate_pages(
    oracle: &dyn RelevanceOracle,
    pages: Vec<PageRecord>,
    instructions: &str,
) -> Vec<AnnotatedPage> {
    info!("Assessing {} pages for relevance", pages.len());

    let mut annotated = Vec::with_capacity(pages.len());
    for page in pages {
        let relevance = match oracle.assess(&page, instructions).await {
            Ok(mut analysis) => {
                analysis.score = analysis.score.clamp(0.0, 1.0);
                debug!("{} scored {:.2}", page.url, analysis.score);
                Some(analysis)
            }
            Err(e) => {
                warn!("Relevance assessment failed for {}: {}", page.url, e);
                None
            }
        };
        annotated.push(AnnotatedPage { page, relevance });
    }
    annotated
}

/// Split `text` into chunks of at most `max_chunk_len` bytes, breaking on
/// line boundaries. A single line longer than the limit is cut at char
/// boundaries. Blank lines are dropped.
pub fn split_text(text: &str, max_chunk_len: usize) -> Vec<String> {
    let max = max_chunk_len.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let needed = if current.is_empty() {
            line.len()
        } else {
            current.len() + 1 + line.len()
        };
        if needed <= max {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        if line.len() <= max {
            current.push_str(line);
        } else {
            let mut piece = String::new();
            for ch in line.chars() {
                if piece.len() + ch.len_utf8() > max && !piece.is_empty() {
                    chunks.push(std::mem::take(&mut piece));
                }
                piece.push(ch);
            }
            current = piece;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
