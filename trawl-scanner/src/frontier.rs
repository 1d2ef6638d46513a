use crate::result::PageRecord;
use std::collections::{HashSet, VecDeque};
use url::Url;

/// A URL waiting to be fetched, with the depth it was discovered at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: Url,
    pub depth: usize,
}

/// FIFO frontier paired with the visited set.
///
/// A URL is claimed when it is enqueued, so the same canonical URL can
/// never sit in the queue twice or be dispatched twice in one session,
/// even when several pages of one batch discover it.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<FrontierEntry>,
    visited: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `url` and queue it. Returns `false` if it was already claimed.
    pub fn enqueue(&mut self, url: Url, depth: usize) -> bool {
        if !self.visited.insert(url.as_str().to_string()) {
            return false;
        }
        self.queue.push_back(FrontierEntry { url, depth });
        true
    }

    pub fn pop(&mut self) -> Option<FrontierEntry> {
        self.queue.pop_front()
    }

    /// Dequeue up to `size` entries, oldest first.
    pub fn next_batch(&mut self, size: usize) -> Vec<FrontierEntry> {
        let take = size.max(1).min(self.queue.len());
        self.queue.drain(..take).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}

/// Transient state of one crawl call. Never shared between sessions.
#[derive(Debug)]
pub struct CrawlSession {
    /// Host (plus explicit port) of the seed, for the same-host constraint
    pub domain: String,
    pub frontier: Frontier,
    pub results: Vec<PageRecord>,
}

impl CrawlSession {
    pub fn new(seed: Url, domain: String) -> Self {
        let mut frontier = Frontier::new();
        frontier.enqueue(seed, 0);
        Self {
            domain,
            frontier,
            results: Vec::new(),
        }
    }
}
