//! URL-set state machine: `pending` → `crawled` / `failed`.
//!
//! Shaped after `crawl_engine/retry_queue.rs` and
//! `crawl_engine/domain_limiter.rs` for the bounded set shape, and the
//! pending/crawled/failed three-set idiom from `spyglass`'s crawler
//! module.

use std::collections::{HashSet, VecDeque};
use thiserror::Error;

use crate::canonical_url::CanonicalUrl;

/// Errors surfaced by Frontier operations whose preconditions are
/// violated: `mark_crawled`/`mark_failed` require the URL to be pending.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrontierOpError {
    #[error("cannot mark {0} crawled: it is not pending")]
    NotPending(String),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrontierStats {
    pub pending: usize,
    pub crawled: usize,
    pub failed: usize,
}

/// The crawl's URL bookkeeping. Every operation here is synchronous; the
/// Crawler is responsible for guarding concurrent access.
#[derive(Debug, Default)]
pub struct Frontier {
    pending_order: VecDeque<CanonicalUrl>,
    pending: HashSet<CanonicalUrl>,
    crawled: HashSet<CanonicalUrl>,
    failed: HashSet<CanonicalUrl>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn known(&self, u: &CanonicalUrl) -> bool {
        self.pending.contains(u) || self.crawled.contains(u) || self.failed.contains(u)
    }

    pub fn is_pending(&self, u: &CanonicalUrl) -> bool {
        self.pending.contains(u)
    }

    pub fn is_crawled(&self, u: &CanonicalUrl) -> bool {
        self.crawled.contains(u)
    }

    pub fn is_failed(&self, u: &CanonicalUrl) -> bool {
        self.failed.contains(u)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Add `u` to `pending` if it isn't already known anywhere. Idempotent.
    pub fn discover(&mut self, u: CanonicalUrl) {
        if self.known(&u) {
            return;
        }
        self.pending.insert(u.clone());
        self.pending_order.push_back(u);
    }

    /// Return the next pending URL in discovery (FIFO) order, without
    /// removing it from `pending` — it stays pending until `mark_crawled`
    /// or `mark_failed` is called on it, so `known`/`is_pending` still see
    /// it as in-flight between the pop and the outcome being recorded.
    pub fn next_pending(&mut self) -> Option<CanonicalUrl> {
        while let Some(u) = self.pending_order.pop_front() {
            if self.pending.contains(&u) {
                return Some(u);
            }
            // Stale entry: already moved to crawled/failed directly,
            // bypassing next_pending — skip it.
        }
        None
    }

    /// Requires `pending(u)`; moves it to `crawled`.
    pub fn mark_crawled(&mut self, u: &CanonicalUrl) -> Result<(), FrontierOpError> {
        if !self.pending.remove(u) {
            return Err(FrontierOpError::NotPending(u.to_string()));
        }
        self.pending_order.retain(|x| x != u);
        self.crawled.insert(u.clone());
        Ok(())
    }

    pub fn mark_failed(&mut self, u: &CanonicalUrl) -> Result<(), FrontierOpError> {
        if !self.pending.remove(u) {
            return Err(FrontierOpError::NotPending(u.to_string()));
        }
        self.pending_order.retain(|x| x != u);
        self.failed.insert(u.clone());
        Ok(())
    }

    pub fn stats(&self) -> FrontierStats {
        FrontierStats {
            pending: self.pending.len(),
            crawled: self.crawled.len(),
            failed: self.failed.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical_url;
    use pretty_assertions::assert_eq;

    fn url(s: &str) -> CanonicalUrl {
        canonical_url::normalize(s, None).unwrap().into_url().unwrap()
    }

    #[test]
    fn discover_then_next_pending_fifo() {
        let mut f = Frontier::new();
        f.discover(url("http://h/a"));
        f.discover(url("http://h/b"));
        assert_eq!(f.next_pending(), Some(url("http://h/a")));
        assert_eq!(f.next_pending(), Some(url("http://h/b")));
        assert_eq!(f.next_pending(), None);
    }

    #[test]
    fn discover_is_idempotent() {
        let mut f = Frontier::new();
        f.discover(url("http://h/a"));
        f.discover(url("http://h/a"));
        assert_eq!(f.stats().pending, 1);
    }

    #[test]
    fn mark_crawled_requires_pending() {
        let mut f = Frontier::new();
        let u = url("http://h/a");
        assert!(matches!(f.mark_crawled(&u), Err(FrontierOpError::NotPending(_))));
        f.discover(u.clone());
        assert!(f.mark_crawled(&u).is_ok());
        assert!(f.is_crawled(&u));
        assert!(!f.is_pending(&u));
    }

    #[test]
    fn mark_failed_requires_pending() {
        let mut f = Frontier::new();
        let u = url("http://h/a");
        f.discover(u.clone());
        assert!(f.mark_failed(&u).is_ok());
        assert!(f.is_failed(&u));
        assert!(matches!(f.mark_failed(&u), Err(FrontierOpError::NotPending(_))));
    }

    #[test]
    fn sets_are_pairwise_disjoint() {
        let mut f = Frontier::new();
        let a = url("http://h/a");
        let b = url("http://h/b");
        f.discover(a.clone());
        f.discover(b.clone());
        f.mark_crawled(&a).unwrap();
        f.mark_failed(&b).unwrap();
        assert!(!f.is_pending(&a) && f.is_crawled(&a) && !f.is_failed(&a));
        assert!(!f.is_pending(&b) && !f.is_crawled(&b) && f.is_failed(&b));
    }

    #[test]
    fn known_covers_all_three_sets() {
        let mut f = Frontier::new();
        let a = url("http://h/a");
        assert!(!f.known(&a));
        f.discover(a.clone());
        assert!(f.known(&a));
        f.mark_crawled(&a).unwrap();
        assert!(f.known(&a));
    }

    #[test]
    fn stats_reflects_counts() {
        let mut f = Frontier::new();
        f.discover(url("http://h/a"));
        f.discover(url("http://h/b"));
        f.mark_crawled(&url("http://h/a")).unwrap();
        let stats = f.stats();
        assert_eq!(stats, FrontierStats { pending: 1, crawled: 1, failed: 0 });
    }
}
