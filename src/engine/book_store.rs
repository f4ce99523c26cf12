//! Shared order book cache and subscription registry.

use crate::datasource::MarketDataSource;
use crate::domain::{BookSnapshot, TimeMs, TokenId};
use dashmap::DashMap;
use tracing::debug;

/// Per-token market state: the latest whole-book snapshot plus the time
/// this token first became interesting.
///
/// Book and subscription live in one entry so expiry removes both
/// atomically; an expired token can never serve a leftover book.
#[derive(Debug, Default, Clone)]
struct MarketEntry {
    book: Option<BookSnapshot>,
    subscribed_at: Option<TimeMs>,
}

/// Latest known order books, written by both the streaming feed and
/// on-demand REST refreshes. Updates replace the snapshot wholesale
/// (last-writer-wins); nothing outside this type mutates book state.
#[derive(Debug, Default)]
pub struct BookStore {
    markets: DashMap<TokenId, MarketEntry>,
}

impl BookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored snapshot for `token` unconditionally.
    pub fn update(&self, token: TokenId, book: BookSnapshot) {
        self.markets.entry(token).or_default().book = Some(book);
    }

    /// The stored snapshot regardless of age (PnL valuation tolerates
    /// stale data when a refresh failed).
    pub fn get(&self, token: &TokenId) -> Option<BookSnapshot> {
        self.markets.get(token).and_then(|e| e.book.clone())
    }

    /// The stored snapshot only if observed within `max_age_ms` of `now`.
    pub fn get_if_fresh(
        &self,
        token: &TokenId,
        max_age_ms: i64,
        now: TimeMs,
    ) -> Option<BookSnapshot> {
        self.markets.get(token).and_then(|e| {
            e.book
                .clone()
                .filter(|book| now.since(book.observed_at) < max_age_ms)
        })
    }

    /// Register first interest in `token`. Returns true when the token was
    /// not already tracked (callers enqueue a stream subscription then).
    pub fn track(&self, token: TokenId, now: TimeMs) -> bool {
        let mut entry = self.markets.entry(token).or_default();
        if entry.subscribed_at.is_none() {
            entry.subscribed_at = Some(now);
            true
        } else {
            false
        }
    }

    /// Tokens currently tracked, for (re)subscribing after a reconnect.
    pub fn tracked(&self) -> Vec<TokenId> {
        self.markets
            .iter()
            .filter(|e| e.value().subscribed_at.is_some())
            .map(|e| e.key().clone())
            .collect()
    }

    /// Drop every token whose subscription is older than `expiry_ms`,
    /// books included. Returns the evicted tokens.
    pub fn sweep_expired(&self, now: TimeMs, expiry_ms: i64) -> Vec<TokenId> {
        let mut evicted = Vec::new();
        self.markets.retain(|token, entry| {
            let expired = entry
                .subscribed_at
                .is_some_and(|at| now.since(at) > expiry_ms);
            if expired {
                evicted.push(token.clone());
            }
            !expired
        });
        evicted
    }
}

/// Resolve a usable book for a fill attempt: the fresh cached snapshot if
/// one exists, otherwise an on-demand REST fetch fed back through the
/// store. Returns None when both paths come up empty.
pub async fn fresh_book(
    store: &BookStore,
    source: &dyn MarketDataSource,
    token: &TokenId,
    max_age_ms: i64,
) -> Option<(BookSnapshot, BookOrigin)> {
    if let Some(book) = store.get_if_fresh(token, max_age_ms, TimeMs::now()) {
        return Some((book, BookOrigin::Cache));
    }

    match source.order_book(token).await {
        Ok(book) => {
            store.update(token.clone(), book.clone());
            Some((book, BookOrigin::Rest))
        }
        Err(e) => {
            debug!("On-demand book fetch failed for {}: {}", token, e);
            None
        }
    }
}

/// Where a fill-attempt book came from (surfaced in the paper-trade log).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookOrigin {
    Cache,
    Rest,
}

impl std::fmt::Display for BookOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookOrigin::Cache => write!(f, "CACHE"),
            BookOrigin::Rest => write!(f, "REST"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MockDataSource;
    use crate::domain::{Decimal, PriceLevel};

    fn token(s: &str) -> TokenId {
        TokenId::new(s.to_string())
    }

    fn book_at(observed_at: i64) -> BookSnapshot {
        BookSnapshot::new(
            vec![PriceLevel::new(
                Decimal::from_str_canonical("0.4").unwrap(),
                Decimal::from_str_canonical("10").unwrap(),
            )],
            vec![],
            TimeMs::new(observed_at),
        )
    }

    #[test]
    fn test_update_then_get() {
        let store = BookStore::new();
        store.update(token("a"), book_at(100));
        assert_eq!(store.get(&token("a")), Some(book_at(100)));
        assert_eq!(store.get(&token("b")), None);
    }

    #[test]
    fn test_last_writer_wins() {
        let store = BookStore::new();
        store.update(token("a"), book_at(100));
        store.update(token("a"), book_at(50));
        // Wholesale replacement, even by an older snapshot.
        assert_eq!(store.get(&token("a")), Some(book_at(50)));
    }

    #[test]
    fn test_freshness_window() {
        let store = BookStore::new();
        store.update(token("a"), book_at(1000));

        assert!(store
            .get_if_fresh(&token("a"), 5000, TimeMs::new(5999))
            .is_some());
        assert!(store
            .get_if_fresh(&token("a"), 5000, TimeMs::new(6000))
            .is_none());
    }

    #[test]
    fn test_track_first_interest_only() {
        let store = BookStore::new();
        assert!(store.track(token("a"), TimeMs::new(100)));
        assert!(!store.track(token("a"), TimeMs::new(200)));
        assert_eq!(store.tracked(), vec![token("a")]);
    }

    #[test]
    fn test_sweep_removes_book_and_subscription_together() {
        let store = BookStore::new();
        store.track(token("a"), TimeMs::new(0));
        store.update(token("a"), book_at(0));

        let evicted = store.sweep_expired(TimeMs::new(1001), 1000);
        assert_eq!(evicted, vec![token("a")]);
        assert_eq!(store.get(&token("a")), None);
        assert!(store.tracked().is_empty());
        // Behaves exactly like a never-seen token afterward.
        assert!(store.track(token("a"), TimeMs::new(2000)));
    }

    #[test]
    fn test_sweep_keeps_live_subscriptions() {
        let store = BookStore::new();
        store.track(token("a"), TimeMs::new(0));
        store.track(token("b"), TimeMs::new(900));

        let evicted = store.sweep_expired(TimeMs::new(1001), 1000);
        assert_eq!(evicted, vec![token("a")]);
        assert_eq!(store.tracked(), vec![token("b")]);
    }

    #[test]
    fn test_sweep_ignores_untracked_books() {
        // A PnL-cached book with no subscription never expires here.
        let store = BookStore::new();
        store.update(token("a"), book_at(0));
        let evicted = store.sweep_expired(TimeMs::new(10_000), 1000);
        assert!(evicted.is_empty());
        assert!(store.get(&token("a")).is_some());
    }

    #[tokio::test]
    async fn test_fresh_book_prefers_cache() {
        let store = BookStore::new();
        let now = TimeMs::now();
        store.update(token("a"), book_at(now.as_ms()));
        let source = MockDataSource::new();

        let (_, origin) = fresh_book(&store, &source, &token("a"), 5000)
            .await
            .expect("cached book");
        assert_eq!(origin, BookOrigin::Cache);
    }

    #[tokio::test]
    async fn test_fresh_book_falls_back_to_rest_and_caches() {
        let store = BookStore::new();
        let source = MockDataSource::new().with_book(token("a"), book_at(7));

        let (book, origin) = fresh_book(&store, &source, &token("a"), 5000)
            .await
            .expect("fetched book");
        assert_eq!(origin, BookOrigin::Rest);
        assert_eq!(book, book_at(7));
        assert_eq!(store.get(&token("a")), Some(book_at(7)));
    }

    #[tokio::test]
    async fn test_fresh_book_none_when_fetch_fails() {
        let store = BookStore::new();
        let source = MockDataSource::new();
        assert!(fresh_book(&store, &source, &token("a"), 5000).await.is_none());
    }
}
