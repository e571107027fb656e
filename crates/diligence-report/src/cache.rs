//! Time-bounded memory of resolved tickers

use cached::{Cached, TimedCache};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Maps free-form company input to a resolved ticker for a fixed TTL
///
/// Keys are normalized, so "Microsoft", " microsoft " and "MICROSOFT" share
/// an entry. Only successful resolutions are stored.
pub struct TickerCache {
    cache: Arc<RwLock<TimedCache<String, String>>>,
}

impl TickerCache {
    /// Create a new cache with specified TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(RwLock::new(TimedCache::with_lifespan(ttl))),
        }
    }

    fn key(query: &str) -> String {
        query.trim().to_lowercase()
    }

    /// Previously resolved ticker for `query`
    pub async fn get(&self, query: &str) -> Option<String> {
        let mut cache = self.cache.write().await;
        let hit = cache.cache_get(&Self::key(query)).cloned();
        if hit.is_some() {
            tracing::debug!("Ticker cache hit for '{query}'");
        }
        hit
    }

    /// Remember a resolution
    pub async fn insert(&self, query: &str, ticker: impl Into<String>) {
        let mut cache = self.cache.write().await;
        let _ = cache.cache_set(Self::key(query), ticker.into());
    }

    /// Clear all cached entries
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.cache_clear();
    }

    /// Get the number of cached entries
    pub async fn len(&self) -> usize {
        let cache = self.cache.read().await;
        cache.cache_size()
    }

    /// Check if the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Clone for TickerCache {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_get_normalized() {
        let cache = TickerCache::new(Duration::from_secs(60));
        cache.insert("Microsoft", "MSFT").await;

        assert_eq!(cache.get(" microsoft ").await.as_deref(), Some("MSFT"));
        assert_eq!(cache.get("MICROSOFT").await.as_deref(), Some("MSFT"));
        assert!(cache.get("Apple").await.is_none());
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = TickerCache::new(Duration::from_secs(1));
        cache.insert("Apple", "AAPL").await;
        assert!(cache.get("Apple").await.is_some());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(cache.get("Apple").await.is_none());
    }

    #[tokio::test]
    async fn test_clear_and_shared_clone() {
        let cache = TickerCache::new(Duration::from_secs(60));
        let shared = cache.clone();
        shared.insert("Apple", "AAPL").await;
        shared.insert("Tesla", "TSLA").await;

        assert_eq!(cache.len().await, 2);
        cache.clear().await;
        assert!(shared.is_empty().await);
    }
}
