//! Short-TTL memoization of lookup results.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::clock::Clock;
use crate::models::LookupResult;

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: LookupResult,
    stored_at: DateTime<Utc>,
}

/// In-memory cache keyed by the canonical request key.
///
/// Expiry is checked on read only: a stale entry is treated as absent but
/// stays in the map until a later `put` overwrites it. There is no
/// background sweep.
pub struct ResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ResponseCache {
    #[must_use]
    pub fn new(ttl_seconds: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: Duration::seconds(i64::from(ttl_seconds)),
            clock,
        }
    }

    /// A clone of the stored payload, when one is present and fresh.
    pub async fn get(&self, key: &str) -> Option<LookupResult> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;

        if self.clock.now() - entry.stored_at > self.ttl {
            return None;
        }

        Some(entry.payload.clone())
    }

    pub async fn put(&self, key: String, payload: LookupResult) {
        let entry = CacheEntry {
            payload,
            stored_at: self.clock.now(),
        };
        self.entries.write().await.insert(key, entry);
    }

    /// Number of entries held, stale ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::Insights;

    fn sample_payload(postcode: &str) -> LookupResult {
        LookupResult {
            success: true,
            properties: Vec::new(),
            insights: Insights::default(),
            total: 0,
            postcode: postcode.to_string(),
            source: "propertydata".to_string(),
            timestamp: Utc::now(),
            cached: false,
        }
    }

    #[tokio::test]
    async fn test_hit_within_ttl() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = ResponseCache::new(300, clock.clone());

        cache.put("SW1A1AA|20|30days|-|-".to_string(), sample_payload("SW1A1AA")).await;
        clock.advance(Duration::seconds(299));

        let hit = cache.get("SW1A1AA|20|30days|-|-").await.unwrap();
        assert_eq!(hit.postcode, "SW1A1AA");
    }

    #[tokio::test]
    async fn test_expired_entry_is_absent_but_lingers() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = ResponseCache::new(300, clock.clone());

        cache.put("key".to_string(), sample_payload("B338TH")).await;
        clock.advance(Duration::seconds(301));

        assert!(cache.get("key").await.is_none());
        // Lazy expiry: the stale entry is still held until overwritten.
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_exactly_ttl_old_is_still_fresh() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = ResponseCache::new(300, clock.clone());

        cache.put("key".to_string(), sample_payload("M11AE")).await;
        clock.advance(Duration::seconds(300));

        assert!(cache.get("key").await.is_some());
    }

    #[tokio::test]
    async fn test_put_overwrites_existing_entry() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = ResponseCache::new(300, clock);

        cache.put("key".to_string(), sample_payload("CR26XH")).await;
        cache.put("key".to_string(), sample_payload("DN551PT")).await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get("key").await.unwrap().postcode, "DN551PT");
    }

    #[tokio::test]
    async fn test_miss_on_unknown_key() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = ResponseCache::new(300, clock);

        assert!(cache.get("missing").await.is_none());
        assert!(cache.is_empty().await);
    }
}
