use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::model::Product;

/// Cached copy of the full product listing
#[derive(Clone, Debug)]
struct CacheEntry {
    products: Vec<Product>,
    stored_at: Instant,
}

/// Process-wide read cache for the storefront product listing.
///
/// The inventory importer replaces the products table wholesale, so the
/// cache exposes a single explicit `invalidate()` the importer calls
/// after a successful swap. Absent invalidation an entry simply ages
/// out after the TTL.
#[derive(Debug)]
pub struct ProductCache {
    entry: Arc<RwLock<Option<CacheEntry>>>,
    ttl: Duration,
}

impl ProductCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entry: Arc::new(RwLock::new(None)),
            ttl,
        }
    }

    /// Get the cached listing if present and not expired
    pub async fn get(&self) -> Option<Vec<Product>> {
        let entry = self.entry.read().await;

        match entry.as_ref() {
            Some(cached) if cached.stored_at.elapsed() < self.ttl => {
                Some(cached.products.clone())
            }
            _ => None,
        }
    }

    pub async fn put(&self, products: Vec<Product>) {
        let mut entry = self.entry.write().await;
        *entry = Some(CacheEntry {
            products,
            stored_at: Instant::now(),
        });
    }

    /// Drop the cached listing so the next read goes to the store
    pub async fn invalidate(&self) {
        let mut entry = self.entry.write().await;
        *entry = None;
    }
}

impl Default for ProductCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_products() -> Vec<Product> {
        vec![Product {
            id: 1,
            name: "BOX-A".to_string(),
            description: "Single-wall carton".to_string(),
            price: 1.0,
        }]
    }

    #[tokio::test]
    async fn test_cache_put_get_invalidate() {
        let cache = ProductCache::new(Duration::from_secs(60));

        assert!(cache.get().await.is_none());

        cache.put(sample_products()).await;
        let cached = cache.get().await;
        assert!(cached.is_some());
        assert_eq!(cached.unwrap()[0].name, "BOX-A");

        cache.invalidate().await;
        assert!(cache.get().await.is_none());
    }

    #[tokio::test]
    async fn test_cache_expiry() {
        let cache = ProductCache::new(Duration::from_millis(0));

        cache.put(sample_products()).await;
        // Zero TTL: the entry is already stale on the next read
        assert!(cache.get().await.is_none());
    }
}
