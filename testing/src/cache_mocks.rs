//! In-memory sale cache for testing cache-aside behaviour.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)]

use flashsale_core::{CacheError, SaleCache, SaleId, SaleItem};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// HashMap-backed [`SaleCache`] with call counters and switchable failures.
///
/// Clones share the same entries and counters.
///
/// # Example
///
/// ```
/// use flashsale_testing::InMemorySaleCache;
/// use flashsale_core::{SaleCache, SaleId};
///
/// # async fn example() {
/// let cache = InMemorySaleCache::new();
/// cache.fail_reads(true);
/// assert!(cache.get(SaleId::new(1)).await.is_err());
/// assert_eq!(cache.reads(), 1);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemorySaleCache {
    entries: Arc<RwLock<HashMap<SaleId, SaleItem>>>,
    reads: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemorySaleCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place an entry directly, bypassing counters (e.g. to plant a stale copy).
    pub fn seed(&self, item: SaleItem) {
        self.entries.write().unwrap().insert(item.id, item);
    }

    /// Cached copy of a sale, if any.
    #[must_use]
    pub fn cached(&self, sale_id: SaleId) -> Option<SaleItem> {
        self.entries.read().unwrap().get(&sale_id).cloned()
    }

    /// Drop one entry, as an expiry or eviction would.
    pub fn evict(&self, sale_id: SaleId) {
        self.entries.write().unwrap().remove(&sale_id);
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }

    /// `get` calls so far.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// `put` calls so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make `get` fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make `put` fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl SaleCache for InMemorySaleCache {
    async fn get(&self, sale_id: SaleId) -> Result<Option<SaleItem>, CacheError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CacheError::ConnectionError("cache unreachable".to_string()));
        }
        Ok(self.cached(sale_id))
    }

    async fn put(&self, item: &SaleItem) -> Result<(), CacheError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::CommandError("cache rejected write".to_string()));
        }
        self.seed(item.clone());
        Ok(())
    }
}
