//! Sale catalog reader: cache-aside reads of sale metadata.
//!
//! Sale metadata is effectively immutable once published (operators discard and
//! republish rather than edit), so a possibly-stale cached copy is served in exchange
//! for keeping the durable store off the hot read path. A stale entry is replaced the
//! next time the cache misses; there is no TTL at this layer.

use std::sync::Arc;

use crate::error::StoreError;
use crate::metrics::CATALOG_CACHE_TOTAL;
use crate::store::{SaleCache, SaleStore};
use crate::types::{SaleId, SaleItem};

/// Cache-aside reader over a durable [`SaleStore`] and a [`SaleCache`].
pub struct SaleCatalog<S, C> {
    store: Arc<S>,
    cache: Arc<C>,
}

impl<S, C> Clone for SaleCatalog<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<S: SaleStore, C: SaleCache> SaleCatalog<S, C> {
    /// Create a catalog reader.
    #[must_use]
    pub const fn new(store: Arc<S>, cache: Arc<C>) -> Self {
        Self { store, cache }
    }

    /// Fetch one sale item.
    ///
    /// Cache hit returns immediately. On a miss (or an unreadable cache) the durable
    /// store is read and, if the item exists, written back to the cache. A failed
    /// write-back is logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] only if the durable store read fails.
    pub async fn get(&self, sale_id: SaleId) -> Result<Option<SaleItem>, StoreError> {
        match self.cache.get(sale_id).await {
            Ok(Some(item)) => {
                metrics::counter!(CATALOG_CACHE_TOTAL, "result" => "hit").increment(1);
                tracing::debug!(sale_id = %sale_id, "Catalog cache hit");
                return Ok(Some(item));
            }
            Ok(None) => {
                metrics::counter!(CATALOG_CACHE_TOTAL, "result" => "miss").increment(1);
                tracing::debug!(sale_id = %sale_id, "Catalog cache miss");
            }
            Err(e) => {
                metrics::counter!(CATALOG_CACHE_TOTAL, "result" => "error").increment(1);
                tracing::warn!(
                    sale_id = %sale_id,
                    error = %e,
                    "Catalog cache read failed, falling back to store"
                );
            }
        }

        let Some(item) = self.store.find_sale(sale_id).await? else {
            return Ok(None);
        };

        if let Err(e) = self.cache.put(&item).await {
            tracing::warn!(
                sale_id = %sale_id,
                error = %e,
                "Catalog cache write-back failed"
            );
        }

        Ok(Some(item))
    }

    /// Page through sale items straight from the durable store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    pub async fn list(&self, offset: u32, limit: u32) -> Result<Vec<SaleItem>, StoreError> {
        self.store.list_sales(offset, limit).await
    }
}
