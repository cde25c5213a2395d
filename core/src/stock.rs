//! Stock decrementer: the only writer of remaining stock.
//!
//! Stock is never read-then-written. One conditional update checks and decrements
//! under the store's row lock, so concurrent callers on the same sale are serialized
//! by the store and the last unit goes to exactly one of them.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::StoreError;
use crate::store::SaleStore;
use crate::types::SaleId;

/// Result of a conditional decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockUpdate {
    /// One unit consumed.
    Reduced,
    /// Sold out or outside the window; nothing changed.
    Unavailable,
}

/// Conditional stock decrement scoped to one sale and its live window.
pub struct StockDecrementer<S> {
    store: Arc<S>,
}

impl<S> Clone for StockDecrementer<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: SaleStore> StockDecrementer<S> {
    /// Create a decrementer over `store`.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Decrement stock of `sale_id` by one inside `tx`, as of `at`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the statement fails, or
    /// [`StoreError::CorruptRecord`] if the store reports more than one changed row.
    pub async fn reduce(
        &self,
        tx: &mut S::Transaction,
        sale_id: SaleId,
        at: DateTime<Utc>,
    ) -> Result<StockUpdate, StoreError> {
        match self.store.reduce_stock(tx, sale_id, at).await? {
            0 => Ok(StockUpdate::Unavailable),
            1 => Ok(StockUpdate::Reduced),
            n => Err(StoreError::CorruptRecord(format!(
                "stock decrement for sale {sale_id} changed {n} rows"
            ))),
        }
    }
}
