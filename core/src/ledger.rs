//! Purchase ledger: at-most-once purchase record per (sale, customer).
//!
//! The uniqueness constraint lives in the durable store. Two concurrent inserts for
//! the same pair are arbitrated there; exactly one observes a new row.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::StoreError;
use crate::store::SaleStore;
use crate::types::{CustomerId, PurchaseRecord, SaleId};

/// Result of a ledger insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerInsert {
    /// A new row was written (pending commit of the enclosing transaction).
    Recorded(PurchaseRecord),
    /// The customer already holds a row for this sale.
    Duplicate,
}

/// Ledger of completed purchases.
pub struct PurchaseLedger<S> {
    store: Arc<S>,
}

impl<S> Clone for PurchaseLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: SaleStore> PurchaseLedger<S> {
    /// Create a ledger over `store`.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Record a purchase inside `tx`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] for store failures. A duplicate is
    /// [`LedgerInsert::Duplicate`], not an error.
    pub async fn insert(
        &self,
        tx: &mut S::Transaction,
        sale_id: SaleId,
        customer_id: CustomerId,
        at: DateTime<Utc>,
    ) -> Result<LedgerInsert, StoreError> {
        let inserted = self
            .store
            .insert_purchase(tx, sale_id, customer_id, at)
            .await?;

        Ok(match inserted {
            Some(record) => LedgerInsert::Recorded(record),
            None => {
                tracing::debug!(
                    sale_id = %sale_id,
                    customer_id = %customer_id,
                    "Ledger insert hit existing purchase"
                );
                LedgerInsert::Duplicate
            }
        })
    }

    /// Look up a committed purchase.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    pub async fn lookup(
        &self,
        sale_id: SaleId,
        customer_id: CustomerId,
    ) -> Result<Option<PurchaseRecord>, StoreError> {
        self.store.find_purchase(sale_id, customer_id).await
    }
}
