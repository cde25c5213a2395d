//! In-memory durable store for fast, deterministic testing.
//!
//! [`InMemorySaleStore`] honours the same contract as the Postgres store:
//!
//! - a transaction holds the table lock from `begin` until it ends, which stands in
//!   for the row locks a real database takes on the first write
//! - a transaction dropped without commit rolls back
//! - duplicate ledger inserts are silent (`Ok(None)`)
//! - the conditional decrement only touches stock inside the open window
//!
//! The lock covers every sale, so transactions on different sales also queue behind
//! each other. Postgres locks only the touched rows. Outcomes are the same, but
//! cross-sale throughput cannot be measured here; the Docker-backed tests in
//! `flashsale-postgres` exercise real row locking.
//!
//! Faults can be switched on to exercise the engine's error mapping.

use chrono::{DateTime, Utc};
use flashsale_core::{
    CustomerId, OutcomeState, PurchaseRecord, SaleId, SaleItem, SaleStore, StoreError,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
struct Tables {
    sales: BTreeMap<SaleId, SaleItem>,
    purchases: HashMap<(SaleId, CustomerId), PurchaseRecord>,
}

#[derive(Debug, Default)]
struct Faults {
    commit: AtomicBool,
    lookup: AtomicBool,
    rollback: AtomicBool,
}

/// Undo step recorded by a write inside a transaction.
#[derive(Debug, Clone, Copy)]
enum Undo {
    Purchase(SaleId, CustomerId),
    Stock(SaleId),
}

/// In-progress transaction on an [`InMemorySaleStore`].
///
/// Holds the table lock for its whole life. Dropping it without
/// [`SaleStore::commit`] reverts every write it made.
pub struct InMemoryTransaction {
    tables: OwnedMutexGuard<Tables>,
    undo: Vec<Undo>,
}

impl InMemoryTransaction {
    fn revert(&mut self) {
        while let Some(step) = self.undo.pop() {
            match step {
                Undo::Purchase(sale_id, customer_id) => {
                    self.tables.purchases.remove(&(sale_id, customer_id));
                }
                Undo::Stock(sale_id) => {
                    if let Some(item) = self.tables.sales.get_mut(&sale_id) {
                        item.stock += 1;
                    }
                }
            }
        }
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        self.revert();
    }
}

/// Transactional in-memory [`SaleStore`].
///
/// Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemorySaleStore {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<Faults>,
    sale_reads: Arc<AtomicUsize>,
}

impl InMemorySaleStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a sale item.
    pub async fn insert_sale(&self, item: SaleItem) {
        self.tables.lock().await.sales.insert(item.id, item);
    }

    /// Overwrite the remaining stock of a sale.
    pub async fn set_stock(&self, sale_id: SaleId, stock: u32) {
        if let Some(item) = self.tables.lock().await.sales.get_mut(&sale_id) {
            item.stock = stock;
        }
    }

    /// Remaining stock of a sale.
    pub async fn stock(&self, sale_id: SaleId) -> Option<u32> {
        self.tables
            .lock()
            .await
            .sales
            .get(&sale_id)
            .map(|item| item.stock)
    }

    /// All committed purchases of a sale.
    pub async fn purchases_of(&self, sale_id: SaleId) -> Vec<PurchaseRecord> {
        let tables = self.tables.lock().await;
        let mut records: Vec<_> = tables
            .purchases
            .values()
            .filter(|record| record.sale_id == sale_id)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.customer_id);
        records
    }

    /// Number of `find_sale` calls served so far.
    #[must_use]
    pub fn sale_reads(&self) -> usize {
        self.sale_reads.load(Ordering::SeqCst)
    }

    /// Make every subsequent commit fail (the transaction then rolls back).
    pub fn fail_commits(&self, fail: bool) {
        self.faults.commit.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent explicit rollback report failure. The transaction is
    /// still dropped, so its writes are reverted either way.
    pub fn fail_rollbacks(&self, fail: bool) {
        self.faults.rollback.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `find_purchase` fail.
    pub fn fail_lookups(&self, fail: bool) {
        self.faults.lookup.store(fail, Ordering::SeqCst);
    }

    fn commit_fault(&self) -> Option<StoreError> {
        self.faults
            .commit
            .load(Ordering::SeqCst)
            .then(|| StoreError::DatabaseError("injected commit failure".to_string()))
    }
}

impl SaleStore for InMemorySaleStore {
    type Transaction = InMemoryTransaction;

    async fn find_sale(&self, sale_id: SaleId) -> Result<Option<SaleItem>, StoreError> {
        self.sale_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.tables.lock().await.sales.get(&sale_id).cloned())
    }

    async fn list_sales(&self, offset: u32, limit: u32) -> Result<Vec<SaleItem>, StoreError> {
        let tables = self.tables.lock().await;
        let mut items: Vec<_> = tables.sales.values().cloned().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(items
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn begin(&self) -> Result<InMemoryTransaction, StoreError> {
        Ok(InMemoryTransaction {
            tables: Arc::clone(&self.tables).lock_owned().await,
            undo: Vec::new(),
        })
    }

    async fn commit(&self, mut tx: InMemoryTransaction) -> Result<(), StoreError> {
        if let Some(e) = self.commit_fault() {
            return Err(e);
        }
        tx.undo.clear();
        Ok(())
    }

    async fn rollback(&self, tx: InMemoryTransaction) -> Result<(), StoreError> {
        drop(tx);
        if self.faults.rollback.load(Ordering::SeqCst) {
            return Err(StoreError::DatabaseError(
                "injected rollback failure".to_string(),
            ));
        }
        Ok(())
    }

    async fn insert_purchase(
        &self,
        tx: &mut InMemoryTransaction,
        sale_id: SaleId,
        customer_id: CustomerId,
        at: DateTime<Utc>,
    ) -> Result<Option<PurchaseRecord>, StoreError> {
        let key = (sale_id, customer_id);
        if tx.tables.purchases.contains_key(&key) {
            return Ok(None);
        }

        let record = PurchaseRecord {
            sale_id,
            customer_id,
            state: OutcomeState::Success,
            created_at: at,
        };
        tx.tables.purchases.insert(key, record.clone());
        tx.undo.push(Undo::Purchase(sale_id, customer_id));
        Ok(Some(record))
    }

    async fn reduce_stock(
        &self,
        tx: &mut InMemoryTransaction,
        sale_id: SaleId,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let Some(item) = tx.tables.sales.get_mut(&sale_id) else {
            return Ok(0);
        };
        if item.stock == 0 || !item.is_open_at(at) {
            return Ok(0);
        }

        item.stock -= 1;
        tx.undo.push(Undo::Stock(sale_id));
        Ok(1)
    }

    async fn find_purchase(
        &self,
        sale_id: SaleId,
        customer_id: CustomerId,
    ) -> Result<Option<PurchaseRecord>, StoreError> {
        if self.faults.lookup.load(Ordering::SeqCst) {
            return Err(StoreError::ConnectionError(
                "injected lookup failure".to_string(),
            ));
        }
        Ok(self
            .tables
            .lock()
            .await
            .purchases
            .get(&(sale_id, customer_id))
            .cloned())
    }

    /// Same sequence the Postgres function runs, under one lock acquisition.
    async fn execute_procedure(
        &self,
        sale_id: SaleId,
        customer_id: CustomerId,
        at: DateTime<Utc>,
    ) -> Result<i32, StoreError> {
        let mut tx = self.begin().await?;

        if self
            .insert_purchase(&mut tx, sale_id, customer_id, at)
            .await?
            .is_none()
        {
            return Ok(OutcomeState::RepeatKill.code());
        }

        if self.reduce_stock(&mut tx, sale_id, at).await? == 0 {
            return Ok(OutcomeState::Closed.code());
        }

        if self.commit(tx).await.is_err() {
            return Ok(OutcomeState::InnerError.code());
        }
        Ok(OutcomeState::Success.code())
    }
}

/// A [`SaleStore`] whose every operation fails with a connection error.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingSaleStore;

impl FailingSaleStore {
    fn error() -> StoreError {
        StoreError::ConnectionError("store unavailable".to_string())
    }
}

impl SaleStore for FailingSaleStore {
    type Transaction = ();

    async fn find_sale(&self, _sale_id: SaleId) -> Result<Option<SaleItem>, StoreError> {
        Err(Self::error())
    }

    async fn list_sales(&self, _offset: u32, _limit: u32) -> Result<Vec<SaleItem>, StoreError> {
        Err(Self::error())
    }

    async fn begin(&self) -> Result<(), StoreError> {
        Err(Self::error())
    }

    async fn commit(&self, _tx: ()) -> Result<(), StoreError> {
        Err(Self::error())
    }

    async fn rollback(&self, _tx: ()) -> Result<(), StoreError> {
        Err(Self::error())
    }

    async fn insert_purchase(
        &self,
        _tx: &mut (),
        _sale_id: SaleId,
        _customer_id: CustomerId,
        _at: DateTime<Utc>,
    ) -> Result<Option<PurchaseRecord>, StoreError> {
        Err(Self::error())
    }

    async fn reduce_stock(
        &self,
        _tx: &mut (),
        _sale_id: SaleId,
        _at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        Err(Self::error())
    }

    async fn find_purchase(
        &self,
        _sale_id: SaleId,
        _customer_id: CustomerId,
    ) -> Result<Option<PurchaseRecord>, StoreError> {
        Err(Self::error())
    }

    async fn execute_procedure(
        &self,
        _sale_id: SaleId,
        _customer_id: CustomerId,
        _at: DateTime<Utc>,
    ) -> Result<i32, StoreError> {
        Err(Self::error())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{fixtures, test_clock};
    use flashsale_core::environment::Clock;

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let now = test_clock().now();
        let store = InMemorySaleStore::new();
        store.insert_sale(fixtures::open_sale(1, 3, now)).await;

        {
            let mut tx = store.begin().await.unwrap();
            let inserted = store
                .insert_purchase(&mut tx, SaleId::new(1), CustomerId::new(7), now)
                .await
                .unwrap();
            assert!(inserted.is_some());
            assert_eq!(store.reduce_stock(&mut tx, SaleId::new(1), now).await.unwrap(), 1);
        }

        assert_eq!(store.stock(SaleId::new(1)).await, Some(3));
        assert!(store.purchases_of(SaleId::new(1)).await.is_empty());
    }

    #[tokio::test]
    async fn open_transaction_blocks_other_sales() {
        let store = InMemorySaleStore::new();
        let held = store.begin().await.unwrap();

        let waiting =
            tokio::time::timeout(std::time::Duration::from_millis(50), store.begin()).await;
        assert!(waiting.is_err());

        store.rollback(held).await.unwrap();
        assert!(store.begin().await.is_ok());
    }

    #[tokio::test]
    async fn failed_rollback_still_reverts() {
        let now = test_clock().now();
        let store = InMemorySaleStore::new();
        store.insert_sale(fixtures::open_sale(1, 3, now)).await;
        store.fail_rollbacks(true);

        let mut tx = store.begin().await.unwrap();
        store.reduce_stock(&mut tx, SaleId::new(1), now).await.unwrap();
        assert!(store.rollback(tx).await.is_err());

        assert_eq!(store.stock(SaleId::new(1)).await, Some(3));
    }

    #[tokio::test]
    async fn commit_keeps_writes() {
        let now = test_clock().now();
        let store = InMemorySaleStore::new();
        store.insert_sale(fixtures::open_sale(1, 3, now)).await;

        let mut tx = store.begin().await.unwrap();
        store
            .insert_purchase(&mut tx, SaleId::new(1), CustomerId::new(7), now)
            .await
            .unwrap();
        store.reduce_stock(&mut tx, SaleId::new(1), now).await.unwrap();
        store.commit(tx).await.unwrap();

        assert_eq!(store.stock(SaleId::new(1)).await, Some(2));
        assert_eq!(store.purchases_of(SaleId::new(1)).await.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_insert_is_silent() {
        let now = test_clock().now();
        let store = InMemorySaleStore::new();
        let mut tx = store.begin().await.unwrap();

        let first = store
            .insert_purchase(&mut tx, SaleId::new(1), CustomerId::new(7), now)
            .await
            .unwrap();
        let second = store
            .insert_purchase(&mut tx, SaleId::new(1), CustomerId::new(7), now)
            .await
            .unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn decrement_respects_window_end() {
        let now = test_clock().now();
        let store = InMemorySaleStore::new();
        let item = fixtures::open_sale(1, 3, now);
        let end = item.end_time;
        store.insert_sale(item).await;

        let mut tx = store.begin().await.unwrap();
        assert_eq!(store.reduce_stock(&mut tx, SaleId::new(1), end).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn listing_is_newest_first_and_paged() {
        let now = test_clock().now();
        let store = InMemorySaleStore::new();
        for id in 1..=5 {
            let mut item = fixtures::open_sale(id, 1, now);
            item.created_at = now + chrono::Duration::minutes(id);
            store.insert_sale(item).await;
        }

        let page = store.list_sales(1, 2).await.unwrap();
        let ids: Vec<_> = page.iter().map(|item| item.id.get()).collect();
        assert_eq!(ids, vec![4, 3]);
    }

    #[tokio::test]
    async fn procedure_reports_commit_failure_as_inner_error() {
        let now = test_clock().now();
        let store = InMemorySaleStore::new();
        store.insert_sale(fixtures::open_sale(1, 3, now)).await;
        store.fail_commits(true);

        let code = store
            .execute_procedure(SaleId::new(1), CustomerId::new(7), now)
            .await
            .unwrap();

        assert_eq!(code, OutcomeState::InnerError.code());
        assert_eq!(store.stock(SaleId::new(1)).await, Some(3));
    }
}
