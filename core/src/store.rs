//! Storage abstractions consumed by the engine.
//!
//! # Implementations
//!
//! - `PostgresSaleStore` (in `flashsale-postgres`): production durable store
//! - `RedisSaleCache` (in `flashsale-redis`): production cache store
//! - `InMemorySaleStore` / `InMemorySaleCache` (in `flashsale-testing`): fast,
//!   deterministic testing
//!
//! # Transactions
//!
//! Mutating ledger and stock operations take `&mut Self::Transaction`. The lifecycle is:
//!
//! 1. [`SaleStore::begin`] starts a transaction
//! 2. [`SaleStore::insert_purchase`] / [`SaleStore::reduce_stock`] run inside it
//! 3. [`SaleStore::commit`] makes both durable, or [`SaleStore::rollback`] discards both
//!
//! A transaction dropped without commit MUST roll back.
//!
//! # Row locks
//!
//! [`SaleStore::reduce_stock`] acquires the sale row's lock and holds it until the
//! transaction ends. Callers keep the distance between that call and commit as short
//! as possible.

use chrono::{DateTime, Utc};
use std::future::Future;

use crate::error::{CacheError, StoreError};
use crate::types::{CustomerId, PurchaseRecord, SaleId, SaleItem};

/// Durable, authoritative store for sale items and the purchase ledger.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync + 'static` so one instance can be shared by
/// every request task.
pub trait SaleStore: Send + Sync + 'static {
    /// In-progress transaction type.
    type Transaction: Send;

    /// Point lookup of a sale item.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn find_sale(
        &self,
        sale_id: SaleId,
    ) -> impl Future<Output = Result<Option<SaleItem>, StoreError>> + Send;

    /// Page through sale items, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn list_sales(
        &self,
        offset: u32,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<SaleItem>, StoreError>> + Send;

    /// Begin a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if no connection is available.
    fn begin(&self) -> impl Future<Output = Result<Self::Transaction, StoreError>> + Send;

    /// Commit a transaction, consuming it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the commit fails; nothing is persisted in that case.
    fn commit(&self, tx: Self::Transaction) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Roll back a transaction, consuming it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the rollback could not be sent.
    fn rollback(
        &self,
        tx: Self::Transaction,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Insert a ledger row for `(sale_id, customer_id)`.
    ///
    /// A uniqueness conflict is not an error: it returns `Ok(None)`. On insert the
    /// new record is returned.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] for any failure other than the uniqueness conflict.
    fn insert_purchase(
        &self,
        tx: &mut Self::Transaction,
        sale_id: SaleId,
        customer_id: CustomerId,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<PurchaseRecord>, StoreError>> + Send;

    /// Decrement stock by one if it is positive and `at` falls inside the sale window.
    ///
    /// Returns the number of rows changed (0 or 1).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the statement fails.
    fn reduce_stock(
        &self,
        tx: &mut Self::Transaction,
        sale_id: SaleId,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Point lookup of a committed ledger row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn find_purchase(
        &self,
        sale_id: SaleId,
        customer_id: CustomerId,
    ) -> impl Future<Output = Result<Option<PurchaseRecord>, StoreError>> + Send;

    /// Run insert + decrement + commit as one atomic store-side procedure.
    ///
    /// Returns the procedure's result code (see
    /// [`OutcomeState::code`](crate::outcome::OutcomeState::code)).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the procedure could not be invoked.
    fn execute_procedure(
        &self,
        sale_id: SaleId,
        customer_id: CustomerId,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<i32, StoreError>> + Send;
}

/// Non-authoritative, best-effort cache of sale items keyed by sale id.
pub trait SaleCache: Send + Sync + 'static {
    /// Look up a cached sale item.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the cache cannot be read or the entry cannot be decoded.
    fn get(
        &self,
        sale_id: SaleId,
    ) -> impl Future<Output = Result<Option<SaleItem>, CacheError>> + Send;

    /// Store (overwrite) a sale item.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the entry cannot be written.
    fn put(&self, item: &SaleItem) -> impl Future<Output = Result<(), CacheError>> + Send;
}
