//! Flash sale service: the operations callers use.
//!
//! Wires the catalog, gate, ledger and the configured execution strategy together
//! over one store and one cache.

use std::sync::Arc;

use crate::catalog::SaleCatalog;
use crate::environment::Clock;
use crate::error::StoreError;
use crate::execution::{ExecutionMode, ExecutionStrategy};
use crate::gate::{AdmissionGate, Exposure};
use crate::ledger::PurchaseLedger;
use crate::outcome::Execution;
use crate::store::{SaleCache, SaleStore};
use crate::token::TokenCodec;
use crate::types::{CustomerId, PurchaseRecord, SaleId, SaleItem};

/// Entry point for browsing, exposing and executing flash sales.
pub struct FlashSaleService<S, C> {
    catalog: SaleCatalog<S, C>,
    gate: AdmissionGate<S, C>,
    ledger: PurchaseLedger<S>,
    strategy: Arc<dyn ExecutionStrategy>,
}

impl<S, C> Clone for FlashSaleService<S, C> {
    fn clone(&self) -> Self {
        Self {
            catalog: self.catalog.clone(),
            gate: self.gate.clone(),
            ledger: self.ledger.clone(),
            strategy: Arc::clone(&self.strategy),
        }
    }
}

impl<S: SaleStore, C: SaleCache> FlashSaleService<S, C> {
    /// Create a service using the strategy selected by `mode`.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        cache: Arc<C>,
        codec: TokenCodec,
        clock: Arc<dyn Clock>,
        mode: ExecutionMode,
    ) -> Self {
        let codec = Arc::new(codec);
        let strategy = mode.build(Arc::clone(&store), Arc::clone(&codec), Arc::clone(&clock));
        Self::with_strategy(store, cache, codec, clock, strategy)
    }

    /// Create a service with an explicit execution strategy.
    #[must_use]
    pub fn with_strategy(
        store: Arc<S>,
        cache: Arc<C>,
        codec: Arc<TokenCodec>,
        clock: Arc<dyn Clock>,
        strategy: Arc<dyn ExecutionStrategy>,
    ) -> Self {
        let catalog = SaleCatalog::new(Arc::clone(&store), cache);
        Self {
            gate: AdmissionGate::new(catalog.clone(), codec, clock),
            catalog,
            ledger: PurchaseLedger::new(store),
            strategy,
        }
    }

    /// Name of the active execution strategy.
    #[must_use]
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Page through sales.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store query fails.
    pub async fn list_sales(&self, offset: u32, limit: u32) -> Result<Vec<SaleItem>, StoreError> {
        self.catalog.list(offset, limit).await
    }

    /// Fetch one sale through the cache.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store read fails.
    pub async fn get_sale(&self, sale_id: SaleId) -> Result<Option<SaleItem>, StoreError> {
        self.catalog.get(sale_id).await
    }

    /// Expose a sale if it is open now.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store read fails.
    pub async fn expose_sale(&self, sale_id: SaleId) -> Result<Exposure, StoreError> {
        self.gate.expose(sale_id).await
    }

    /// Attempt one purchase. Always resolves to an outcome.
    pub async fn execute(
        &self,
        sale_id: SaleId,
        customer_id: CustomerId,
        token: &str,
    ) -> Execution {
        self.strategy.execute(sale_id, customer_id, token).await
    }

    /// Look up a customer's committed purchase of a sale.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    pub async fn find_purchase(
        &self,
        sale_id: SaleId,
        customer_id: CustomerId,
    ) -> Result<Option<PurchaseRecord>, StoreError> {
        self.ledger.lookup(sale_id, customer_id).await
    }
}
