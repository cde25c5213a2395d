//! Fully wired service over the in-memory stores.

use flashsale_core::environment::Clock;
use flashsale_core::{
    AccessToken, CustomerId, Execution, ExecutionMode, FlashSaleService, SaleId, SaleItem,
    TokenCodec,
};
use std::sync::Arc;

use crate::fixtures::TEST_SALT;
use crate::{FixedClock, InMemorySaleCache, InMemorySaleStore, test_clock};

/// A [`FlashSaleService`] plus handles on everything it reads.
///
/// The store, cache and clock fields share state with the ones inside `service`, so a
/// test can seed data, move time and inspect results.
pub struct SaleTestHarness {
    /// Durable store handle
    pub store: Arc<InMemorySaleStore>,
    /// Cache handle
    pub cache: Arc<InMemorySaleCache>,
    /// Clock handle
    pub clock: FixedClock,
    /// Codec with the service's salt
    pub codec: TokenCodec,
    /// The service under test
    pub service: FlashSaleService<InMemorySaleStore, InMemorySaleCache>,
}

impl SaleTestHarness {
    /// Build a harness running `mode`, with the clock at [`test_clock`].
    #[must_use]
    pub fn new(mode: ExecutionMode) -> Self {
        let store = Arc::new(InMemorySaleStore::new());
        let cache = Arc::new(InMemorySaleCache::new());
        let clock = test_clock();
        let codec = TokenCodec::new(TEST_SALT);

        let service = FlashSaleService::new(
            Arc::clone(&store),
            Arc::clone(&cache),
            codec.clone(),
            Arc::new(clock.clone()),
            mode,
        );

        Self {
            store,
            cache,
            clock,
            codec,
            service,
        }
    }

    /// Store `item` in the durable store.
    pub async fn with_sale(self, item: SaleItem) -> Self {
        self.store.insert_sale(item).await;
        self
    }

    /// Token the service issues for `sale_id`.
    #[must_use]
    pub fn token(&self, sale_id: SaleId) -> AccessToken {
        self.codec.derive(sale_id)
    }

    /// Execute with the correct token for `sale_id`.
    pub async fn execute(&self, sale_id: SaleId, customer_id: CustomerId) -> Execution {
        let token = self.token(sale_id);
        self.service
            .execute(sale_id, customer_id, token.as_str())
            .await
    }

    /// Current harness time.
    #[must_use]
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }
}
