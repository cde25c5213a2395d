//! Application state for Axum handlers.

use flashsale_core::FlashSaleService;
use flashsale_core::environment::Clock;
use std::sync::Arc;

/// Default page size of the sale listing.
pub const DEFAULT_LIST_LIMIT: u32 = 4;

/// Largest page a client may request.
pub const MAX_LIST_LIMIT: u32 = 100;

/// State shared across all sale handlers.
///
/// Cloned per request by Axum; every field is a handle.
pub struct AppState<S, C> {
    /// Engine operations.
    pub service: FlashSaleService<S, C>,

    /// Time source for `/seckill/time/now`.
    pub clock: Arc<dyn Clock>,

    /// Page size used when the listing request names none.
    pub list_limit: u32,
}

impl<S, C> Clone for AppState<S, C> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            clock: Arc::clone(&self.clock),
            list_limit: self.list_limit,
        }
    }
}

impl<S, C> AppState<S, C> {
    /// Create application state with the default listing page size.
    #[must_use]
    pub fn new(service: FlashSaleService<S, C>, clock: Arc<dyn Clock>) -> Self {
        Self {
            service,
            clock,
            list_limit: DEFAULT_LIST_LIMIT,
        }
    }

    /// Override the default listing page size, capped at [`MAX_LIST_LIMIT`].
    #[must_use]
    pub fn with_list_limit(mut self, list_limit: u32) -> Self {
        self.list_limit = list_limit.clamp(1, MAX_LIST_LIMIT);
        self
    }
}
