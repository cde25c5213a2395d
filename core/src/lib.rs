//! # Flashsale Core
//!
//! Admission and execution engine for time-boxed flash sales.
//!
//! A flash sale offers a fixed quantity of one item inside a `[start, end)` window.
//! Under a flood of simultaneous requests each unit must be sold at most once, and each
//! customer may win at most once per item. This crate owns the parts of the system that
//! make that true:
//!
//! - **Token Codec** ([`token`]): per-item access token derived from a server secret
//! - **Sale Catalog** ([`catalog`]): cache-aside read path for sale metadata
//! - **Purchase Ledger** ([`ledger`]): at-most-once purchase record per (item, customer)
//! - **Stock Decrementer** ([`stock`]): conditional decrement-if-positive inside the window
//! - **Admission Gate** ([`gate`]): exposes a sale, with a token, only while it is open
//! - **Execution Controller** ([`execution`]): runs a purchase attempt to a terminal outcome
//! - **Outcome** ([`outcome`]): the closed set of results surfaced to callers
//!
//! ## Where correctness comes from
//!
//! No in-process lock guards stock. Two arbitration points live in the durable store
//! behind [`store::SaleStore`]:
//!
//! 1. a conditional row update (`number > 0` and inside the window) that the store
//!    serializes per row, and
//! 2. a uniqueness constraint on `(sale_id, customer_id)` for ledger inserts.
//!
//! ## Example
//!
//! ```ignore
//! use flashsale_core::{ExecutionMode, FlashSaleService, TokenCodec};
//! use flashsale_core::environment::SystemClock;
//! use std::sync::Arc;
//!
//! let service = FlashSaleService::new(
//!     Arc::new(store),
//!     Arc::new(cache),
//!     TokenCodec::new("server-secret"),
//!     Arc::new(SystemClock),
//!     ExecutionMode::Procedure,
//! );
//!
//! let exposure = service.expose_sale(sale_id).await?;
//! if let Some(token) = exposure.token {
//!     let execution = service.execute(sale_id, customer_id, token.as_str()).await;
//!     println!("{}", execution.state);
//! }
//! ```

#![forbid(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod execution;
pub mod gate;
pub mod ledger;
pub mod metrics;
pub mod outcome;
pub mod service;
pub mod stock;
pub mod store;
pub mod token;
pub mod types;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

pub use catalog::SaleCatalog;
pub use error::{CacheError, StoreError};
pub use execution::{
    ExecutionMode, ExecutionStrategy, ParseExecutionModeError, ProcedureExecution,
    TransactionalExecution,
};
pub use gate::{AdmissionGate, Exposure};
pub use ledger::{LedgerInsert, PurchaseLedger};
pub use outcome::{Execution, OutcomeState};
pub use service::FlashSaleService;
pub use stock::{StockDecrementer, StockUpdate};
pub use store::{SaleCache, SaleStore};
pub use token::{AccessToken, TokenCodec};
pub use types::{CustomerId, PurchaseRecord, SaleId, SaleItem, WindowPosition};

/// Environment module - Dependency injection traits
///
/// All external dependencies that are not storage are abstracted behind traits
/// and injected into the engine components.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system wall clock.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::environment::{Clock, SystemClock};

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
