//! `PostgreSQL` sale store for the flash sale engine.
//!
//! This crate provides the production durable store that implements the `SaleStore`
//! trait from `flashsale-core`. It uses sqlx and supports:
//!
//! - Cache-aside source of truth for sale items
//! - Purchase ledger with a composite-key uniqueness constraint
//! - Conditional, window-scoped stock decrement inside client transactions
//! - The `execute_seckill` stored function for single-round-trip purchases
//!
//! # Example
//!
//! ```ignore
//! use flashsale_postgres::PostgresSaleStore;
//! use sqlx::postgres::PgPoolOptions;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = PgPoolOptions::new().connect("postgres://localhost/seckill").await?;
//!     let store = PostgresSaleStore::new(pool);
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use flashsale_core::StoreError;

mod store;

pub use store::PostgresSaleStore;

/// Map a sqlx error onto the store taxonomy.
///
/// Pool exhaustion and I/O failures are connection errors; everything else is a
/// database error.
pub(crate) fn store_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::ConnectionError(e.to_string())
        }
        _ => StoreError::DatabaseError(e.to_string()),
    }
}
