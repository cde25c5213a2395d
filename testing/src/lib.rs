//! # Flashsale Testing
//!
//! Testing utilities for the flash sale engine.
//!
//! This crate provides:
//! - [`FixedClock`]: deterministic, manually advanced time
//! - [`InMemorySaleStore`]: transactional in-memory durable store; one lock guards
//!   every sale, so concurrent transactions run one at a time even across sales
//! - [`InMemorySaleCache`]: observable, fault-injectable cache
//! - [`FailingSaleStore`]: a store whose every call fails
//! - [`fixtures`]: sale items positioned relative to a clock
//! - [`SaleTestHarness`]: a fully wired service over the in-memory stores
//!
//! ## Example
//!
//! ```ignore
//! use flashsale_testing::{SaleTestHarness, fixtures};
//! use flashsale_core::{CustomerId, ExecutionMode, OutcomeState};
//!
//! #[tokio::test]
//! async fn buys_last_unit() {
//!     let harness = SaleTestHarness::new(ExecutionMode::Transaction);
//!     let sale = fixtures::open_sale(1000, 1, harness.now());
//!     let sale_id = sale.id;
//!     let harness = harness.with_sale(sale).await;
//!
//!     let execution = harness.execute(sale_id, CustomerId::new(13_800_000_000)).await;
//!     assert_eq!(execution.state, OutcomeState::Success);
//! }
//! ```

use chrono::{DateTime, Utc};
use flashsale_core::environment::Clock;

mod cache_mocks;
mod harness;
mod store_mocks;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::Duration;
    use std::sync::{Arc, PoisonError, RwLock};

    /// Fixed clock for deterministic tests
    ///
    /// Returns the same time until moved with [`FixedClock::set`] or
    /// [`FixedClock::advance`]. Clones share the same time, so a test can keep a
    /// handle and move the clock the engine reads.
    ///
    /// # Example
    ///
    /// ```
    /// use flashsale_testing::mocks::FixedClock;
    /// use flashsale_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// assert_eq!(time1, clock.now());
    ///
    /// clock.advance(Duration::seconds(5));
    /// assert_eq!(clock.now() - time1, Duration::seconds(5));
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: Arc<RwLock<DateTime<Utc>>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(RwLock::new(time)),
            }
        }

        /// Move the clock to `time`.
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.write().unwrap_or_else(PoisonError::into_inner) = time;
        }

        /// Move the clock forward (or backward, for a negative `by`).
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.write().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.read().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Sale items positioned relative to a reference instant.
pub mod fixtures {
    use chrono::{DateTime, Duration, Utc};
    use flashsale_core::{SaleId, SaleItem};

    /// Salt used by [`crate::SaleTestHarness`] and the HTTP tests.
    pub const TEST_SALT: &str = "asfasdfhas8er7fdyhfa";

    /// A sale item with an explicit window.
    #[must_use]
    pub fn sale_item(
        id: i64,
        stock: u32,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> SaleItem {
        SaleItem {
            id: SaleId::new(id),
            name: format!("{stock} units of item {id}"),
            stock,
            start_time,
            end_time,
            created_at: start_time - Duration::days(1),
        }
    }

    /// A sale that opened an hour before `now` and closes an hour after.
    #[must_use]
    pub fn open_sale(id: i64, stock: u32, now: DateTime<Utc>) -> SaleItem {
        sale_item(id, stock, now - Duration::hours(1), now + Duration::hours(1))
    }

    /// A sale that opens an hour after `now`.
    #[must_use]
    pub fn upcoming_sale(id: i64, stock: u32, now: DateTime<Utc>) -> SaleItem {
        sale_item(id, stock, now + Duration::hours(1), now + Duration::hours(2))
    }

    /// A sale that closed an hour before `now`.
    #[must_use]
    pub fn ended_sale(id: i64, stock: u32, now: DateTime<Utc>) -> SaleItem {
        sale_item(id, stock, now - Duration::hours(2), now - Duration::hours(1))
    }
}

// Re-export commonly used items
pub use cache_mocks::InMemorySaleCache;
pub use harness::SaleTestHarness;
pub use mocks::{FixedClock, test_clock};
pub use store_mocks::{FailingSaleStore, InMemorySaleStore, InMemoryTransaction};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn clones_share_time() {
        let clock = test_clock();
        let handle = clock.clone();
        handle.advance(Duration::minutes(3));
        assert_eq!(clock.now(), handle.now());
        assert_eq!(clock.now() - test_clock().now(), Duration::minutes(3));
    }

    #[test]
    fn fixture_windows_are_positioned_around_now() {
        let now = test_clock().now();
        assert!(fixtures::open_sale(1, 1, now).is_open_at(now));
        assert!(!fixtures::upcoming_sale(1, 1, now).is_open_at(now));
        assert!(!fixtures::ended_sale(1, 1, now).is_open_at(now));
    }
}
