//! Domain types for flash sales.
//!
//! All identifiers are newtypes over the integer keys used by the durable store so
//! that a sale id can never be passed where a customer id is expected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::outcome::OutcomeState;

/// Unique identifier of a sale item (primary key in the durable store).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SaleId(pub i64);

impl SaleId {
    /// Create a sale id from its raw value.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Raw integer value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for SaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Customer identifier.
///
/// The browsing user is identified by a bare phone number; no authentication is
/// attached to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub i64);

impl CustomerId {
    /// Create a customer id from a phone number.
    #[must_use]
    pub const fn new(phone: i64) -> Self {
        Self(phone)
    }

    /// Raw phone number.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where an instant falls relative to a sale's `[start, end)` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPosition {
    /// `now < start`
    NotStarted,
    /// `start <= now < end`
    Open,
    /// `now >= end`
    Ended,
}

/// A sale item: one product offered in limited quantity inside a time window.
///
/// Timestamps serialize at full precision. A cached copy must carry exactly the
/// window the store compares against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItem {
    /// Primary key
    pub id: SaleId,

    /// Display name
    pub name: String,

    /// Remaining stock (never negative)
    pub stock: u32,

    /// Sale opens at this instant (inclusive)
    pub start_time: DateTime<Utc>,

    /// Sale closes at this instant (exclusive)
    pub end_time: DateTime<Utc>,

    /// When the sale was created
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    /// Position of `now` relative to this sale's window.
    #[must_use]
    pub fn window_position(&self, now: DateTime<Utc>) -> WindowPosition {
        if now < self.start_time {
            WindowPosition::NotStarted
        } else if now >= self.end_time {
            WindowPosition::Ended
        } else {
            WindowPosition::Open
        }
    }

    /// Whether the sale accepts purchases at `now`.
    #[must_use]
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.window_position(now) == WindowPosition::Open
    }
}

/// Ledger entry for one customer's purchase of one sale item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    /// Sale item purchased
    pub sale_id: SaleId,

    /// Purchasing customer
    pub customer_id: CustomerId,

    /// Outcome state recorded with the purchase
    pub state: OutcomeState,

    /// When the purchase was recorded
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn item() -> SaleItem {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();
        SaleItem {
            id: SaleId::new(1000),
            name: "1000 yuan for an iPhone".to_string(),
            stock: 100,
            start_time: start,
            end_time: start + Duration::hours(1),
            created_at: start - Duration::days(1),
        }
    }

    #[test]
    fn window_is_half_open() {
        let item = item();
        assert_eq!(
            item.window_position(item.start_time - Duration::milliseconds(1)),
            WindowPosition::NotStarted
        );
        assert_eq!(item.window_position(item.start_time), WindowPosition::Open);
        assert_eq!(
            item.window_position(item.end_time - Duration::milliseconds(1)),
            WindowPosition::Open
        );
        assert_eq!(item.window_position(item.end_time), WindowPosition::Ended);
    }

    #[test]
    fn sale_item_keeps_sub_millisecond_times() {
        let mut item = item();
        item.start_time += Duration::microseconds(500_700);
        let json = serde_json::to_string(&item).unwrap();
        let back: SaleItem = serde_json::from_str(&json).unwrap();

        assert_eq!(back, item);
        let instant = item.start_time - Duration::microseconds(300);
        assert_eq!(back.is_open_at(instant), item.is_open_at(instant));
    }

    #[test]
    fn ids_display_raw_value() {
        assert_eq!(SaleId::new(7).to_string(), "7");
        assert_eq!(CustomerId::new(13_800_000_000).to_string(), "13800000000");
    }
}
