//! Outcome state machine.
//!
//! Every purchase attempt ends in exactly one [`OutcomeState`]. Expected business
//! results (duplicate, sold out, bad token) are values here, never errors.
//!
//! Each state also has a stable integer code. The store-side purchase procedure
//! reports its result with these codes, and the ledger persists the code of the
//! recorded state.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{PurchaseRecord, SaleId};

/// Terminal result of one purchase attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeState {
    /// The purchase was recorded and one unit of stock consumed.
    Success,
    /// The customer already holds a purchase for this sale.
    RepeatKill,
    /// Sold out, or outside the sale window.
    Closed,
    /// Token missing or not derived for this sale.
    InvalidToken,
    /// A collaborator failed unexpectedly.
    InnerError,
}

impl OutcomeState {
    /// All states, in code order from highest to lowest.
    pub const ALL: [Self; 5] = [
        Self::Success,
        Self::Closed,
        Self::RepeatKill,
        Self::InnerError,
        Self::InvalidToken,
    ];

    /// Integer code shared with the store-side procedure.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Success => 1,
            Self::Closed => 0,
            Self::RepeatKill => -1,
            Self::InnerError => -2,
            Self::InvalidToken => -3,
        }
    }

    /// Map a result code back to a state.
    ///
    /// Unknown codes are treated as [`OutcomeState::InnerError`]: the store answered
    /// with something this engine cannot interpret.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Success,
            0 => Self::Closed,
            -1 => Self::RepeatKill,
            -3 => Self::InvalidToken,
            _ => Self::InnerError,
        }
    }

    /// Stable machine-readable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::RepeatKill => "REPEAT_KILL",
            Self::Closed => "CLOSED",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::InnerError => "INNER_ERROR",
        }
    }

    /// Human-readable description for display.
    #[must_use]
    pub const fn info(self) -> &'static str {
        match self {
            Self::Success => "purchase succeeded",
            Self::RepeatKill => "repeated purchase",
            Self::Closed => "sale closed",
            Self::InvalidToken => "sale data rewritten",
            Self::InnerError => "internal error",
        }
    }

    /// Whether this is the winning state.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for OutcomeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of executing one purchase attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    /// Sale the attempt targeted
    pub sale_id: SaleId,

    /// Terminal state
    pub state: OutcomeState,

    /// The ledger record, present on success
    pub purchase: Option<PurchaseRecord>,
}

impl Execution {
    /// A successful attempt carrying its ledger record.
    #[must_use]
    pub const fn success(purchase: PurchaseRecord) -> Self {
        Self {
            sale_id: purchase.sale_id,
            state: OutcomeState::Success,
            purchase: Some(purchase),
        }
    }

    /// An attempt that ended in `state` without a record to return.
    #[must_use]
    pub const fn without_record(sale_id: SaleId, state: OutcomeState) -> Self {
        Self {
            sale_id,
            state,
            purchase: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_for_every_state() {
        for state in OutcomeState::ALL {
            assert_eq!(OutcomeState::from_code(state.code()), state);
        }
    }

    #[test]
    fn unknown_code_is_inner_error() {
        assert_eq!(OutcomeState::from_code(42), OutcomeState::InnerError);
        assert_eq!(OutcomeState::from_code(-99), OutcomeState::InnerError);
    }

    #[test]
    fn serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&OutcomeState::RepeatKill).unwrap();
        assert_eq!(json, "\"REPEAT_KILL\"");
        assert_eq!(OutcomeState::InvalidToken.to_string(), "INVALID_TOKEN");
    }

    #[test]
    fn only_success_is_success() {
        let winners: Vec<_> = OutcomeState::ALL
            .into_iter()
            .filter(|s| s.is_success())
            .collect();
        assert_eq!(winners, vec![OutcomeState::Success]);
    }
}
