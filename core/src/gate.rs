//! Admission gate: exposes a sale only while its window is open.
//!
//! Exposure is read-only. The only side effect is the cache population inherent in
//! the catalog read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::catalog::SaleCatalog;
use crate::environment::Clock;
use crate::error::StoreError;
use crate::metrics::EXPOSURES_TOTAL;
use crate::store::{SaleCache, SaleStore};
use crate::token::{AccessToken, TokenCodec};
use crate::types::{SaleId, SaleItem, WindowPosition};

/// Result of asking the gate to expose a sale.
///
/// When the sale exists but is outside its window, `now`, `start` and `end` are
/// filled in so a client can render a countdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exposure {
    /// Whether the sale is open and a token was issued
    pub exposed: bool,

    /// Access token, present only when exposed
    pub token: Option<AccessToken>,

    /// Sale the request targeted
    pub sale_id: SaleId,

    /// Server time at the decision (outside-window only)
    #[serde(with = "chrono::serde::ts_milliseconds_option", default)]
    pub now: Option<DateTime<Utc>>,

    /// Window start (outside-window only)
    #[serde(with = "chrono::serde::ts_milliseconds_option", default)]
    pub start: Option<DateTime<Utc>>,

    /// Window end (outside-window only)
    #[serde(with = "chrono::serde::ts_milliseconds_option", default)]
    pub end: Option<DateTime<Utc>>,
}

impl Exposure {
    /// The sale does not exist.
    #[must_use]
    pub const fn unknown(sale_id: SaleId) -> Self {
        Self {
            exposed: false,
            token: None,
            sale_id,
            now: None,
            start: None,
            end: None,
        }
    }

    /// The sale exists but `now` is outside its window.
    #[must_use]
    pub const fn outside_window(item: &SaleItem, now: DateTime<Utc>) -> Self {
        Self {
            exposed: false,
            token: None,
            sale_id: item.id,
            now: Some(now),
            start: Some(item.start_time),
            end: Some(item.end_time),
        }
    }

    /// The sale is open; `token` grants execution.
    #[must_use]
    pub const fn open(sale_id: SaleId, token: AccessToken) -> Self {
        Self {
            exposed: true,
            token: Some(token),
            sale_id,
            now: None,
            start: None,
            end: None,
        }
    }
}

/// Decides whether a sale is currently open and issues its access token.
pub struct AdmissionGate<S, C> {
    catalog: SaleCatalog<S, C>,
    codec: Arc<TokenCodec>,
    clock: Arc<dyn Clock>,
}

impl<S, C> Clone for AdmissionGate<S, C> {
    fn clone(&self) -> Self {
        Self {
            catalog: self.catalog.clone(),
            codec: Arc::clone(&self.codec),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: SaleStore, C: SaleCache> AdmissionGate<S, C> {
    /// Create a gate.
    #[must_use]
    pub fn new(catalog: SaleCatalog<S, C>, codec: Arc<TokenCodec>, clock: Arc<dyn Clock>) -> Self {
        Self {
            catalog,
            codec,
            clock,
        }
    }

    /// Expose `sale_id` if it exists and its window is open now.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the durable store read fails.
    pub async fn expose(&self, sale_id: SaleId) -> Result<Exposure, StoreError> {
        let Some(item) = self.catalog.get(sale_id).await? else {
            tracing::debug!(sale_id = %sale_id, "Exposure refused: unknown sale");
            metrics::counter!(EXPOSURES_TOTAL, "exposed" => "false").increment(1);
            return Ok(Exposure::unknown(sale_id));
        };

        let now = self.clock.now();
        let position = item.window_position(now);

        if position != WindowPosition::Open {
            tracing::debug!(
                sale_id = %sale_id,
                now = %now,
                start = %item.start_time,
                end = %item.end_time,
                position = ?position,
                "Exposure refused: outside sale window"
            );
            metrics::counter!(EXPOSURES_TOTAL, "exposed" => "false").increment(1);
            return Ok(Exposure::outside_window(&item, now));
        }

        metrics::counter!(EXPOSURES_TOTAL, "exposed" => "true").increment(1);
        Ok(Exposure::open(sale_id, self.codec.derive(sale_id)))
    }
}
