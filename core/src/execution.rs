//! Execution controller: resolves a purchase attempt to a terminal outcome.
//!
//! Two interchangeable strategies implement [`ExecutionStrategy`]:
//!
//! - [`TransactionalExecution`] drives ledger insert and stock decrement from the
//!   client inside one store transaction.
//! - [`ProcedureExecution`] hands the whole sequence to one atomic store-side
//!   procedure in a single round trip.
//!
//! The stock row lock is held from the decrement until the transaction ends. The
//! procedure strategy keeps that interval inside the store, which is why it is the
//! default.
//!
//! # Flow (transactional)
//!
//! ```text
//! verify token ──✗──▶ INVALID_TOKEN            (store untouched)
//!      │
//!   BEGIN
//!      │
//! ledger insert ──0──▶ ROLLBACK ─▶ REPEAT_KILL
//!      │
//! stock decrement ─0─▶ ROLLBACK ─▶ CLOSED       (no ledger row survives)
//!      │
//!   COMMIT ─▶ SUCCESS
//!
//! any store error ──▶ (tx dropped = rollback) ─▶ INNER_ERROR
//! ```

use chrono::{DateTime, Utc};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

use crate::environment::Clock;
use crate::error::StoreError;
use crate::ledger::{LedgerInsert, PurchaseLedger};
use crate::metrics::EXECUTIONS_TOTAL;
use crate::outcome::{Execution, OutcomeState};
use crate::stock::{StockDecrementer, StockUpdate};
use crate::store::SaleStore;
use crate::token::TokenCodec;
use crate::types::{CustomerId, SaleId};

/// A way of executing purchase attempts.
///
/// Every call returns an [`Execution`]; collaborator failures are logged and
/// reported as [`OutcomeState::InnerError`], never propagated.
///
/// # Dyn Compatibility
///
/// Uses an explicit `Pin<Box<dyn Future>>` return so strategies can be selected at
/// runtime and held as `Arc<dyn ExecutionStrategy>`.
pub trait ExecutionStrategy: Send + Sync {
    /// Short name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Attempt to purchase one unit of `sale_id` for `customer_id`, presenting `token`.
    fn execute<'a>(
        &'a self,
        sale_id: SaleId,
        customer_id: CustomerId,
        token: &'a str,
    ) -> Pin<Box<dyn Future<Output = Execution> + Send + 'a>>;
}

/// Configuration switch between the two strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Client-orchestrated transaction.
    Transaction,
    /// Store-orchestrated atomic procedure.
    #[default]
    Procedure,
}

impl ExecutionMode {
    /// Configuration string for this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transaction => "transaction",
            Self::Procedure => "procedure",
        }
    }

    /// Build the strategy this mode selects.
    #[must_use]
    pub fn build<S: SaleStore>(
        self,
        store: Arc<S>,
        codec: Arc<TokenCodec>,
        clock: Arc<dyn Clock>,
    ) -> Arc<dyn ExecutionStrategy> {
        match self {
            Self::Transaction => Arc::new(TransactionalExecution::new(store, codec, clock)),
            Self::Procedure => Arc::new(ProcedureExecution::new(store, codec, clock)),
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown execution mode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown execution mode: {0} (expected \"transaction\" or \"procedure\")")]
pub struct ParseExecutionModeError(String);

impl FromStr for ExecutionMode {
    type Err = ParseExecutionModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transaction" => Ok(Self::Transaction),
            "procedure" => Ok(Self::Procedure),
            other => Err(ParseExecutionModeError(other.to_string())),
        }
    }
}

/// Log and count a finished attempt.
fn record(strategy: &'static str, customer_id: CustomerId, execution: &Execution) {
    metrics::counter!(
        EXECUTIONS_TOTAL,
        "strategy" => strategy,
        "state" => execution.state.as_str()
    )
    .increment(1);

    match execution.state {
        OutcomeState::Success => tracing::info!(
            strategy,
            sale_id = %execution.sale_id,
            customer_id = %customer_id,
            "Purchase succeeded"
        ),
        OutcomeState::InvalidToken => tracing::warn!(
            strategy,
            sale_id = %execution.sale_id,
            customer_id = %customer_id,
            "Purchase rejected: token mismatch"
        ),
        OutcomeState::RepeatKill | OutcomeState::Closed | OutcomeState::InnerError => {
            tracing::debug!(
                strategy,
                sale_id = %execution.sale_id,
                customer_id = %customer_id,
                state = %execution.state,
                "Purchase attempt finished"
            );
        }
    }
}

/// Downgrade a collaborator failure to `INNER_ERROR`.
fn inner_error(
    strategy: &'static str,
    sale_id: SaleId,
    customer_id: CustomerId,
    error: &StoreError,
) -> Execution {
    tracing::error!(
        strategy,
        sale_id = %sale_id,
        customer_id = %customer_id,
        error = %error,
        "Purchase attempt failed in store"
    );
    Execution::without_record(sale_id, OutcomeState::InnerError)
}

/// Client-orchestrated strategy: ledger insert and stock decrement in one transaction.
pub struct TransactionalExecution<S> {
    store: Arc<S>,
    ledger: PurchaseLedger<S>,
    stock: StockDecrementer<S>,
    codec: Arc<TokenCodec>,
    clock: Arc<dyn Clock>,
}

impl<S: SaleStore> TransactionalExecution<S> {
    const NAME: &'static str = "transaction";

    /// Create the strategy.
    #[must_use]
    pub fn new(store: Arc<S>, codec: Arc<TokenCodec>, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger: PurchaseLedger::new(Arc::clone(&store)),
            stock: StockDecrementer::new(Arc::clone(&store)),
            store,
            codec,
            clock,
        }
    }

    async fn run(&self, sale_id: SaleId, customer_id: CustomerId, token: &str) -> Execution {
        if !self.codec.verify(sale_id, token) {
            return Execution::without_record(sale_id, OutcomeState::InvalidToken);
        }

        let now = self.clock.now();
        match self.attempt(sale_id, customer_id, now).await {
            Ok(execution) => execution,
            Err(e) => inner_error(Self::NAME, sale_id, customer_id, &e),
        }
    }

    /// Steps 2-4. Returning early with `?` drops the transaction, which rolls it back.
    async fn attempt(
        &self,
        sale_id: SaleId,
        customer_id: CustomerId,
        now: DateTime<Utc>,
    ) -> Result<Execution, StoreError> {
        let mut tx = self.store.begin().await?;

        let record = match self.ledger.insert(&mut tx, sale_id, customer_id, now).await? {
            LedgerInsert::Recorded(record) => record,
            LedgerInsert::Duplicate => {
                self.discard(tx, sale_id).await;
                return Ok(Execution::without_record(sale_id, OutcomeState::RepeatKill));
            }
        };

        if self.stock.reduce(&mut tx, sale_id, now).await? == StockUpdate::Unavailable {
            // The ledger row written above must not outlive a CLOSED outcome.
            self.discard(tx, sale_id).await;
            return Ok(Execution::without_record(sale_id, OutcomeState::Closed));
        }

        self.store.commit(tx).await?;
        Ok(Execution::success(record))
    }

    /// Roll back a transaction whose outcome is already decided. A failed rollback
    /// still ends the transaction when it is dropped, so it does not change the outcome.
    async fn discard(&self, tx: S::Transaction, sale_id: SaleId) {
        if let Err(e) = self.store.rollback(tx).await {
            tracing::warn!(
                strategy = Self::NAME,
                sale_id = %sale_id,
                error = %e,
                "Rollback failed; transaction discarded on drop"
            );
        }
    }
}

impl<S: SaleStore> ExecutionStrategy for TransactionalExecution<S> {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn execute<'a>(
        &'a self,
        sale_id: SaleId,
        customer_id: CustomerId,
        token: &'a str,
    ) -> Pin<Box<dyn Future<Output = Execution> + Send + 'a>> {
        Box::pin(async move {
            let execution = self.run(sale_id, customer_id, token).await;
            record(Self::NAME, customer_id, &execution);
            execution
        })
    }
}

/// Store-orchestrated strategy: one atomic procedure call per attempt.
pub struct ProcedureExecution<S> {
    store: Arc<S>,
    ledger: PurchaseLedger<S>,
    codec: Arc<TokenCodec>,
    clock: Arc<dyn Clock>,
}

impl<S: SaleStore> ProcedureExecution<S> {
    const NAME: &'static str = "procedure";

    /// Create the strategy.
    #[must_use]
    pub fn new(store: Arc<S>, codec: Arc<TokenCodec>, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger: PurchaseLedger::new(Arc::clone(&store)),
            store,
            codec,
            clock,
        }
    }

    async fn run(&self, sale_id: SaleId, customer_id: CustomerId, token: &str) -> Execution {
        if !self.codec.verify(sale_id, token) {
            return Execution::without_record(sale_id, OutcomeState::InvalidToken);
        }

        let now = self.clock.now();
        let code = match self.store.execute_procedure(sale_id, customer_id, now).await {
            Ok(code) => code,
            Err(e) => return inner_error(Self::NAME, sale_id, customer_id, &e),
        };

        let state = OutcomeState::from_code(code);
        if !state.is_success() {
            if state == OutcomeState::InnerError {
                tracing::error!(
                    strategy = Self::NAME,
                    sale_id = %sale_id,
                    customer_id = %customer_id,
                    code,
                    "Purchase procedure reported an internal error"
                );
            }
            return Execution::without_record(sale_id, state);
        }

        // The purchase is committed at this point; a failed lookup only loses the
        // record in the response, not the outcome.
        match self.ledger.lookup(sale_id, customer_id).await {
            Ok(Some(record)) => Execution::success(record),
            Ok(None) => {
                tracing::warn!(
                    sale_id = %sale_id,
                    customer_id = %customer_id,
                    "Committed purchase not found on lookup"
                );
                Execution::without_record(sale_id, OutcomeState::Success)
            }
            Err(e) => {
                tracing::warn!(
                    sale_id = %sale_id,
                    customer_id = %customer_id,
                    error = %e,
                    "Committed purchase lookup failed"
                );
                Execution::without_record(sale_id, OutcomeState::Success)
            }
        }
    }
}

impl<S: SaleStore> ExecutionStrategy for ProcedureExecution<S> {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn execute<'a>(
        &'a self,
        sale_id: SaleId,
        customer_id: CustomerId,
        token: &'a str,
    ) -> Pin<Box<dyn Future<Output = Execution> + Send + 'a>> {
        Box::pin(async move {
            let execution = self.run(sale_id, customer_id, token).await;
            record(Self::NAME, customer_id, &execution);
            execution
        })
    }
}
