//! Sale endpoints.
//!
//! | Method | Path                               | Answer                          |
//! |--------|------------------------------------|---------------------------------|
//! | GET    | `/seckill/list?offset&limit`       | page of sales, newest first     |
//! | GET    | `/seckill/:id/detail`              | one sale, 404 when unknown      |
//! | POST   | `/seckill/:id/exposer`             | exposure (token while open)     |
//! | POST   | `/seckill/:id/:token/execution`    | outcome of one purchase attempt |
//! | GET    | `/seckill/time/now`                | server time, epoch millis       |

use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use flashsale_core::environment::Clock;
use flashsale_core::{
    Execution, Exposure, OutcomeState, PurchaseRecord, SaleCache, SaleId, SaleItem, SaleStore,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extractors::RegisteredPhone;
use crate::response::ApiResult;
use crate::state::{AppState, MAX_LIST_LIMIT};

/// Reason given when the buyer has no usable phone cookie.
pub const NOT_REGISTERED: &str = "not registered";

/// Query of the listing endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Sales to skip
    pub offset: Option<u32>,
    /// Page size, defaults to the configured listing size
    pub limit: Option<u32>,
}

/// Sale item as rendered to the storefront, times in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleView {
    /// Sale item id
    pub id: SaleId,
    /// Display name
    pub name: String,
    /// Units left
    pub stock: u32,
    /// Window start
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    /// Window end, exclusive
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,
    /// Creation time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl From<SaleItem> for SaleView {
    fn from(item: SaleItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
            stock: item.stock,
            start_time: item.start_time,
            end_time: item.end_time,
            created_at: item.created_at,
        }
    }
}

/// Execution outcome as rendered to the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionView {
    /// Sale the attempt targeted
    pub sale_id: SaleId,
    /// Outcome name
    pub state: OutcomeState,
    /// Outcome code
    pub code: i32,
    /// Outcome description
    pub state_info: String,
    /// Ledger record on success
    pub purchase: Option<PurchaseRecord>,
}

impl From<Execution> for ExecutionView {
    fn from(execution: Execution) -> Self {
        Self {
            sale_id: execution.sale_id,
            state: execution.state,
            code: execution.state.code(),
            state_info: execution.state.info().to_string(),
            purchase: execution.purchase,
        }
    }
}

/// `GET /seckill/list`
///
/// # Errors
///
/// Returns 400 for a page size of zero or above the cap, and a store error mapped
/// through [`AppError`] otherwise.
pub async fn list<S: SaleStore, C: SaleCache>(
    State(state): State<AppState<S, C>>,
    Query(params): Query<ListParams>,
) -> Result<ApiResult<Vec<SaleView>>, AppError> {
    let limit = params.limit.unwrap_or(state.list_limit);
    if limit == 0 || limit > MAX_LIST_LIMIT {
        return Err(AppError::bad_request(format!(
            "limit must be between 1 and {MAX_LIST_LIMIT}"
        )));
    }

    let items = state
        .service
        .list_sales(params.offset.unwrap_or(0), limit)
        .await?;
    Ok(ApiResult::ok(items.into_iter().map(SaleView::from).collect()))
}

/// `GET /seckill/:id/detail`
///
/// # Errors
///
/// Returns 404 when the sale does not exist.
pub async fn detail<S: SaleStore, C: SaleCache>(
    State(state): State<AppState<S, C>>,
    Path(id): Path<i64>,
) -> Result<ApiResult<SaleView>, AppError> {
    let item = state
        .service
        .get_sale(SaleId::new(id))
        .await?
        .ok_or_else(|| AppError::not_found("Sale", id))?;
    Ok(ApiResult::ok(item.into()))
}

/// `POST /seckill/:id/exposer`
///
/// An unknown or closed sale is a served request whose exposure says so.
///
/// # Errors
///
/// Returns a store error mapped through [`AppError`].
pub async fn exposer<S: SaleStore, C: SaleCache>(
    State(state): State<AppState<S, C>>,
    Path(id): Path<i64>,
) -> Result<ApiResult<Exposure>, AppError> {
    let exposure = state.service.expose_sale(SaleId::new(id)).await?;
    Ok(ApiResult::ok(exposure))
}

/// `POST /seckill/:id/:token/execution`
///
/// Every outcome, including failures inside the engine, is a served request.
/// Only a missing phone cookie refuses the request.
pub async fn execution<S: SaleStore, C: SaleCache>(
    State(state): State<AppState<S, C>>,
    Path((id, token)): Path<(i64, String)>,
    RegisteredPhone(phone): RegisteredPhone,
) -> ApiResult<ExecutionView> {
    let Some(customer_id) = phone else {
        tracing::debug!(sale_id = id, "Execution without a registered phone");
        return ApiResult::refused(NOT_REGISTERED);
    };

    let execution = state
        .service
        .execute(SaleId::new(id), customer_id, &token)
        .await;
    ApiResult::ok(execution.into())
}

/// `GET /seckill/time/now`
#[allow(clippy::unused_async)]
pub async fn now<S: SaleStore, C: SaleCache>(
    State(state): State<AppState<S, C>>,
) -> ApiResult<i64> {
    ApiResult::ok(state.clock.now().timestamp_millis())
}

