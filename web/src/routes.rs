//! Router assembly.

use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};
use flashsale_core::{SaleCache, SaleStore};
use tower_http::trace::TraceLayer;

use crate::handlers::{health_check, seckill};
use crate::middleware::correlate;
use crate::state::AppState;

/// Build the application router.
///
/// Layers run outside-in: the correlation id is assigned before the trace span
/// opens, so both carry the same request.
pub fn build_router<S: SaleStore, C: SaleCache>(state: AppState<S, C>) -> Router {
    let seckill_routes = Router::new()
        .route("/list", get(seckill::list::<S, C>))
        .route("/time/now", get(seckill::now::<S, C>))
        .route("/:id/detail", get(seckill::detail::<S, C>))
        .route("/:id/exposer", post(seckill::exposer::<S, C>))
        .route("/:id/:token/execution", post(seckill::execution::<S, C>));

    Router::new()
        .route("/health", get(health_check))
        .nest("/seckill", seckill_routes)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(correlate))
        .with_state(state)
}
