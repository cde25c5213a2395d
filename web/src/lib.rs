//! HTTP surface of the flash sale engine.
//!
//! A thin Axum shell over [`flashsale_core::FlashSaleService`]: handlers parse the
//! path, query and `killPhone` cookie, call one service operation, and wrap the
//! result in the `{success, data, error}` envelope.
//!
//! # Example
//!
//! ```ignore
//! use flashsale_web::{AppState, build_router};
//!
//! let state = AppState::new(service, Arc::new(SystemClock)).with_list_limit(4);
//! let app = build_router(state);
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use extractors::{PHONE_COOKIE, RegisteredPhone};
pub use middleware::{CORRELATION_ID_HEADER, CorrelationId, correlate};
pub use response::ApiResult;
pub use routes::build_router;
pub use state::AppState;
