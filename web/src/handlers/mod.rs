//! HTTP request handlers.

pub mod health;
pub mod seckill;

pub use health::health_check;
pub use seckill::{ExecutionView, ListParams, NOT_REGISTERED};
