//! JSON envelope shared by the sale endpoints.
//!
//! ```json
//! { "success": true, "data": { ... }, "error": null }
//! ```
//!
//! `success` reports whether the request was served, not whether a purchase
//! went through: a sold-out attempt is a served request whose `data` says `CLOSED`.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Response envelope `{success, data, error}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResult<T> {
    /// Whether the request was served
    pub success: bool,

    /// Payload when served
    pub data: Option<T>,

    /// Reason when not served
    pub error: Option<String>,
}

impl<T> ApiResult<T> {
    /// Served request carrying `data`.
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Request refused with a reason.
    #[must_use]
    pub fn refused(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResult<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn served_envelope_shape() {
        let json = serde_json::to_value(ApiResult::ok(7)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": true, "data": 7, "error": null})
        );
    }

    #[test]
    fn refused_envelope_shape() {
        let json = serde_json::to_value(ApiResult::<()>::refused("not registered")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "data": null, "error": "not registered"})
        );
    }
}
