//! Failures that refuse an HTTP request.
//!
//! Purchase outcomes never land here: CLOSED or REPEAT_KILL is a served request in
//! the success envelope. An [`AppError`] is a bad query, an unknown sale, or a
//! store the listing and detail pages could not read.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use flashsale_core::StoreError;
use serde::Serialize;
use std::fmt;

/// Refusal rendered as `{code, message}` with a matching status.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
    /// Logged on 5xx, never sent to the buyer.
    cause: Option<anyhow::Error>,
}

impl AppError {
    fn refusal(status: StatusCode, code: &'static str, message: String) -> Self {
        Self {
            status,
            code,
            message,
            cause: None,
        }
    }

    /// 400 for a malformed query.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::refusal(StatusCode::BAD_REQUEST, "BAD_REQUEST", message.into())
    }

    /// 404 for an id with no row behind it.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::refusal(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{resource} with id {id} not found"),
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|cause| cause.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                code = self.code,
                cause = ?self.cause,
                "Request failed in the sale store"
            );
        }

        let body = ErrorBody {
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

/// An unreachable store is 503, anything else is 500.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let mut refusal = match err {
            StoreError::ConnectionError(_) => Self::refusal(
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "Sale store unavailable".to_string(),
            ),
            StoreError::DatabaseError(_) | StoreError::CorruptRecord(_) => Self::refusal(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "An internal error occurred".to_string(),
            ),
        };
        refusal.cause = Some(anyhow::Error::new(err));
        refusal
    }
}
