//! Request correlation.
//!
//! A buyer's purchase attempt is traced under one id, taken from `X-Correlation-ID`
//! when it holds a UUID and minted otherwise. Handlers read it as
//! `Extension<CorrelationId>`; the response echoes it back.

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

/// Header carrying the correlation id in both directions.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Correlation id of the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    fn of(request: &Request) -> Self {
        let sent = request
            .headers()
            .get(CORRELATION_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value.trim()).ok());
        Self(sent.unwrap_or_else(Uuid::new_v4))
    }
}

/// Middleware for `axum::middleware::from_fn`: tags the request, runs it inside an
/// `http_request` span, and echoes the id on the response.
pub async fn correlate(mut request: Request, next: Next) -> Response {
    let id = CorrelationId::of(&request);
    request.extensions_mut().insert(id);

    let span = tracing::info_span!(
        "http_request",
        correlation_id = %id.0,
        method = %request.method(),
        path = %request.uri().path(),
    );
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&id.0.to_string()) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}
