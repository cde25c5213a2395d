//! Liveness endpoint for load balancers.

use axum::http::StatusCode;

/// `GET /health`
///
/// Answers 200 as long as the process serves requests. Dependencies are not checked:
/// a store outage surfaces as `INNER_ERROR` outcomes, not as a dead instance.
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simple_health_check() {
        let (status, body) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }
}
