//! HTTP tests driving the router with `tower::ServiceExt::oneshot`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::Duration;
use flashsale_core::{ExecutionMode, SaleId};
use flashsale_testing::{SaleTestHarness, fixtures};
use flashsale_web::{AppState, CORRELATION_ID_HEADER, build_router};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

const PHONE: &str = "killPhone=13800138000";

fn app(harness: &SaleTestHarness) -> Router {
    let state = AppState::new(harness.service.clone(), Arc::new(harness.clock.clone()));
    build_router(state)
}

async fn call(app: Router, method: Method, uri: &str, cookie: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    let response = app
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn harness_with_open_sale(stock: u32) -> SaleTestHarness {
    let harness = SaleTestHarness::new(ExecutionMode::Procedure);
    let now = harness.now();
    harness.with_sale(fixtures::open_sale(1000, stock, now)).await
}

#[tokio::test]
async fn test_health() {
    let harness = SaleTestHarness::new(ExecutionMode::Procedure);
    let response = app(&harness)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(CORRELATION_ID_HEADER));
}

#[tokio::test]
async fn test_time_now_is_clock_millis() {
    let harness = SaleTestHarness::new(ExecutionMode::Procedure);

    let (status, body) = call(app(&harness), Method::GET, "/seckill/time/now", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], harness.now().timestamp_millis());
}

#[tokio::test]
async fn test_list_uses_default_page_size() {
    let harness = SaleTestHarness::new(ExecutionMode::Procedure);
    let now = harness.now();
    let mut harness = harness;
    for id in 1..=6 {
        let mut item = fixtures::open_sale(id, 10, now);
        item.created_at = now - Duration::minutes(60 - id);
        harness = harness.with_sale(item).await;
    }

    let (status, body) = call(app(&harness), Method::GET, "/seckill/list", None).await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![6, 5, 4, 3]);

    let (_, body) = call(app(&harness), Method::GET, "/seckill/list?offset=4&limit=10", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_list_rejects_zero_limit() {
    let harness = SaleTestHarness::new(ExecutionMode::Procedure);

    let (status, body) = call(app(&harness), Method::GET, "/seckill/list?limit=0", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_detail_of_known_and_unknown_sale() {
    let harness = harness_with_open_sale(100).await;
    let start = harness.now() - Duration::hours(1);

    let (status, body) = call(app(&harness), Method::GET, "/seckill/1000/detail", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], 1000);
    assert_eq!(body["data"]["stock"], 100);
    assert_eq!(body["data"]["start_time"], start.timestamp_millis());

    let (status, body) = call(app(&harness), Method::GET, "/seckill/42/detail", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_exposer_issues_token_while_open() {
    let harness = harness_with_open_sale(100).await;

    let (status, body) = call(app(&harness), Method::POST, "/seckill/1000/exposer", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["exposed"], true);
    assert_eq!(
        body["data"]["token"],
        harness.token(SaleId::new(1000)).as_str()
    );
}

#[tokio::test]
async fn test_exposer_reports_window_before_start() {
    let harness = SaleTestHarness::new(ExecutionMode::Procedure);
    let now = harness.now();
    let item = fixtures::upcoming_sale(7, 1, now);
    let start = item.start_time.timestamp_millis();
    let harness = harness.with_sale(item).await;

    let (_, body) = call(app(&harness), Method::POST, "/seckill/7/exposer", None).await;

    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["exposed"], false);
    assert_eq!(body["data"]["token"], Value::Null);
    assert_eq!(body["data"]["now"], now.timestamp_millis());
    assert_eq!(body["data"]["start"], start);
}

#[tokio::test]
async fn test_execution_without_phone_is_refused() {
    let harness = harness_with_open_sale(100).await;
    let uri = format!("/seckill/1000/{}/execution", harness.token(SaleId::new(1000)).as_str());

    let (status, body) = call(app(&harness), Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "not registered");

    let (_, body) = call(app(&harness), Method::POST, &uri, Some("killPhone=abc")).await;
    assert_eq!(body["success"], false);
    assert_eq!(harness.store.stock(SaleId::new(1000)).await, Some(100));
}

#[tokio::test]
async fn test_execution_success_then_repeat() {
    let harness = harness_with_open_sale(100).await;
    let uri = format!("/seckill/1000/{}/execution", harness.token(SaleId::new(1000)).as_str());

    let (status, body) = call(app(&harness), Method::POST, &uri, Some(PHONE)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["state"], "SUCCESS");
    assert_eq!(body["data"]["code"], 1);
    assert_eq!(body["data"]["purchase"]["customer_id"], 13_800_138_000_i64);

    let (_, body) = call(app(&harness), Method::POST, &uri, Some(PHONE)).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["state"], "REPEAT_KILL");
    assert_eq!(body["data"]["code"], -1);
    assert_eq!(body["data"]["purchase"], Value::Null);

    assert_eq!(harness.store.stock(SaleId::new(1000)).await, Some(99));
}

#[tokio::test]
async fn test_execution_with_forged_token() {
    let harness = harness_with_open_sale(100).await;

    let (_, body) = call(
        app(&harness),
        Method::POST,
        "/seckill/1000/forged/execution",
        Some(PHONE),
    )
    .await;

    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["state"], "INVALID_TOKEN");
    assert_eq!(body["data"]["code"], -3);
    assert_eq!(harness.store.stock(SaleId::new(1000)).await, Some(100));
}

#[tokio::test]
async fn test_execution_sold_out_is_closed() {
    let harness = harness_with_open_sale(0).await;
    let uri = format!("/seckill/1000/{}/execution", harness.token(SaleId::new(1000)).as_str());

    let (_, body) = call(app(&harness), Method::POST, &uri, Some(PHONE)).await;

    assert_eq!(body["data"]["state"], "CLOSED");
    assert_eq!(body["data"]["state_info"], "sale closed");
}
