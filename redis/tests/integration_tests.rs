//! Integration tests for `RedisSaleCache` using testcontainers.
//!
//! # Requirements
//!
//! Docker must be running. Run with `cargo test -p flashsale-redis -- --ignored`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use flashsale_core::environment::Clock;
use flashsale_core::{CacheError, SaleCache, SaleId};
use flashsale_redis::RedisSaleCache;
use flashsale_testing::{fixtures, test_clock};
use redis::AsyncCommands;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;

async fn setup_redis() -> (ContainerAsync<Redis>, String) {
    let container = Redis::default()
        .start()
        .await
        .expect("Failed to start redis container");

    let port = container
        .get_host_port_ipv4(6379)
        .await
        .expect("Failed to get redis port");

    (container, format!("redis://127.0.0.1:{port}"))
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_put_then_get() {
    let (_container, url) = setup_redis().await;
    let cache = RedisSaleCache::new(&url).await.expect("connect");
    let item = fixtures::open_sale(1000, 100, test_clock().now());

    assert!(cache.get(item.id).await.unwrap().is_none());

    cache.put(&item).await.expect("put");

    assert_eq!(cache.get(item.id).await.unwrap(), Some(item));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_ttl_is_applied() {
    let (_container, url) = setup_redis().await;
    let cache = RedisSaleCache::new(&url)
        .await
        .expect("connect")
        .with_ttl(Some(120));
    let item = fixtures::open_sale(7, 1, test_clock().now());

    cache.put(&item).await.expect("put");

    let client = redis::Client::open(url.as_str()).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();
    let ttl: i64 = conn.ttl("seckill:7").await.unwrap();
    assert!(ttl > 0 && ttl <= 120, "ttl was {ttl}");
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_garbage_entry_is_a_serialization_error() {
    let (_container, url) = setup_redis().await;
    let cache = RedisSaleCache::new(&url).await.expect("connect");

    let client = redis::Client::open(url.as_str()).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();
    let _: () = conn.set("seckill:9", vec![1_u8, 2, 3]).await.unwrap();

    assert!(matches!(
        cache.get(SaleId::new(9)).await,
        Err(CacheError::SerializationError(_))
    ));
}
