//! Flash sale HTTP server.
//!
//! Wires configuration, tracing, the Prometheus exporter, the `PostgreSQL` store,
//! the Redis cache and the HTTP router, then serves until Ctrl+C or SIGTERM.

mod config;

use anyhow::Context;
use flashsale_core::environment::SystemClock;
use flashsale_core::metrics::register_engine_metrics;
use flashsale_core::{FlashSaleService, TokenCodec};
use flashsale_postgres::PostgresSaleStore;
use flashsale_redis::RedisSaleCache;
use flashsale_web::{AppState, build_router};
use metrics_exporter_prometheus::PrometheusBuilder;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::Notify;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, DEV_TOKEN_SALT};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flashsale=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting flash sale server");

    let config = Config::from_env().context("Invalid configuration")?;
    info!(
        redis_url = %config.redis.url,
        strategy = %config.sale.execution_mode,
        cache_ttl_seconds = ?config.redis.ttl_seconds,
        "Configuration loaded"
    );
    if config.sale.token_salt == DEV_TOKEN_SALT {
        warn!("SALE_TOKEN_SALT is unset; tokens are derived from the development salt");
    }

    let metrics_addr: SocketAddr = config
        .metrics_addr()
        .parse()
        .context("Invalid metrics address")?;
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .context("Failed to install Prometheus exporter")?;
    register_engine_metrics();
    info!(address = %metrics_addr, "Metrics exporter listening");

    info!("Connecting to sale database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.postgres.max_connections)
        .min_connections(config.postgres.min_connections)
        .acquire_timeout(Duration::from_secs(config.postgres.connect_timeout))
        .connect(&config.postgres.url)
        .await
        .context("Failed to connect to PostgreSQL")?;
    let store = PostgresSaleStore::new(pool);
    store.migrate().await.context("Failed to run migrations")?;
    info!("Sale database ready");

    info!("Connecting to sale cache...");
    let cache = RedisSaleCache::new(&config.redis.url)
        .await
        .context("Failed to connect to Redis")?
        .with_ttl(config.redis.ttl_seconds);
    info!("Sale cache ready");

    let clock = Arc::new(SystemClock);
    let service = FlashSaleService::new(
        Arc::new(store),
        Arc::new(cache),
        TokenCodec::new(config.sale.token_salt.clone()),
        clock.clone(),
        config.sale.execution_mode,
    );
    info!(strategy = service.strategy_name(), "Flash sale service initialized");

    let state = AppState::new(service, clock).with_list_limit(config.sale.list_limit);
    let app = build_router(state);

    let addr = config.http_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(address = %addr, "Server listening");

    let stopping = Arc::new(Notify::new());
    let server = axum::serve(listener, app)
        .with_graceful_shutdown({
            let stopping = Arc::clone(&stopping);
            async move {
                shutdown_signal().await;
                stopping.notify_one();
            }
        })
        .into_future();
    let deadline = async {
        stopping.notified().await;
        tokio::time::sleep(Duration::from_secs(config.server.shutdown_timeout)).await;
    };

    tokio::select! {
        result = server => result.context("Server error")?,
        () = deadline => {
            warn!(
                timeout_seconds = config.server.shutdown_timeout,
                "In-flight requests did not finish before the shutdown timeout"
            );
        }
    }

    info!("Server stopped");
    Ok(())
}

/// Graceful shutdown signal handler.
///
/// Waits for:
/// - Ctrl+C (SIGINT)
/// - SIGTERM (in production environments)
///
/// A handler that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
