//! Redis-based cache store for sale metadata.
//!
//! # Architecture
//!
//! Sale items are stored in Redis with:
//! - **Key**: `seckill:{sale_id}` → bincode-serialized `SaleItem`
//! - **TTL**: optional; without one an entry lives until overwritten or evicted
//!
//! The cache is never authoritative. Every error is returned to the caller, which
//! treats a failed read as a miss and a failed write as a no-op.
//!
//! # Example
//!
//! ```no_run
//! use flashsale_redis::RedisSaleCache;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = RedisSaleCache::new("redis://127.0.0.1:6379").await?
//!     .with_ttl(Some(60));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

use flashsale_core::{CacheError, SaleCache, SaleId, SaleItem};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

/// Redis-backed [`SaleCache`].
///
/// Cloning is cheap: clones share the underlying `ConnectionManager`.
#[derive(Clone)]
pub struct RedisSaleCache {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,

    /// Expiry in seconds, if any.
    ttl_seconds: Option<u64>,
}

impl RedisSaleCache {
    /// Connect to Redis.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://127.0.0.1:6379")
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ConnectionError`] if the connection cannot be established.
    pub async fn new(redis_url: &str) -> Result<Self, CacheError> {
        let client = Client::open(redis_url).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis client: {e}"))
        })?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::ConnectionError(format!(
                "Failed to create Redis connection manager: {e}"
            ))
        })?;

        Ok(Self {
            conn_manager,
            ttl_seconds: None,
        })
    }

    /// Expire entries after `ttl_seconds` (`None` or `Some(0)` keeps them until
    /// overwritten).
    #[must_use]
    pub fn with_ttl(mut self, ttl_seconds: Option<u64>) -> Self {
        self.ttl_seconds = ttl_seconds.filter(|&ttl| ttl > 0);
        self
    }

    /// Get the Redis key for a sale.
    fn sale_key(sale_id: SaleId) -> String {
        format!("seckill:{sale_id}")
    }
}

/// Cached bytes of a sale item. Times keep their full precision so a cached
/// window opens at the same instant as the stored one.
fn encode(item: &SaleItem) -> Result<Vec<u8>, CacheError> {
    bincode::serialize(item).map_err(|e| CacheError::SerializationError(e.to_string()))
}

fn decode(bytes: &[u8]) -> Result<SaleItem, CacheError> {
    bincode::deserialize(bytes).map_err(|e| CacheError::SerializationError(e.to_string()))
}

impl SaleCache for RedisSaleCache {
    async fn get(&self, sale_id: SaleId) -> Result<Option<SaleItem>, CacheError> {
        let mut conn = self.conn_manager.clone();
        let key = Self::sale_key(sale_id);

        let bytes: Option<Vec<u8>> = conn
            .get(&key)
            .await
            .map_err(|e| CacheError::CommandError(format!("Failed to get {key}: {e}")))?;

        bytes.map(|bytes| decode(&bytes)).transpose()
    }

    async fn put(&self, item: &SaleItem) -> Result<(), CacheError> {
        let mut conn = self.conn_manager.clone();
        let key = Self::sale_key(item.id);

        let bytes = encode(item)?;

        let result: redis::RedisResult<()> = match self.ttl_seconds {
            Some(ttl) => conn.set_ex(&key, bytes, ttl).await,
            None => conn.set(&key, bytes).await,
        };
        result.map_err(|e| CacheError::CommandError(format!("Failed to set {key}: {e}")))?;

        tracing::debug!(sale_id = %item.id, ttl_seconds = ?self.ttl_seconds, "Cached sale item");
        Ok(())
    }
}
