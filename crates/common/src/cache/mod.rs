//! Response cache for upstream search results
//!
//! Provides:
//! - The `ResponseCache` trait consumed by the search client
//! - A Redis-backed implementation for deployments
//! - An in-memory implementation for tests and single-process use
//!
//! Entries hold the full normalized result list for one (query, limit)
//! pair, empty lists included: a query that legitimately returns
//! nothing is cached like any other so the upstream service is not
//! hammered for it.

use crate::config::RedisConfig;
use crate::errors::{AppError, Result};
use crate::records::NormalizedRecord;
use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Time-boxed cache keyed by normalized query. All entries share the
/// configured TTL; bypass is a caller-side decision (skip `get`, still
/// `put`).
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Look up a cached result list. `None` means miss or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<NormalizedRecord>>>;

    /// Store a result list under `key` for `ttl`.
    async fn put(&self, key: &str, records: &[NormalizedRecord], ttl: Duration) -> Result<()>;
}

/// Redis cache client
pub struct RedisCache {
    connection: RwLock<MultiplexedConnection>,
    key_prefix: String,
}

impl RedisCache {
    /// Connect to Redis using the given configuration
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str()).map_err(|e| AppError::CacheError {
            message: format!("Failed to create Redis client: {}", e),
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Failed to connect to Redis: {}", e),
            })?;

        Ok(Self {
            connection: RwLock::new(connection),
            key_prefix: config.key_prefix.clone(),
        })
    }

    /// Build a prefixed key
    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }

    /// Ping Redis to check connectivity
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.connection.write().await;
        redis::cmd("PING")
            .query_async::<String>(&mut *conn)
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Redis ping failed: {}", e),
            })?;
        Ok(())
    }
}

#[async_trait]
impl ResponseCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<NormalizedRecord>>> {
        let full_key = self.key(key);
        let mut conn = self.connection.write().await;

        let value: Option<String> =
            conn.get(&full_key).await.map_err(|e| AppError::CacheError {
                message: format!("Failed to get key '{}': {}", full_key, e),
            })?;

        match value {
            Some(json) => {
                let records = serde_json::from_str(&json)?;
                debug!(key = %full_key, "Cache hit");
                Ok(Some(records))
            }
            None => {
                debug!(key = %full_key, "Cache miss");
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &str, records: &[NormalizedRecord], ttl: Duration) -> Result<()> {
        let full_key = self.key(key);
        let json = serde_json::to_string(records)?;

        let mut conn = self.connection.write().await;
        let _: () = conn
            .set_ex(&full_key, &json, ttl.as_secs())
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Failed to set key '{}': {}", full_key, e),
            })?;

        debug!(key = %full_key, ttl_secs = ttl.as_secs(), "Cache set");
        Ok(())
    }
}

/// In-memory cache for tests and single-process deployments
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (Instant, Vec<NormalizedRecord>)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<NormalizedRecord>>> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some((expires_at, records)) if Instant::now() < *expires_at => {
                Ok(Some(records.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn put(&self, key: &str, records: &[NormalizedRecord], ttl: Duration) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), (Instant::now() + ttl, records.to_vec()));
        Ok(())
    }
}

/// Cache key builder helpers
pub mod keys {
    use sha2::{Digest, Sha256};

    /// Key for one (effective query, batch cap) pair. The query is
    /// hashed so arbitrary boolean expressions stay within key length
    /// and character limits.
    pub fn search_results(query: &str, limit: u32) -> String {
        let mut hasher = Sha256::new();
        hasher.update(query.as_bytes());
        format!("search:{}:{}", limit, hex::encode(hasher.finalize()))
    }
}
