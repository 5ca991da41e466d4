//! Shared key-value cache store.
//!
//! The orchestrator consumes a narrow capability interface: `get`, `set`
//! with TTL, and a pipelined `set_many` used only by the batch refresh
//! engine. Two implementations: a Redis-backed production store and an
//! in-process store for tests and development.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::AsyncCommands;
use tokio::sync::RwLock;

use nimbus_core::error::WeatherError;

/// One entry for a bulk write: key, serialized value, TTL in seconds.
pub type BulkEntry = (String, String, u64);

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Return the cached value, or `None` on miss or expiry.
    async fn get(&self, key: &str) -> Result<Option<String>, WeatherError>;

    /// Set a value with a per-entry TTL in seconds.
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), WeatherError>;

    /// Write all entries in a single round trip.
    async fn set_many(&self, entries: &[BulkEntry]) -> Result<(), WeatherError>;
}

fn cache_err(err: redis::RedisError) -> WeatherError {
    WeatherError::CacheUnavailable(err.to_string())
}

/// Redis-backed store. Connections are multiplexed through a connection
/// manager, so the store is cheap to clone and share.
#[derive(Clone)]
pub struct RedisStore {
    conn: redis::aio::ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self, WeatherError> {
        let client = redis::Client::open(url).map_err(cache_err)?;
        let conn = client.get_connection_manager().await.map_err(cache_err)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, WeatherError> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(cache_err)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), WeatherError> {
        let mut conn = self.conn.clone();
        let () = conn.set_ex(key, value, ttl_secs).await.map_err(cache_err)?;
        Ok(())
    }

    async fn set_many(&self, entries: &[BulkEntry]) -> Result<(), WeatherError> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        for (key, value, ttl_secs) in entries {
            pipe.set_ex(key, value, *ttl_secs).ignore();
        }
        let () = pipe.query_async(&mut conn).await.map_err(cache_err)?;
        Ok(())
    }
}

/// In-process store honoring TTLs on read. Expired entries are simply
/// treated as absent; nothing reaps them eagerly.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

struct MemoryEntry {
    value: String,
    ttl_secs: u64,
    expires_at: Instant,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// TTL the entry was stored with, if the entry is still live.
    pub async fn ttl_of(&self, key: &str) -> Option<u64> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| Instant::now() < e.expires_at)
            .map(|e| e.ttl_secs)
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        let now = Instant::now();
        entries.values().filter(|e| now < e.expires_at).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, WeatherError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|e| Instant::now() < e.expires_at)
            .map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), WeatherError> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                ttl_secs,
                expires_at: Instant::now() + Duration::from_secs(ttl_secs),
            },
        );
        Ok(())
    }

    async fn set_many(&self, batch: &[BulkEntry]) -> Result<(), WeatherError> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        for (key, value, ttl_secs) in batch {
            entries.insert(
                key.clone(),
                MemoryEntry {
                    value: value.clone(),
                    ttl_secs: *ttl_secs,
                    expires_at: now + Duration::from_secs(*ttl_secs),
                },
            );
        }
        Ok(())
    }
}
