//! Delivery ledger: the persistent record of what has been sent.
//!
//! Text items are stored as `key -> last delivered text`, photos as
//! `content hash -> date first delivered`. The ledger is the only thing that
//! decides whether an item was already delivered.
//!
//! Reads and writes are plain get/compare/set with no transaction around
//! them. Overlapping runs can race on the same key and must be serialised by
//! whoever schedules them.

use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Durable string key-value store shared across runs.
pub trait Ledger {
    async fn exists(&self, key: &str) -> Result<bool, LedgerError>;
    async fn get(&self, key: &str) -> Result<Option<String>, LedgerError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), LedgerError>;
}

/// Ledger backed by a Redis server.
///
/// One multiplexed connection is opened per run and dropped with the value.
#[derive(Clone)]
pub struct RedisLedger {
    conn: MultiplexedConnection,
}

impl RedisLedger {
    #[instrument(level = "info", skip_all)]
    pub async fn connect(redis_url: &str) -> Result<Self, LedgerError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!("Connected to ledger");
        Ok(Self { conn })
    }
}

impl Ledger for RedisLedger {
    async fn exists(&self, key: &str) -> Result<bool, LedgerError> {
        let mut conn = self.conn.clone();
        let found: bool = conn.exists(key).await?;
        debug!(key, found, "Ledger exists");
        Ok(found)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, LedgerError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), LedgerError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value).await?;
        debug!(key, "Ledger updated");
        Ok(())
    }
}
