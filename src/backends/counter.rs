//! Redis-backed counter.
//!
//! `INCR` is atomic on the server, so concurrent requests each observe a
//! distinct post-increment value without any coordination here.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::backends::{BackendError, CounterStore};

/// Counter backed by a Redis connection manager.
#[derive(Clone)]
pub struct RedisCounter {
    /// Multiplexed connection with automatic reconnect.
    conn_manager: ConnectionManager,
}

impl RedisCounter {
    /// Connect to `Redis`.
    ///
    /// # Errors
    ///
    /// Returns error if the URL is invalid or the initial connection fails.
    pub async fn connect(url: &str) -> Result<Self, BackendError> {
        let client = Client::open(url)?;
        let conn_manager = ConnectionManager::new(client).await?;

        tracing::info!("Redis counter connected");
        Ok(Self { conn_manager })
    }
}

#[async_trait]
impl CounterStore for RedisCounter {
    async fn increment(&self, key: &str) -> Result<i64, BackendError> {
        let mut conn = self.conn_manager.clone();
        let value: i64 = conn.incr(key, 1).await?;
        Ok(value)
    }

    async fn ping(&self) -> Result<(), BackendError> {
        let mut conn = self.conn_manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
