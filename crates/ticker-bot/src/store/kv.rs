//! Redis state store
//!
//! For hosted long-running deployments where the local disk is ephemeral.

use crate::error::{Result, TickerError};
use crate::store::{MessageRecord, StateStore};
use async_trait::async_trait;
use redis::{AsyncCommands, Client};

/// Store keeping each record as a JSON string under its key, without expiry
pub struct RedisStore {
    client: Client,
}

impl RedisStore {
    /// Create a store for the given redis URL.
    ///
    /// Only validates the URL; connections are opened per operation.
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| TickerError::ConfigError(format!("Invalid REDIS_URL: {e}")))?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| TickerError::StoreError(format!("Redis connection error: {e}")))
    }
}

#[async_trait]
impl StateStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<MessageRecord>> {
        let mut conn = self.connection().await?;
        let data: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| TickerError::StoreError(format!("Redis get error: {e}")))?;

        data.map(|json| {
            serde_json::from_str(&json).map_err(|e| {
                TickerError::StoreError(format!("Redis deserialization error: {e}"))
            })
        })
        .transpose()
    }

    async fn set(&self, key: &str, record: &MessageRecord) -> Result<()> {
        let mut conn = self.connection().await?;
        let json = serde_json::to_string(record)?;
        let _: () = conn
            .set(key, json)
            .await
            .map_err(|e| TickerError::StoreError(format!("Redis set error: {e}")))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_invalid_url_is_config_error() {
        assert!(matches!(
            RedisStore::new("definitely not a url"),
            Err(TickerError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_reads_absent() {
        let store = RedisStore::new("redis://127.0.0.1:1/").unwrap();
        assert!(store.get("live").await.is_err());
        assert_eq!(store.load("live").await, None);
    }

    #[tokio::test]
    #[ignore] // Requires a running redis at REDIS_URL
    async fn test_round_trip_against_server() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
        let store = RedisStore::new(&url).unwrap();
        let record = MessageRecord::new(42, Utc::now());

        store.set("ticker_bot:test:live_message", &record).await.unwrap();
        assert_eq!(
            store.get("ticker_bot:test:live_message").await.unwrap(),
            Some(record)
        );
    }
}
