//! Persisted state store
//!
//! Holds the record of the live status message between ticks. The store is a
//! passive key-value holder; the lifecycle manager owns the record.

pub mod file;
pub mod kv;
pub mod memory;

use crate::config::StoreBackend;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub use file::FileStore;
pub use kv::RedisStore;
pub use memory::MemoryStore;

/// The live message as last persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Remote message id
    pub message_id: i64,
    /// When the message was sent; edits never move it
    pub created_at: DateTime<Utc>,
}

impl MessageRecord {
    /// Create a record
    pub fn new(message_id: i64, created_at: DateTime<Utc>) -> Self {
        Self {
            message_id,
            created_at,
        }
    }

    /// Whether the message has reached `threshold` age at `now`.
    ///
    /// A `created_at` in the future (clock skew) counts as fresh.
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        (now - self.created_at)
            .to_std()
            .is_ok_and(|age| age >= threshold)
    }
}

/// Key-value holder for message records
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the record under `key`
    async fn get(&self, key: &str) -> Result<Option<MessageRecord>>;

    /// Write the record under `key`, replacing any previous one
    async fn set(&self, key: &str, record: &MessageRecord) -> Result<()>;

    /// Backend name for logs
    fn name(&self) -> &str;

    /// Read the record, treating an unavailable backend as "no record".
    ///
    /// Degrades the tick to sending a new message rather than failing it.
    async fn load(&self, key: &str) -> Option<MessageRecord> {
        match self.get(key).await {
            Ok(record) => record,
            Err(e) => {
                warn!(store = self.name(), "Failed to read state, assuming no record: {e}");
                None
            }
        }
    }
}

/// Open the configured backend
pub fn open_store(backend: &StoreBackend) -> Result<Arc<dyn StateStore>> {
    Ok(match backend {
        StoreBackend::File(path) => Arc::new(FileStore::new(path.clone())),
        StoreBackend::Redis(url) => Arc::new(RedisStore::new(url)?),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TickerError;
    use chrono::TimeDelta;

    struct BrokenStore;

    #[async_trait]
    impl StateStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<MessageRecord>> {
            Err(TickerError::StoreError("connection refused".to_string()))
        }

        async fn set(&self, _key: &str, _record: &MessageRecord) -> Result<()> {
            Err(TickerError::StoreError("connection refused".to_string()))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    #[test]
    fn test_staleness_boundary() {
        let now = Utc::now();
        let threshold = Duration::from_secs(24 * 3600);

        let fresh = MessageRecord::new(1, now - TimeDelta::hours(2));
        assert!(!fresh.is_stale(now, threshold));

        let exact = MessageRecord::new(1, now - TimeDelta::hours(24));
        assert!(exact.is_stale(now, threshold));

        let old = MessageRecord::new(1, now - TimeDelta::hours(25));
        assert!(old.is_stale(now, threshold));

        let future = MessageRecord::new(1, now + TimeDelta::hours(1));
        assert!(!future.is_stale(now, threshold));
    }

    #[test]
    fn test_record_serialization() {
        let record: MessageRecord = serde_json::from_str(
            r#"{"message_id": 42, "created_at": "2026-10-15T08:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(record.message_id, 42);
        assert_eq!(record.created_at.to_rfc3339(), "2026-10-15T08:00:00+00:00");
    }

    #[tokio::test]
    async fn test_load_degrades_to_none() {
        assert_eq!(BrokenStore.load("k").await, None);
    }

    #[tokio::test]
    async fn test_open_store_backends() {
        let store = open_store(&StoreBackend::Memory).unwrap();
        assert_eq!(store.name(), "memory");

        let store = open_store(&StoreBackend::File("state.json".into())).unwrap();
        assert_eq!(store.name(), "file");

        assert!(open_store(&StoreBackend::Redis("not a url".to_string())).is_err());
    }
}
