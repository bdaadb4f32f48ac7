//! In-process state store

use crate::error::Result;
use crate::store::{MessageRecord, StateStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Thread-safe store living only as long as the process.
///
/// Clones share the same records.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<String, MessageRecord>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding one record
    pub fn with_record(key: impl Into<String>, record: MessageRecord) -> Self {
        let mut records = HashMap::new();
        records.insert(key.into(), record);
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<MessageRecord>> {
        Ok(self.records.read().await.get(key).copied())
    }

    async fn set(&self, key: &str, record: &MessageRecord) -> Result<()> {
        self.records.write().await.insert(key.to_string(), *record);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_set_and_get() {
        let store = MemoryStore::new();
        assert!(store.get("live").await.unwrap().is_none());

        let record = MessageRecord::new(42, Utc::now());
        store.set("live", &record).await.unwrap();

        assert_eq!(store.get("live").await.unwrap(), Some(record));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_set_overwrites_single_record() {
        let store = MemoryStore::with_record("live", MessageRecord::new(1, Utc::now()));
        let replacement = MessageRecord::new(2, Utc::now());
        store.set("live", &replacement).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("live").await.unwrap(), Some(replacement));
    }

    #[tokio::test]
    async fn test_clones_share_records() {
        let store = MemoryStore::new();
        let other = store.clone();
        other
            .set("live", &MessageRecord::new(7, Utc::now()))
            .await
            .unwrap();

        assert!(!store.is_empty().await);
    }
}
