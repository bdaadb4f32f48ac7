//! JSON file state store
//!
//! Suited to one-shot runs where the file is committed back or cached between
//! jobs (e.g. `.github/last_message.json` in a CI workspace).

use crate::error::{Result, TickerError};
use crate::store::{MessageRecord, StateStore};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Store keeping all records in one JSON object keyed by store key
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store backed by `path`; the file is created on first write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<BTreeMap<String, MessageRecord>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                TickerError::StoreError(format!(
                    "Corrupt state file {}: {e}",
                    self.path.display()
                ))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("State file {} does not exist yet", self.path.display());
                Ok(BTreeMap::new())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl StateStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<MessageRecord>> {
        Ok(self.read_all().await?.get(key).copied())
    }

    async fn set(&self, key: &str, record: &MessageRecord) -> Result<()> {
        // A corrupt file must not block writing a fresh record. Any other
        // read failure would lose the remaining keys, so it is returned.
        let mut records = match self.read_all().await {
            Ok(records) => records,
            Err(e @ TickerError::StoreError(_)) => {
                warn!("Discarding corrupt state: {e}");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        records.insert(key.to_string(), *record);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(&records)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}
