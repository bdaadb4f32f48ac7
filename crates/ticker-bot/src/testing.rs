//! In-process fakes shared by unit tests

use crate::error::{Result, TickerError, TransportError, TransportResult};
use crate::platforms::ChatTransport;
use crate::store::{MemoryStore, MessageRecord, StateStore};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Mutex;

/// A remote call seen by [`FakeTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Send(String),
    Edit(i64, String),
    Delete(i64),
    Pin(i64),
    Unpin(i64),
}

/// Chat simulation that records every call and tracks which messages exist
pub struct FakeTransport {
    calls: Mutex<Vec<Call>>,
    live: Mutex<BTreeSet<i64>>,
    next_id: Mutex<i64>,
    reject_edits: bool,
    reject_sends: bool,
    fail_cosmetics: bool,
}

impl FakeTransport {
    pub fn starting_at(first_id: i64) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            live: Mutex::new(BTreeSet::new()),
            next_id: Mutex::new(first_id),
            reject_edits: false,
            reject_sends: false,
            fail_cosmetics: false,
        }
    }

    pub fn with_live(self, message_id: i64) -> Self {
        self.live.lock().unwrap().insert(message_id);
        self
    }

    pub fn rejecting_edits(mut self) -> Self {
        self.reject_edits = true;
        self
    }

    pub fn rejecting_sends(mut self) -> Self {
        self.reject_sends = true;
        self
    }

    pub fn failing_cosmetics(mut self) -> Self {
        self.fail_cosmetics = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn live(&self) -> Vec<i64> {
        self.live.lock().unwrap().iter().copied().collect()
    }

    /// Remove a message as if a chat admin deleted it
    pub fn delete_externally(&self, message_id: i64) {
        self.live.lock().unwrap().remove(&message_id);
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn rejected(method: &str) -> TransportError {
        TransportError::Rejected {
            method: method.to_string(),
            status: 400,
            error_code: Some(400),
            description: "Bad Request: simulated failure".to_string(),
        }
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn send(&self, text: &str) -> TransportResult<i64> {
        self.record(Call::Send(text.to_string()));
        if self.reject_sends {
            return Err(Self::rejected("sendMessage"));
        }

        let mut next = self.next_id.lock().unwrap();
        let id = *next;
        *next += 1;
        self.live.lock().unwrap().insert(id);
        Ok(id)
    }

    async fn edit(&self, message_id: i64, text: &str) -> TransportResult<()> {
        self.record(Call::Edit(message_id, text.to_string()));
        if self.reject_edits {
            return Err(Self::rejected("editMessageText"));
        }
        if !self.live.lock().unwrap().contains(&message_id) {
            return Err(TransportError::MessageNotFound { message_id });
        }
        Ok(())
    }

    async fn delete(&self, message_id: i64) -> TransportResult<()> {
        self.record(Call::Delete(message_id));
        if self.fail_cosmetics {
            return Err(Self::rejected("deleteMessage"));
        }
        self.live.lock().unwrap().remove(&message_id);
        Ok(())
    }

    async fn pin(&self, message_id: i64) -> TransportResult<()> {
        self.record(Call::Pin(message_id));
        if self.fail_cosmetics {
            return Err(Self::rejected("pinChatMessage"));
        }
        Ok(())
    }

    async fn unpin(&self, message_id: i64) -> TransportResult<()> {
        self.record(Call::Unpin(message_id));
        if self.fail_cosmetics {
            return Err(Self::rejected("unpinChatMessage"));
        }
        Ok(())
    }
}

/// Memory store whose reads or writes can be made to fail
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_reads: bool,
    fail_writes: bool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }
}

#[async_trait]
impl StateStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<MessageRecord>> {
        if self.fail_reads {
            return Err(TickerError::StoreError("simulated read failure".into()));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, record: &MessageRecord) -> Result<()> {
        if self.fail_writes {
            return Err(TickerError::StoreError("simulated write failure".into()));
        }
        self.inner.set(key, record).await
    }

    fn name(&self) -> &str {
        "flaky"
    }
}
