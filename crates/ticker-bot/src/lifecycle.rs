//! Message lifecycle manager
//!
//! Keeps exactly one live status message per chat. Each tick reads the
//! persisted record, then:
//!
//! | Record | Action | Record after |
//! |---|---|---|
//! | none | send, pin | new |
//! | fresh | edit (re-pin if configured) | unchanged |
//! | fresh, edit says not found | send, pin | new |
//! | fresh, edit rejected otherwise | nothing | unchanged |
//! | stale | unpin old, delete old, send, pin | new |
//!
//! Unpin, delete and pin are cosmetic: failures are logged and never abort
//! the tick. The record is written right after a successful send, before
//! pinning. If that write fails the message is live with no record, and the
//! next tick sends a duplicate; this is reported as `StoreWriteError` and
//! never undone.

use crate::config::TickerConfig;
use crate::error::{Result, TickerError, TransportResult};
use crate::platforms::ChatTransport;
use crate::store::{MessageRecord, StateStore};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Why a live message was replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceReason {
    /// Reached the staleness threshold
    Stale,
    /// The chat reported it gone or uneditable
    NotFound,
}

/// What a tick did to the live message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No record existed; a new message was sent
    Created { message_id: i64 },
    /// The live message was edited in place
    Edited { message_id: i64 },
    /// The live message was replaced by a new one
    Replaced {
        old_message_id: i64,
        message_id: i64,
        reason: ReplaceReason,
    },
}

impl TickOutcome {
    /// Id of the live message after the tick
    pub fn message_id(&self) -> i64 {
        match self {
            Self::Created { message_id }
            | Self::Edited { message_id }
            | Self::Replaced { message_id, .. } => *message_id,
        }
    }
}

impl fmt::Display for TickOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created { message_id } => write!(f, "created message {message_id}"),
            Self::Edited { message_id } => write!(f, "edited message {message_id}"),
            Self::Replaced {
                old_message_id,
                message_id,
                reason,
            } => write!(
                f,
                "replaced message {old_message_id} with {message_id} ({})",
                match reason {
                    ReplaceReason::Stale => "stale",
                    ReplaceReason::NotFound => "not found",
                }
            ),
        }
    }
}

/// Per-tick view of the persisted record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    NoRecord,
    Fresh(MessageRecord),
    Stale(MessageRecord),
}

impl RecordState {
    /// Classify a record against the staleness threshold
    pub fn of(record: Option<MessageRecord>, now: DateTime<Utc>, stale_after: Duration) -> Self {
        match record {
            None => Self::NoRecord,
            Some(record) if record.is_stale(now, stale_after) => Self::Stale(record),
            Some(record) => Self::Fresh(record),
        }
    }
}

/// Reconciles the chat with the latest status text
pub struct LifecycleManager {
    transport: Arc<dyn ChatTransport>,
    store: Arc<dyn StateStore>,
    key: String,
    stale_after: Duration,
    repin_on_edit: bool,
}

impl LifecycleManager {
    /// Create a manager for the record stored under `key`
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        store: Arc<dyn StateStore>,
        key: impl Into<String>,
        stale_after: Duration,
    ) -> Self {
        Self {
            transport,
            store,
            key: key.into(),
            stale_after,
            repin_on_edit: false,
        }
    }

    /// Create a manager from the ticker configuration
    pub fn from_config(
        config: &TickerConfig,
        transport: Arc<dyn ChatTransport>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self::new(transport, store, config.store_key(), config.stale_after)
            .with_repin_on_edit(config.repin_on_edit)
    }

    /// Re-pin the live message after each successful edit
    pub fn with_repin_on_edit(mut self, repin: bool) -> Self {
        self.repin_on_edit = repin;
        self
    }

    /// Bring the chat in line with `text`.
    ///
    /// An unreadable store counts as no record.
    pub async fn reconcile(&self, text: &str, now: DateTime<Utc>) -> Result<TickOutcome> {
        let record = self.store.load(&self.key).await;
        self.apply(RecordState::of(record, now, self.stale_after), text, now)
            .await
    }

    async fn apply(&self, state: RecordState, text: &str, now: DateTime<Utc>) -> Result<TickOutcome> {
        match state {
            RecordState::NoRecord => {
                let message_id = self.publish(text, now).await?;
                info!(message_id, "Sent initial status message");
                Ok(TickOutcome::Created { message_id })
            }
            RecordState::Fresh(record) => self.edit_or_replace(record, text, now).await,
            RecordState::Stale(record) => {
                let old = record.message_id;
                info!(message_id = old, created_at = %record.created_at, "Status message is stale, replacing");

                log_cosmetic("unpin", old, self.transport.unpin(old).await);
                log_cosmetic("delete", old, self.transport.delete(old).await);

                let message_id = self.publish(text, now).await?;
                info!(old_message_id = old, message_id, "Replaced stale status message");
                Ok(TickOutcome::Replaced {
                    old_message_id: old,
                    message_id,
                    reason: ReplaceReason::Stale,
                })
            }
        }
    }

    async fn edit_or_replace(
        &self,
        record: MessageRecord,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<TickOutcome> {
        let old = record.message_id;

        match self.transport.edit(old, text).await {
            Ok(()) => {
                if self.repin_on_edit {
                    log_cosmetic("pin", old, self.transport.pin(old).await);
                }
                info!(message_id = old, "Edited status message");
                Ok(TickOutcome::Edited { message_id: old })
            }
            Err(e) if e.is_not_found() => {
                info!(message_id = old, "Status message not found, sending a new one");
                let message_id = self.publish(text, now).await?;
                Ok(TickOutcome::Replaced {
                    old_message_id: old,
                    message_id,
                    reason: ReplaceReason::NotFound,
                })
            }
            // Record stays; the next tick tries the edit again
            Err(e) => Err(e.into()),
        }
    }

    /// Send a new message, persist it as the live one, then pin it
    async fn publish(&self, text: &str, now: DateTime<Utc>) -> Result<i64> {
        let message_id = self.transport.send(text).await?;
        let record = MessageRecord::new(message_id, now);

        if let Err(e) = self.store.set(&self.key, &record).await {
            error!(
                message_id,
                store = self.store.name(),
                "Message sent but its record was not persisted; the next tick will send a duplicate: {e}"
            );
            return Err(TickerError::StoreWriteError {
                message_id,
                reason: e.to_string(),
            });
        }

        log_cosmetic("pin", message_id, self.transport.pin(message_id).await);
        Ok(message_id)
    }
}

fn log_cosmetic(action: &str, message_id: i64, result: TransportResult<()>) {
    if let Err(e) = result {
        warn!(message_id, "Failed to {action} message: {e}");
    }
}
