//! Chat platform transports
//!
//! A transport wraps the remote operations the lifecycle manager needs, each
//! a single request/response exchange with the messaging API.

pub mod telegram;

use crate::error::TransportResult;
use async_trait::async_trait;

pub use telegram::{TelegramConfig, TelegramTransport};

/// Remote message operations against a single chat
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Post a new message, returning its id
    async fn send(&self, text: &str) -> TransportResult<i64>;

    /// Replace the text of an existing message.
    ///
    /// Fails with `TransportError::MessageNotFound` when the message is gone
    /// or can no longer be edited.
    async fn edit(&self, message_id: i64, text: &str) -> TransportResult<()>;

    /// Delete a message. Callers treat failure as cosmetic.
    async fn delete(&self, message_id: i64) -> TransportResult<()>;

    /// Pin a message without notifying the chat. Callers treat failure as cosmetic.
    async fn pin(&self, message_id: i64) -> TransportResult<()>;

    /// Unpin a message. Callers treat failure as cosmetic.
    async fn unpin(&self, message_id: i64) -> TransportResult<()>;
}
