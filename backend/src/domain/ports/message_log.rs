//! Port for the append-only chat message log.
//!
//! The log is stored separately from room metadata. It assigns a strictly
//! increasing `seq` per append; readers order by `seq` only.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{ChatRoomId, Message, NewMessage, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by message log adapters.
    pub enum MessageLogError {
        /// Log connection could not be established.
        Connection { message: String } =>
            "message log connection failed: {message}",
        /// Append or read failed during execution.
        Query { message: String } =>
            "message log query failed: {message}",
    }
}

/// Port for appending and reading chat messages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageLog: Send + Sync {
    /// Append a message and return it with its sequence.
    async fn append(&self, message: NewMessage) -> Result<Message, MessageLogError>;

    /// Most recently appended message of a room.
    async fn latest(&self, room_id: &ChatRoomId) -> Result<Option<Message>, MessageLogError>;

    /// Up to `limit` messages with `seq < before_seq` (or from the tail when
    /// absent), newest first.
    async fn list_before(
        &self,
        room_id: &ChatRoomId,
        before_seq: Option<i64>,
        limit: usize,
    ) -> Result<Vec<Message>, MessageLogError>;

    /// TALK messages sent after `after` by anyone but `reader`.
    async fn count_unread(
        &self,
        room_id: &ChatRoomId,
        after: DateTime<Utc>,
        reader: &UserId,
    ) -> Result<u64, MessageLogError>;

    /// Drop the whole log of a room; returns the number of removed messages.
    async fn delete_all(&self, room_id: &ChatRoomId) -> Result<u64, MessageLogError>;
}
