//! Append-only message log kept in process memory.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::ports::{MessageLog, MessageLogError};
use crate::domain::{ChatRoomId, Message, MessageType, NewMessage, UserId};

#[derive(Debug, Default)]
struct LogState {
    next_seq: i64,
    rooms: HashMap<ChatRoomId, Vec<Message>>,
}

/// Message log backed by per-room vectors in append order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMessageLog {
    state: Arc<RwLock<LogState>>,
}

impl InMemoryMessageLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageLog for InMemoryMessageLog {
    async fn append(&self, message: NewMessage) -> Result<Message, MessageLogError> {
        let mut state = self.state.write().await;
        state.next_seq += 1;
        let logged = message.into_logged(state.next_seq);
        state
            .rooms
            .entry(logged.chat_room_id)
            .or_default()
            .push(logged.clone());
        Ok(logged)
    }

    async fn latest(&self, room_id: &ChatRoomId) -> Result<Option<Message>, MessageLogError> {
        let state = self.state.read().await;
        Ok(state
            .rooms
            .get(room_id)
            .and_then(|messages| messages.last().cloned()))
    }

    async fn list_before(
        &self,
        room_id: &ChatRoomId,
        before_seq: Option<i64>,
        limit: usize,
    ) -> Result<Vec<Message>, MessageLogError> {
        let state = self.state.read().await;
        let Some(messages) = state.rooms.get(room_id) else {
            return Ok(Vec::new());
        };
        Ok(messages
            .iter()
            .rev()
            .filter(|message| before_seq.is_none_or(|seq| message.seq < seq))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_unread(
        &self,
        room_id: &ChatRoomId,
        after: DateTime<Utc>,
        reader: &UserId,
    ) -> Result<u64, MessageLogError> {
        let state = self.state.read().await;
        let count = state.rooms.get(room_id).map_or(0, |messages| {
            messages
                .iter()
                .filter(|message| {
                    message.message_type == MessageType::Talk
                        && message.sent_at > after
                        && message.sender_id != Some(*reader)
                })
                .count()
        });
        Ok(count as u64)
    }

    async fn delete_all(&self, room_id: &ChatRoomId) -> Result<u64, MessageLogError> {
        let mut state = self.state.write().await;
        Ok(state
            .rooms
            .remove(room_id)
            .map_or(0, |messages| messages.len() as u64))
    }
}
