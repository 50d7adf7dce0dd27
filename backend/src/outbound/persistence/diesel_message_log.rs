//! PostgreSQL-backed chat message log.
//!
//! `seq` is a `BIGSERIAL`, so appends from concurrent senders get distinct,
//! increasing sequence numbers without any application-side locking.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{MessageLog, MessageLogError};
use crate::domain::{ChatRoomId, Message, MessageType, NewMessage, UserId};

use super::diesel_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::{MessageRow, NewMessageRow};
use super::pool::{DbPool, PoolError};
use super::schema::chat_messages;

/// Diesel-backed implementation of the message log port.
#[derive(Clone)]
pub struct DieselMessageLog {
    pool: DbPool,
}

impl DieselMessageLog {
    /// Create a new log with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> MessageLogError {
    map_basic_pool_error(error, MessageLogError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> MessageLogError {
    map_basic_diesel_error(error, MessageLogError::query, MessageLogError::connection)
}

fn to_message(row: MessageRow) -> Result<Message, MessageLogError> {
    Message::try_from(row).map_err(|err| MessageLogError::query(format!("corrupt message: {err}")))
}

#[async_trait]
impl MessageLog for DieselMessageLog {
    async fn append(&self, message: NewMessage) -> Result<Message, MessageLogError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = NewMessageRow {
            id: *message.id.as_uuid(),
            chat_room_id: *message.chat_room_id.as_uuid(),
            sender_id: message.sender_id.map(|id| *id.as_uuid()),
            content: &message.content,
            message_type: message.message_type.as_str(),
            sent_at: message.sent_at,
        };
        let stored = diesel::insert_into(chat_messages::table)
            .values(&row)
            .returning(MessageRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        to_message(stored)
    }

    async fn latest(&self, room_id: &ChatRoomId) -> Result<Option<Message>, MessageLogError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = chat_messages::table
            .filter(chat_messages::chat_room_id.eq(room_id.as_uuid()))
            .order(chat_messages::seq.desc())
            .select(MessageRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(to_message).transpose()
    }

    async fn list_before(
        &self,
        room_id: &ChatRoomId,
        before_seq: Option<i64>,
        limit: usize,
    ) -> Result<Vec<Message>, MessageLogError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut query = chat_messages::table
            .filter(chat_messages::chat_room_id.eq(*room_id.as_uuid()))
            .select(MessageRow::as_select())
            .into_boxed();
        if let Some(before) = before_seq {
            query = query.filter(chat_messages::seq.lt(before));
        }
        let rows: Vec<MessageRow> = query
            .order(chat_messages::seq.desc())
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(to_message).collect()
    }

    async fn count_unread(
        &self,
        room_id: &ChatRoomId,
        after: DateTime<Utc>,
        reader: &UserId,
    ) -> Result<u64, MessageLogError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let count: i64 = chat_messages::table
            .filter(chat_messages::chat_room_id.eq(room_id.as_uuid()))
            .filter(chat_messages::message_type.eq(MessageType::Talk.as_str()))
            .filter(chat_messages::sent_at.gt(after))
            .filter(chat_messages::sender_id.is_distinct_from(*reader.as_uuid()))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn delete_all(&self, room_id: &ChatRoomId) -> Result<u64, MessageLogError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(
            chat_messages::table.filter(chat_messages::chat_room_id.eq(room_id.as_uuid())),
        )
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(deleted as u64)
    }
}
