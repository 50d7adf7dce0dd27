//! PostgreSQL-backed chat room reads and lock-free single-row updates.

use std::cmp::Reverse;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{ChatRoomRepository, ChatRoomRepositoryError, MemberRoom};
use crate::domain::{ChatRoom, ChatRoomId, RoomMembership, UserId};

use super::diesel_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::{ChatRoomRow, MembershipRow};
use super::pool::{DbPool, PoolError};
use super::schema::{boards, chat_rooms, room_memberships};

/// Diesel-backed implementation of the chat room repository port.
#[derive(Clone)]
pub struct DieselChatRoomRepository {
    pool: DbPool,
}

impl DieselChatRoomRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> ChatRoomRepositoryError {
    map_basic_pool_error(error, ChatRoomRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> ChatRoomRepositoryError {
    map_basic_diesel_error(
        error,
        ChatRoomRepositoryError::query,
        ChatRoomRepositoryError::connection,
    )
}

type MemberRoomRow = (MembershipRow, ChatRoomRow, String, Uuid);

fn to_member_room(row: MemberRoomRow) -> Result<MemberRoom, ChatRoomRepositoryError> {
    let (membership, room, board_title, board_owner_id) = row;
    let room = ChatRoom::try_from(room)
        .map_err(|err| ChatRoomRepositoryError::query(format!("corrupt chat room: {err}")))?;
    Ok(MemberRoom {
        room,
        membership: RoomMembership::from(membership),
        board_title,
        board_owner_id: UserId::from_uuid(board_owner_id),
    })
}

#[async_trait]
impl ChatRoomRepository for DieselChatRoomRepository {
    async fn find_member_room(
        &self,
        room_id: &ChatRoomId,
        user_id: &UserId,
    ) -> Result<Option<MemberRoom>, ChatRoomRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<MemberRoomRow> = room_memberships::table
            .inner_join(chat_rooms::table.inner_join(boards::table))
            .filter(room_memberships::chat_room_id.eq(room_id.as_uuid()))
            .filter(room_memberships::user_id.eq(user_id.as_uuid()))
            .filter(room_memberships::deleted_at.is_null())
            .filter(chat_rooms::deleted_at.is_null())
            .select((
                MembershipRow::as_select(),
                ChatRoomRow::as_select(),
                boards::title,
                boards::owner_id,
            ))
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(to_member_room).transpose()
    }

    async fn list_member_rooms(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<MemberRoom>, ChatRoomRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<MemberRoomRow> = room_memberships::table
            .inner_join(chat_rooms::table.inner_join(boards::table))
            .filter(room_memberships::user_id.eq(user_id.as_uuid()))
            .filter(room_memberships::deleted_at.is_null())
            .filter(chat_rooms::deleted_at.is_null())
            .select((
                MembershipRow::as_select(),
                ChatRoomRow::as_select(),
                boards::title,
                boards::owner_id,
            ))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let mut rooms = rows
            .into_iter()
            .map(to_member_room)
            .collect::<Result<Vec<_>, _>>()?;
        rooms.sort_by_key(|entry| {
            Reverse((
                entry.room.last_message_at.unwrap_or(entry.room.created_at),
                entry.room.id,
            ))
        });
        Ok(rooms)
    }

    async fn list_memberships(
        &self,
        room_id: &ChatRoomId,
    ) -> Result<Vec<RoomMembership>, ChatRoomRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<MembershipRow> = room_memberships::table
            .filter(room_memberships::chat_room_id.eq(room_id.as_uuid()))
            .filter(room_memberships::deleted_at.is_null())
            .order(room_memberships::joined_at.asc())
            .select(MembershipRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(RoomMembership::from).collect())
    }

    async fn touch_last_message(
        &self,
        room_id: &ChatRoomId,
        sent_at: DateTime<Utc>,
        content: &str,
    ) -> Result<(), ChatRoomRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::update(
            chat_rooms::table.find(room_id.as_uuid()).filter(
                chat_rooms::last_message_at
                    .is_null()
                    .or(chat_rooms::last_message_at.le(sent_at)),
            ),
        )
        .set((
            chat_rooms::last_message_at.eq(sent_at),
            chat_rooms::last_message_content.eq(content),
        ))
        .execute(&mut conn)
        .await
        .map(|_| ())
        .map_err(map_diesel_error)
    }

    async fn mark_read(
        &self,
        room_id: &ChatRoomId,
        user_id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<bool, ChatRoomRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(
            room_memberships::table
                .filter(room_memberships::chat_room_id.eq(room_id.as_uuid()))
                .filter(room_memberships::user_id.eq(user_id.as_uuid()))
                .filter(room_memberships::deleted_at.is_null()),
        )
        .set(room_memberships::last_read_at.eq(at))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(updated > 0)
    }

    async fn set_notifications(
        &self,
        room_id: &ChatRoomId,
        user_id: &UserId,
        enabled: bool,
    ) -> Result<bool, ChatRoomRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(
            room_memberships::table
                .filter(room_memberships::chat_room_id.eq(room_id.as_uuid()))
                .filter(room_memberships::user_id.eq(user_id.as_uuid()))
                .filter(room_memberships::deleted_at.is_null()),
        )
        .set(room_memberships::notifications_enabled.eq(enabled))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(updated > 0)
    }

    async fn set_image(
        &self,
        room_id: &ChatRoomId,
        image_url: &str,
    ) -> Result<(), ChatRoomRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::update(chat_rooms::table.find(room_id.as_uuid()))
            .set(chat_rooms::image_url.eq(image_url))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }
}
