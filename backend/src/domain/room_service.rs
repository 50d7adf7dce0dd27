//! Chat room lifecycle: creation, departures, kicks and member settings.
//!
//! A room's owner is its board's owner. When the owner leaves, the board, the
//! room, every membership and every live enrollment go with it in one
//! transaction. Any other departure frees one board slot and one room seat.
//!
//! Every committed departure is also published on the room topic as a
//! [`RoomEvent`] so live sessions of the departed member close.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use tracing::{info, warn};

use crate::domain::ports::{
    ChatRoomCommand, ChatRoomQuery, ChatRoomRepository, CompanionPorts, CompanionStore,
    CreateChatRoomRequest, KickMemberRequest, LeaveChatRoomRequest, MemberRoom, MessageLog,
    ObjectStorage, ObjectStorageError, RealtimePublisher, StoreTransaction,
    UpdateNotificationSettingRequest, UpdateRoomImageRequest, UserDirectory, room_topic,
};
use crate::domain::service_support::{
    finish, map_message_log_error, map_room_repository_error, map_store_error,
};
use crate::domain::{
    Board, ChatRoom, ChatRoomId, Error, MessageService, MessageType, RoomEvent, RoomMembership,
    RoomOverview, UserId,
};

/// Largest accepted room image, in bytes.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Room lifecycle service implementing the chat room driving ports.
#[derive(Clone)]
pub struct RoomService {
    store: Arc<dyn CompanionStore>,
    rooms: Arc<dyn ChatRoomRepository>,
    log: Arc<dyn MessageLog>,
    users: Arc<dyn UserDirectory>,
    storage: Arc<dyn ObjectStorage>,
    publisher: Arc<dyn RealtimePublisher>,
    messages: Arc<MessageService>,
    clock: Arc<dyn Clock>,
}

/// How a member leaves a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Departure {
    Left,
    Removed,
}

impl Departure {
    fn announcement(self, nickname: &str) -> String {
        match self {
            Self::Left => format!("{nickname} left the chat."),
            Self::Removed => format!("{nickname} was removed from the chat."),
        }
    }
}

/// Result of a leave transaction.
enum LeaveOutcome {
    Dissolved,
    Departed,
}

impl RoomService {
    /// Build the service from the shared port bundle.
    pub fn new(ports: &CompanionPorts, messages: Arc<MessageService>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Arc::clone(&ports.store),
            rooms: Arc::clone(&ports.rooms),
            log: Arc::clone(&ports.message_log),
            users: Arc::clone(&ports.users),
            storage: Arc::clone(&ports.storage),
            publisher: Arc::clone(&ports.publisher),
            messages,
            clock,
        }
    }

    async fn record_creation(
        &self,
        tx: &mut dyn StoreTransaction,
        request: &CreateChatRoomRequest,
        now: DateTime<Utc>,
    ) -> Result<ChatRoom, Error> {
        let mut board = tx
            .lock_board(&request.board_id)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| Error::not_found(format!("board {} not found", request.board_id)))?;
        if !board.is_owned_by(&request.owner_id) {
            return Err(Error::forbidden("only the board owner may open its chat room"));
        }
        if tx
            .find_room_for_board(&board.id)
            .await
            .map_err(map_store_error)?
            .is_some()
        {
            return Err(Error::conflict("board already has a chat room"));
        }

        board.is_completed = true;
        tx.save_board(&board).await.map_err(map_store_error)?;
        let room = ChatRoom::open(board.id, now);
        tx.insert_room(&room).await.map_err(map_store_error)?;
        let membership = RoomMembership::join(room.id, board.owner_id, now);
        tx.insert_membership(&membership)
            .await
            .map_err(map_store_error)?;
        Ok(room)
    }

    /// Lock board then room for `room_id`, in that order.
    async fn lock_room_and_board(
        &self,
        tx: &mut dyn StoreTransaction,
        room_id: &ChatRoomId,
    ) -> Result<(Board, ChatRoom), Error> {
        let not_found = || Error::not_found(format!("chat room {room_id} not found"));
        let board_id = tx
            .find_room(room_id)
            .await
            .map_err(map_store_error)?
            .ok_or_else(not_found)?
            .board_id;
        let board = tx
            .lock_board(&board_id)
            .await
            .map_err(map_store_error)?
            .ok_or_else(not_found)?;
        let room = tx
            .lock_room(room_id)
            .await
            .map_err(map_store_error)?
            .ok_or_else(not_found)?;
        Ok((board, room))
    }

    async fn record_leave(
        &self,
        tx: &mut dyn StoreTransaction,
        request: &LeaveChatRoomRequest,
        now: DateTime<Utc>,
    ) -> Result<LeaveOutcome, Error> {
        let (mut board, mut room) = self
            .lock_room_and_board(tx, &request.chat_room_id)
            .await?;
        let membership = tx
            .find_membership(&room.id, &request.user_id)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| Error::forbidden("not a participant of this chat room"))?;

        if board.is_owned_by(&request.user_id) {
            board.soft_delete(now);
            tx.save_board(&board).await.map_err(map_store_error)?;
            room.soft_delete(now);
            tx.save_room(&room).await.map_err(map_store_error)?;
            tx.soft_delete_memberships(&room.id, now)
                .await
                .map_err(map_store_error)?;
            tx.soft_delete_enrollments(&board.id, None, now)
                .await
                .map_err(map_store_error)?;
            return Ok(LeaveOutcome::Dissolved);
        }

        remove_participant(tx, &mut board, &mut room, membership, now).await?;
        Ok(LeaveOutcome::Departed)
    }

    async fn record_kick(
        &self,
        tx: &mut dyn StoreTransaction,
        request: &KickMemberRequest,
        now: DateTime<Utc>,
    ) -> Result<(), Error> {
        let (mut board, mut room) = self
            .lock_room_and_board(tx, &request.chat_room_id)
            .await?;
        if !board.is_owned_by(&request.owner_id) {
            return Err(Error::forbidden("only the room owner may remove members"));
        }
        let membership = tx
            .find_membership(&room.id, &request.target_user_id)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| Error::not_found("user is not a participant of this chat room"))?;
        remove_participant(tx, &mut board, &mut room, membership, now).await
    }

    async fn publish_event(&self, event: RoomEvent) {
        let payload = match serde_json::to_string(&event) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(room_id = %event.chat_room_id(), error = %error, "failed to serialise room event");
                return;
            }
        };
        let topic = room_topic(&event.chat_room_id());
        if let Err(error) = self.publisher.publish(&topic, &payload).await {
            warn!(%topic, error = %error, "room event publish failed");
        }
    }

    async fn announce_departure(&self, room_id: ChatRoomId, user_id: UserId, how: Departure) {
        let name = match self.users.find_user(&user_id).await {
            Ok(Some(user)) => user.nickname,
            Ok(None) => "A member".to_owned(),
            Err(error) => {
                warn!(%user_id, error = %error, "nickname lookup failed");
                "A member".to_owned()
            }
        };
        if let Err(error) = self
            .messages
            .send_system_message(room_id, &how.announcement(&name), user_id, MessageType::Leave)
            .await
        {
            warn!(%room_id, error = %error, "failed to log LEAVE message");
        }
    }

    async fn overview(&self, user_id: &UserId, member_room: MemberRoom) -> Result<RoomOverview, Error> {
        let unread_count = self
            .log
            .count_unread(
                &member_room.room.id,
                member_room.membership.last_read_at,
                user_id,
            )
            .await
            .map_err(map_message_log_error)?;
        Ok(RoomOverview {
            is_owner: member_room.board_owner_id == *user_id,
            notifications_enabled: member_room.membership.notifications_enabled,
            board_title: member_room.board_title,
            room: member_room.room,
            unread_count,
        })
    }

    async fn require_owned_room(
        &self,
        user_id: &UserId,
        room_id: &ChatRoomId,
    ) -> Result<MemberRoom, Error> {
        let member_room = self
            .rooms
            .find_member_room(room_id, user_id)
            .await
            .map_err(map_room_repository_error)?
            .ok_or_else(|| Error::forbidden("not a participant of this chat room"))?;
        if member_room.board_owner_id != *user_id {
            return Err(Error::forbidden("only the room owner may change the room image"));
        }
        Ok(member_room)
    }
}

/// Retire a non-owner membership and free its seat and board slot.
async fn remove_participant(
    tx: &mut dyn StoreTransaction,
    board: &mut Board,
    room: &mut ChatRoom,
    mut membership: RoomMembership,
    now: DateTime<Utc>,
) -> Result<(), Error> {
    room.release()
        .map_err(|err| Error::integrity_violation(err.to_string()))?;
    board
        .capacity
        .release()
        .map_err(|err| Error::integrity_violation(err.to_string()))?;

    membership.soft_delete(now);
    tx.save_membership(&membership)
        .await
        .map_err(map_store_error)?;
    tx.save_room(room).await.map_err(map_store_error)?;
    tx.save_board(board).await.map_err(map_store_error)?;
    tx.soft_delete_enrollments(&board.id, Some(&membership.user_id), now)
        .await
        .map_err(map_store_error)?;
    Ok(())
}

fn map_storage_error(error: ObjectStorageError) -> Error {
    match error {
        ObjectStorageError::Invalid { message } => Error::invalid_request(message),
        ObjectStorageError::Write { message } => {
            Error::service_unavailable(format!("image storage unavailable: {message}"))
        }
    }
}

#[async_trait]
impl ChatRoomCommand for RoomService {
    async fn create_room_for_board(
        &self,
        request: CreateChatRoomRequest,
    ) -> Result<ChatRoom, Error> {
        let now = self.clock.utc();
        let mut tx = self.store.begin().await.map_err(map_store_error)?;
        let outcome = self.record_creation(tx.as_mut(), &request, now).await;
        let room = finish(tx, outcome).await?;
        info!(room_id = %room.id, board_id = %room.board_id, "chat room opened");
        Ok(room)
    }

    async fn leave(&self, request: LeaveChatRoomRequest) -> Result<(), Error> {
        let now = self.clock.utc();
        let mut tx = self.store.begin().await.map_err(map_store_error)?;
        let outcome = self.record_leave(tx.as_mut(), &request, now).await;
        match finish(tx, outcome).await? {
            LeaveOutcome::Dissolved => {
                info!(room_id = %request.chat_room_id, "owner left; chat room dissolved");
                self.publish_event(RoomEvent::Dissolved {
                    chat_room_id: request.chat_room_id,
                })
                .await;
            }
            LeaveOutcome::Departed => {
                info!(room_id = %request.chat_room_id, user_id = %request.user_id, "member left");
                self.publish_event(RoomEvent::Revoked {
                    chat_room_id: request.chat_room_id,
                    user_id: request.user_id,
                })
                .await;
                self.announce_departure(request.chat_room_id, request.user_id, Departure::Left)
                    .await;
            }
        }
        Ok(())
    }

    async fn kick(&self, request: KickMemberRequest) -> Result<(), Error> {
        if request.owner_id == request.target_user_id {
            return Err(Error::conflict("the owner cannot remove themselves; leave instead"));
        }
        let now = self.clock.utc();
        let mut tx = self.store.begin().await.map_err(map_store_error)?;
        let outcome = self.record_kick(tx.as_mut(), &request, now).await;
        finish(tx, outcome).await?;
        info!(
            room_id = %request.chat_room_id,
            user_id = %request.target_user_id,
            "member removed"
        );
        self.publish_event(RoomEvent::Revoked {
            chat_room_id: request.chat_room_id,
            user_id: request.target_user_id,
        })
        .await;
        self.announce_departure(
            request.chat_room_id,
            request.target_user_id,
            Departure::Removed,
        )
        .await;
        Ok(())
    }

    async fn update_room_image(&self, request: UpdateRoomImageRequest) -> Result<String, Error> {
        self.require_owned_room(&request.owner_id, &request.chat_room_id)
            .await?;
        if request.bytes.is_empty() {
            return Err(Error::invalid_request("image must not be empty")
                .with_details(serde_json::json!({ "field": "image", "code": "empty" })));
        }
        if request.bytes.len() > MAX_IMAGE_BYTES {
            return Err(Error::invalid_request(format!(
                "image must be at most {MAX_IMAGE_BYTES} bytes"
            ))
            .with_details(serde_json::json!({ "field": "image", "code": "too_large" })));
        }

        let url = self
            .storage
            .upload(request.bytes, &request.content_type)
            .await
            .map_err(map_storage_error)?;
        self.rooms
            .set_image(&request.chat_room_id, &url)
            .await
            .map_err(map_room_repository_error)?;
        Ok(url)
    }

    async fn update_notification_setting(
        &self,
        request: UpdateNotificationSettingRequest,
    ) -> Result<(), Error> {
        let updated = self
            .rooms
            .set_notifications(&request.chat_room_id, &request.user_id, request.enabled)
            .await
            .map_err(map_room_repository_error)?;
        if updated {
            Ok(())
        } else {
            Err(Error::forbidden("not a participant of this chat room"))
        }
    }
}

#[async_trait]
impl ChatRoomQuery for RoomService {
    async fn get_room(&self, user_id: UserId, chat_room_id: ChatRoomId) -> Result<RoomOverview, Error> {
        let member_room = self
            .rooms
            .find_member_room(&chat_room_id, &user_id)
            .await
            .map_err(map_room_repository_error)?
            .ok_or_else(|| Error::forbidden("not a participant of this chat room"))?;
        self.overview(&user_id, member_room).await
    }

    async fn list_rooms(&self, user_id: UserId) -> Result<Vec<RoomOverview>, Error> {
        let member_rooms = self
            .rooms
            .list_member_rooms(&user_id)
            .await
            .map_err(map_room_repository_error)?;
        let mut overviews = Vec::with_capacity(member_rooms.len());
        for member_room in member_rooms {
            overviews.push(self.overview(&user_id, member_room).await?);
        }
        Ok(overviews)
    }
}

#[cfg(test)]
#[path = "room_service_tests.rs"]
mod tests;
