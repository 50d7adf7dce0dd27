//! Driving port for chat room lifecycle changes.

use async_trait::async_trait;

use crate::domain::{BoardId, ChatRoom, ChatRoomId, Error, UserId};

/// Request to open the room of a completed board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateChatRoomRequest {
    /// Caller; must own the board.
    pub owner_id: UserId,
    /// Board being completed.
    pub board_id: BoardId,
}

/// Request to leave a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveChatRoomRequest {
    /// Caller.
    pub user_id: UserId,
    /// Room to leave.
    pub chat_room_id: ChatRoomId,
}

/// Request to remove another participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KickMemberRequest {
    /// Caller; must own the room's board.
    pub owner_id: UserId,
    /// Room to remove the participant from.
    pub chat_room_id: ChatRoomId,
    /// Participant to remove.
    pub target_user_id: UserId,
}

/// Request to replace the room image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRoomImageRequest {
    /// Caller; must own the room's board.
    pub owner_id: UserId,
    /// Room to update.
    pub chat_room_id: ChatRoomId,
    /// Image bytes.
    pub bytes: Vec<u8>,
    /// MIME type of the image.
    pub content_type: String,
}

/// Request to toggle push notifications for one membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateNotificationSettingRequest {
    /// Caller.
    pub user_id: UserId,
    /// Room the setting applies to.
    pub chat_room_id: ChatRoomId,
    /// New preference.
    pub enabled: bool,
}

/// Driving port for room lifecycle operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatRoomCommand: Send + Sync {
    /// Mark the board completed and open its room with the owner inside.
    async fn create_room_for_board(&self, request: CreateChatRoomRequest)
    -> Result<ChatRoom, Error>;

    /// Leave a room; an owner leaving closes the board and the room.
    async fn leave(&self, request: LeaveChatRoomRequest) -> Result<(), Error>;

    /// Remove a participant on the owner's behalf.
    async fn kick(&self, request: KickMemberRequest) -> Result<(), Error>;

    /// Upload and attach a room image, returning its URL.
    async fn update_room_image(&self, request: UpdateRoomImageRequest) -> Result<String, Error>;

    /// Toggle the caller's push preference for the room.
    async fn update_notification_setting(
        &self,
        request: UpdateNotificationSettingRequest,
    ) -> Result<(), Error>;
}
