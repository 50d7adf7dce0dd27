//! Chat room metadata and memberships (the relational side of chat).

use chrono::{DateTime, Utc};

use super::{BoardId, ChatRoomId, MembershipId, UserId};

/// Participant-count violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParticipantCountError {
    /// A removal would leave the room without its owner.
    #[error("chat room has no non-owner participant to remove")]
    NoParticipant,
}

/// Chat room opened for a completed board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRoom {
    /// Room identifier.
    pub id: ChatRoomId,
    /// Board the room belongs to (1:1).
    pub board_id: BoardId,
    /// Number of active memberships, owner included.
    pub participant_count: u32,
    /// Public URL of the room image.
    pub image_url: Option<String>,
    /// Time of the latest logged message.
    pub last_message_at: Option<DateTime<Utc>>,
    /// Content of the latest logged message.
    pub last_message_content: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Soft-deletion marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ChatRoom {
    /// Open a room with the owner as its only participant.
    pub fn open(board_id: BoardId, now: DateTime<Utc>) -> Self {
        Self {
            id: ChatRoomId::random(),
            board_id,
            participant_count: 1,
            image_url: None,
            last_message_at: None,
            last_message_content: None,
            created_at: now,
            deleted_at: None,
        }
    }

    /// Whether the room takes part in active-state queries.
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Count a newly admitted participant.
    pub fn admit(&mut self) {
        self.participant_count += 1;
    }

    /// Count a departed non-owner participant.
    pub fn release(&mut self) -> Result<(), ParticipantCountError> {
        if self.participant_count <= 1 {
            return Err(ParticipantCountError::NoParticipant);
        }
        self.participant_count -= 1;
        Ok(())
    }

    /// Soft-delete the room.
    pub fn soft_delete(&mut self, at: DateTime<Utc>) {
        self.deleted_at.get_or_insert(at);
    }
}

/// A user's participation in a chat room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomMembership {
    /// Membership identifier.
    pub id: MembershipId,
    /// Participant.
    pub user_id: UserId,
    /// Room joined.
    pub chat_room_id: ChatRoomId,
    /// Join time.
    pub joined_at: DateTime<Utc>,
    /// Messages sent after this instant count as unread.
    pub last_read_at: DateTime<Utc>,
    /// Whether push notifications are wanted for this room.
    pub notifications_enabled: bool,
    /// Soft-deletion marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl RoomMembership {
    /// Create an active membership with notifications on.
    pub fn join(chat_room_id: ChatRoomId, user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: MembershipId::random(),
            user_id,
            chat_room_id,
            joined_at: now,
            last_read_at: now,
            notifications_enabled: true,
            deleted_at: None,
        }
    }

    /// Whether the membership takes part in active-state queries.
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Soft-delete the membership.
    pub fn soft_delete(&mut self, at: DateTime<Utc>) {
        self.deleted_at.get_or_insert(at);
    }
}

/// Room annotated with the caller's unread count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomOverview {
    /// Room metadata.
    pub room: ChatRoom,
    /// Title of the room's board.
    pub board_title: String,
    /// Whether the caller owns the board.
    pub is_owner: bool,
    /// The caller's notification preference.
    pub notifications_enabled: bool,
    /// TALK messages the caller has not read.
    pub unread_count: u64,
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;

    #[test]
    fn new_room_counts_its_owner() {
        let room = ChatRoom::open(BoardId::random(), Utc::now());
        assert_eq!(room.participant_count, 1);
        assert!(room.is_active());
    }

    #[test]
    fn release_never_removes_the_owner_slot() {
        let mut room = ChatRoom::open(BoardId::random(), Utc::now());
        room.admit();
        room.release().expect("participant removed");
        assert_eq!(room.release(), Err(ParticipantCountError::NoParticipant));
        assert_eq!(room.participant_count, 1);
    }

    #[test]
    fn membership_starts_fully_read() {
        let now = Utc::now();
        let membership = RoomMembership::join(ChatRoomId::random(), UserId::random(), now);
        assert_eq!(membership.last_read_at, now);
        assert!(membership.notifications_enabled);
    }
}
