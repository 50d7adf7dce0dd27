//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions into domain types validate
//! stored enums and counters and report anything unexpected as a message the
//! caller wraps in its own error type.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{
    Board, BoardId, CapacityLedger, ChatRoom, ChatRoomId, Enrollment, EnrollmentId, Message,
    MembershipId, MessageId, Notification, NotificationId, RoomMembership, UserContact, UserId,
};

use super::schema::{
    boards, chat_messages, chat_rooms, enrollments, notifications, room_memberships, users,
};

fn to_count(value: i32, column: &str) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("{column} is negative: {value}"))
}

fn from_count(value: u32, column: &str) -> Result<i32, String> {
    i32::try_from(value).map_err(|_| format!("{column} overflows: {value}"))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub nickname: String,
    pub push_token: Option<String>,
}

impl From<UserRow> for UserContact {
    fn from(row: UserRow) -> Self {
        Self::new(UserId::from_uuid(row.id), row.nickname, row.push_token)
    }
}

// ---------------------------------------------------------------------------
// Boards
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = boards)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct BoardRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub current_person: i32,
    pub max_person: i32,
    pub is_completed: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<BoardRow> for Board {
    type Error = String;

    fn try_from(row: BoardRow) -> Result<Self, Self::Error> {
        let capacity = CapacityLedger::new(
            to_count(row.current_person, "current_person")?,
            to_count(row.max_person, "max_person")?,
        )
        .map_err(|err| err.to_string())?;
        Ok(Self {
            id: BoardId::from_uuid(row.id),
            owner_id: UserId::from_uuid(row.owner_id),
            title: row.title,
            capacity,
            is_completed: row.is_completed,
            deleted_at: row.deleted_at,
        })
    }
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = boards)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct BoardUpdate {
    pub current_person: i32,
    pub is_completed: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<&Board> for BoardUpdate {
    type Error = String;

    fn try_from(board: &Board) -> Result<Self, Self::Error> {
        Ok(Self {
            current_person: from_count(board.capacity.current(), "current_person")?,
            is_completed: board.is_completed,
            deleted_at: board.deleted_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Enrollments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = enrollments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct EnrollmentRow {
    pub id: Uuid,
    pub board_id: Uuid,
    pub applicant_id: Uuid,
    pub status: String,
    pub is_new: bool,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<EnrollmentRow> for Enrollment {
    type Error = String;

    fn try_from(row: EnrollmentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: EnrollmentId::from_uuid(row.id),
            board_id: BoardId::from_uuid(row.board_id),
            applicant_id: UserId::from_uuid(row.applicant_id),
            status: row.status.parse().map_err(|err| format!("status: {err}"))?,
            is_new: row.is_new,
            description: row.description,
            created_at: row.created_at,
            deleted_at: row.deleted_at,
        })
    }
}

impl From<&Enrollment> for EnrollmentRow {
    fn from(enrollment: &Enrollment) -> Self {
        Self {
            id: *enrollment.id.as_uuid(),
            board_id: *enrollment.board_id.as_uuid(),
            applicant_id: *enrollment.applicant_id.as_uuid(),
            status: enrollment.status.as_str().to_owned(),
            is_new: enrollment.is_new,
            description: enrollment.description.clone(),
            created_at: enrollment.created_at,
            deleted_at: enrollment.deleted_at,
        }
    }
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = enrollments)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct EnrollmentUpdate<'a> {
    pub status: &'a str,
    pub is_new: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl<'a> From<&'a Enrollment> for EnrollmentUpdate<'a> {
    fn from(enrollment: &'a Enrollment) -> Self {
        Self {
            status: enrollment.status.as_str(),
            is_new: enrollment.is_new,
            deleted_at: enrollment.deleted_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Chat rooms and memberships
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = chat_rooms)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ChatRoomRow {
    pub id: Uuid,
    pub board_id: Uuid,
    pub participant_count: i32,
    pub image_url: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_message_content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<ChatRoomRow> for ChatRoom {
    type Error = String;

    fn try_from(row: ChatRoomRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ChatRoomId::from_uuid(row.id),
            board_id: BoardId::from_uuid(row.board_id),
            participant_count: to_count(row.participant_count, "participant_count")?,
            image_url: row.image_url,
            last_message_at: row.last_message_at,
            last_message_content: row.last_message_content,
            created_at: row.created_at,
            deleted_at: row.deleted_at,
        })
    }
}

impl TryFrom<&ChatRoom> for ChatRoomRow {
    type Error = String;

    fn try_from(room: &ChatRoom) -> Result<Self, Self::Error> {
        Ok(Self {
            id: *room.id.as_uuid(),
            board_id: *room.board_id.as_uuid(),
            participant_count: from_count(room.participant_count, "participant_count")?,
            image_url: room.image_url.clone(),
            last_message_at: room.last_message_at,
            last_message_content: room.last_message_content.clone(),
            created_at: room.created_at,
            deleted_at: room.deleted_at,
        })
    }
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = chat_rooms)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct ChatRoomUpdate {
    pub participant_count: i32,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<&ChatRoom> for ChatRoomUpdate {
    type Error = String;

    fn try_from(room: &ChatRoom) -> Result<Self, Self::Error> {
        Ok(Self {
            participant_count: from_count(room.participant_count, "participant_count")?,
            deleted_at: room.deleted_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = room_memberships)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MembershipRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub chat_room_id: Uuid,
    pub joined_at: DateTime<Utc>,
    pub last_read_at: DateTime<Utc>,
    pub notifications_enabled: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<MembershipRow> for RoomMembership {
    fn from(row: MembershipRow) -> Self {
        Self {
            id: MembershipId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            chat_room_id: ChatRoomId::from_uuid(row.chat_room_id),
            joined_at: row.joined_at,
            last_read_at: row.last_read_at,
            notifications_enabled: row.notifications_enabled,
            deleted_at: row.deleted_at,
        }
    }
}

impl From<&RoomMembership> for MembershipRow {
    fn from(membership: &RoomMembership) -> Self {
        Self {
            id: *membership.id.as_uuid(),
            user_id: *membership.user_id.as_uuid(),
            chat_room_id: *membership.chat_room_id.as_uuid(),
            joined_at: membership.joined_at,
            last_read_at: membership.last_read_at,
            notifications_enabled: membership.notifications_enabled,
            deleted_at: membership.deleted_at,
        }
    }
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = room_memberships)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct MembershipUpdate {
    pub last_read_at: DateTime<Utc>,
    pub notifications_enabled: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<&RoomMembership> for MembershipUpdate {
    fn from(membership: &RoomMembership) -> Self {
        Self {
            last_read_at: membership.last_read_at,
            notifications_enabled: membership.notifications_enabled,
            deleted_at: membership.deleted_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct NotificationRow {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub board_id: Uuid,
    pub enrollment_id: Option<Uuid>,
    pub title: String,
    pub body: String,
    pub accept_status: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = String;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let accept_status = row
            .accept_status
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(|err| format!("accept_status: {err}"))?;
        Ok(Self {
            id: NotificationId::from_uuid(row.id),
            recipient_id: UserId::from_uuid(row.recipient_id),
            sender_id: row.sender_id.map(UserId::from_uuid),
            board_id: BoardId::from_uuid(row.board_id),
            enrollment_id: row.enrollment_id.map(EnrollmentId::from_uuid),
            title: row.title,
            body: row.body,
            accept_status,
            is_read: row.is_read,
            created_at: row.created_at,
            deleted_at: row.deleted_at,
        })
    }
}

impl From<&Notification> for NotificationRow {
    fn from(notification: &Notification) -> Self {
        Self {
            id: *notification.id.as_uuid(),
            recipient_id: *notification.recipient_id.as_uuid(),
            sender_id: notification.sender_id.map(|id| *id.as_uuid()),
            board_id: *notification.board_id.as_uuid(),
            enrollment_id: notification.enrollment_id.map(|id| *id.as_uuid()),
            title: notification.title.clone(),
            body: notification.body.clone(),
            accept_status: notification
                .accept_status
                .map(|status| status.as_str().to_owned()),
            is_read: notification.is_read,
            created_at: notification.created_at,
            deleted_at: notification.deleted_at,
        }
    }
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = notifications)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct NotificationUpdate<'a> {
    pub accept_status: Option<&'a str>,
    pub is_read: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl<'a> From<&'a Notification> for NotificationUpdate<'a> {
    fn from(notification: &'a Notification) -> Self {
        Self {
            accept_status: notification.accept_status.map(|status| status.as_str()),
            is_read: notification.is_read,
            deleted_at: notification.deleted_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Message log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = chat_messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MessageRow {
    pub seq: i64,
    pub id: Uuid,
    pub chat_room_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub content: String,
    pub message_type: String,
    pub sent_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for Message {
    type Error = String;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: MessageId::from_uuid(row.id),
            seq: row.seq,
            chat_room_id: ChatRoomId::from_uuid(row.chat_room_id),
            sender_id: row.sender_id.map(UserId::from_uuid),
            content: row.content,
            message_type: row
                .message_type
                .parse()
                .map_err(|err| format!("message_type: {err}"))?,
            sent_at: row.sent_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = chat_messages)]
pub(crate) struct NewMessageRow<'a> {
    pub id: Uuid,
    pub chat_room_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub content: &'a str,
    pub message_type: &'a str,
    pub sent_at: DateTime<Utc>,
}
