//! Chat messages (the append-only log side of chat).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use super::{ChatRoomId, MessageId, UserId, enrollment::UnknownVariant};

/// Kind of a logged message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// Regular user message.
    Talk,
    /// A participant joined.
    Enter,
    /// A participant left or was removed.
    Leave,
    /// First entry of a new calendar day.
    DateDivider,
}

impl MessageType {
    /// Stable storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Talk => "TALK",
            Self::Enter => "ENTER",
            Self::Leave => "LEAVE",
            Self::DateDivider => "DATE_DIVIDER",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "TALK" => Ok(Self::Talk),
            "ENTER" => Ok(Self::Enter),
            "LEAVE" => Ok(Self::Leave),
            "DATE_DIVIDER" => Ok(Self::DateDivider),
            other => Err(UnknownVariant(other.to_owned())),
        }
    }
}

/// Message waiting to be appended; the log assigns `seq`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    /// Message identifier.
    pub id: MessageId,
    /// Target room.
    pub chat_room_id: ChatRoomId,
    /// Author; absent for date dividers.
    pub sender_id: Option<UserId>,
    /// Text content.
    pub content: String,
    /// Message kind.
    pub message_type: MessageType,
    /// Send time.
    pub sent_at: DateTime<Utc>,
}

impl NewMessage {
    /// Build a message with a fresh identifier.
    pub fn new(
        chat_room_id: ChatRoomId,
        sender_id: Option<UserId>,
        content: impl Into<String>,
        message_type: MessageType,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::random(),
            chat_room_id,
            sender_id,
            content: content.into(),
            message_type,
            sent_at,
        }
    }

    /// Attach the append sequence assigned by the log.
    pub fn into_logged(self, seq: i64) -> Message {
        Message {
            id: self.id,
            seq,
            chat_room_id: self.chat_room_id,
            sender_id: self.sender_id,
            content: self.content,
            message_type: self.message_type,
            sent_at: self.sent_at,
        }
    }
}

/// Message as stored in the log.
///
/// `seq` is the log's append sequence and the authoritative order within a
/// room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message identifier.
    pub id: MessageId,
    /// Append sequence.
    pub seq: i64,
    /// Room the message belongs to.
    pub chat_room_id: ChatRoomId,
    /// Author; absent for date dividers.
    pub sender_id: Option<UserId>,
    /// Text content.
    pub content: String,
    /// Message kind.
    #[serde(rename = "type")]
    pub message_type: MessageType,
    /// Send time.
    pub sent_at: DateTime<Utc>,
}

/// Keyset position for reverse-chronological paging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCursor {
    /// Only messages with a lower sequence are returned.
    pub before_seq: i64,
}

/// Calendar-day boundaries in the service time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBoundary {
    offset: FixedOffset,
}

impl DayBoundary {
    /// Use the given UTC offset to decide calendar days.
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Calendar days follow UTC.
    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    /// Whether a message sent at `now` opens a new day after `latest`.
    pub fn needs_divider(&self, latest: Option<&Message>, now: DateTime<Utc>) -> bool {
        latest.is_none_or(|message| {
            message.sent_at.with_timezone(&self.offset).date_naive()
                < now.with_timezone(&self.offset).date_naive()
        })
    }

    /// Text rendered inside a date divider.
    pub fn divider_label(&self, now: DateTime<Utc>) -> String {
        now.with_timezone(&self.offset)
            .format("%Y-%m-%d (%a)")
            .to_string()
    }
}
