//! Push notification payloads.
//!
//! Mobile clients route on the `kind` field of the data map, so the payload
//! is a closed set of variants rather than free-form key/value pairs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{AcceptStatus, BoardId, ChatRoomId, MessageId, MessageType, UserId};

/// Structured data attached to a push notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PushPayload {
    /// Enrollment created, accepted or rejected.
    EnrollmentEvent {
        /// Board the enrollment targets.
        board_id: BoardId,
        /// Owner decision; absent for a new request.
        accept_status: Option<AcceptStatus>,
        /// Room the applicant was admitted to.
        chat_room_id: Option<ChatRoomId>,
    },
    /// New chat message.
    ChatMessageEvent {
        /// Room the message was posted in.
        chat_room_id: ChatRoomId,
        /// Logged message.
        message_id: MessageId,
        /// Author.
        sender_id: UserId,
        /// Message kind.
        message_type: MessageType,
    },
}

impl PushPayload {
    /// Flatten into the string map push gateways accept as `data`.
    ///
    /// # Examples
    /// ```
    /// use companion::domain::{BoardId, PushPayload};
    ///
    /// let data = PushPayload::EnrollmentEvent {
    ///     board_id: BoardId::random(),
    ///     accept_status: None,
    ///     chat_room_id: None,
    /// }
    /// .data();
    /// assert_eq!(data.get("kind").map(String::as_str), Some("enrollment_event"));
    /// assert!(!data.contains_key("chat_room_id"));
    /// ```
    pub fn data(&self) -> BTreeMap<String, String> {
        let mut data = BTreeMap::new();
        match self {
            Self::EnrollmentEvent {
                board_id,
                accept_status,
                chat_room_id,
            } => {
                data.insert("kind".to_owned(), "enrollment_event".to_owned());
                data.insert("board_id".to_owned(), board_id.to_string());
                if let Some(status) = accept_status {
                    data.insert("accept_status".to_owned(), status.as_str().to_owned());
                }
                if let Some(room) = chat_room_id {
                    data.insert("chat_room_id".to_owned(), room.to_string());
                }
            }
            Self::ChatMessageEvent {
                chat_room_id,
                message_id,
                sender_id,
                message_type,
            } => {
                data.insert("kind".to_owned(), "chat_message_event".to_owned());
                data.insert("chat_room_id".to_owned(), chat_room_id.to_string());
                data.insert("message_id".to_owned(), message_id.to_string());
                data.insert("sender_id".to_owned(), sender_id.to_string());
                data.insert("message_type".to_owned(), message_type.as_str().to_owned());
            }
        }
        data
    }
}

/// Notification text plus its structured payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    /// Notification headline.
    pub title: String,
    /// Notification body.
    pub body: String,
    /// Routing data for the client.
    pub payload: PushPayload,
}

impl PushMessage {
    /// Bundle text and payload.
    pub fn new(title: impl Into<String>, body: impl Into<String>, payload: PushPayload) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            payload,
        }
    }
}
