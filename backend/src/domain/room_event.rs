//! Membership control events published on a room topic.
//!
//! These frames share the topic with logged messages but never enter the
//! log. Live sessions use them to drop connections whose membership ended.

use serde::{Deserialize, Serialize};

use super::{ChatRoomId, UserId};

/// A membership change that ends live sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomEvent {
    /// One member left or was removed.
    Revoked {
        /// Room the member belonged to.
        #[serde(rename = "chatRoomId")]
        chat_room_id: ChatRoomId,
        /// Member whose sessions must end.
        #[serde(rename = "userId")]
        user_id: UserId,
    },
    /// The owner left and the room is gone for everyone.
    Dissolved {
        /// Dissolved room.
        #[serde(rename = "chatRoomId")]
        chat_room_id: ChatRoomId,
    },
}

impl RoomEvent {
    /// Room the event belongs to.
    pub fn chat_room_id(&self) -> ChatRoomId {
        match self {
            Self::Revoked { chat_room_id, .. } | Self::Dissolved { chat_room_id } => *chat_room_id,
        }
    }

    /// Whether a session held by `user_id` must close.
    pub fn ends_session_of(&self, user_id: &UserId) -> bool {
        match self {
            Self::Revoked {
                user_id: revoked, ..
            } => revoked == user_id,
            Self::Dissolved { .. } => true,
        }
    }

    /// Read a topic frame; `None` for anything that is not a control event.
    pub fn parse(frame: &str) -> Option<Self> {
        serde_json::from_str(frame).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Message, MessageType, NewMessage};
    use chrono::Utc;
    use rstest::rstest;

    #[rstest]
    fn revocations_name_the_member() {
        let room = ChatRoomId::random();
        let user = UserId::random();
        let event = RoomEvent::Revoked {
            chat_room_id: room,
            user_id: user,
        };
        let value = serde_json::to_value(event).expect("serialise");

        assert_eq!(value["type"], "REVOKED");
        assert_eq!(value["chatRoomId"], room.to_string());
        assert_eq!(value["userId"], user.to_string());
        assert!(event.ends_session_of(&user));
        assert!(!event.ends_session_of(&UserId::random()));
    }

    #[rstest]
    fn dissolution_ends_every_session() {
        let event = RoomEvent::Dissolved {
            chat_room_id: ChatRoomId::random(),
        };
        let frame = serde_json::to_string(&event).expect("serialise");

        assert_eq!(RoomEvent::parse(&frame), Some(event));
        assert!(event.ends_session_of(&UserId::random()));
    }

    #[rstest]
    fn logged_messages_are_not_control_events() {
        let message: Message = NewMessage::new(
            ChatRoomId::random(),
            Some(UserId::random()),
            "hello",
            MessageType::Talk,
            Utc::now(),
        )
        .into_logged(1);
        let frame = serde_json::to_string(&message).expect("serialise");

        assert_eq!(RoomEvent::parse(&frame), None);
    }
}
