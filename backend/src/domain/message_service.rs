//! Message pipeline: append, summarise, broadcast, fan out.
//!
//! The log append always happens before the room summary update, so a crash
//! between the two leaves a stale summary rather than one that names a
//! message the log never stored.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use pagination::Paginated;
use tracing::warn;

use crate::domain::ports::{
    ChatMessageCommand, ChatMessageQuery, ChatRoomRepository, CompanionPorts, ListMessagesRequest,
    MemberRoom, MessageLog, RealtimePublisher, SendMessageRequest, room_topic,
};
use crate::domain::service_support::{
    decode_cursor, into_page, map_message_log_error, map_room_repository_error,
};
use crate::domain::{
    ChatRoomId, DayBoundary, Error, Message, MessageCursor, MessageType, NewMessage,
    NotificationFanout, UserId,
};

/// Longest accepted chat message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 2_000;

/// Message pipeline implementing the chat message driving ports.
#[derive(Clone)]
pub struct MessageService {
    rooms: Arc<dyn ChatRoomRepository>,
    log: Arc<dyn MessageLog>,
    publisher: Arc<dyn RealtimePublisher>,
    fanout: NotificationFanout,
    clock: Arc<dyn Clock>,
    day_boundary: DayBoundary,
}

impl MessageService {
    /// Build the pipeline; `day_boundary` decides when date dividers appear.
    pub fn new(ports: &CompanionPorts, clock: Arc<dyn Clock>, day_boundary: DayBoundary) -> Self {
        Self {
            rooms: Arc::clone(&ports.rooms),
            log: Arc::clone(&ports.message_log),
            publisher: Arc::clone(&ports.publisher),
            fanout: NotificationFanout::new(ports),
            clock,
            day_boundary,
        }
    }

    /// Log and broadcast an ENTER or LEAVE event; no push is sent.
    pub async fn send_system_message(
        &self,
        chat_room_id: ChatRoomId,
        content: &str,
        actor_id: UserId,
        message_type: MessageType,
    ) -> Result<Message, Error> {
        if !matches!(message_type, MessageType::Enter | MessageType::Leave) {
            return Err(Error::invalid_request(format!(
                "{message_type} is not a system message type"
            )));
        }
        self.append_and_broadcast(chat_room_id, Some(actor_id), content, message_type)
            .await
    }

    async fn append_and_broadcast(
        &self,
        chat_room_id: ChatRoomId,
        sender_id: Option<UserId>,
        content: &str,
        message_type: MessageType,
    ) -> Result<Message, Error> {
        let now = self.clock.utc();
        let latest = self
            .log
            .latest(&chat_room_id)
            .await
            .map_err(map_message_log_error)?;
        if self.day_boundary.needs_divider(latest.as_ref(), now) {
            let divider = NewMessage::new(
                chat_room_id,
                None,
                self.day_boundary.divider_label(now),
                MessageType::DateDivider,
                now,
            );
            let divider = self
                .log
                .append(divider)
                .await
                .map_err(map_message_log_error)?;
            self.broadcast(&divider).await;
        }

        let message = self
            .log
            .append(NewMessage::new(
                chat_room_id,
                sender_id,
                content,
                message_type,
                now,
            ))
            .await
            .map_err(map_message_log_error)?;

        // Append succeeded; a failed summary update only leaves it stale.
        if let Err(error) = self
            .rooms
            .touch_last_message(&chat_room_id, message.sent_at, &message.content)
            .await
        {
            warn!(room_id = %chat_room_id, error = %error, "room summary update failed");
        }

        self.broadcast(&message).await;
        Ok(message)
    }

    async fn broadcast(&self, message: &Message) {
        let payload = match serde_json::to_string(message) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(message_id = %message.id, error = %error, "failed to serialise message");
                return;
            }
        };
        let topic = room_topic(&message.chat_room_id);
        if let Err(error) = self.publisher.publish(&topic, &payload).await {
            warn!(%topic, error = %error, "realtime publish failed");
        }
    }

    async fn require_membership(
        &self,
        chat_room_id: &ChatRoomId,
        user_id: &UserId,
    ) -> Result<MemberRoom, Error> {
        self.rooms
            .find_member_room(chat_room_id, user_id)
            .await
            .map_err(map_room_repository_error)?
            .ok_or_else(|| Error::forbidden("not a participant of this chat room"))
    }
}

#[async_trait]
impl ChatMessageCommand for MessageService {
    async fn send(&self, request: SendMessageRequest) -> Result<Message, Error> {
        let content = request.content.trim();
        if content.is_empty() {
            return Err(Error::invalid_request("message content must not be blank")
                .with_details(serde_json::json!({ "field": "content", "code": "blank" })));
        }
        if content.chars().count() > MAX_MESSAGE_CHARS {
            return Err(Error::invalid_request(format!(
                "message content must be at most {MAX_MESSAGE_CHARS} characters"
            ))
            .with_details(serde_json::json!({ "field": "content", "code": "too_long" })));
        }

        let member_room = self
            .require_membership(&request.chat_room_id, &request.sender_id)
            .await?;
        let message = self
            .append_and_broadcast(
                request.chat_room_id,
                Some(request.sender_id),
                content,
                MessageType::Talk,
            )
            .await?;

        self.fanout
            .dispatch_chat_message(&member_room.board_title, &message)
            .await;
        Ok(message)
    }

    async fn mark_read(&self, user_id: UserId, chat_room_id: ChatRoomId) -> Result<(), Error> {
        let updated = self
            .rooms
            .mark_read(&chat_room_id, &user_id, self.clock.utc())
            .await
            .map_err(map_room_repository_error)?;
        if updated {
            Ok(())
        } else {
            Err(Error::forbidden("not a participant of this chat room"))
        }
    }

    async fn delete_all_messages(&self, chat_room_id: ChatRoomId) -> Result<u64, Error> {
        self.log
            .delete_all(&chat_room_id)
            .await
            .map_err(map_message_log_error)
    }
}

#[async_trait]
impl ChatMessageQuery for MessageService {
    async fn list(&self, request: ListMessagesRequest) -> Result<Paginated<Message>, Error> {
        self.require_membership(&request.chat_room_id, &request.user_id)
            .await?;
        let cursor: Option<MessageCursor> = decode_cursor(&request.page)?;
        let limit = request.page.limit();

        let rows = self
            .log
            .list_before(
                &request.chat_room_id,
                cursor.map(|position| position.before_seq),
                limit + 1,
            )
            .await
            .map_err(map_message_log_error)?;
        let page = into_page(rows, limit, |message: &Message| MessageCursor {
            before_seq: message.seq,
        })?;

        self.mark_read(request.user_id, request.chat_room_id).await?;
        Ok(page)
    }

    async fn unread_count(&self, user_id: UserId, chat_room_id: ChatRoomId) -> Result<u64, Error> {
        let member_room = self.require_membership(&chat_room_id, &user_id).await?;
        self.log
            .count_unread(&chat_room_id, member_room.membership.last_read_at, &user_id)
            .await
            .map_err(map_message_log_error)
    }
}

#[cfg(test)]
#[path = "message_service_tests.rs"]
mod tests;
