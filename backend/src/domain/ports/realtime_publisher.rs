//! Port for the room-scoped real-time broadcast transport.

use async_trait::async_trait;

use crate::domain::ChatRoomId;

use super::define_port_error;

define_port_error! {
    /// Errors raised by broadcast adapters.
    pub enum RealtimePublishError {
        /// The payload could not be handed to the transport.
        Publish { message: String } =>
            "realtime publish failed: {message}",
    }
}

/// Topic that carries every event of a chat room.
///
/// # Examples
/// ```
/// use companion::domain::ChatRoomId;
/// use companion::domain::ports::room_topic;
/// use uuid::Uuid;
///
/// assert_eq!(
///     room_topic(&ChatRoomId::from_uuid(Uuid::nil())),
///     "chat-room/00000000-0000-0000-0000-000000000000",
/// );
/// ```
pub fn room_topic(room_id: &ChatRoomId) -> String {
    format!("chat-room/{room_id}")
}

/// Port for publishing to a topic. Fire-and-forget: a topic without
/// subscribers is not an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RealtimePublisher: Send + Sync {
    /// Publish a serialised event.
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), RealtimePublishError>;
}

/// Publisher that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureRealtimePublisher;

#[async_trait]
impl RealtimePublisher for FixtureRealtimePublisher {
    async fn publish(&self, _topic: &str, _payload: &str) -> Result<(), RealtimePublishError> {
        Ok(())
    }
}

/// Port for listening to a topic.
///
/// Receivers that fall behind the transport's buffer observe a lag and skip
/// the missed frames.
pub trait RealtimeSubscriber: Send + Sync {
    /// Start receiving frames published to `topic`.
    fn subscribe(&self, topic: &str) -> tokio::sync::broadcast::Receiver<String>;

    /// Release transport resources for `topic` once nobody listens.
    fn release(&self, topic: &str);
}
