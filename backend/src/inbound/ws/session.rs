//! Per-connection room WebSocket handler.
//!
//! Keeps WebSocket framing and heartbeats at the edge while deferring
//! message handling to the injected `ChatMessageCommand`. The public
//! contract pings every 5s and considers a connection idle after 10s without
//! client traffic. Tests shorten these intervals.
//!
//! A session holds the caller's presence in the room for its whole lifetime
//! and forwards every event published on the room topic as a text frame. A
//! [`RoomEvent`] that ends the caller's membership closes the session instead.

use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_ws::{CloseCode, CloseReason, Closed, Message, MessageStream, ProtocolError, Session};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::time;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    ChatMessageCommand, PresenceRegistry, RealtimeSubscriber, SendMessageRequest, room_topic,
};
use crate::domain::{ChatRoomId, RoomEvent, UserId};
use crate::inbound::ws::messages::{ClientMessage, ErrorFrame};
use crate::inbound::ws::state::WsState;

/// Time between heartbeats to the client (5s in production, shorter in tests).
#[cfg(not(test))]
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
#[cfg(test)]
const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(50);

/// Max idle time before disconnecting the client (10s in production, shorter in tests).
#[cfg(not(test))]
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);
#[cfg(test)]
const CLIENT_TIMEOUT: Duration = Duration::from_millis(100);

/// Who is connected to which room.
#[derive(Debug, Clone, Copy)]
pub(super) struct Seat {
    pub(super) room_id: ChatRoomId,
    pub(super) user_id: UserId,
}

pub(super) async fn handle_ws_session(
    state: WsState,
    seat: Seat,
    events: broadcast::Receiver<String>,
    session: Session,
    stream: MessageStream,
) {
    let room_session = RoomSession {
        messages: state.messages,
        presence: state.presence,
        topics: state.topics,
        seat,
    };
    room_session.enter().await;
    room_session.run(session, stream, events).await;
    room_session.exit().await;
}

enum SessionError {
    ClientClosed(Option<CloseReason>),
    StreamClosed,
    TopicClosed,
    MembershipEnded(RoomEvent),
    HeartbeatTimeout,
    Protocol(ProtocolError),
    InvalidPayload,
    Network(Closed),
}

enum CloseAction {
    None,
    Close(Option<CloseReason>),
}

struct RoomSession {
    messages: Arc<dyn ChatMessageCommand>,
    presence: Arc<dyn PresenceRegistry>,
    topics: Arc<dyn RealtimeSubscriber>,
    seat: Seat,
}

impl RoomSession {
    async fn enter(&self) {
        if let Err(error) = self
            .presence
            .join(&self.seat.room_id, &self.seat.user_id)
            .await
        {
            warn!(
                chat_room_id = %self.seat.room_id,
                user_id = %self.seat.user_id,
                error = %error,
                "presence join failed; user will be treated as offline"
            );
        }
    }

    async fn exit(&self) {
        if let Err(error) = self
            .presence
            .leave(&self.seat.room_id, &self.seat.user_id)
            .await
        {
            warn!(
                chat_room_id = %self.seat.room_id,
                user_id = %self.seat.user_id,
                error = %error,
                "presence leave failed"
            );
        }
        self.topics.release(&room_topic(&self.seat.room_id));
    }

    async fn run(
        &self,
        mut session: Session,
        mut stream: MessageStream,
        mut events: broadcast::Receiver<String>,
    ) {
        let mut last_heartbeat = Instant::now();
        let mut heartbeat = time::interval(HEARTBEAT_INTERVAL);

        loop {
            let result = tokio::select! {
                _ = heartbeat.tick() => {
                    self.handle_heartbeat_tick(&mut session, &last_heartbeat).await
                }
                message = stream.recv() => {
                    self.handle_stream_message(&mut session, &mut last_heartbeat, message)
                        .await
                }
                event = events.recv() => {
                    self.handle_room_event(&mut session, event).await
                }
            };

            if let Err(error) = result {
                self.log_shutdown_reason(&error);
                let close_action = self.close_action_for(&error);
                self.close_session_if_needed(session, close_action).await;
                return;
            }
        }
    }

    async fn handle_heartbeat_tick(
        &self,
        session: &mut Session,
        last_heartbeat: &Instant,
    ) -> Result<(), SessionError> {
        if Instant::now().duration_since(*last_heartbeat) > CLIENT_TIMEOUT {
            return Err(SessionError::HeartbeatTimeout);
        }

        session.ping(b"").await.map_err(SessionError::Network)
    }

    async fn handle_room_event(
        &self,
        session: &mut Session,
        event: Result<String, RecvError>,
    ) -> Result<(), SessionError> {
        match event {
            Ok(frame) => match RoomEvent::parse(&frame) {
                Some(event) if event.ends_session_of(&self.seat.user_id) => {
                    Err(SessionError::MembershipEnded(event))
                }
                _ => session.text(frame).await.map_err(SessionError::Network),
            },
            Err(RecvError::Lagged(skipped)) => {
                warn!(
                    chat_room_id = %self.seat.room_id,
                    skipped,
                    "websocket subscriber lagged; frames dropped"
                );
                Ok(())
            }
            Err(RecvError::Closed) => Err(SessionError::TopicClosed),
        }
    }

    async fn handle_stream_message(
        &self,
        session: &mut Session,
        last_heartbeat: &mut Instant,
        message: Option<Result<Message, ProtocolError>>,
    ) -> Result<(), SessionError> {
        let Some(message) = message else {
            return Err(SessionError::StreamClosed);
        };

        match message {
            Ok(message) => self.handle_message(session, last_heartbeat, message).await,
            Err(error) => Err(SessionError::Protocol(error)),
        }
    }

    async fn handle_message(
        &self,
        session: &mut Session,
        last_heartbeat: &mut Instant,
        message: Message,
    ) -> Result<(), SessionError> {
        match message {
            Message::Ping(payload) => {
                *last_heartbeat = Instant::now();
                session
                    .pong(&payload)
                    .await
                    .map_err(SessionError::Network)?;
                Ok(())
            }
            Message::Text(text) => {
                *last_heartbeat = Instant::now();
                self.handle_text_message(session, text.as_ref()).await
            }
            Message::Pong(_) | Message::Binary(_) | Message::Continuation(_) | Message::Nop => {
                *last_heartbeat = Instant::now();
                Ok(())
            }
            Message::Close(reason) => Err(SessionError::ClientClosed(reason)),
        }
    }

    async fn handle_text_message(
        &self,
        session: &mut Session,
        text: &str,
    ) -> Result<(), SessionError> {
        let request = match serde_json::from_str::<ClientMessage>(text) {
            Ok(request) => request,
            Err(error) => {
                warn!(error = %error, "Rejected malformed WebSocket payload");
                return Err(SessionError::InvalidPayload);
            }
        };

        let sent = self
            .messages
            .send(SendMessageRequest {
                chat_room_id: self.seat.room_id,
                sender_id: self.seat.user_id,
                content: request.content,
            })
            .await;
        match sent {
            // The logged message reaches this session through the room topic.
            Ok(message) => {
                debug!(message_id = %message.id, "websocket message accepted");
                Ok(())
            }
            Err(error) => self
                .send_json(session, &ErrorFrame::from(&error))
                .await
                .map_err(SessionError::Network),
        }
    }

    async fn send_json<T: serde::Serialize>(
        &self,
        session: &mut Session,
        payload: &T,
    ) -> Result<(), Closed> {
        match serde_json::to_string(payload) {
            Ok(body) => session.text(body).await,
            Err(error) => {
                warn!(error = %error, "Failed to serialize WebSocket payload");
                Ok(())
            }
        }
    }

    fn log_shutdown_reason(&self, error: &SessionError) {
        match error {
            SessionError::HeartbeatTimeout => {
                warn!("WebSocket heartbeat timeout; closing connection");
            }
            SessionError::Protocol(error) => {
                warn!(error = %error, "WebSocket protocol error");
            }
            SessionError::Network(error) => {
                warn!(error = %error, "WebSocket send failed; closing connection");
            }
            SessionError::TopicClosed => {
                warn!(chat_room_id = %self.seat.room_id, "room topic closed; closing connection");
            }
            SessionError::MembershipEnded(_) => {
                info!(
                    chat_room_id = %self.seat.room_id,
                    user_id = %self.seat.user_id,
                    "membership ended; closing connection"
                );
            }
            SessionError::InvalidPayload
            | SessionError::ClientClosed(_)
            | SessionError::StreamClosed => {}
        }
    }

    fn close_action_for(&self, error: &SessionError) -> CloseAction {
        match error {
            SessionError::HeartbeatTimeout => CloseAction::Close(Some(CloseReason {
                code: CloseCode::Normal,
                description: Some("heartbeat timeout".to_owned()),
            })),
            SessionError::Protocol(_) => CloseAction::Close(Some(CloseReason {
                code: CloseCode::Protocol,
                description: Some("protocol error".to_owned()),
            })),
            SessionError::InvalidPayload => CloseAction::Close(Some(CloseReason {
                code: CloseCode::Policy,
                description: Some("invalid payload".to_owned()),
            })),
            SessionError::TopicClosed
            | SessionError::MembershipEnded(RoomEvent::Dissolved { .. }) => {
                CloseAction::Close(Some(CloseReason {
                    code: CloseCode::Away,
                    description: Some("room closed".to_owned()),
                }))
            }
            SessionError::MembershipEnded(RoomEvent::Revoked { .. }) => {
                CloseAction::Close(Some(CloseReason {
                    code: CloseCode::Policy,
                    description: Some("membership revoked".to_owned()),
                }))
            }
            SessionError::ClientClosed(reason) => CloseAction::Close(reason.clone()),
            SessionError::StreamClosed | SessionError::Network(_) => CloseAction::None,
        }
    }

    async fn close_session_if_needed(&self, session: Session, close_action: CloseAction) {
        if let CloseAction::Close(reason) = close_action {
            if let Err(error) = session.close(reason).await {
                warn!(error = %error, "Failed to close WebSocket session");
            }
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
