//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on driving ports and remain testable with mocks.

use std::sync::Arc;

use crate::domain::ports::{
    ChatMessageCommand, ChatMessageQuery, ChatRoomCommand, ChatRoomQuery, EnrollmentCommand,
    EnrollmentQuery,
};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub enrollments: Arc<dyn EnrollmentCommand>,
    pub enrollments_query: Arc<dyn EnrollmentQuery>,
    pub chat_rooms: Arc<dyn ChatRoomCommand>,
    pub chat_rooms_query: Arc<dyn ChatRoomQuery>,
    pub messages: Arc<dyn ChatMessageCommand>,
    pub messages_query: Arc<dyn ChatMessageQuery>,
}

/// Parameter object bundling the driving ports for [`HttpState::new`].
#[derive(Clone)]
pub struct HttpStatePorts {
    pub enrollments: Arc<dyn EnrollmentCommand>,
    pub enrollments_query: Arc<dyn EnrollmentQuery>,
    pub chat_rooms: Arc<dyn ChatRoomCommand>,
    pub chat_rooms_query: Arc<dyn ChatRoomQuery>,
    pub messages: Arc<dyn ChatMessageCommand>,
    pub messages_query: Arc<dyn ChatMessageQuery>,
}

impl HttpState {
    /// Construct state from a ports bundle.
    pub fn new(ports: HttpStatePorts) -> Self {
        let HttpStatePorts {
            enrollments,
            enrollments_query,
            chat_rooms,
            chat_rooms_query,
            messages,
            messages_query,
        } = ports;
        Self {
            enrollments,
            enrollments_query,
            chat_rooms,
            chat_rooms_query,
            messages,
            messages_query,
        }
    }
}

impl From<HttpStatePorts> for HttpState {
    fn from(ports: HttpStatePorts) -> Self {
        Self::new(ports)
    }
}
