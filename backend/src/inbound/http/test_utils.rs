//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use crate::domain::ports::{
    MockChatMessageCommand, MockChatMessageQuery, MockChatRoomCommand, MockChatRoomQuery,
    MockEnrollmentCommand, MockEnrollmentQuery,
};
use crate::inbound::http::auth::USER_ID_HEADER;
use crate::inbound::http::state::{HttpState, HttpStatePorts};

/// Caller used by handler tests.
pub const CALLER: &str = "11111111-1111-4111-8111-111111111111";

/// Header pair identifying [`CALLER`].
pub fn caller_header() -> (&'static str, &'static str) {
    (USER_ID_HEADER, CALLER)
}

/// Mock driving ports; tests set expectations on the ones they exercise.
///
/// Unused mocks have no expectations, so any unexpected call panics.
#[derive(Default)]
pub struct MockPorts {
    pub enrollments: MockEnrollmentCommand,
    pub enrollments_query: MockEnrollmentQuery,
    pub chat_rooms: MockChatRoomCommand,
    pub chat_rooms_query: MockChatRoomQuery,
    pub messages: MockChatMessageCommand,
    pub messages_query: MockChatMessageQuery,
}

impl MockPorts {
    /// Freeze the mocks into handler state.
    pub fn into_state(self) -> HttpState {
        HttpState::new(HttpStatePorts {
            enrollments: Arc::new(self.enrollments),
            enrollments_query: Arc::new(self.enrollments_query),
            chat_rooms: Arc::new(self.chat_rooms),
            chat_rooms_query: Arc::new(self.chat_rooms_query),
            messages: Arc::new(self.messages),
            messages_query: Arc::new(self.messages_query),
        })
    }
}
