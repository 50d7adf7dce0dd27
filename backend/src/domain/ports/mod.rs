//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (`CompanionStore`, `MessageLog`, `PresenceRegistry`,
//! `PushGateway`, ...) are implemented by the outbound adapters. Driving
//! ports (`*Command`, `*Query`) are implemented by the domain services and
//! consumed by the HTTP and WebSocket adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod bundle;
mod chat_message_command;
mod chat_message_query;
mod chat_room_command;
mod chat_room_query;
mod chat_room_repository;
mod companion_store;
mod directory;
mod enrollment_command;
mod enrollment_query;
mod enrollment_repository;
mod message_log;
mod object_storage;
mod presence_registry;
mod push_gateway;
mod realtime_publisher;

pub use bundle::CompanionPorts;
#[cfg(test)]
pub use chat_message_command::MockChatMessageCommand;
pub use chat_message_command::{ChatMessageCommand, SendMessageRequest};
#[cfg(test)]
pub use chat_message_query::MockChatMessageQuery;
pub use chat_message_query::{ChatMessageQuery, ListMessagesRequest};
#[cfg(test)]
pub use chat_room_command::MockChatRoomCommand;
pub use chat_room_command::{
    ChatRoomCommand, CreateChatRoomRequest, KickMemberRequest, LeaveChatRoomRequest,
    UpdateNotificationSettingRequest, UpdateRoomImageRequest,
};
#[cfg(test)]
pub use chat_room_query::MockChatRoomQuery;
pub use chat_room_query::ChatRoomQuery;
#[cfg(test)]
pub use chat_room_repository::MockChatRoomRepository;
pub use chat_room_repository::{ChatRoomRepository, ChatRoomRepositoryError, MemberRoom};
#[cfg(test)]
pub use companion_store::MockCompanionStore;
pub use companion_store::{CompanionStore, CompanionStoreError, StoreTransaction};
#[cfg(test)]
pub use directory::{MockBoardDirectory, MockUserDirectory};
pub use directory::{BoardDirectory, DirectoryError, UserDirectory};
#[cfg(test)]
pub use enrollment_command::MockEnrollmentCommand;
pub use enrollment_command::{
    CancelEnrollmentRequest, EnrollmentCommand, RequestEnrollmentRequest,
    RequestEnrollmentResponse, RespondEnrollmentRequest, RespondEnrollmentResponse,
};
#[cfg(test)]
pub use enrollment_query::MockEnrollmentQuery;
pub use enrollment_query::{EnrollmentQuery, ListBoardEnrollmentsRequest, ListEnrollmentsRequest};
#[cfg(test)]
pub use enrollment_repository::MockEnrollmentRepository;
pub use enrollment_repository::{EnrollmentKey, EnrollmentRepository, EnrollmentRepositoryError};
#[cfg(test)]
pub use message_log::MockMessageLog;
pub use message_log::{MessageLog, MessageLogError};
#[cfg(test)]
pub use object_storage::MockObjectStorage;
pub use object_storage::{FixtureObjectStorage, ObjectStorage, ObjectStorageError};
#[cfg(test)]
pub use presence_registry::MockPresenceRegistry;
pub use presence_registry::{PresenceError, PresenceRegistry};
#[cfg(test)]
pub use push_gateway::MockPushGateway;
pub use push_gateway::{
    FixturePushGateway, MulticastReport, PushGateway, PushGatewayError, TokenDelivery,
};
#[cfg(test)]
pub use realtime_publisher::MockRealtimePublisher;
pub use realtime_publisher::{
    FixtureRealtimePublisher, RealtimePublishError, RealtimePublisher, RealtimeSubscriber,
    room_topic,
};
