//! Driven-port bundle shared by the domain services.

use std::sync::Arc;

use super::{
    BoardDirectory, ChatRoomRepository, CompanionStore, EnrollmentRepository, MessageLog,
    ObjectStorage, PresenceRegistry, PushGateway, RealtimePublisher, UserDirectory,
};

/// Every outbound adapter the companion services talk to.
#[derive(Clone)]
pub struct CompanionPorts {
    /// Transactional relational store.
    pub store: Arc<dyn CompanionStore>,
    /// Enrollment listings.
    pub enrollments: Arc<dyn EnrollmentRepository>,
    /// Room and membership reads.
    pub rooms: Arc<dyn ChatRoomRepository>,
    /// Append-only message log.
    pub message_log: Arc<dyn MessageLog>,
    /// Board lookups.
    pub boards: Arc<dyn BoardDirectory>,
    /// User contact lookups.
    pub users: Arc<dyn UserDirectory>,
    /// Live connection registry.
    pub presence: Arc<dyn PresenceRegistry>,
    /// Mobile push provider.
    pub push: Arc<dyn PushGateway>,
    /// Room broadcast transport.
    pub publisher: Arc<dyn RealtimePublisher>,
    /// Image storage.
    pub storage: Arc<dyn ObjectStorage>,
}
