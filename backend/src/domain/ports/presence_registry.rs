//! Port for tracking which users hold a live connection to a room.

use async_trait::async_trait;

use crate::domain::{ChatRoomId, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by presence adapters.
    pub enum PresenceError {
        /// Backing cache could not be reached.
        Connection { message: String } =>
            "presence registry connection failed: {message}",
        /// Cache command failed.
        Command { message: String } =>
            "presence registry command failed: {message}",
    }
}

/// Port for room presence.
///
/// Presence is a set of users per room. `join` and `leave` are idempotent:
/// joining twice equals joining once, and one `leave` clears the user even if
/// another connection of theirs is still open. No durability is expected; a
/// stale entry after an ungraceful disconnect is tolerated.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PresenceRegistry: Send + Sync {
    /// Mark the user as connected to the room.
    async fn join(&self, room_id: &ChatRoomId, user_id: &UserId) -> Result<(), PresenceError>;

    /// Mark the user as disconnected from the room.
    async fn leave(&self, room_id: &ChatRoomId, user_id: &UserId) -> Result<(), PresenceError>;

    /// Whether the user is currently connected to the room.
    async fn is_present(
        &self,
        room_id: &ChatRoomId,
        user_id: &UserId,
    ) -> Result<bool, PresenceError>;
}
