//! Process-local presence backed by a concurrent map.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::ports::{PresenceError, PresenceRegistry};
use crate::domain::{ChatRoomId, UserId};

/// Presence registry keeping one set of users per room.
///
/// Membership in the set is all that is tracked: joining twice is the same as
/// joining once, and a single leave clears the user. This matches
/// `RedisPresenceRegistry`, so fanout behaves the same with either adapter.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPresenceRegistry {
    rooms: Arc<DashMap<ChatRoomId, HashSet<UserId>>>,
}

impl InMemoryPresenceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PresenceRegistry for InMemoryPresenceRegistry {
    async fn join(&self, room_id: &ChatRoomId, user_id: &UserId) -> Result<(), PresenceError> {
        self.rooms.entry(*room_id).or_default().insert(*user_id);
        Ok(())
    }

    async fn leave(&self, room_id: &ChatRoomId, user_id: &UserId) -> Result<(), PresenceError> {
        let emptied = self.rooms.get_mut(room_id).is_some_and(|mut users| {
            users.remove(user_id);
            users.is_empty()
        });
        if emptied {
            self.rooms.remove_if(room_id, |_, users| users.is_empty());
        }
        Ok(())
    }

    async fn is_present(
        &self,
        room_id: &ChatRoomId,
        user_id: &UserId,
    ) -> Result<bool, PresenceError> {
        Ok(self
            .rooms
            .get(room_id)
            .is_some_and(|users| users.contains(user_id)))
    }
}
