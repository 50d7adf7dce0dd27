//! Companion-request board as seen by the enrollment core.
//!
//! Board content (description, schedule, bookmarks) belongs to the external
//! board service. The core reads ownership and title, and owns only the
//! capacity counters and the completion/deletion markers.

use chrono::{DateTime, Utc};

use super::{BoardId, CapacityLedger, UserId};

/// Board row relevant to enrollment and chat flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    /// Board identifier.
    pub id: BoardId,
    /// Creator and owner of the board.
    pub owner_id: UserId,
    /// Title used in notification text.
    pub title: String,
    /// Occupancy counters.
    pub capacity: CapacityLedger,
    /// Set once the owner opened the chat room.
    pub is_completed: bool,
    /// Soft-deletion marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Board {
    /// Whether `user_id` created the board.
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.owner_id == user_id
    }

    /// Whether the board takes part in active-state queries.
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Soft-delete the board.
    pub fn soft_delete(&mut self, at: DateTime<Utc>) {
        self.deleted_at.get_or_insert(at);
    }
}
