//! Read-only access to collaborator-owned boards and users.
//!
//! Board content and user profiles are managed by other services; the core
//! only looks them up.

use async_trait::async_trait;

use crate::domain::{Board, BoardId, UserContact, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by directory adapters.
    pub enum DirectoryError {
        /// Directory connection could not be established.
        Connection { message: String } =>
            "directory connection failed: {message}",
        /// Lookup failed during execution.
        Query { message: String } =>
            "directory query failed: {message}",
    }
}

/// Port for board lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BoardDirectory: Send + Sync {
    /// Fetch an active board.
    async fn find_board(&self, id: &BoardId) -> Result<Option<Board>, DirectoryError>;
}

/// Port for user contact lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fetch one user.
    async fn find_user(&self, id: &UserId) -> Result<Option<UserContact>, DirectoryError>;

    /// Fetch several users; unknown ids are skipped.
    async fn find_users(&self, ids: &[UserId]) -> Result<Vec<UserContact>, DirectoryError>;
}
