//! Port for the read side of enrollments: inbox listings and unseen counts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{BoardId, Enrollment, EnrollmentId, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by enrollment read adapters.
    pub enum EnrollmentRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "enrollment repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "enrollment repository query failed: {message}",
    }
}

/// Keyset position in a newest-first enrollment listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentKey {
    /// Creation time of the last enrollment on the previous page.
    pub created_at: DateTime<Utc>,
    /// Identifier of that enrollment, breaking creation-time ties.
    pub id: EnrollmentId,
}

impl From<&Enrollment> for EnrollmentKey {
    fn from(value: &Enrollment) -> Self {
        Self {
            created_at: value.created_at,
            id: value.id,
        }
    }
}

/// Port for listing active enrollments.
///
/// Listings return at most `limit` rows ordered by `(created_at, id)`
/// descending, starting strictly after `after` when given.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Enrollments the applicant sent.
    async fn list_sent(
        &self,
        applicant_id: &UserId,
        after: Option<EnrollmentKey>,
        limit: usize,
    ) -> Result<Vec<Enrollment>, EnrollmentRepositoryError>;

    /// Enrollments received on any board the owner created.
    async fn list_received_for_owner(
        &self,
        owner_id: &UserId,
        after: Option<EnrollmentKey>,
        limit: usize,
    ) -> Result<Vec<Enrollment>, EnrollmentRepositoryError>;

    /// Enrollments received on one board.
    async fn list_received_for_board(
        &self,
        board_id: &BoardId,
        after: Option<EnrollmentKey>,
        limit: usize,
    ) -> Result<Vec<Enrollment>, EnrollmentRepositoryError>;

    /// Clear the unseen flag on the given enrollments.
    async fn mark_seen(&self, ids: &[EnrollmentId]) -> Result<(), EnrollmentRepositoryError>;

    /// Count unseen active enrollments across the owner's boards.
    async fn count_new(&self, owner_id: &UserId) -> Result<u64, EnrollmentRepositoryError>;
}
