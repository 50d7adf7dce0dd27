//! Driving port for enrollment state changes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{BoardId, ChatRoomId, EnrollmentId, EnrollmentStatus, Error, UserId};

/// Request to join a board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEnrollmentRequest {
    /// User asking to join.
    pub applicant_id: UserId,
    /// Board to join.
    pub board_id: BoardId,
    /// Introduction shown to the owner.
    pub description: String,
}

/// Identifier and creation time of a new enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestEnrollmentResponse {
    /// New enrollment.
    pub enrollment_id: EnrollmentId,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Request to withdraw a pending enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelEnrollmentRequest {
    /// Caller; must be the applicant.
    pub applicant_id: UserId,
    /// Enrollment to withdraw.
    pub enrollment_id: EnrollmentId,
}

/// Owner decision on a pending enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RespondEnrollmentRequest {
    /// Caller; must own the board.
    pub owner_id: UserId,
    /// Enrollment to decide.
    pub enrollment_id: EnrollmentId,
}

/// Result of an owner decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RespondEnrollmentResponse {
    /// Decided enrollment.
    pub enrollment_id: EnrollmentId,
    /// Terminal status.
    pub status: EnrollmentStatus,
    /// Room the applicant joined, for accepted enrollments.
    pub chat_room_id: Option<ChatRoomId>,
}

/// Driving port for the enrollment state machine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrollmentCommand: Send + Sync {
    /// Create a pending enrollment and notify the owner.
    async fn request(
        &self,
        request: RequestEnrollmentRequest,
    ) -> Result<RequestEnrollmentResponse, Error>;

    /// Withdraw a pending enrollment.
    async fn cancel(&self, request: CancelEnrollmentRequest) -> Result<(), Error>;

    /// Accept a pending enrollment and admit the applicant to the room.
    async fn accept(
        &self,
        request: RespondEnrollmentRequest,
    ) -> Result<RespondEnrollmentResponse, Error>;

    /// Reject a pending enrollment.
    async fn reject(
        &self,
        request: RespondEnrollmentRequest,
    ) -> Result<RespondEnrollmentResponse, Error>;
}
