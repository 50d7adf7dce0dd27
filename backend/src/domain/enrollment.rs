//! Enrollment (join request) aggregate and its state machine.
//!
//! ```text
//! PENDING ──accept──▶ ACCEPTED (soft-deleted)
//!    └─────reject──▶ REJECTED (soft-deleted)
//! ```
//!
//! Terminal states are written together with the soft-deletion marker, so an
//! enrollment is only ever queryable while it is pending.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BoardId, EnrollmentId, UserId};

/// Lifecycle state of an enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    /// Awaiting the owner's decision.
    Pending,
    /// Accepted; the applicant joined the room.
    Accepted,
    /// Rejected by the owner.
    Rejected,
}

impl EnrollmentStatus {
    /// Stable storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored enum value is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stored value: {0}")]
pub struct UnknownVariant(pub String);

impl FromStr for EnrollmentStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "PENDING" => Ok(Self::Pending),
            "ACCEPTED" => Ok(Self::Accepted),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(UnknownVariant(other.to_owned())),
        }
    }
}

/// Owner decision on a pending enrollment.
///
/// Also stored on the originating notification so the owner's inbox shows
/// that the request was already handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AcceptStatus {
    /// The request was accepted.
    Accepted,
    /// The request was rejected.
    Rejected,
}

impl AcceptStatus {
    /// Stable storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
        }
    }

    fn as_status(self) -> EnrollmentStatus {
        match self {
            Self::Accepted => EnrollmentStatus::Accepted,
            Self::Rejected => EnrollmentStatus::Rejected,
        }
    }
}

impl FromStr for AcceptStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ACCEPTED" => Ok(Self::Accepted),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(UnknownVariant(other.to_owned())),
        }
    }
}

/// Invalid state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EnrollmentTransitionError {
    /// The enrollment already left the pending state.
    #[error("enrollment already responded")]
    AlreadyResponded,
}

/// Join request for a board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    /// Enrollment identifier.
    pub id: EnrollmentId,
    /// Board the applicant wants to join.
    pub board_id: BoardId,
    /// User asking to join.
    pub applicant_id: UserId,
    /// Lifecycle state.
    pub status: EnrollmentStatus,
    /// Unseen by the owner.
    pub is_new: bool,
    /// Free-text introduction from the applicant.
    pub description: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Soft-deletion marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Enrollment {
    /// Create a pending request.
    pub fn request(
        board_id: BoardId,
        applicant_id: UserId,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EnrollmentId::random(),
            board_id,
            applicant_id,
            status: EnrollmentStatus::Pending,
            is_new: true,
            description: description.into(),
            created_at: now,
            deleted_at: None,
        }
    }

    /// Whether the enrollment takes part in active-state queries.
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Apply the owner's decision and retire the record.
    pub fn respond(
        &mut self,
        decision: AcceptStatus,
        now: DateTime<Utc>,
    ) -> Result<(), EnrollmentTransitionError> {
        if self.status != EnrollmentStatus::Pending {
            return Err(EnrollmentTransitionError::AlreadyResponded);
        }
        self.status = decision.as_status();
        self.deleted_at = Some(now);
        Ok(())
    }

    /// Withdraw the request on the applicant's behalf.
    pub fn withdraw(&mut self, now: DateTime<Utc>) {
        self.deleted_at.get_or_insert(now);
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    fn pending() -> Enrollment {
        Enrollment::request(BoardId::random(), UserId::random(), "hello", Utc::now())
    }

    #[rstest]
    #[case::accept(AcceptStatus::Accepted, EnrollmentStatus::Accepted)]
    #[case::reject(AcceptStatus::Rejected, EnrollmentStatus::Rejected)]
    fn responding_retires_the_enrollment(
        #[case] decision: AcceptStatus,
        #[case] expected: EnrollmentStatus,
    ) {
        let mut enrollment = pending();
        enrollment
            .respond(decision, Utc::now())
            .expect("pending enrollment accepts a decision");

        assert_eq!(enrollment.status, expected);
        assert!(!enrollment.is_active());
    }

    #[rstest]
    fn second_response_is_rejected() {
        let mut enrollment = pending();
        enrollment
            .respond(AcceptStatus::Rejected, Utc::now())
            .expect("first response");

        let err = enrollment
            .respond(AcceptStatus::Accepted, Utc::now())
            .expect_err("terminal state");
        assert_eq!(err, EnrollmentTransitionError::AlreadyResponded);
        assert_eq!(enrollment.status, EnrollmentStatus::Rejected);
    }

    #[rstest]
    #[case("PENDING", EnrollmentStatus::Pending)]
    #[case("ACCEPTED", EnrollmentStatus::Accepted)]
    #[case("REJECTED", EnrollmentStatus::Rejected)]
    fn status_parses_storage_form(#[case] raw: &str, #[case] expected: EnrollmentStatus) {
        assert_eq!(raw.parse::<EnrollmentStatus>(), Ok(expected));
        assert_eq!(expected.as_str(), raw);
    }

    #[rstest]
    fn new_requests_are_pending_and_unseen() {
        let enrollment = pending();
        assert_eq!(enrollment.status, EnrollmentStatus::Pending);
        assert!(enrollment.is_new);
        assert!(enrollment.is_active());
    }
}
