//! In-app notification history.
//!
//! A notification is written for every enrollment transition. The "new
//! request" notification carries the enrollment id so cancel and the owner's
//! decision can find it again; its `accept_status` is filled in once the owner
//! responds.

use chrono::{DateTime, Utc};

use super::{AcceptStatus, Board, BoardId, Enrollment, EnrollmentId, NotificationId, UserId};

/// Notification row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Notification identifier.
    pub id: NotificationId,
    /// User the notification is addressed to.
    pub recipient_id: UserId,
    /// User whose action produced the notification.
    pub sender_id: Option<UserId>,
    /// Board the event concerns.
    pub board_id: BoardId,
    /// Enrollment announced by a "new request" notification.
    pub enrollment_id: Option<EnrollmentId>,
    /// Short headline.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Owner decision, once made.
    pub accept_status: Option<AcceptStatus>,
    /// Whether the recipient opened it.
    pub is_read: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Soft-deletion marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// Notification telling the owner about a new join request.
    pub fn new_request(
        board: &Board,
        enrollment: &Enrollment,
        applicant_nickname: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::random(),
            recipient_id: board.owner_id,
            sender_id: Some(enrollment.applicant_id),
            board_id: board.id,
            enrollment_id: Some(enrollment.id),
            title: "New join request".to_owned(),
            body: format!("{applicant_nickname} asked to join \"{}\".", board.title),
            accept_status: None,
            is_read: false,
            created_at: now,
            deleted_at: None,
        }
    }

    /// Notification telling the applicant about the owner's decision.
    pub fn decision(
        board: &Board,
        enrollment: &Enrollment,
        decision: AcceptStatus,
        now: DateTime<Utc>,
    ) -> Self {
        let (title, verb) = match decision {
            AcceptStatus::Accepted => ("Join request accepted", "accepted"),
            AcceptStatus::Rejected => ("Join request rejected", "rejected"),
        };
        Self {
            id: NotificationId::random(),
            recipient_id: enrollment.applicant_id,
            sender_id: Some(board.owner_id),
            board_id: board.id,
            enrollment_id: None,
            title: title.to_owned(),
            body: format!("Your request to join \"{}\" was {verb}.", board.title),
            accept_status: Some(decision),
            is_read: false,
            created_at: now,
            deleted_at: None,
        }
    }

    /// Record the owner's decision on the originating notification.
    pub fn mark_handled(&mut self, decision: AcceptStatus) {
        self.accept_status = Some(decision);
    }

    /// Soft-delete the notification.
    pub fn soft_delete(&mut self, at: DateTime<Utc>) {
        self.deleted_at.get_or_insert(at);
    }
}
