//! Driving port for enrollment listings.
//!
//! The "received" listings clear the unseen flag of every enrollment they
//! return.

use async_trait::async_trait;
use pagination::{PageParams, Paginated};

use crate::domain::{BoardId, Enrollment, Error, UserId};

/// Page request scoped to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEnrollmentsRequest {
    /// Caller.
    pub user_id: UserId,
    /// Cursor and page size.
    pub page: PageParams,
}

/// Page request scoped to one of the caller's boards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListBoardEnrollmentsRequest {
    /// Caller; must own the board.
    pub owner_id: UserId,
    /// Board whose enrollments are listed.
    pub board_id: BoardId,
    /// Cursor and page size.
    pub page: PageParams,
}

/// Driving port for enrollment reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrollmentQuery: Send + Sync {
    /// Pending enrollments the caller sent, newest first.
    async fn list_sent(&self, request: ListEnrollmentsRequest)
    -> Result<Paginated<Enrollment>, Error>;

    /// Pending enrollments on any of the caller's boards, newest first.
    async fn list_received_for_owner(
        &self,
        request: ListEnrollmentsRequest,
    ) -> Result<Paginated<Enrollment>, Error>;

    /// Pending enrollments on one of the caller's boards, newest first.
    async fn list_received_for_board(
        &self,
        request: ListBoardEnrollmentsRequest,
    ) -> Result<Paginated<Enrollment>, Error>;

    /// Number of unseen enrollments across the caller's boards.
    async fn count_new(&self, owner_id: UserId) -> Result<u64, Error>;
}
