//! PostgreSQL-backed enrollment listings and unseen counts.

use async_trait::async_trait;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{EnrollmentKey, EnrollmentRepository, EnrollmentRepositoryError};
use crate::domain::{BoardId, Enrollment, EnrollmentId, UserId};

use super::diesel_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::EnrollmentRow;
use super::pool::{DbPool, PoolError};
use super::schema::{boards, enrollments};

/// Diesel-backed implementation of the enrollment repository port.
#[derive(Clone)]
pub struct DieselEnrollmentRepository {
    pool: DbPool,
}

impl DieselEnrollmentRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> EnrollmentRepositoryError {
    map_basic_pool_error(error, EnrollmentRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> EnrollmentRepositoryError {
    map_basic_diesel_error(
        error,
        EnrollmentRepositoryError::query,
        EnrollmentRepositoryError::connection,
    )
}

fn to_domain(rows: Vec<EnrollmentRow>) -> Result<Vec<Enrollment>, EnrollmentRepositoryError> {
    rows.into_iter()
        .map(Enrollment::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| EnrollmentRepositoryError::query(format!("corrupt enrollment: {err}")))
}

fn page_size(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Rows strictly after `key` in `(created_at, id)` descending order.
fn after_key(
    key: EnrollmentKey,
) -> Box<dyn BoxableExpression<enrollments::table, Pg, SqlType = diesel::sql_types::Bool>> {
    Box::new(
        enrollments::created_at.lt(key.created_at).or(enrollments::created_at
            .eq(key.created_at)
            .and(enrollments::id.lt(*key.id.as_uuid()))),
    )
}

#[async_trait]
impl EnrollmentRepository for DieselEnrollmentRepository {
    async fn list_sent(
        &self,
        applicant_id: &UserId,
        after: Option<EnrollmentKey>,
        limit: usize,
    ) -> Result<Vec<Enrollment>, EnrollmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut query = enrollments::table
            .filter(enrollments::applicant_id.eq(*applicant_id.as_uuid()))
            .filter(enrollments::deleted_at.is_null())
            .select(EnrollmentRow::as_select())
            .into_boxed();
        if let Some(key) = after {
            query = query.filter(after_key(key));
        }
        let rows = query
            .order((enrollments::created_at.desc(), enrollments::id.desc()))
            .limit(page_size(limit))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        to_domain(rows)
    }

    async fn list_received_for_owner(
        &self,
        owner_id: &UserId,
        after: Option<EnrollmentKey>,
        limit: usize,
    ) -> Result<Vec<Enrollment>, EnrollmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let owned_boards = boards::table
            .filter(boards::owner_id.eq(*owner_id.as_uuid()))
            .filter(boards::deleted_at.is_null())
            .select(boards::id);
        let mut query = enrollments::table
            .filter(enrollments::board_id.eq_any(owned_boards))
            .filter(enrollments::deleted_at.is_null())
            .select(EnrollmentRow::as_select())
            .into_boxed();
        if let Some(key) = after {
            query = query.filter(after_key(key));
        }
        let rows = query
            .order((enrollments::created_at.desc(), enrollments::id.desc()))
            .limit(page_size(limit))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        to_domain(rows)
    }

    async fn list_received_for_board(
        &self,
        board_id: &BoardId,
        after: Option<EnrollmentKey>,
        limit: usize,
    ) -> Result<Vec<Enrollment>, EnrollmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut query = enrollments::table
            .filter(enrollments::board_id.eq(*board_id.as_uuid()))
            .filter(enrollments::deleted_at.is_null())
            .select(EnrollmentRow::as_select())
            .into_boxed();
        if let Some(key) = after {
            query = query.filter(after_key(key));
        }
        let rows = query
            .order((enrollments::created_at.desc(), enrollments::id.desc()))
            .limit(page_size(limit))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        to_domain(rows)
    }

    async fn mark_seen(&self, ids: &[EnrollmentId]) -> Result<(), EnrollmentRepositoryError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let ids: Vec<uuid::Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        diesel::update(enrollments::table.filter(enrollments::id.eq_any(ids)))
            .set(enrollments::is_new.eq(false))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn count_new(&self, owner_id: &UserId) -> Result<u64, EnrollmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let owned_boards = boards::table
            .filter(boards::owner_id.eq(*owner_id.as_uuid()))
            .filter(boards::deleted_at.is_null())
            .select(boards::id);
        let count: i64 = enrollments::table
            .filter(enrollments::board_id.eq_any(owned_boards))
            .filter(enrollments::deleted_at.is_null())
            .filter(enrollments::is_new.eq(true))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}
