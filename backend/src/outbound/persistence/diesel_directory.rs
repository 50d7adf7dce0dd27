//! PostgreSQL-backed board and user lookups.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{BoardDirectory, DirectoryError, UserDirectory};
use crate::domain::{Board, BoardId, UserContact, UserId};

use super::diesel_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::{BoardRow, UserRow};
use super::pool::{DbPool, PoolError};
use super::schema::{boards, users};

/// Diesel-backed implementation of the board and user directory ports.
#[derive(Clone)]
pub struct DieselDirectory {
    pool: DbPool,
}

impl DieselDirectory {
    /// Create a new directory with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> DirectoryError {
    map_basic_pool_error(error, DirectoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> DirectoryError {
    map_basic_diesel_error(error, DirectoryError::query, DirectoryError::connection)
}

#[async_trait]
impl BoardDirectory for DieselDirectory {
    async fn find_board(&self, id: &BoardId) -> Result<Option<Board>, DirectoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = boards::table
            .find(id.as_uuid())
            .filter(boards::deleted_at.is_null())
            .select(BoardRow::as_select())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(Board::try_from)
            .transpose()
            .map_err(|err| DirectoryError::query(format!("corrupt board: {err}")))
    }
}

#[async_trait]
impl UserDirectory for DieselDirectory {
    async fn find_user(&self, id: &UserId) -> Result<Option<UserContact>, DirectoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        users::table
            .find(id.as_uuid())
            .select(UserRow::as_select())
            .get_result::<UserRow>(&mut conn)
            .await
            .optional()
            .map(|row| row.map(UserContact::from))
            .map_err(map_diesel_error)
    }

    async fn find_users(&self, ids: &[UserId]) -> Result<Vec<UserContact>, DirectoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let ids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows: Vec<UserRow> = users::table
            .filter(users::id.eq_any(ids))
            .select(UserRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(UserContact::from).collect())
    }
}
