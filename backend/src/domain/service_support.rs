//! Shared helpers for the companion services: port error translation,
//! transaction completion and keyset page assembly.

use pagination::{Cursor, PageParams, Paginated, split_page};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::domain::Error;
use crate::domain::ports::{
    ChatRoomRepositoryError, CompanionStoreError, DirectoryError, EnrollmentRepositoryError,
    MessageLogError, StoreTransaction,
};

pub(crate) fn map_store_error(error: CompanionStoreError) -> Error {
    match error {
        CompanionStoreError::Connection { message } => {
            Error::service_unavailable(format!("companion store unavailable: {message}"))
        }
        CompanionStoreError::Query { message } => {
            Error::internal(format!("companion store error: {message}"))
        }
        CompanionStoreError::Conflict { message } => Error::conflict(message),
    }
}

pub(crate) fn map_enrollment_repository_error(error: EnrollmentRepositoryError) -> Error {
    match error {
        EnrollmentRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("enrollment repository unavailable: {message}"))
        }
        EnrollmentRepositoryError::Query { message } => {
            Error::internal(format!("enrollment repository error: {message}"))
        }
    }
}

pub(crate) fn map_room_repository_error(error: ChatRoomRepositoryError) -> Error {
    match error {
        ChatRoomRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("chat room repository unavailable: {message}"))
        }
        ChatRoomRepositoryError::Query { message } => {
            Error::internal(format!("chat room repository error: {message}"))
        }
    }
}

pub(crate) fn map_message_log_error(error: MessageLogError) -> Error {
    match error {
        MessageLogError::Connection { message } => {
            Error::service_unavailable(format!("message log unavailable: {message}"))
        }
        MessageLogError::Query { message } => {
            Error::internal(format!("message log error: {message}"))
        }
    }
}

pub(crate) fn map_directory_error(error: DirectoryError) -> Error {
    match error {
        DirectoryError::Connection { message } => {
            Error::service_unavailable(format!("directory unavailable: {message}"))
        }
        DirectoryError::Query { message } => Error::internal(format!("directory error: {message}")),
    }
}

/// Commit when the workflow succeeded, roll back otherwise.
///
/// A failed rollback is logged; the workflow error is what the caller sees.
pub(crate) async fn finish<T>(
    tx: Box<dyn StoreTransaction>,
    outcome: Result<T, Error>,
) -> Result<T, Error> {
    match outcome {
        Ok(value) => {
            tx.commit().await.map_err(map_store_error)?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = tx.rollback().await {
                warn!(error = %rollback_error, "transaction rollback failed");
            }
            Err(error)
        }
    }
}

/// Decode the keyset position carried by a page request.
pub(crate) fn decode_cursor<K>(page: &PageParams) -> Result<Option<K>, Error>
where
    K: DeserializeOwned,
{
    page.cursor::<K>()
        .map(|cursor| cursor.map(Cursor::into_inner))
        .map_err(|err| {
            Error::invalid_request(format!("invalid cursor: {err}"))
                .with_details(serde_json::json!({ "field": "cursor", "code": "invalid_cursor" }))
        })
}

/// Trim a `limit + 1` fetch into a page whose cursor points past its last row.
pub(crate) fn into_page<T, K, F>(rows: Vec<T>, limit: usize, key: F) -> Result<Paginated<T>, Error>
where
    K: Serialize,
    F: Fn(&T) -> K,
{
    let (data, has_more) = split_page(rows, limit);
    let next_cursor = match data.last() {
        Some(last) if has_more => Some(
            Cursor::new(key(last))
                .encode()
                .map_err(|err| Error::internal(format!("failed to encode cursor: {err}")))?,
        ),
        _ => None,
    };
    Ok(Paginated::new(data, limit, next_cursor))
}
