//! Shared Diesel error mapping for the companion adapters.
//!
//! Every adapter error enum has the same connection/query split, with the
//! store adding a conflict variant for uniqueness violations. The helpers here
//! take the adapter's constructors so each adapter keeps its own error type.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Map pool errors into an adapter-specific connection error constructor.
pub(crate) fn map_basic_pool_error<E, C>(error: PoolError, connection: C) -> E
where
    C: FnOnce(String) -> E,
{
    let message = match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    };
    connection(message)
}

fn log_failure(error: &DieselError) {
    match error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(error = %error, "diesel operation failed"),
    }
}

/// Map common Diesel error variants into query/connection constructors.
pub(crate) fn map_basic_diesel_error<E, Q, C>(error: DieselError, query: Q, connection: C) -> E
where
    Q: Fn(&'static str) -> E,
    C: Fn(&'static str) -> E,
{
    log_failure(&error);
    match error {
        DieselError::NotFound => query("record not found"),
        DieselError::QueryBuilderError(_) => query("database query error"),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            connection("database connection error")
        }
        DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => {
            connection("transaction aborted by a concurrent update")
        }
        _ => query("database error"),
    }
}

/// Like [`map_basic_diesel_error`] but reports uniqueness violations through
/// `conflict`, carrying the violated constraint name.
pub(crate) fn map_constrained_diesel_error<E, Q, C, K>(
    error: DieselError,
    query: Q,
    connection: C,
    conflict: K,
) -> E
where
    Q: Fn(&'static str) -> E,
    C: Fn(&'static str) -> E,
    K: FnOnce(String) -> E,
{
    if let DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) = &error {
        log_failure(&error);
        let constraint = info.constraint_name().unwrap_or("unique constraint");
        return conflict(constraint.to_owned());
    }
    map_basic_diesel_error(error, query, connection)
}
