//! Redis-backed presence shared between instances.
//!
//! Each room is a Redis set of user ids under `presence:chat-room:{id}`.
//! Every join refreshes a TTL on the set so entries left behind by a crashed
//! instance eventually expire.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::RedisConnectionManager;
use bb8_redis::bb8::{Pool, PooledConnection, RunError};
use bb8_redis::redis::{self, RedisError};

use crate::domain::ports::{PresenceError, PresenceRegistry};
use crate::domain::{ChatRoomId, UserId};

/// Redis key holding the members present in a room.
///
/// # Examples
/// ```
/// use companion::domain::ChatRoomId;
/// use companion::outbound::presence::presence_key;
///
/// let room = ChatRoomId::random();
/// assert_eq!(presence_key(&room), format!("presence:chat-room:{room}"));
/// ```
pub fn presence_key(room_id: &ChatRoomId) -> String {
    format!("presence:chat-room:{room_id}")
}

/// Presence registry using a pooled Redis connection.
#[derive(Clone)]
pub struct RedisPresenceRegistry {
    pool: Pool<RedisConnectionManager>,
    ttl: Duration,
}

impl RedisPresenceRegistry {
    /// Connect a pool to `url`; room sets expire `ttl` after the last join.
    pub async fn connect(url: &str, ttl: Duration) -> Result<Self, PresenceError> {
        let manager = RedisConnectionManager::new(url).map_err(map_redis_error)?;
        let pool = Pool::builder()
            .build(manager)
            .await
            .map_err(map_redis_error)?;
        Ok(Self { pool, ttl })
    }

    /// Wrap an existing pool.
    pub fn new(pool: Pool<RedisConnectionManager>, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    async fn connection(
        &self,
    ) -> Result<PooledConnection<'_, RedisConnectionManager>, PresenceError> {
        self.pool.get().await.map_err(map_pool_error)
    }
}

fn map_redis_error(error: RedisError) -> PresenceError {
    if error.is_io_error() || error.is_connection_dropped() || error.is_connection_refusal() {
        PresenceError::connection(error.to_string())
    } else {
        PresenceError::command(error.to_string())
    }
}

fn map_pool_error(error: RunError<RedisError>) -> PresenceError {
    match error {
        RunError::User(error) => map_redis_error(error),
        RunError::TimedOut => PresenceError::connection("timed out waiting for a redis connection"),
    }
}

#[async_trait]
impl PresenceRegistry for RedisPresenceRegistry {
    async fn join(&self, room_id: &ChatRoomId, user_id: &UserId) -> Result<(), PresenceError> {
        let key = presence_key(room_id);
        let mut conn = self.connection().await?;
        redis::pipe()
            .atomic()
            .cmd("SADD")
            .arg(&key)
            .arg(user_id.to_string())
            .ignore()
            .cmd("EXPIRE")
            .arg(&key)
            .arg(self.ttl.as_secs().max(1))
            .ignore()
            .query_async::<()>(&mut *conn)
            .await
            .map_err(map_redis_error)
    }

    async fn leave(&self, room_id: &ChatRoomId, user_id: &UserId) -> Result<(), PresenceError> {
        let mut conn = self.connection().await?;
        redis::cmd("SREM")
            .arg(presence_key(room_id))
            .arg(user_id.to_string())
            .query_async::<()>(&mut *conn)
            .await
            .map_err(map_redis_error)
    }

    async fn is_present(
        &self,
        room_id: &ChatRoomId,
        user_id: &UserId,
    ) -> Result<bool, PresenceError> {
        let mut conn = self.connection().await?;
        redis::cmd("SISMEMBER")
            .arg(presence_key(room_id))
            .arg(user_id.to_string())
            .query_async::<bool>(&mut *conn)
            .await
            .map_err(map_redis_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bb8_redis::redis::ErrorKind;

    #[test]
    fn io_failures_map_to_connection_errors() {
        let error = RedisError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        assert!(matches!(
            map_redis_error(error),
            PresenceError::Connection { .. }
        ));
    }

    #[test]
    fn command_failures_map_to_command_errors() {
        let error = RedisError::from((ErrorKind::UnexpectedReturnType, "WRONGTYPE"));
        assert!(matches!(map_redis_error(error), PresenceError::Command { .. }));
    }

    #[test]
    fn pool_timeouts_map_to_connection_errors() {
        assert!(matches!(
            map_pool_error(RunError::TimedOut),
            PresenceError::Connection { .. }
        ));
    }
}
