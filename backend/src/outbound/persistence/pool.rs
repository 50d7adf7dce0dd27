//! bb8 pool of `diesel-async` PostgreSQL connections.
//!
//! Repositories borrow a connection per call. The companion store checks
//! out an owned connection for each unit of work and keeps it until commit
//! or rollback; a connection dropped mid-transaction is discarded by bb8.

use std::time::Duration;

use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};

/// Most idle connections kept warm, whatever the pool size.
const MAX_WARM_CONNECTIONS: u32 = 2;

/// Failure to build the pool or to check out of it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// No connection became available in time.
    #[error("database checkout failed: {message}")]
    Checkout { message: String },

    /// The pool could not be created.
    #[error("database pool setup failed: {message}")]
    Build { message: String },
}

impl PoolError {
    /// Checkout failure.
    pub fn checkout(message: impl Into<String>) -> Self {
        Self::Checkout {
            message: message.into(),
        }
    }

    /// Build failure.
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
        }
    }
}

/// Sizing and timeouts for [`DbPool`].
///
/// ```ignore
/// let config = PoolConfig::new(settings.database_url().unwrap_or_default())
///     .with_max_connections(settings.database_max_connections());
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfig {
    database_url: String,
    max_size: u32,
    min_idle: Option<u32>,
    checkout_timeout: Duration,
}

impl PoolConfig {
    /// Ten connections, two kept warm, 30 s checkout timeout.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_size: 10,
            min_idle: Some(MAX_WARM_CONNECTIONS),
            checkout_timeout: Duration::from_secs(30),
        }
    }

    /// Cap the pool at `max` connections (at least one) and keep up to two
    /// of them idle.
    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_size = max.max(1);
        self.min_idle = Some(self.max_size.min(MAX_WARM_CONNECTIONS));
        self
    }

    /// How long `get` waits before reporting [`PoolError::Checkout`].
    pub fn with_checkout_timeout(mut self, timeout: Duration) -> Self {
        self.checkout_timeout = timeout;
        self
    }

    /// Connection string the pool dials.
    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

/// Shared handle over the connection pool; clones share connections.
#[derive(Clone)]
pub struct DbPool {
    inner: Pool<AsyncPgConnection>,
}

impl DbPool {
    /// Build the pool and open its warm connections.
    ///
    /// # Errors
    ///
    /// [`PoolError::Build`] when the URL is malformed or the warm
    /// connections cannot be opened.
    pub async fn new(config: PoolConfig) -> Result<Self, PoolError> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_size)
            .min_idle(config.min_idle)
            .connection_timeout(config.checkout_timeout)
            .build(manager)
            .await
            .map_err(|err| PoolError::build(err.to_string()))?;

        Ok(Self { inner: pool })
    }

    /// Borrow a connection for a single repository call.
    ///
    /// # Errors
    ///
    /// [`PoolError::Checkout`] after the checkout timeout.
    pub async fn get(&self) -> Result<PooledConnection<'_, AsyncPgConnection>, PoolError> {
        self.inner
            .get()
            .await
            .map_err(|err| PoolError::checkout(err.to_string()))
    }

    /// Check out a connection that outlives the borrow of the pool.
    ///
    /// Store transactions hold it across `await` points behind a boxed
    /// trait object.
    ///
    /// # Errors
    ///
    /// [`PoolError::Checkout`] after the checkout timeout.
    pub async fn get_owned(
        &self,
    ) -> Result<PooledConnection<'static, AsyncPgConnection>, PoolError> {
        self.inner
            .get_owned()
            .await
            .map_err(|err| PoolError::checkout(err.to_string()))
    }
}
