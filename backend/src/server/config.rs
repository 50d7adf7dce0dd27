//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::sync::Arc;

use companion::domain::DayBoundary;
use companion::domain::ports::{ObjectStorage, PresenceRegistry, PushGateway};
use companion::inbound::ws::state::AllowedOrigins;
use companion::outbound::persistence::DbPool;

/// Builder-style configuration for creating the HTTP server.
///
/// Unset adapters fall back to their in-process counterparts when the
/// server state is built.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) storage: Arc<dyn ObjectStorage>,
    pub(crate) db_pool: Option<DbPool>,
    pub(crate) presence: Option<Arc<dyn PresenceRegistry>>,
    pub(crate) push: Option<Arc<dyn PushGateway>>,
    pub(crate) day_boundary: DayBoundary,
    pub(crate) origins: AllowedOrigins,
}

impl ServerConfig {
    /// Construct a server configuration with in-process defaults.
    #[must_use]
    pub fn new(bind_addr: SocketAddr, storage: Arc<dyn ObjectStorage>) -> Self {
        Self {
            bind_addr,
            storage,
            db_pool: None,
            presence: None,
            push: None,
            day_boundary: DayBoundary::utc(),
            origins: AllowedOrigins::default(),
        }
    }

    /// Attach a database connection pool for persistence adapters.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// Use a shared presence registry instead of the in-process one.
    #[must_use]
    pub fn with_presence(mut self, presence: Arc<dyn PresenceRegistry>) -> Self {
        self.presence = Some(presence);
        self
    }

    /// Deliver notifications through `push` instead of discarding them.
    #[must_use]
    pub fn with_push(mut self, push: Arc<dyn PushGateway>) -> Self {
        self.push = Some(push);
        self
    }

    /// Split chat history into days at `day_boundary`.
    #[must_use]
    pub fn with_day_boundary(mut self, day_boundary: DayBoundary) -> Self {
        self.day_boundary = day_boundary;
        self
    }

    /// Admit WebSocket upgrades from `origins`.
    #[must_use]
    pub fn with_allowed_origins(mut self, origins: AllowedOrigins) -> Self {
        self.origins = origins;
        self
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
