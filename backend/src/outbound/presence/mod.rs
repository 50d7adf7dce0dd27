//! Presence registry adapters.
//!
//! [`InMemoryPresenceRegistry`] serves a single process. Deployments running
//! several instances behind a load balancer share [`RedisPresenceRegistry`]
//! so a push is suppressed no matter which instance holds the socket.

mod memory;
mod redis;

pub use memory::InMemoryPresenceRegistry;
pub use redis::{RedisPresenceRegistry, presence_key};
