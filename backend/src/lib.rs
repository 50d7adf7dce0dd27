//! Companion backend library modules.
//!
//! The crate follows a hexagonal layout: [`domain`] holds entities, services
//! and ports; [`inbound`] adapts HTTP and WebSocket traffic onto the driving
//! ports; [`outbound`] implements the driven ports against PostgreSQL, Redis,
//! Firebase and the local filesystem.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;
#[cfg(test)]
pub(crate) mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
