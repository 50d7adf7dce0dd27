//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL store, repositories and message log (Diesel)
//! - **memory**: process-local doubles of the same ports for DB-less runs
//! - **presence**: in-process and Redis presence registries
//! - **push**: Firebase Cloud Messaging gateway
//! - **realtime**: topic hub feeding websocket sessions
//! - **storage**: local filesystem object storage for room images
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod memory;
pub mod persistence;
pub mod presence;
pub mod push;
pub mod realtime;
pub mod storage;
