//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! This module provides concrete implementations of the relational ports
//! backed by PostgreSQL via the Diesel ORM with async support through
//! `diesel-async` and `bb8` connection pooling.
//!
//! # Architecture
//!
//! - **Thin adapters**: implementations only translate between Diesel rows
//!   and domain types. Workflow rules live in the domain services.
//! - **Internal models**: row structs (`models.rs`) and schema definitions
//!   (`schema.rs`) never leave this module.
//! - **Unit of work**: [`DieselCompanionStore`] hands out transactions that
//!   hold an owned pooled connection and take row locks with `FOR UPDATE`.
//! - **Separate log**: [`DieselMessageLog`] shares the pool but never joins
//!   the store's transactions.
//!
//! # Example
//!
//! ```ignore
//! use companion::outbound::persistence::{DbPool, DieselCompanionStore, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/companion")).await?;
//! let store = DieselCompanionStore::new(pool);
//! ```

mod diesel_chat_room_repository;
mod diesel_companion_store;
mod diesel_directory;
mod diesel_enrollment_repository;
mod diesel_error_mapping;
mod diesel_message_log;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_chat_room_repository::DieselChatRoomRepository;
pub use diesel_companion_store::{DieselCompanionStore, DieselStoreTransaction};
pub use diesel_directory::DieselDirectory;
pub use diesel_enrollment_repository::DieselEnrollmentRepository;
pub use diesel_message_log::DieselMessageLog;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
