//! In-process adapters for the relational ports and the message log.
//!
//! Used by the test suites and by the server when no database URL is
//! configured. [`InMemoryCompanionStore`] serialises every transaction behind
//! one async mutex in place of the row locks the
//! workflows rely on. Writes made inside a transaction go straight into the
//! shared state; rollback, or dropping the transaction, restores each
//! touched row from an undo log.

mod message_log;
mod store;

pub use message_log::InMemoryMessageLog;
pub use store::InMemoryCompanionStore;
