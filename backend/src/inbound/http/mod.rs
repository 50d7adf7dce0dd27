//! HTTP inbound adapter exposing REST endpoints.

pub mod auth;
pub mod chat_messages;
pub mod chat_rooms;
pub mod enrollments;
pub mod error;
pub mod health;
pub mod internal;
pub mod pages;
pub mod schemas;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod validation;

pub use error::ApiResult;
