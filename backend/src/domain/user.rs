//! User contact data read from the external user directory.
//!
//! Profiles are owned elsewhere; the core only needs a display name for
//! notification text and the device token for push delivery.

use super::UserId;

/// Nickname and push token of a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContact {
    /// User identifier.
    pub id: UserId,
    /// Display name.
    pub nickname: String,
    /// Device registration token, if the user has a device.
    pub push_token: Option<String>,
}

impl UserContact {
    /// Build a contact record.
    pub fn new(id: UserId, nickname: impl Into<String>, push_token: Option<String>) -> Self {
        Self {
            id,
            nickname: nickname.into(),
            push_token,
        }
    }

    /// Push token, unless missing or blank.
    ///
    /// # Examples
    /// ```
    /// use companion::domain::{UserContact, UserId};
    ///
    /// let contact = UserContact::new(UserId::random(), "mina", Some("  ".to_owned()));
    /// assert!(contact.usable_push_token().is_none());
    /// ```
    pub fn usable_push_token(&self) -> Option<&str> {
        self.push_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

#[cfg(test)]
mod tests;
