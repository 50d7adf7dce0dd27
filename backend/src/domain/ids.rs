//! Strongly typed identifiers for companion aggregates.
//!
//! Every aggregate is keyed by a UUID. Wrapping each one in its own newtype
//! keeps a board id from being passed where an enrollment id is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error returned when parsing an identifier from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} must be a valid UUID")]
pub struct IdParseError {
    kind: &'static str,
}

impl IdParseError {
    /// Name of the identifier type that failed to parse.
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Wrap an existing UUID.
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Generate a fresh random identifier.
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Borrow the inner UUID.
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(value.trim())
                    .map(Self)
                    .map_err(|_| IdParseError { kind: $label })
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }
    };
}

define_id!(
    /// Identifier of a user account owned by the external identity service.
    UserId,
    "user id"
);
define_id!(
    /// Identifier of a companion-request board.
    BoardId,
    "board id"
);
define_id!(
    /// Identifier of an enrollment (join request).
    EnrollmentId,
    "enrollment id"
);
define_id!(
    /// Identifier of a chat room.
    ChatRoomId,
    "chat room id"
);
define_id!(
    /// Identifier of a room membership.
    MembershipId,
    "membership id"
);
define_id!(
    /// Identifier of an in-app notification.
    NotificationId,
    "notification id"
);
define_id!(
    /// Identifier of a chat message.
    MessageId,
    "message id"
);
