//! Domain primitives, aggregates and services.
//!
//! Purpose: define the strongly typed companion entities (boards, enrollments,
//! chat rooms, memberships, messages, notifications) and the services that
//! drive them through the driven ports in [`ports`]. Nothing in this module
//! knows about HTTP, SQL or push vendors.
//!
//! Public surface:
//! - Error (alias to `error::Error`): API error response payload.
//! - ErrorCode (alias to `error::ErrorCode`): stable error identifier.
//! - `EnrollmentService`, `RoomService`, `MessageService`: driving-port
//!   implementations.
//! - `NotificationFanout`: presence-aware push dispatch.

pub mod board;
pub mod capacity;
pub mod chat;
pub mod enrollment;
mod enrollment_service;
pub mod error;
pub mod ids;
pub mod message;
mod message_service;
pub mod notification;
mod notification_fanout;
pub mod ports;
pub mod push;
pub mod room_event;
mod room_service;
mod service_support;
mod trace_id;
pub mod user;

pub use self::board::Board;
pub use self::capacity::{CapacityError, CapacityLedger};
pub use self::chat::{ChatRoom, ParticipantCountError, RoomMembership, RoomOverview};
pub use self::enrollment::{
    AcceptStatus, Enrollment, EnrollmentStatus, EnrollmentTransitionError, UnknownVariant,
};
pub use self::enrollment_service::EnrollmentService;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::ids::{
    BoardId, ChatRoomId, EnrollmentId, IdParseError, MembershipId, MessageId, NotificationId,
    UserId,
};
pub use self::message::{DayBoundary, Message, MessageCursor, MessageType, NewMessage};
pub use self::message_service::MessageService;
pub use self::notification::Notification;
pub use self::notification_fanout::NotificationFanout;
pub use self::push::{PushMessage, PushPayload};
pub use self::room_event::RoomEvent;
pub use self::room_service::{MAX_IMAGE_BYTES, RoomService};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::UserContact;

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use companion::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
