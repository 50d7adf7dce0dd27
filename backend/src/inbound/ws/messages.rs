//! Wire-level frames for the room WebSocket.
//!
//! Server-to-client frames are the room's published events, forwarded
//! verbatim: logged messages and membership events
//! ([`crate::domain::RoomEvent`]). The only frame the session itself produces
//! is [`ErrorFrame`].

use serde::{Deserialize, Serialize};

use crate::domain::{Error, ErrorCode};

/// Inbound chat frame sent by the client.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMessage {
    /// Message text.
    pub content: String,
}

/// Outbound frame reporting a rejected client message.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorFrame {
    #[serde(rename = "type")]
    pub frame_type: &'static str,
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for ErrorFrame {
    fn from(value: &Error) -> Self {
        if value.code() == ErrorCode::InternalError {
            return Self {
                frame_type: "ERROR",
                code: value.code(),
                message: "Internal server error".to_owned(),
                details: None,
            };
        }
        Self {
            frame_type: "ERROR",
            code: value.code(),
            message: value.message().to_owned(),
            details: value.details().cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn client_frames_carry_content() {
        let frame: ClientMessage =
            serde_json::from_str(r#"{"content":"hello"}"#).expect("client frame");
        assert_eq!(frame.content, "hello");
    }

    #[rstest]
    fn business_errors_keep_their_details() {
        let error = Error::invalid_request("message content must not be blank")
            .with_details(json!({ "field": "content", "code": "blank" }));
        let value = serde_json::to_value(ErrorFrame::from(&error)).expect("serialise");
        assert_eq!(value["type"], "ERROR");
        assert_eq!(value["code"], "invalid_request");
        assert_eq!(value["details"]["code"], "blank");
    }

    #[rstest]
    fn internal_errors_are_redacted() {
        let error = Error::internal("pool exhausted on db-3");
        let value = serde_json::to_value(ErrorFrame::from(&error)).expect("serialise");
        assert_eq!(value["message"], "Internal server error");
    }
}
