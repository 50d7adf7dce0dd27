//! Shared validation helpers for inbound HTTP adapters.

use std::str::FromStr;

use serde_json::json;

use crate::domain::Error;

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    InvalidUuid,
    MissingContentType,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidUuid => "invalid_uuid",
            ErrorCode::MissingContentType => "missing_content_type",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(&self) -> &str {
        self.0
    }
}

pub(crate) fn invalid_uuid_error(field: FieldName, value: &str) -> Error {
    let field = field.as_str();
    Error::invalid_request(format!("{field} must be a valid UUID")).with_details(json!({
        "field": field,
        "value": value,
        "code": ErrorCode::InvalidUuid.as_str(),
    }))
}

pub(crate) fn missing_content_type_error() -> Error {
    Error::invalid_request("Content-Type header is required").with_details(json!({
        "field": "Content-Type",
        "code": ErrorCode::MissingContentType.as_str(),
    }))
}

/// Parse a path segment into one of the domain identifier newtypes.
pub(crate) fn parse_id<T: FromStr>(value: &str, field: FieldName) -> Result<T, Error> {
    value
        .parse::<T>()
        .map_err(|_| invalid_uuid_error(field, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BoardId, ErrorCode as DomainErrorCode};
    use rstest::rstest;

    #[rstest]
    fn parses_valid_ids() {
        let id: BoardId = parse_id("3fa85f64-5717-4562-b3fc-2c963f66afa6", FieldName::new("boardId"))
            .expect("valid uuid");
        assert_eq!(id.to_string(), "3fa85f64-5717-4562-b3fc-2c963f66afa6");
    }

    #[rstest]
    #[case("")]
    #[case("board-1")]
    #[case("3fa85f64-5717-4562-b3fc")]
    fn rejects_malformed_ids_with_field_details(#[case] raw: &str) {
        let err = parse_id::<BoardId>(raw, FieldName::new("boardId")).expect_err("invalid");
        assert_eq!(err.code(), DomainErrorCode::InvalidRequest);
        let details = err.details().expect("details");
        assert_eq!(details["field"], "boardId");
        assert_eq!(details["code"], "invalid_uuid");
        assert_eq!(details["value"], raw);
    }
}
