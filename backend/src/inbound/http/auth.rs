//! Caller identity extraction.
//!
//! The upstream gateway authenticates users and forwards the verified
//! identifier in the `X-User-Id` header. Handlers take [`Caller`] as an
//! argument; a missing or malformed header short-circuits with 401.

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use futures_util::future::{Ready, ready};

use crate::domain::{Error, UserId};

/// Header carrying the authenticated user identifier.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller of an HTTP or WebSocket endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub UserId);

impl Caller {
    /// The caller's user identifier.
    pub fn user_id(&self) -> UserId {
        self.0
    }

    /// Resolve the caller from request headers.
    ///
    /// # Errors
    ///
    /// Returns an unauthorized error when the header is missing, repeated or
    /// not a UUID.
    pub fn from_headers(req: &HttpRequest) -> Result<Self, Error> {
        let mut values = req.headers().get_all(USER_ID_HEADER);
        let value = values
            .next()
            .ok_or_else(|| Error::unauthorized("missing X-User-Id header"))?;
        if values.next().is_some() {
            return Err(Error::unauthorized("X-User-Id header must appear once"));
        }
        value
            .to_str()
            .ok()
            .and_then(|raw| raw.trim().parse::<UserId>().ok())
            .map(Self)
            .ok_or_else(|| Error::unauthorized("X-User-Id header must be a UUID"))
    }
}

impl FromRequest for Caller {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Self::from_headers(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use actix_web::test::TestRequest;
    use rstest::rstest;

    const USER: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

    #[rstest]
    fn reads_the_forwarded_user() {
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, USER))
            .to_http_request();
        let caller = Caller::from_headers(&req).expect("caller");
        assert_eq!(caller.user_id().to_string(), USER);
    }

    #[rstest]
    fn missing_header_is_unauthorized() {
        let req = TestRequest::default().to_http_request();
        let err = Caller::from_headers(&req).expect_err("missing");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[rstest]
    #[case("")]
    #[case("admin")]
    #[case("42")]
    fn malformed_header_is_unauthorized(#[case] value: &str) {
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, value))
            .to_http_request();
        let err = Caller::from_headers(&req).expect_err("malformed");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[rstest]
    fn repeated_header_is_unauthorized() {
        let req = TestRequest::default()
            .append_header((USER_ID_HEADER, USER))
            .append_header((USER_ID_HEADER, USER))
            .to_http_request();
        let err = Caller::from_headers(&req).expect_err("repeated");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }
}
