//! Port for the mobile push provider.

use async_trait::async_trait;

use crate::domain::PushMessage;

use super::define_port_error;

define_port_error! {
    /// Delivery failures reported by push adapters.
    pub enum PushGatewayError {
        /// The provider did not answer within the configured timeout.
        Timeout { message: String } =>
            "push gateway timed out: {message}",
        /// The provider refused our credential.
        Unauthorized { message: String } =>
            "push gateway rejected credentials: {message}",
        /// A credential could not be obtained.
        Credential { message: String } =>
            "push credential unavailable: {message}",
        /// The provider rejected the message or the token.
        Rejected { status: u16, message: String } =>
            "push gateway rejected message with status {status}: {message}",
        /// The request could not be sent.
        Transport { message: String } =>
            "push gateway transport failed: {message}",
    }
}

/// Outcome of one token in a multicast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDelivery {
    /// Device token the message was addressed to.
    pub token: String,
    /// Per-token result.
    pub outcome: Result<(), PushGatewayError>,
}

/// Per-token results of a multicast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MulticastReport {
    /// One entry per token, in request order.
    pub deliveries: Vec<TokenDelivery>,
}

impl MulticastReport {
    /// Number of tokens that accepted the message.
    pub fn success_count(&self) -> usize {
        self.deliveries
            .iter()
            .filter(|delivery| delivery.outcome.is_ok())
            .count()
    }

    /// Deliveries that failed.
    pub fn failures(&self) -> impl Iterator<Item = &TokenDelivery> {
        self.deliveries
            .iter()
            .filter(|delivery| delivery.outcome.is_err())
    }
}

/// Port for sending push notifications.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PushGateway: Send + Sync {
    /// Send one message to many devices. Individual token failures are
    /// reported in the result, never as an `Err`.
    async fn send_multicast(
        &self,
        tokens: &[String],
        message: &PushMessage,
    ) -> Result<MulticastReport, PushGatewayError>;

    /// Send one message to one device.
    async fn send_single(&self, token: &str, message: &PushMessage)
    -> Result<(), PushGatewayError>;
}

/// Gateway that accepts and drops every message.
///
/// Used when no provider credential is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixturePushGateway;

#[async_trait]
impl PushGateway for FixturePushGateway {
    async fn send_multicast(
        &self,
        tokens: &[String],
        _message: &PushMessage,
    ) -> Result<MulticastReport, PushGatewayError> {
        Ok(MulticastReport {
            deliveries: tokens
                .iter()
                .map(|token| TokenDelivery {
                    token: token.clone(),
                    outcome: Ok(()),
                })
                .collect(),
        })
    }

    async fn send_single(
        &self,
        _token: &str,
        _message: &PushMessage,
    ) -> Result<(), PushGatewayError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::{BoardId, PushPayload};

    fn message() -> PushMessage {
        PushMessage::new(
            "title",
            "body",
            PushPayload::EnrollmentEvent {
                board_id: BoardId::random(),
                accept_status: None,
                chat_room_id: None,
            },
        )
    }

    #[tokio::test]
    async fn fixture_reports_every_token_as_delivered() {
        let tokens = vec!["a".to_owned(), "b".to_owned()];
        let report = FixturePushGateway
            .send_multicast(&tokens, &message())
            .await
            .expect("fixture never fails");
        assert_eq!(report.success_count(), 2);
        assert_eq!(report.failures().count(), 0);
    }

    #[test]
    fn report_separates_failures() {
        let report = MulticastReport {
            deliveries: vec![
                TokenDelivery {
                    token: "ok".to_owned(),
                    outcome: Ok(()),
                },
                TokenDelivery {
                    token: "stale".to_owned(),
                    outcome: Err(PushGatewayError::rejected(404_u16, "UNREGISTERED")),
                },
            ],
        };
        assert_eq!(report.success_count(), 1);
        let failed: Vec<_> = report.failures().map(|d| d.token.as_str()).collect();
        assert_eq!(failed, vec!["stale"]);
    }
}
