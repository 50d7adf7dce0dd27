//! Push gateway adapters.
//!
//! [`FcmPushGateway`] talks to the Firebase Cloud Messaging HTTP v1 API.
//! [`DisabledPushGateway`] stands in when no credentials are configured and
//! only logs what it would have sent.

mod credential;
mod fcm;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::PushMessage;
use crate::domain::ports::{MulticastReport, PushGateway, PushGatewayError, TokenDelivery};

pub use credential::{AccessToken, ServiceAccountCredential, ServiceAccountKey};
pub use fcm::{FcmConfig, FcmPushGateway};

/// Push gateway that accepts every message without sending it.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledPushGateway;

#[async_trait]
impl PushGateway for DisabledPushGateway {
    async fn send_multicast(
        &self,
        tokens: &[String],
        message: &PushMessage,
    ) -> Result<MulticastReport, PushGatewayError> {
        debug!(recipients = tokens.len(), title = %message.title, "push disabled; multicast skipped");
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

    async fn send_single(&self, _token: &str, message: &PushMessage) -> Result<(), PushGatewayError> {
        debug!(title = %message.title, "push disabled; single send skipped");
        Ok(())
    }
}
