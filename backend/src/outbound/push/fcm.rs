//! Firebase Cloud Messaging HTTP v1 client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;
use reqwest::StatusCode;
use serde_json::{Value, json};
use tracing::debug;

use super::credential::ServiceAccountCredential;
use crate::domain::PushMessage;
use crate::domain::ports::{MulticastReport, PushGateway, PushGatewayError, TokenDelivery};

const FCM_ENDPOINT: &str = "https://fcm.googleapis.com/v1";

/// Connection settings for [`FcmPushGateway`].
#[derive(Debug, Clone)]
pub struct FcmConfig {
    /// Firebase project id.
    pub project_id: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Maximum in-flight sends during a multicast.
    pub concurrency: usize,
    /// API base, overridable for tests against a local double.
    pub endpoint: String,
}

impl FcmConfig {
    /// Settings for `project_id` against the public endpoint.
    pub fn new(project_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            project_id: project_id.into(),
            timeout,
            concurrency: 8,
            endpoint: FCM_ENDPOINT.to_owned(),
        }
    }

    fn send_url(&self) -> String {
        format!(
            "{}/projects/{}/messages:send",
            self.endpoint.trim_end_matches('/'),
            self.project_id
        )
    }
}

/// Push gateway sending one FCM request per device token.
pub struct FcmPushGateway {
    http: reqwest::Client,
    credential: Arc<ServiceAccountCredential>,
    config: FcmConfig,
}

impl FcmPushGateway {
    /// Build a gateway; `http` should carry the configured timeout.
    pub fn new(
        http: reqwest::Client,
        credential: Arc<ServiceAccountCredential>,
        config: FcmConfig,
    ) -> Self {
        Self {
            http,
            credential,
            config,
        }
    }

    /// HTTP client with the request timeout applied.
    pub fn http_client(timeout: Duration) -> Result<reqwest::Client, PushGatewayError> {
        reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| PushGatewayError::transport(err.to_string()))
    }

    async fn post_once(&self, body: &Value) -> Result<(), PushGatewayError> {
        let bearer = self.credential.bearer().await?;
        let response = self
            .http
            .post(self.config.send_url())
            .bearer_auth(bearer.as_str())
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let detail = response.text().await.unwrap_or_default();
        Err(map_status(status, &detail))
    }

    /// Send once, retrying a single time after an authentication failure.
    async fn deliver(&self, token: &str, message: &PushMessage) -> Result<(), PushGatewayError> {
        let body = request_body(token, message);
        match self.post_once(&body).await {
            Err(PushGatewayError::Unauthorized { message }) => {
                debug!(reason = %message, "push token refused; refreshing credential");
                self.credential.invalidate().await;
                self.post_once(&body).await
            }
            other => other,
        }
    }
}

/// FCM v1 request body for one device.
fn request_body(token: &str, message: &PushMessage) -> Value {
    json!({
        "message": {
            "token": token,
            "notification": {
                "title": message.title,
                "body": message.body,
            },
            "data": message.payload.data(),
            "android": { "priority": "high" },
            "apns": { "payload": { "aps": { "sound": "default" } } },
        }
    })
}

fn map_transport_error(error: reqwest::Error) -> PushGatewayError {
    if error.is_timeout() {
        PushGatewayError::timeout(error.to_string())
    } else {
        PushGatewayError::transport(error.to_string())
    }
}

fn map_status(status: StatusCode, detail: &str) -> PushGatewayError {
    match status {
        StatusCode::UNAUTHORIZED => PushGatewayError::unauthorized(detail.to_owned()),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            PushGatewayError::timeout(format!("gateway answered {status}"))
        }
        other => PushGatewayError::rejected(other.as_u16(), detail.to_owned()),
    }
}

#[async_trait]
impl PushGateway for FcmPushGateway {
    async fn send_multicast(
        &self,
        tokens: &[String],
        message: &PushMessage,
    ) -> Result<MulticastReport, PushGatewayError> {
        // Fail the whole batch early when no credential can be obtained.
        self.credential.bearer().await?;

        let deliveries = stream::iter(tokens.iter().cloned())
            .map(|token| async move {
                let outcome = self.deliver(&token, message).await;
                TokenDelivery { token, outcome }
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect::<Vec<_>>()
            .await;
        Ok(MulticastReport { deliveries })
    }

    async fn send_single(&self, token: &str, message: &PushMessage) -> Result<(), PushGatewayError> {
        self.deliver(token, message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BoardId, PushPayload};
    use rstest::rstest;

    fn message() -> PushMessage {
        PushMessage::new(
            "New join request",
            "Ana asked to join \"Jazz night\".",
            PushPayload::EnrollmentEvent {
                board_id: BoardId::random(),
                accept_status: None,
                chat_room_id: None,
            },
        )
    }

    #[rstest]
    fn body_carries_notification_and_string_data() {
        let body = request_body("device-1", &message());
        assert_eq!(body["message"]["token"], "device-1");
        assert_eq!(body["message"]["notification"]["title"], "New join request");
        assert_eq!(body["message"]["data"]["kind"], "enrollment_event");
        assert!(body["message"]["data"].get("chat_room_id").is_none());
    }

    #[rstest]
    #[case(StatusCode::UNAUTHORIZED, "unauthorized")]
    #[case(StatusCode::GATEWAY_TIMEOUT, "timeout")]
    #[case(StatusCode::NOT_FOUND, "rejected")]
    #[case(StatusCode::TOO_MANY_REQUESTS, "rejected")]
    fn statuses_map_to_gateway_errors(#[case] status: StatusCode, #[case] expected: &str) {
        let kind = match map_status(status, "detail") {
            PushGatewayError::Unauthorized { .. } => "unauthorized",
            PushGatewayError::Timeout { .. } => "timeout",
            PushGatewayError::Rejected { .. } => "rejected",
            _ => "other",
        };
        assert_eq!(kind, expected);
    }

    #[rstest]
    fn rejected_errors_keep_the_status_code() {
        let err = map_status(StatusCode::NOT_FOUND, "UNREGISTERED");
        assert!(matches!(err, PushGatewayError::Rejected { status: 404, .. }));
    }

    #[rstest]
    fn send_url_targets_the_project() {
        let mut config = FcmConfig::new("demo-project", Duration::from_secs(5));
        config.endpoint = "http://localhost:9099/v1/".to_owned();
        assert_eq!(
            config.send_url(),
            "http://localhost:9099/v1/projects/demo-project/messages:send"
        );
    }

    mod against_a_local_double {
        //! The gateway and its credential against an in-process HTTP double
        //! that plays both the OAuth token endpoint and the FCM send API.

        use std::sync::atomic::{AtomicUsize, Ordering};

        use actix_web::dev::ServerHandle;
        use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
        use mockable::DefaultClock;

        use super::*;
        use crate::outbound::push::{ServiceAccountCredential, ServiceAccountKey};

        const TEST_KEY: &str = include_str!("testdata/service_account_key.pem");

        #[derive(Default)]
        struct Double {
            token_hits: AtomicUsize,
            send_hits: AtomicUsize,
            refused_bearer: Option<&'static str>,
            refuse_all: bool,
            stall: Option<Duration>,
        }

        async fn issue_token(double: web::Data<Double>) -> HttpResponse {
            let issued = double.token_hits.fetch_add(1, Ordering::SeqCst) + 1;
            HttpResponse::Ok().json(json!({
                "access_token": format!("token-{issued}"),
                "expires_in": 3600,
                "token_type": "Bearer",
            }))
        }

        async fn accept_send(double: web::Data<Double>, req: HttpRequest) -> HttpResponse {
            double.send_hits.fetch_add(1, Ordering::SeqCst);
            if let Some(stall) = double.stall {
                tokio::time::sleep(stall).await;
            }
            let bearer = req
                .headers()
                .get("authorization")
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default();
            if double.refuse_all
                || double
                    .refused_bearer
                    .is_some_and(|refused| bearer == format!("Bearer {refused}"))
            {
                return HttpResponse::Unauthorized().body("access token expired");
            }
            HttpResponse::Ok().json(json!({ "name": "projects/demo/messages/1" }))
        }

        struct Running {
            gateway: FcmPushGateway,
            double: Arc<Double>,
            server: ServerHandle,
        }

        fn start(double: Double, timeout: Duration) -> Running {
            let double = Arc::new(double);
            let shared = web::Data::from(Arc::clone(&double));
            let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind double");
            let addr = listener.local_addr().expect("double addr");
            let server = HttpServer::new(move || {
                App::new()
                    .app_data(shared.clone())
                    .route("/token", web::post().to(issue_token))
                    .route("/v1/projects/demo/messages:send", web::post().to(accept_send))
            })
            .listen(listener)
            .expect("listen")
            .disable_signals()
            .workers(1)
            .run();
            let handle = server.handle();
            actix_web::rt::spawn(server);

            let base = format!("http://{addr}");
            let http = FcmPushGateway::http_client(timeout).expect("http client");
            let key = ServiceAccountKey {
                client_email: "push@demo.iam.gserviceaccount.com".to_owned(),
                private_key: TEST_KEY.to_owned(),
                token_uri: format!("{base}/token"),
                project_id: Some("demo".to_owned()),
            };
            let credential =
                ServiceAccountCredential::from_key(key, http.clone(), Arc::new(DefaultClock));
            let mut config = FcmConfig::new("demo", timeout);
            config.endpoint = format!("{base}/v1");
            Running {
                gateway: FcmPushGateway::new(http, Arc::new(credential), config),
                double,
                server: handle,
            }
        }

        #[rstest]
        #[actix_rt::test]
        async fn refused_tokens_are_exchanged_once_more() {
            let running = start(
                Double {
                    refused_bearer: Some("token-1"),
                    ..Double::default()
                },
                Duration::from_secs(5),
            );

            running
                .gateway
                .send_single("device-1", &message())
                .await
                .expect("second attempt delivers");

            assert_eq!(running.double.token_hits.load(Ordering::SeqCst), 2);
            assert_eq!(running.double.send_hits.load(Ordering::SeqCst), 2);
            running.server.stop(false).await;
        }

        #[rstest]
        #[actix_rt::test]
        async fn recovered_tokens_are_cached() {
            let running = start(
                Double {
                    refused_bearer: Some("token-1"),
                    ..Double::default()
                },
                Duration::from_secs(5),
            );
            running
                .gateway
                .send_single("device-1", &message())
                .await
                .expect("recovered");

            // token-2 is cached and accepted; no further exchange happens.
            running
                .gateway
                .send_single("device-2", &message())
                .await
                .expect("cached token reused");
            assert_eq!(running.double.token_hits.load(Ordering::SeqCst), 2);
            assert_eq!(running.double.send_hits.load(Ordering::SeqCst), 3);
            running.server.stop(false).await;
        }

        #[rstest]
        #[actix_rt::test]
        async fn a_second_refusal_is_reported_not_retried() {
            let running = start(
                Double {
                    refuse_all: true,
                    ..Double::default()
                },
                Duration::from_secs(5),
            );

            let err = running
                .gateway
                .send_single("device-1", &message())
                .await
                .expect_err("refused twice");

            assert!(matches!(err, PushGatewayError::Unauthorized { .. }), "{err:?}");
            assert_eq!(running.double.token_hits.load(Ordering::SeqCst), 2);
            assert_eq!(running.double.send_hits.load(Ordering::SeqCst), 2);
            running.server.stop(false).await;
        }

        #[rstest]
        #[actix_rt::test]
        async fn cached_tokens_serve_a_whole_multicast() {
            let running = start(Double::default(), Duration::from_secs(5));
            let tokens = vec!["a".to_owned(), "b".to_owned(), "c".to_owned()];

            let report = running
                .gateway
                .send_multicast(&tokens, &message())
                .await
                .expect("multicast");

            assert_eq!(report.deliveries.len(), 3);
            assert!(report.deliveries.iter().all(|delivery| delivery.outcome.is_ok()));
            assert_eq!(running.double.token_hits.load(Ordering::SeqCst), 1);
            running.server.stop(false).await;
        }

        #[rstest]
        #[actix_rt::test]
        async fn stalled_gateways_time_out() {
            let running = start(
                Double {
                    stall: Some(Duration::from_millis(500)),
                    ..Double::default()
                },
                Duration::from_millis(100),
            );

            let err = running
                .gateway
                .send_single("device-1", &message())
                .await
                .expect_err("stalled send fails");

            assert!(matches!(err, PushGatewayError::Timeout { .. }), "{err:?}");
            running.server.stop(false).await;
        }
    }
}
