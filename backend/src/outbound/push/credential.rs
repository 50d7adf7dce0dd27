//! OAuth access tokens for the FCM HTTP v1 API.
//!
//! The service-account key is read on first use, not at startup, so a
//! misplaced key file only disables push rather than the whole service. The
//! signed-assertion exchange follows Google's two-legged OAuth flow: an RS256
//! JWT naming the messaging scope is traded for a bearer token.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cap_std::ambient_authority;
use cap_std::fs::Dir;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;
use zeroize::Zeroizing;

use crate::domain::ports::PushGatewayError;

const MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const ASSERTION_LIFETIME_SECS: i64 = 3_600;
/// Tokens are refreshed this long before they expire.
pub const REFRESH_MARGIN_SECS: i64 = 60;

/// Fields of a Google service-account key file used here.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    /// Service account identity.
    pub client_email: String,
    /// PEM-encoded RSA private key.
    pub private_key: String,
    /// OAuth token endpoint.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    /// Firebase project the account belongs to.
    #[serde(default)]
    pub project_id: Option<String>,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .finish()
    }
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_owned()
}

impl ServiceAccountKey {
    /// Parse a key from its JSON text.
    pub fn from_json(raw: &str) -> Result<Self, PushGatewayError> {
        serde_json::from_str(raw)
            .map_err(|err| PushGatewayError::credential(format!("invalid service account key: {err}")))
    }

    /// Read and parse a key file through `cap_std`.
    pub fn load(path: &Path) -> Result<Self, PushGatewayError> {
        let parent = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let file_name = path.file_name().ok_or_else(|| {
            PushGatewayError::credential(format!("{} does not name a file", path.display()))
        })?;
        let raw = Dir::open_ambient_dir(parent, ambient_authority())
            .and_then(|dir| dir.read_to_string(file_name))
            .map_err(|err| {
                PushGatewayError::credential(format!("cannot read {}: {err}", path.display()))
            })?;
        Self::from_json(&raw)
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Bearer token with its expiry.
pub struct AccessToken {
    secret: Zeroizing<String>,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Wrap a token expiring at `expires_at`.
    pub fn new(secret: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            secret: Zeroizing::new(secret.into()),
            expires_at,
        }
    }

    /// Whether the token may still be used at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS)
    }

    /// Token text for the `Authorization` header.
    pub fn secret(&self) -> &str {
        self.secret.as_str()
    }
}

enum KeySource {
    Path(PathBuf),
    Loaded(Arc<ServiceAccountKey>),
}

struct CredentialState {
    key: KeySource,
    token: Option<AccessToken>,
}

/// Lazily loaded, cached service-account credential.
pub struct ServiceAccountCredential {
    http: reqwest::Client,
    clock: Arc<dyn Clock>,
    state: Mutex<CredentialState>,
}

impl ServiceAccountCredential {
    /// Credential that reads its key from `path` on first use.
    pub fn from_path(path: impl Into<PathBuf>, http: reqwest::Client, clock: Arc<dyn Clock>) -> Self {
        Self::with_source(KeySource::Path(path.into()), http, clock)
    }

    /// Credential backed by an already parsed key.
    pub fn from_key(key: ServiceAccountKey, http: reqwest::Client, clock: Arc<dyn Clock>) -> Self {
        Self::with_source(KeySource::Loaded(Arc::new(key)), http, clock)
    }

    fn with_source(key: KeySource, http: reqwest::Client, clock: Arc<dyn Clock>) -> Self {
        Self {
            http,
            clock,
            state: Mutex::new(CredentialState { key, token: None }),
        }
    }

    /// Return a fresh bearer token, exchanging a new one when needed.
    pub async fn bearer(&self) -> Result<Zeroizing<String>, PushGatewayError> {
        let mut state = self.state.lock().await;
        let now = self.clock.utc();
        if let Some(token) = state.token.as_ref().filter(|token| token.is_fresh(now)) {
            return Ok(Zeroizing::new(token.secret().to_owned()));
        }

        let key = match &state.key {
            KeySource::Loaded(key) => Arc::clone(key),
            KeySource::Path(path) => {
                let key = Arc::new(ServiceAccountKey::load(path)?);
                state.key = KeySource::Loaded(Arc::clone(&key));
                key
            }
        };
        let token = self.exchange(&key, now).await?;
        let secret = Zeroizing::new(token.secret().to_owned());
        debug!(expires_at = %token.expires_at, "push access token refreshed");
        state.token = Some(token);
        Ok(secret)
    }

    /// Forget the cached token after the gateway refused it.
    pub async fn invalidate(&self) {
        self.state.lock().await.token = None;
    }

    async fn exchange(
        &self,
        key: &ServiceAccountKey,
        now: DateTime<Utc>,
    ) -> Result<AccessToken, PushGatewayError> {
        let assertion = sign_assertion(key, now)?;
        let response = self
            .http
            .post(&key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|err| PushGatewayError::credential(format!("token exchange failed: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PushGatewayError::credential(format!(
                "token endpoint answered {status}"
            )));
        }
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|err| PushGatewayError::credential(format!("invalid token response: {err}")))?;
        Ok(AccessToken::new(
            body.access_token,
            now + Duration::seconds(body.expires_in),
        ))
    }
}

fn sign_assertion(key: &ServiceAccountKey, now: DateTime<Utc>) -> Result<Zeroizing<String>, PushGatewayError> {
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: MESSAGING_SCOPE,
        aud: &key.token_uri,
        iat: now.timestamp(),
        exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
    };
    let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|err| PushGatewayError::credential(format!("invalid private key: {err}")))?;
    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
        .map(Zeroizing::new)
        .map_err(|err| PushGatewayError::credential(format!("cannot sign assertion: {err}")))
}
