//! Service-account authentication: a signed JWT assertion exchanged for a
//! short-lived OAuth access token.

use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::OcrError;
use crate::options::{Credentials, DEFAULT_TOKEN_URI};

pub const VISION_SCOPE: &str = "https://www.googleapis.com/auth/cloud-vision";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens this close to expiry are refreshed before use.
const REFRESH_MARGIN_SECS: i64 = 60;

const SETUP_HINT: &str = "Google Vision is not correctly configured. Provide the JSON key of a \
     service account with access to the Cloud Vision API (fields `client_email` and \
     `private_key`), e.g. via `--credentials key.json` or GOOGLE_APPLICATION_CREDENTIALS.";

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl ServiceAccountKey {
    pub fn from_credentials(credentials: &Credentials) -> Result<Self, OcrError> {
        if credentials.is_empty() {
            return Err(OcrError::Configuration(format!(
                "no credentials were given. {}",
                SETUP_HINT
            )));
        }

        let key: Self = serde_json::from_value(credentials.0.clone())
            .map_err(|e| OcrError::Configuration(format!("invalid credentials ({}). {}", e, SETUP_HINT)))?;

        match key.key_type.as_deref() {
            None | Some("service_account") => Ok(key),
            Some(other) => Err(OcrError::Configuration(format!(
                "credentials of type `{}` are not supported. {}",
                other, SETUP_HINT
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

struct AccessToken {
    value: String,
    expires_at: i64,
}

/// Mints and caches access tokens for one service account.
pub struct TokenSource {
    client_email: String,
    key_id: Option<String>,
    token_uri: String,
    encoding_key: EncodingKey,
    http: reqwest::Client,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenSource {
    /// Fails if the private key cannot be loaded, so bad keys surface
    /// before any page is processed.
    pub fn new(
        key: ServiceAccountKey,
        token_uri: Option<&str>,
        http: reqwest::Client,
    ) -> Result<Self, OcrError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            OcrError::Configuration(format!("cannot load private key ({}). {}", e, SETUP_HINT))
        })?;

        let token_uri = token_uri
            .map(str::to_string)
            .or(key.token_uri)
            .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());

        Ok(Self {
            client_email: key.client_email,
            key_id: key.private_key_id,
            token_uri,
            encoding_key,
            http,
            cached: Mutex::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    pub fn token_uri(&self) -> &str {
        &self.token_uri
    }

    /// Signed JWT asserting the service account's identity at `now`.
    pub fn assertion(&self, now: i64) -> Result<String, OcrError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();
        let claims = Claims {
            iss: &self.client_email,
            scope: VISION_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        encode(&header, &claims, &self.encoding_key).map_err(|e| OcrError::Auth(e.to_string()))
    }

    fn cache(&self) -> MutexGuard<'_, Option<AccessToken>> {
        self.cached.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// A cached token still valid past the refresh margin at `now`.
    fn cached_token(&self, now: i64) -> Option<String> {
        self.cache()
            .as_ref()
            .filter(|token| token.expires_at - REFRESH_MARGIN_SECS > now)
            .map(|token| token.value.clone())
    }

    pub async fn access_token(&self) -> Result<String, OcrError> {
        let now = Utc::now().timestamp();
        if let Some(token) = self.cached_token(now) {
            return Ok(token);
        }

        debug!("Requesting access token for {}", self.client_email);
        let assertion = self.assertion(now)?;
        let response = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::Auth(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await?;
        *self.cache() = Some(AccessToken {
            value: token.access_token.clone(),
            expires_at: now + token.expires_in,
        });
        Ok(token.access_token)
    }

    /// Forgets the cached token.
    pub fn clear(&self) {
        *self.cache() = None;
    }
}
