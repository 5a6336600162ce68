// src/auth.rs - OAuth2 bearer tokens for the Vertex AI and Cloud Storage APIs
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::Mutex;

use crate::config::Credentials;
use crate::error::{VeoError, VeoResult};

const SCOPES: &str = "https://www.googleapis.com/auth/cloud-platform https://www.googleapis.com/auth/devstorage.read_write";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens are refreshed this long before they actually expire.
const REFRESH_MARGIN_SECS: i64 = 60;

/// The fields of a Google service-account key file we need.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl ServiceAccountKey {
    pub async fn from_file(path: &Path) -> VeoResult<Self> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            VeoError::Config(format!("Failed to read service account key {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| VeoError::Config(format!("Invalid service account key {}: {}", path.display(), e)))
    }

    fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
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

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

enum TokenSource {
    Static(String),
    ServiceAccount(ServiceAccountKey),
}

pub struct TokenProvider {
    client: Client,
    source: TokenSource,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn with_static_token(token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            source: TokenSource::Static(token.into()),
            cached: Mutex::new(None),
        }
    }

    pub fn with_service_account(key: ServiceAccountKey) -> Self {
        Self {
            client: Client::new(),
            source: TokenSource::ServiceAccount(key),
            cached: Mutex::new(None),
        }
    }

    pub async fn from_credentials(credentials: &Credentials) -> VeoResult<Self> {
        match credentials {
            Credentials::AccessToken(token) => Ok(Self::with_static_token(token.clone())),
            Credentials::ServiceAccountFile(path) => {
                let key = ServiceAccountKey::from_file(path).await?;
                tracing::info!("🔑 Using service account {}", key.client_email);
                Ok(Self::with_service_account(key))
            }
        }
    }

    /// Returns a bearer token, exchanging a fresh assertion when the cached one is stale.
    pub async fn access_token(&self) -> VeoResult<String> {
        let key = match &self.source {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::ServiceAccount(key) => key,
        };

        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > Utc::now() {
                return Ok(token.value.clone());
            }
        }

        let token = self.exchange_assertion(key).await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn exchange_assertion(&self, key: &ServiceAccountKey) -> VeoResult<CachedToken> {
        let now = Utc::now();
        let claims = AssertionClaims {
            iss: &key.client_email,
            scope: SCOPES,
            aud: key.token_uri(),
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = key.private_key_id.clone();
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        let assertion = encode(&header, &claims, &signing_key)?;

        tracing::debug!("Exchanging service account assertion at {}", key.token_uri());

        let response = self
            .client
            .post(key.token_uri())
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| VeoError::Auth(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(VeoError::Auth(format!(
                "Token endpoint returned {}: {}",
                status, error_text
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| VeoError::Auth(format!("Invalid token response: {}", e)))?;

        Ok(CachedToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}
