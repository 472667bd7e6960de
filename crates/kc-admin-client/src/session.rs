//! Password-grant token session.
//!
//! A [`TokenSession`] is owned by the caller and handed by reference to the
//! admin client. It caches one access token and transparently requests a new
//! one when the cached token has expired. Tokens are never persisted.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{AdminError, AdminResult};

/// Seconds before literal expiry at which a cached token is considered stale.
pub const EXPIRY_MARGIN_SECS: i64 = 30;

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 300;

/// Credentials for the resource-owner password grant.
#[derive(Clone)]
pub struct AdminCredentials {
    /// Realm whose token endpoint is used.
    pub realm: String,
    /// Public client used for the grant, usually `admin-cli`.
    pub client_id: String,
    /// Admin username.
    pub username: String,
    /// Admin password.
    pub password: String,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("realm", &self.realm)
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Ephemeral bearer credential with its effective expiry.
#[derive(Clone)]
pub struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Builds a token issued at `issued_at` that the server says lives `expires_in` seconds.
    ///
    /// The effective expiry is pulled in by [`EXPIRY_MARGIN_SECS`], but never by
    /// more than half the lifetime so that short-lived tokens stay usable. A
    /// lifetime too large to represent falls back to [`DEFAULT_EXPIRES_IN_SECS`].
    #[must_use]
    pub fn new(value: impl Into<String>, expires_in: i64, issued_at: DateTime<Utc>) -> Self {
        let lifetime = expires_in
            .saturating_sub(EXPIRY_MARGIN_SECS)
            .max(expires_in / 2)
            .max(0);
        let expires_at = Duration::try_seconds(lifetime)
            .and_then(|d| issued_at.checked_add_signed(d))
            .unwrap_or_else(|| issued_at + Duration::seconds(DEFAULT_EXPIRES_IN_SECS));
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// The bearer value.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.value
    }

    /// When the token stops being used.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Checks expiry against a given instant.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Checks expiry against the current time.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Authenticated session against one realm's token endpoint.
#[derive(Debug)]
pub struct TokenSession {
    http: reqwest::Client,
    server_url: String,
    credentials: AdminCredentials,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenSession {
    /// Creates a session; no request is made until a token is needed.
    pub fn new(
        http: reqwest::Client,
        server_url: impl Into<String>,
        credentials: AdminCredentials,
    ) -> Self {
        Self {
            http,
            server_url: server_url.into().trim_end_matches('/').to_string(),
            credentials,
            cached: Mutex::new(None),
        }
    }

    /// Realm the session authenticates against.
    #[must_use]
    pub fn realm(&self) -> &str {
        &self.credentials.realm
    }

    /// Full URL of the realm's token endpoint.
    #[must_use]
    pub fn token_endpoint(&self) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/token",
            self.server_url,
            urlencoding::encode(&self.credentials.realm)
        )
    }

    /// Requests a fresh token and caches it.
    pub async fn authenticate(&self) -> AdminResult<AccessToken> {
        let mut cached = self.cached.lock().await;
        let token = self.request_token().await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Returns the cached bearer value, re-authenticating once it has expired.
    pub async fn bearer_token(&self) -> AdminResult<String> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if !token.is_expired() {
                return Ok(token.secret().to_string());
            }
            debug!(realm = %self.credentials.realm, "access token expired, re-authenticating");
        }

        let token = self.request_token().await?;
        let value = token.secret().to_string();
        *cached = Some(token);
        Ok(value)
    }

    /// Drops the cached token.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn request_token(&self) -> AdminResult<AccessToken> {
        let realm = &self.credentials.realm;
        let form = [
            ("grant_type", "password"),
            ("client_id", self.credentials.client_id.as_str()),
            ("username", self.credentials.username.as_str()),
            ("password", self.credentials.password.as_str()),
        ];

        debug!(%realm, endpoint = %self.token_endpoint(), "requesting access token");

        let response = self
            .http
            .post(self.token_endpoint())
            .form(&form)
            .send()
            .await
            .map_err(|e| AdminError::Authentication {
                realm: realm.clone(),
                status: None,
                reason: format!("token request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdminError::Authentication {
                realm: realm.clone(),
                status: Some(status.as_u16()),
                reason: format!("token endpoint returned {status}: {body}"),
            });
        }

        let issued_at = Utc::now();
        let body: TokenResponse = response.json().await.map_err(|e| {
            AdminError::Authentication {
                realm: realm.clone(),
                status: Some(status.as_u16()),
                reason: format!("unreadable token response: {e}"),
            }
        })?;

        let token = AccessToken::new(
            body.access_token,
            body.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS),
            issued_at,
        );
        debug!(%realm, expires_at = %token.expires_at(), "access token obtained");
        Ok(token)
    }
}
