//! REST identity provider for the hosted backend's auth endpoints.
//!
//! Sessions are persisted to [`LocalStorage`] under the project's
//! `sb-<ref>-auth-token` key, in the same layout the backend's JavaScript SDK
//! writes, so the token cache's storage scan finds them.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

use crate::config::SessionConfig;
use crate::domain::{AuthEvent, Session};
use crate::error::{ProviderError, SessionResult};
use crate::traits::{
    Headers, HttpClient, IdentityProvider, LocalStorage, Response, Subscription,
};

/// Token endpoint response (`POST /auth/v1/token`).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Unix timestamp of expiry, sent by newer backends
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: UserResponse,
}

/// User object (`GET /auth/v1/user`, and nested in token responses).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserResponse {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// What is written to local storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct PersistedSession {
    access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
    #[serde(default = "bearer")]
    token_type: String,
    user: UserResponse,
}

fn bearer() -> String {
    "bearer".to_string()
}

impl PersistedSession {
    fn to_session(&self) -> Session {
        Session {
            user_id: self.user.id.clone(),
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            expires_at: self.expires_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct JwtClaims {
    exp: i64,
}

/// Expiry (`exp` claim) of a JWT access token, without verifying it.
pub fn jwt_expires_at(access_token: &str) -> Option<i64> {
    let payload = URL_SAFE_NO_PAD.decode(access_token.split('.').nth(1)?).ok()?;
    let claims: JwtClaims = serde_json::from_slice(&payload).ok()?;
    Some(claims.exp)
}

/// Identity provider backed by `/auth/v1/*`.
///
/// Every session change (sign-in, refresh, sign-out) is persisted and then
/// broadcast to all live subscriptions.
pub struct RestIdentityProvider {
    http: Arc<dyn HttpClient>,
    storage: Arc<dyn LocalStorage>,
    base_url: String,
    anon_key: String,
    storage_key: String,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<AuthEvent>>>,
}

impl RestIdentityProvider {
    pub fn new(
        http: Arc<dyn HttpClient>,
        storage: Arc<dyn LocalStorage>,
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        storage_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            storage,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            storage_key: storage_key.into(),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn from_config(
        config: &SessionConfig,
        http: Arc<dyn HttpClient>,
        storage: Arc<dyn LocalStorage>,
    ) -> SessionResult<Self> {
        let (url, anon_key) = config.backend()?;
        Ok(Self::new(http, storage, url, anon_key, config.storage_key()?))
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Exchange email and password for a session.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let response = self.post_token("password", &body).await?;
        let session = self.store_token_response(response)?;
        tracing::info!("Signed in as {}", session.user_id);
        self.broadcast(AuthEvent::signed_in(session.clone()));
        Ok(session)
    }

    /// Trade the persisted refresh token for a fresh access token.
    ///
    /// A rejected refresh token ends the session.
    pub async fn refresh_session(&self) -> Result<Session, ProviderError> {
        self.refresh(true).await
    }

    /// Refresh, optionally announcing the new token as `TOKEN_REFRESHED`.
    ///
    /// The session check refreshes silently: its caller receives the new
    /// session as the return value, and a broadcast would make the event
    /// stream resolve the same identity a second time.
    async fn refresh(&self, broadcast: bool) -> Result<Session, ProviderError> {
        let refresh_token = self
            .load_persisted()?
            .and_then(|persisted| persisted.refresh_token)
            .ok_or(ProviderError::NoSession)?;

        let body = serde_json::json!({ "refresh_token": refresh_token });
        match self.post_token("refresh_token", &body).await {
            Ok(response) => {
                let session = self.store_token_response(response)?;
                tracing::debug!("Refreshed access token for {}", session.user_id);
                if broadcast {
                    self.broadcast(AuthEvent::token_refreshed(session.clone()));
                }
                Ok(session)
            }
            Err(err @ ProviderError::Unauthorized { .. }) => {
                tracing::info!("Refresh token rejected, ending session: {}", err);
                self.end_session()?;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    fn headers(&self, token: Option<&str>) -> Headers {
        let mut headers = Headers::new();
        headers.insert("apikey".to_string(), self.anon_key.clone());
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", token.unwrap_or(&self.anon_key)),
        );
        headers
    }

    async fn post_token(
        &self,
        grant_type: &str,
        body: &serde_json::Value,
    ) -> Result<TokenResponse, ProviderError> {
        let url = format!("{}/auth/v1/token?grant_type={}", self.base_url, grant_type);
        let mut headers = self.headers(None);
        headers.insert("Content-Type".to_string(), "application/json".to_string());

        let response = self
            .http
            .post(&url, &body.to_string(), &headers)
            .await?
            .error_for_status()?;
        Ok(response.json()?)
    }

    async fn fetch_user(&self, access_token: &str) -> Result<Response, ProviderError> {
        let url = format!("{}/auth/v1/user", self.base_url);
        Ok(self.http.get(&url, &self.headers(Some(access_token))).await?)
    }

    fn store_token_response(&self, response: TokenResponse) -> Result<Session, ProviderError> {
        let expires_at = response
            .expires_at
            .or_else(|| {
                response
                    .expires_in
                    .map(|secs| chrono::Utc::now().timestamp() + secs)
            })
            .or_else(|| jwt_expires_at(&response.access_token));

        let persisted = PersistedSession {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at,
            token_type: bearer(),
            user: response.user,
        };
        self.storage
            .set_item(&self.storage_key, &serde_json::to_string(&persisted)?)?;
        Ok(persisted.to_session())
    }

    fn load_persisted(&self) -> Result<Option<PersistedSession>, ProviderError> {
        let Some(raw) = self.storage.get_item(&self.storage_key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(persisted) => Ok(Some(persisted)),
            Err(err) => {
                tracing::warn!("Discarding unreadable persisted session: {}", err);
                self.storage.remove_item(&self.storage_key)?;
                Ok(None)
            }
        }
    }

    /// Remove the persisted session and tell subscribers.
    fn end_session(&self) -> Result<(), ProviderError> {
        let removed = self.storage.remove_item(&self.storage_key);
        self.broadcast(AuthEvent::signed_out());
        removed.map_err(ProviderError::from)
    }

    fn broadcast(&self, event: AuthEvent) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        tracing::trace!("{} delivered to {} subscriber(s)", event.kind, subscribers.len());
    }
}

#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    /// Validate the persisted session against `/auth/v1/user`, refreshing an
    /// expired or rejected access token when a refresh token is held.
    async fn get_current_session(&self) -> Result<Option<Session>, ProviderError> {
        let Some(persisted) = self.load_persisted()? else {
            return Ok(None);
        };
        let mut session = persisted.to_session();

        if session.is_expired() {
            if session.refresh_token.is_none() {
                self.storage.remove_item(&self.storage_key)?;
                return Ok(None);
            }
            session = match self.refresh(false).await {
                Ok(session) => session,
                Err(ProviderError::Unauthorized { .. }) => return Ok(None),
                Err(err) => return Err(err),
            };
        }

        let response = self.fetch_user(&session.access_token).await?;
        match response.status {
            401 | 403 if session.refresh_token.is_some() => match self.refresh(false).await {
                Ok(refreshed) => Ok(Some(refreshed)),
                Err(ProviderError::Unauthorized { .. }) => Ok(None),
                Err(err) => Err(err),
            },
            401 | 403 => {
                tracing::info!("Persisted session rejected by backend");
                self.storage.remove_item(&self.storage_key)?;
                Ok(None)
            }
            _ => {
                let user: UserResponse = response.error_for_status()?.json()?;
                session.user_id = user.id;
                Ok(Some(session))
            }
        }
    }

    fn subscribe(&self) -> Subscription {
        let (tx, subscription) = Subscription::channel();
        let current = match self.load_persisted() {
            Ok(persisted) => persisted.map(|persisted| persisted.to_session()),
            Err(err) => {
                tracing::warn!("Cannot read persisted session for replay: {}", err);
                None
            }
        };
        let _ = tx.send(AuthEvent::initial(current));
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        subscription
    }

    /// Revoke the session server-side, then clear it locally whatever the
    /// backend answered.
    ///
    /// An unreadable session cannot be revoked, but it is still cleared and
    /// `SIGNED_OUT` still reaches subscribers.
    async fn sign_out(&self) -> Result<(), ProviderError> {
        let revoked = match self.load_persisted() {
            Ok(Some(persisted)) => {
                let url = format!("{}/auth/v1/logout", self.base_url);
                let result = self
                    .http
                    .post(&url, "{}", &self.headers(Some(&persisted.access_token)))
                    .await
                    .map_err(ProviderError::from)
                    .and_then(|response| {
                        response.error_for_status().map_err(ProviderError::from)
                    });
                if let Err(err) = &result {
                    tracing::warn!(code = err.error_code(), "Logout request failed: {}", err);
                }
                result.map(|_| ())
            }
            Ok(None) => Ok(()),
            Err(err) => {
                tracing::warn!(
                    code = err.error_code(),
                    "Cannot read persisted session for logout: {}",
                    err
                );
                Err(err)
            }
        };

        self.end_session()?;
        tracing::info!("Signed out");
        revoked
    }
}

impl std::fmt::Debug for RestIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestIdentityProvider")
            .field("base_url", &self.base_url)
            .field("storage_key", &self.storage_key)
            .finish()
    }
}
