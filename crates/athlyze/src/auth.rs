//! OAuth token management for the Athlyze API.
//!
//! The initial authorization (authorization-code flow in a browser) happens
//! outside this crate; its result is handed to [`TokenProvider::authorize`]
//! as a [`Credential`]. From then on the provider hands out access tokens,
//! refreshing them with the `refresh_token` grant when they expire.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use scalesync_core::secrets::SecretStore;

use crate::error::AuthError;

/// Store key holding the JSON-encoded [`Credential`].
pub const AUTH_STATE_KEY: &str = "athlyze_auth_state";

pub const DEFAULT_CLIENT_ID: &str = "openscale-sync";
pub const DEFAULT_SCOPE: &str = "openid profile email offline_access";

/// Seconds before actual expiry to treat a token as expired (clock skew / latency).
const TOKEN_EXPIRY_BUFFER_SECS: i64 = 60;
/// TTL assumed when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_TTL_SECS: i64 = 60 * 60;
const REFRESH_TIMEOUT_SECS: u64 = 10;

/// Where and as whom tokens are refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationMetadata {
    pub token_endpoint: String,
    pub client_id: String,
    #[serde(default)]
    pub scope: Option<String>,
}

impl AuthorizationMetadata {
    /// Metadata for the public `openscale-sync` client.
    pub fn for_token_endpoint(token_endpoint: impl Into<String>) -> Self {
        Self {
            token_endpoint: token_endpoint.into(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            scope: Some(DEFAULT_SCOPE.to_string()),
        }
    }
}

/// Access token plus refresh material. Replaced wholesale on every refresh.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub authorization: AuthorizationMetadata,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl Credential {
    /// True when the access token is missing or about to expire.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        if self.access_token.is_empty() {
            return true;
        }
        match self.expires_at {
            Some(expires_at) => {
                now + chrono::Duration::seconds(TOKEN_EXPIRY_BUFFER_SECS) >= expires_at
            }
            None => false,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .field("authorization", &self.authorization)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    token_type: Option<String>,
    scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
}

/// Hands out valid access tokens, refreshing them on demand.
///
/// Refresh runs under a write lock so concurrent callers sharing a provider
/// trigger at most one refresh; reads of a still-valid token only take the
/// read lock.
pub struct TokenProvider {
    store: Arc<dyn SecretStore>,
    client: reqwest::Client,
    cache: RwLock<Option<Credential>>,
}

impl TokenProvider {
    pub fn new(store: Arc<dyn SecretStore>) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REFRESH_TIMEOUT_SECS))
            .build()
            .map_err(AuthError::ClientBuild)?;
        Ok(Self {
            store,
            client,
            cache: RwLock::new(None),
        })
    }

    /// Store a credential obtained from the authorization-code exchange.
    pub async fn authorize(&self, credential: Credential) -> Result<(), AuthError> {
        let mut cache = self.cache.write().await;
        self.persist(&credential)?;
        *cache = Some(credential);
        Ok(())
    }

    /// Whether an authorization state exists (it may still fail to refresh).
    pub async fn is_authorized(&self) -> bool {
        if self.cache.read().await.is_some() {
            return true;
        }
        matches!(self.load_stored(), Ok(Some(_)))
    }

    /// Forget the authorization state, in memory and in the store.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let mut cache = self.cache.write().await;
        *cache = None;
        self.store.delete_secret(AUTH_STATE_KEY)?;
        Ok(())
    }

    /// Await a valid credential, then run `action` with it.
    ///
    /// If no valid credential can be produced the action is not invoked and
    /// the refresh failure is returned.
    pub async fn with_fresh_credential<F, Fut, T>(&self, action: F) -> Result<T, AuthError>
    where
        F: FnOnce(Credential) -> Fut,
        Fut: Future<Output = T>,
    {
        let credential = self.fresh_credential().await?;
        Ok(action(credential).await)
    }

    /// Return a valid credential, refreshing (and persisting) it if needed.
    pub async fn fresh_credential(&self) -> Result<Credential, AuthError> {
        // Fast path: check cache under a read lock.
        {
            let cache = self.cache.read().await;
            if let Some(ref cached) = *cache {
                if !cached.needs_refresh(Utc::now()) {
                    return Ok(cached.clone());
                }
            }
        }

        // Slow path: acquire write lock, double-check, then refresh.
        let mut cache = self.cache.write().await;
        let current = match cache.clone() {
            Some(cached) => cached,
            None => self.load_stored()?.ok_or(AuthError::Unauthenticated)?,
        };
        if !current.needs_refresh(Utc::now()) {
            *cache = Some(current.clone());
            return Ok(current);
        }

        let refreshed = self.refresh(&current).await?;
        self.persist(&refreshed)?;
        *cache = Some(refreshed.clone());
        Ok(refreshed)
    }

    fn load_stored(&self) -> Result<Option<Credential>, AuthError> {
        match self.store.get_secret(AUTH_STATE_KEY)? {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| AuthError::Malformed(e.to_string())),
            None => Ok(None),
        }
    }

    fn persist(&self, credential: &Credential) -> Result<(), AuthError> {
        let json =
            serde_json::to_string(credential).map_err(|e| AuthError::Malformed(e.to_string()))?;
        self.store.set_secret(AUTH_STATE_KEY, &json)?;
        Ok(())
    }

    async fn refresh(&self, current: &Credential) -> Result<Credential, AuthError> {
        let refresh_token = current
            .refresh_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::Unauthenticated)?;
        let metadata = &current.authorization;

        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", metadata.client_id.as_str()),
        ];
        if let Some(scope) = metadata.scope.as_deref() {
            params.push(("scope", scope));
        }

        debug!("[AthlyzeAuth] Refreshing access token");
        let response = self
            .client
            .post(&metadata.token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(AuthError::RefreshNetwork)?;

        let status = response.status();
        let body = response.text().await.map_err(AuthError::RefreshNetwork)?;

        if !status.is_success() {
            let message = serde_json::from_str::<OAuthErrorResponse>(&body)
                .ok()
                .and_then(|err| err.error_description.or(err.error))
                .unwrap_or_else(|| "Unknown error".to_string());
            error!(
                "[AthlyzeAuth] Token refresh failed with status {}: {}",
                status, message
            );
            return Err(AuthError::RefreshRejected {
                status: status.as_u16(),
                message,
            });
        }

        let token_response: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| AuthError::Malformed(format!("token response: {}", e)))?;

        let ttl = token_response.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS);
        let authorization = AuthorizationMetadata {
            scope: token_response.scope.or_else(|| metadata.scope.clone()),
            ..metadata.clone()
        };

        debug!("[AthlyzeAuth] Access token refreshed (TTL {}s)", ttl);
        Ok(Credential {
            access_token: token_response.access_token,
            // Servers that do not rotate refresh tokens omit the field.
            refresh_token: token_response
                .refresh_token
                .or_else(|| current.refresh_token.clone()),
            expires_at: Some(Utc::now() + chrono::Duration::seconds(ttl)),
            token_type: token_response
                .token_type
                .unwrap_or_else(|| current.token_type.clone()),
            authorization,
        })
    }
}
