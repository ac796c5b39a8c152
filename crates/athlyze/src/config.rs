//! Athlyze connection settings.
//!
//! The base URL resolves with priority: `ATHLYZE_API_URL` env var > value
//! persisted in the caller's store > built-in default.

use std::time::Duration;

use scalesync_core::secrets::SecretStore;

use crate::client::{normalize_base_url, AthlyzeClient};
use crate::error::Result;

/// Store key holding the configured API base URL.
pub const SERVER_KEY: &str = "athlyze_server";

pub const DEFAULT_SERVER_URL: &str = "https://athlyze.de/api/v1/";

const SERVER_URL_ENV: &str = "ATHLYZE_API_URL";

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AthlyzeConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for AthlyzeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVER_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl AthlyzeConfig {
    /// Load settings from the environment and the caller's store.
    pub fn load(store: &dyn SecretStore) -> Result<Self> {
        let stored = store.get_secret(SERVER_KEY)?;
        let env = std::env::var(SERVER_URL_ENV).ok();
        Ok(Self::resolve(env, stored))
    }

    fn resolve(env: Option<String>, stored: Option<String>) -> Self {
        let base_url = [env, stored]
            .into_iter()
            .flatten()
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

        Self {
            base_url,
            ..Self::default()
        }
    }

    /// Normalize and persist a new base URL. Takes effect on the next operation.
    pub fn set_base_url(store: &dyn SecretStore, base_url: &str) -> Result<String> {
        let normalized = normalize_base_url(base_url)?;
        store.set_secret(SERVER_KEY, &normalized)?;
        Ok(normalized)
    }

    pub fn build_client(&self) -> Result<AthlyzeClient> {
        AthlyzeClient::with_timeout(&self.base_url, self.request_timeout)
    }
}
