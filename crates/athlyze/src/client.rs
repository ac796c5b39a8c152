//! HTTP client for the Athlyze measurement API.
//!
//! Every call carries the caller's bearer token. Non-2xx responses become
//! [`AthlyzeError::Api`] with the status and a best-effort message from the
//! body; only transport faults and undecodable payloads surface as
//! [`AthlyzeError::Http`] / [`AthlyzeError::Json`].

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;

use crate::config::DEFAULT_TIMEOUT_SECS;
use crate::error::{AthlyzeError, AuthError, Result};
use crate::types::{extract_error_message, EntryPage, RemoteEntry};

const MAX_LOG_BODY_CHARS: usize = 512;
const MEASUREMENTS_PATH: &str = "measurements";

/// Remote operations the sync engine relies on.
#[async_trait]
pub trait MeasurementApi: Send + Sync {
    /// GET measurements (first page, insertion order)
    async fn list_entries(&self, token: &str) -> Result<EntryPage>;

    /// GET measurements/get-by-date?date={date}
    async fn entries_by_date(&self, token: &str, date: &str) -> Result<EntryPage>;

    /// POST measurements
    async fn insert(&self, token: &str, entry: &RemoteEntry) -> Result<()>;

    /// PUT measurements/{id}
    async fn update(&self, token: &str, id: i64, entry: &RemoteEntry) -> Result<()>;

    /// DELETE measurements/{id}
    async fn delete(&self, token: &str, id: i64) -> Result<()>;
}

/// Trim a base URL and make sure it ends with a path separator.
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AthlyzeError::invalid_request("Athlyze server URL must not be empty"));
    }
    if trimmed.ends_with('/') {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{}/", trimmed))
    }
}

/// Client for the Athlyze REST API.
#[derive(Debug, Clone)]
pub struct AthlyzeClient {
    client: reqwest::Client,
    base_url: String,
}

impl AthlyzeClient {
    /// Create a client with the default request timeout.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API root, e.g. "https://athlyze.de/api/v1/"
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn entry_url(&self, id: i64) -> String {
        self.url(&format!("{}/{}", MEASUREMENTS_PATH, id))
    }

    /// Create headers for an API request.
    fn headers(&self, token: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| {
                AuthError::Malformed("access token is not a valid header value".to_string())
            })?;
        headers.insert(AUTHORIZATION, auth_value);

        Ok(headers)
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("[Athlyze] API response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("[Athlyze] API response error ({}): {}", status, preview);
    }

    fn api_error(status: reqwest::StatusCode, body: &str) -> AthlyzeError {
        AthlyzeError::api(status.as_u16(), extract_error_message(body))
    }

    /// Parse a JSON response body.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            return Err(Self::api_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            log::error!("[Athlyze] Failed to deserialize response: {}", e);
            AthlyzeError::from(e)
        })
    }

    /// Check a response whose success body (if any) is irrelevant.
    async fn expect_success(response: reqwest::Response) -> Result<()> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            return Err(Self::api_error(status, &body));
        }
        Ok(())
    }
}

#[async_trait]
impl MeasurementApi for AthlyzeClient {
    async fn list_entries(&self, token: &str) -> Result<EntryPage> {
        let url = self.url(MEASUREMENTS_PATH);

        let response = self
            .client
            .get(&url)
            .headers(self.headers(token)?)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn entries_by_date(&self, token: &str, date: &str) -> Result<EntryPage> {
        let url = self.url(&format!("{}/get-by-date", MEASUREMENTS_PATH));
        debug!("[Athlyze] Looking up entries for date {}", date);

        let response = self
            .client
            .get(&url)
            .headers(self.headers(token)?)
            .query(&[("date", date)])
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn insert(&self, token: &str, entry: &RemoteEntry) -> Result<()> {
        let url = self.url(MEASUREMENTS_PATH);

        let response = self
            .client
            .post(&url)
            .headers(self.headers(token)?)
            .json(entry)
            .send()
            .await?;

        Self::expect_success(response).await
    }

    async fn update(&self, token: &str, id: i64, entry: &RemoteEntry) -> Result<()> {
        let response = self
            .client
            .put(self.entry_url(id))
            .headers(self.headers(token)?)
            .json(entry)
            .send()
            .await?;

        Self::expect_success(response).await
    }

    async fn delete(&self, token: &str, id: i64) -> Result<()> {
        let response = self
            .client
            .delete(self.entry_url(id))
            .headers(self.headers(token)?)
            .send()
            .await?;

        Self::expect_success(response).await
    }
}
