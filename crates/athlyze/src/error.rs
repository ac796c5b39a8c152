//! Error types for the Athlyze crate.

use scalesync_core::sync::{classify_http_status, SyncFailure, SyncRetryClass};
use thiserror::Error;

/// Result type alias for Athlyze operations.
pub type Result<T> = std::result::Result<T, AthlyzeError>;

/// Failures while obtaining a usable credential.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No authorization was ever stored, or it was signed out.
    #[error("Not authorized with Athlyze. Please connect your account first.")]
    Unauthenticated,

    /// The HTTP client for the token endpoint could not be built.
    #[error("Failed to build token client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// The token endpoint could not be reached.
    #[error("Failed to refresh token: {0}")]
    RefreshNetwork(#[source] reqwest::Error),

    /// The token endpoint refused the refresh grant (expired or revoked).
    #[error("Token refresh rejected ({status}): {message}")]
    RefreshRejected { status: u16, message: String },

    /// The caller-owned store failed.
    #[error("Authorization store error: {0}")]
    Store(#[from] scalesync_core::Error),

    /// Stored or received authorization state could not be decoded.
    #[error("Malformed authorization state: {0}")]
    Malformed(String),
}

/// Errors that can occur while talking to the Athlyze API.
#[derive(Debug, Error)]
pub enum AthlyzeError {
    /// HTTP client error (DNS, connection, timeout)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API error response from the backend
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Invalid request (missing configuration, bad input)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Caller-owned settings store failed
    #[error("Settings store error: {0}")]
    Store(#[from] scalesync_core::Error),

    /// Credential could not be obtained
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl AthlyzeError {
    /// Create an API error from status and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// HTTP status if this is an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for faults of the channel rather than of the request.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Json(_))
    }

    /// Classify error for retry policy.
    pub fn retry_class(&self) -> SyncRetryClass {
        match self {
            Self::Api { status, .. } => classify_http_status(*status),
            Self::Http(_) => SyncRetryClass::Retryable,
            Self::Json(_) => SyncRetryClass::Permanent,
            Self::InvalidRequest(_) => SyncRetryClass::Permanent,
            Self::Store(_) => SyncRetryClass::Retryable,
            Self::Auth(AuthError::RefreshNetwork(_)) => SyncRetryClass::Retryable,
            Self::Auth(AuthError::ClientBuild(_)) => SyncRetryClass::Permanent,
            Self::Auth(_) => SyncRetryClass::ReauthRequired,
        }
    }
}

impl From<AthlyzeError> for SyncFailure {
    fn from(err: AthlyzeError) -> Self {
        match err {
            AthlyzeError::Auth(auth) => {
                SyncFailure::permission_denied(auth.to_string()).with_cause(auth)
            }
            AthlyzeError::Api { status, message } => {
                SyncFailure::api(format!("response error ({}): {}", status, message))
                    .with_status(status)
            }
            AthlyzeError::InvalidRequest(message) => SyncFailure::api(message),
            other => SyncFailure::unknown(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scalesync_core::sync::SyncErrorKind;

    #[test]
    fn retry_class_for_auth_error_is_reauth() {
        let err = AthlyzeError::api(401, "unauthorized");
        assert_eq!(err.retry_class(), SyncRetryClass::ReauthRequired);

        let err = AthlyzeError::from(AuthError::Unauthenticated);
        assert_eq!(err.retry_class(), SyncRetryClass::ReauthRequired);
    }

    #[test]
    fn auth_errors_become_permission_denied() {
        let failure: SyncFailure = AthlyzeError::from(AuthError::RefreshRejected {
            status: 400,
            message: "invalid_grant".to_string(),
        })
        .into();
        assert_eq!(failure.kind(), SyncErrorKind::PermissionDenied);
        assert!(failure.to_string().contains("invalid_grant"));
    }

    #[test]
    fn api_errors_keep_status_and_body() {
        let failure: SyncFailure = AthlyzeError::api(409, r#"{"detail":"duplicate"}"#).into();
        assert_eq!(failure.kind(), SyncErrorKind::ApiError);
        assert_eq!(failure.status(), Some(409));
        assert!(failure.to_string().contains("duplicate"));
    }

    #[test]
    fn unusable_access_token_is_a_credential_fault() {
        let err = AthlyzeError::from(AuthError::Malformed(
            "access token is not a valid header value".to_string(),
        ));
        assert!(!err.is_transport());
        assert_eq!(err.retry_class(), SyncRetryClass::ReauthRequired);
        let failure: SyncFailure = err.into();
        assert_eq!(failure.kind(), SyncErrorKind::PermissionDenied);
    }

    #[test]
    fn json_errors_are_transport_faults() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = AthlyzeError::from(json_err);
        assert!(err.is_transport());
        let failure: SyncFailure = err.into();
        assert_eq!(failure.kind(), SyncErrorKind::UnknownError);
    }
}
