//! Typed outcome returned by every sync operation.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::retry::{classify_http_status, SyncRetryClass};

/// Boxed underlying cause kept for diagnostics.
pub type FailureCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result of a sync operation. `Ok` carries the operation's value (unit for
/// all write operations).
pub type SyncOutcome<T = ()> = std::result::Result<T, SyncFailure>;

/// Failure classes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncErrorKind {
    /// No usable credential. The user must authorize again; retrying is pointless.
    PermissionDenied,
    /// The remote answered and rejected the request, or an expected record was absent.
    ApiError,
    /// Transport fault or unexpected error. Safe to retry later.
    UnknownError,
}

impl SyncErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncErrorKind::PermissionDenied => "permission_denied",
            SyncErrorKind::ApiError => "api_error",
            SyncErrorKind::UnknownError => "unknown_error",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            SyncErrorKind::PermissionDenied => "Permission denied",
            SyncErrorKind::ApiError => "API error",
            SyncErrorKind::UnknownError => "Unknown error",
        }
    }
}

impl fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A failed sync operation.
#[derive(Debug)]
pub struct SyncFailure {
    kind: SyncErrorKind,
    message: Option<String>,
    status: Option<u16>,
    cause: Option<FailureCause>,
}

impl SyncFailure {
    pub fn new(kind: SyncErrorKind, message: Option<String>, cause: Option<FailureCause>) -> Self {
        Self {
            kind,
            message,
            status: None,
            cause,
        }
    }

    /// Credential unavailable or unusable.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::PermissionDenied, Some(message.into()), None)
    }

    /// Remote rejection or business mismatch (e.g. no entry for a date).
    pub fn api(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::ApiError, Some(message.into()), None)
    }

    /// Transport fault or unexpected error, wrapping its cause.
    pub fn unknown(cause: impl Into<FailureCause>) -> Self {
        Self::new(SyncErrorKind::UnknownError, None, Some(cause.into()))
    }

    /// Attach the HTTP status that produced this failure.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Replace the message, e.g. to add batch context.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach an underlying cause.
    pub fn with_cause(mut self, cause: impl Into<FailureCause>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn kind(&self) -> SyncErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// How a caller should react to this failure.
    pub fn retry_class(&self) -> SyncRetryClass {
        match self.kind {
            SyncErrorKind::PermissionDenied => SyncRetryClass::ReauthRequired,
            SyncErrorKind::ApiError => self
                .status
                .map(classify_http_status)
                .unwrap_or(SyncRetryClass::Permanent),
            SyncErrorKind::UnknownError => SyncRetryClass::Retryable,
        }
    }
}

impl fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.message, &self.cause) {
            (Some(message), _) => write!(f, "{}: {}", self.kind, message),
            (None, Some(cause)) => write!(f, "{}: {}", self.kind, cause),
            (None, None) => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for SyncFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn message_is_preferred_over_cause_in_display() {
        let failure = SyncFailure::api("2 of 3 measurements failed to sync");
        assert_eq!(
            failure.to_string(),
            "API error: 2 of 3 measurements failed to sync"
        );
    }

    #[test]
    fn unknown_failure_shows_and_exposes_its_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        let failure = SyncFailure::unknown(io);
        assert_eq!(failure.kind(), SyncErrorKind::UnknownError);
        assert_eq!(failure.to_string(), "Unknown error: connection refused");
        assert!(failure.source().is_some());
        assert_eq!(failure.retry_class(), SyncRetryClass::Retryable);
    }

    #[test]
    fn api_failure_retry_class_follows_status() {
        let throttled = SyncFailure::api("slow down").with_status(429);
        assert_eq!(throttled.retry_class(), SyncRetryClass::Retryable);

        let rejected = SyncFailure::api("duplicate").with_status(400);
        assert_eq!(rejected.retry_class(), SyncRetryClass::Permanent);

        let missing = SyncFailure::api("no entry found for date: x");
        assert_eq!(missing.retry_class(), SyncRetryClass::Permanent);
    }

    #[test]
    fn with_message_keeps_kind_and_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let failure = SyncFailure::unknown(io).with_message("full sync aborted at item 2 of 5");
        assert_eq!(failure.kind(), SyncErrorKind::UnknownError);
        assert_eq!(failure.message(), Some("full sync aborted at item 2 of 5"));
        assert!(failure.source().is_some());
    }

    #[test]
    fn permission_denied_requires_reauth() {
        let failure = SyncFailure::permission_denied("not authorized");
        assert_eq!(failure.retry_class(), SyncRetryClass::ReauthRequired);
        assert_eq!(failure.kind().as_str(), "permission_denied");
    }
}
