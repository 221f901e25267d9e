//! Error taxonomy for the synchronization engine.
//!
//! Errors fall into three layers:
//!
//! - [`RemoteError`]: what a remote source reports. Each variant is either
//!   transient (retrying may help) or permanent (retrying is futile).
//! - [`StoreError`]: what the local store reports. Never retried.
//! - [`SyncError`]: what the coordinator hands to callers inside a
//!   [`SyncOutcome::Error`](crate::outcome::SyncOutcome::Error).

use std::fmt;

use thiserror::Error;

/// Whether a failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Retrying may succeed (timeouts, 5xx, DNS/connect failures).
    Transient,
    /// Retrying is futile (4xx, malformed data).
    Permanent,
}

/// Failures reported by a remote source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The connection could not be established (DNS, refused, reset).
    #[error("connection failed: {0}")]
    Connect(String),

    /// The server answered with a 5xx status.
    #[error("server error: HTTP {status}")]
    Server { status: u16 },

    /// The server rejected the request with a 4xx status.
    #[error("client error: HTTP {status}")]
    Client { status: u16 },

    /// The response could not be decoded.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Any other failure, with an explicit classification.
    #[error("{message}")]
    Other { message: String, transient: bool },
}

impl RemoteError {
    /// Map a non-success HTTP status to an error.
    ///
    /// Returns `None` for 1xx/2xx/3xx statuses.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            400..=499 => Some(Self::Client { status }),
            500..=599 => Some(Self::Server { status }),
            _ => None,
        }
    }

    /// Create a transient error with a free-form message.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            transient: true,
        }
    }

    /// Create a permanent error with a free-form message.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            transient: false,
        }
    }

    /// Default classification of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Timeout | Self::Connect(_) | Self::Server { .. } => ErrorClass::Transient,
            // 408 and 429 are the client errors worth retrying
            Self::Client { status } if *status == 408 || *status == 429 => ErrorClass::Transient,
            Self::Client { .. } | Self::Malformed(_) => ErrorClass::Permanent,
            Self::Other { transient, .. } => {
                if *transient {
                    ErrorClass::Transient
                } else {
                    ErrorClass::Permanent
                }
            }
        }
    }

    /// Returns true if retrying may succeed.
    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::Timeout;
        }
        if e.is_connect() {
            return Self::Connect(e.to_string());
        }
        if e.is_decode() {
            return Self::Malformed(e.to_string());
        }
        if let Some(err) = e.status().and_then(|s| Self::from_status(s.as_u16())) {
            return err;
        }
        if e.is_builder() {
            return Self::permanent(e.to_string());
        }
        Self::transient(e.to_string())
    }
}

/// Failures reported by the local store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error reading or writing the backing file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored table could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The stored table contains an entry that cannot be understood.
    #[error("corrupt entry '{key}': {reason}")]
    Corrupt { key: String, reason: String },

    /// Backend-specific error.
    #[error("store error: {0}")]
    Backend(String),
}

/// Error attached to a terminal [`SyncOutcome::Error`](crate::outcome::SyncOutcome::Error).
#[derive(Debug, Error)]
pub enum SyncError {
    /// The network was unreachable when the fetch decision was made.
    #[error("no network connectivity")]
    NoConnectivity,

    /// The remote source kept failing with retryable errors until attempts ran out.
    #[error("remote source unavailable: {0}")]
    TransientRemote(#[source] RemoteError),

    /// The remote source failed with a non-retryable error.
    #[error("remote source rejected request: {0}")]
    PermanentRemote(#[source] RemoteError),

    /// The local store failed to read or save.
    #[error("local storage fault: {0}")]
    LocalStorageFault(#[from] StoreError),

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,
}

impl SyncError {
    /// Comparable tag for this error.
    pub fn kind(&self) -> SyncErrorKind {
        match self {
            Self::NoConnectivity => SyncErrorKind::NoConnectivity,
            Self::TransientRemote(_) => SyncErrorKind::TransientRemote,
            Self::PermanentRemote(_) => SyncErrorKind::PermanentRemote,
            Self::LocalStorageFault(_) => SyncErrorKind::LocalStorageFault,
            Self::Cancelled => SyncErrorKind::Cancelled,
        }
    }

    /// The remote error behind this failure, if any.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            Self::TransientRemote(e) | Self::PermanentRemote(e) => Some(e),
            _ => None,
        }
    }
}

/// Error tags ordered by severity (least severe first).
///
/// The ordering is used to pick the worst failure out of a bulk refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SyncErrorKind {
    Cancelled,
    NoConnectivity,
    TransientRemote,
    PermanentRemote,
    LocalStorageFault,
}

impl SyncErrorKind {
    /// Short name for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::NoConnectivity => "no-connectivity",
            Self::TransientRemote => "transient-remote",
            Self::PermanentRemote => "permanent-remote",
            Self::LocalStorageFault => "local-storage-fault",
        }
    }
}

impl fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_classification() {
        assert_eq!(RemoteError::Timeout.class(), ErrorClass::Transient);
        assert_eq!(
            RemoteError::Connect("refused".into()).class(),
            ErrorClass::Transient
        );
        assert_eq!(
            RemoteError::Server { status: 503 }.class(),
            ErrorClass::Transient
        );
        assert_eq!(
            RemoteError::Client { status: 404 }.class(),
            ErrorClass::Permanent
        );
        assert_eq!(
            RemoteError::Malformed("eof".into()).class(),
            ErrorClass::Permanent
        );
    }

    #[test]
    fn test_rate_limit_is_transient() {
        assert!(RemoteError::Client { status: 429 }.is_transient());
        assert!(RemoteError::Client { status: 408 }.is_transient());
        assert!(!RemoteError::Client { status: 401 }.is_transient());
    }

    #[test]
    fn test_from_status() {
        assert_eq!(RemoteError::from_status(200), None);
        assert_eq!(RemoteError::from_status(304), None);
        assert_eq!(
            RemoteError::from_status(404),
            Some(RemoteError::Client { status: 404 })
        );
        assert_eq!(
            RemoteError::from_status(502),
            Some(RemoteError::Server { status: 502 })
        );
    }

    #[test]
    fn test_other_uses_flag() {
        assert!(RemoteError::transient("flaky").is_transient());
        assert!(!RemoteError::permanent("bad key").is_transient());
    }

    #[test]
    fn test_sync_error_kind() {
        assert_eq!(SyncError::NoConnectivity.kind(), SyncErrorKind::NoConnectivity);
        assert_eq!(
            SyncError::TransientRemote(RemoteError::Timeout).kind(),
            SyncErrorKind::TransientRemote
        );
        let store: SyncError = StoreError::Backend("disk full".into()).into();
        assert_eq!(store.kind(), SyncErrorKind::LocalStorageFault);
    }

    #[test]
    fn test_kind_severity_ordering() {
        assert!(SyncErrorKind::LocalStorageFault > SyncErrorKind::PermanentRemote);
        assert!(SyncErrorKind::PermanentRemote > SyncErrorKind::TransientRemote);
        assert!(SyncErrorKind::TransientRemote > SyncErrorKind::NoConnectivity);
        assert!(SyncErrorKind::NoConnectivity > SyncErrorKind::Cancelled);
    }

    #[test]
    fn test_sync_error_display() {
        let err = SyncError::TransientRemote(RemoteError::Server { status: 503 });
        assert_eq!(
            err.to_string(),
            "remote source unavailable: server error: HTTP 503"
        );
        assert_eq!(SyncError::NoConnectivity.to_string(), "no network connectivity");
    }

    #[test]
    fn test_store_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: StoreError = io_err.into();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
