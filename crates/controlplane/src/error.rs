//! Error types for Control Plane operations.
//!
//! Every failure the client can produce is classified into an
//! [`ErrorCategory`]. Categories tell a caller whether retrying the same
//! request could help and what kind of feedback is appropriate. The client
//! itself never retries.

use crate::registry::EntityKind;
use std::fmt;
use std::io;

/// Result type alias for Control Plane operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of Control Plane errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The remote host could not be reached, or the call was cut short.
    Transport,
    /// The remote API answered with a non-2xx status.
    RemoteStatus,
    /// A 2xx body matched none of the accepted shapes.
    Decode,
    /// The resource does not exist remotely.
    NotFound,
    /// Local reconciliation rules were violated.
    Reconcile,
    /// Missing or invalid provider settings.
    Config,
}

impl ErrorCategory {
    /// Whether the same request could succeed if sent again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Transport => "Could not reach the Control Plane",
            Self::RemoteStatus => "Control Plane rejected the request",
            Self::Decode => "Unexpected response from the Control Plane",
            Self::NotFound => "Resource not found",
            Self::Reconcile => "Reconciliation rule violated",
            Self::Config => "Invalid configuration",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Transport => "Check connectivity and the base URL, then try again",
            Self::RemoteStatus => "Inspect the response body and the diagnostic log for details",
            Self::Decode => "The API contract may have changed; check the diagnostic log",
            Self::NotFound => "Refresh state or import the resource again",
            Self::Reconcile => "Review the planned change; it may need a replacement",
            Self::Config => "Set KUBIYA_CONTROL_PLANE_API_KEY and KUBIYA_CONTROL_PLANE_ORG_ID",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// What went wrong below the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// The request timed out.
    Timeout,
    /// Host lookup or connection failed.
    Connect,
    /// Socket or TLS I/O failed mid-request.
    Io,
    /// Anything else the HTTP client reported.
    Other,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Io => "io",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during Control Plane operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request never produced a response.
    #[error("request failed ({kind}): {message}")]
    Transport {
        /// Failure class.
        kind: TransportKind,
        /// Error message from the HTTP client.
        message: String,
    },

    /// The caller cancelled the call or its deadline passed.
    #[error("request cancelled: {reason}")]
    Cancelled {
        /// Why the call stopped.
        reason: String,
    },

    /// The remote API answered with a non-2xx status.
    ///
    /// `body` is the raw response body, unredacted.
    #[error("API error (status {status}): {body}")]
    RemoteStatus {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// A 2xx body could not be decoded.
    #[error("invalid API response: {message}")]
    Decode {
        /// Decoder message.
        message: String,
    },

    /// The resource no longer exists remotely.
    #[error("{kind} '{identity}' not found")]
    NotFound {
        /// Entity kind.
        kind: EntityKind,
        /// Requested identity.
        identity: String,
    },

    /// An update returned a record with a different identity.
    #[error("{kind} identity changed from '{before}' to '{after}'")]
    IdentityChanged {
        /// Entity kind.
        kind: EntityKind,
        /// Identity before the update.
        before: String,
        /// Identity the response carried.
        after: String,
    },

    /// A record carries no usable identity.
    #[error("{kind} record has no identity")]
    MissingIdentity {
        /// Entity kind.
        kind: EntityKind,
    },

    /// The change touches fields that cannot be updated in place.
    #[error("{kind} cannot change {} in place", .fields.join(", "))]
    RequiresReplacement {
        /// Entity kind.
        kind: EntityKind,
        /// Offending fields.
        fields: Vec<String>,
    },

    /// A scoped kind was used without its parent identity.
    #[error("{kind} requires {field}")]
    MissingScope {
        /// Entity kind.
        kind: EntityKind,
        /// Name of the parent scope field.
        field: &'static str,
    },

    /// Provider settings are missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a transport error.
    pub fn transport(kind: TransportKind, message: impl Into<String>) -> Self {
        Self::Transport {
            kind,
            message: message.into(),
        }
    }

    /// Create a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a cancellation error.
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled {
            reason: reason.into(),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Transport { .. } | Error::Cancelled { .. } => ErrorCategory::Transport,
            Error::RemoteStatus { .. } => ErrorCategory::RemoteStatus,
            Error::Decode { .. } => ErrorCategory::Decode,
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::IdentityChanged { .. }
            | Error::MissingIdentity { .. }
            | Error::RequiresReplacement { .. }
            | Error::MissingScope { .. } => ErrorCategory::Reconcile,
            Error::Config(_) => ErrorCategory::Config,
        }
    }

    /// Whether the same request could succeed if sent again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Whether the call was stopped by its caller.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }

    /// Whether this error means the resource is absent.
    ///
    /// True for a logical NotFound and for a remote 404.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NotFound { .. } | Error::RemoteStatus { status: 404, .. }
        )
    }

    /// HTTP status code, if the remote API answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::RemoteStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        let kind = match &err {
            ureq::Error::Timeout(_) => TransportKind::Timeout,
            ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => TransportKind::Connect,
            ureq::Error::Io(_) => TransportKind::Io,
            _ => TransportKind::Other,
        };
        Self::transport(kind, err.to_string())
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::TimedOut => TransportKind::Timeout,
            io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset => {
                TransportKind::Connect
            }
            _ => TransportKind::Io,
        };
        Self::transport(kind, err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::Transport.is_retryable());
        assert!(!ErrorCategory::RemoteStatus.is_retryable());
        assert!(!ErrorCategory::Decode.is_retryable());
        assert!(!ErrorCategory::NotFound.is_retryable());
        assert!(!ErrorCategory::Reconcile.is_retryable());
        assert!(!ErrorCategory::Config.is_retryable());
    }

    #[test]
    fn test_error_category_description_and_advice() {
        for category in [
            ErrorCategory::Transport,
            ErrorCategory::RemoteStatus,
            ErrorCategory::Decode,
            ErrorCategory::NotFound,
            ErrorCategory::Reconcile,
            ErrorCategory::Config,
        ] {
            assert!(!category.description().is_empty());
            assert!(!category.advice().is_empty());
        }
    }

    #[test]
    fn test_cancelled_is_transport() {
        let err = Error::cancelled("deadline exceeded");
        assert_eq!(err.category(), ErrorCategory::Transport);
        assert!(err.is_cancelled());
        assert!(err.is_retryable());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_remote_status_keeps_raw_body() {
        let err = Error::RemoteStatus {
            status: 422,
            body: r#"{"detail":"api_key sk-abcdef is invalid"}"#.to_string(),
        };
        assert_eq!(err.status(), Some(422));
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("sk-abcdef"));
        assert!(err.to_string().contains("status 422"));
    }

    #[test]
    fn test_not_found_detection() {
        let remote = Error::RemoteStatus {
            status: 404,
            body: String::new(),
        };
        assert!(remote.is_not_found());

        let logical = Error::NotFound {
            kind: EntityKind::Worker,
            identity: "w1".to_string(),
        };
        assert!(logical.is_not_found());
        assert_eq!(logical.category(), ErrorCategory::NotFound);

        let other = Error::RemoteStatus {
            status: 500,
            body: String::new(),
        };
        assert!(!other.is_not_found());
    }

    #[test]
    fn test_requires_replacement_display() {
        let err = Error::RequiresReplacement {
            kind: EntityKind::WorkerQueue,
            fields: vec!["environment_id".to_string()],
        };
        assert_eq!(err.category(), ErrorCategory::Reconcile);
        assert!(err.to_string().contains("environment_id"));
    }

    #[test]
    fn test_error_from_io_error() {
        let err: Error = io::Error::new(io::ErrorKind::TimedOut, "slow").into();
        match err {
            Error::Transport { kind, .. } => assert_eq!(kind, TransportKind::Timeout),
            _ => panic!("Expected Error::Transport"),
        }
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: Error = json_err.into();
        assert_eq!(err.category(), ErrorCategory::Decode);
    }
}
