//! Error types for Confluence operations.
//!
//! Every failure maps onto a [`provision::ErrorKind`] so the orchestrator
//! can decide whether to resolve, retry, record or abort. The HTTP status
//! and response body heuristics live in [`classify`].

use provision::{ClientError, ErrorKind};
use std::io;

/// Result type alias for Confluence operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Body fragments Confluence uses to report duplicate resources.
///
/// Spaces answer "A space with key X already exists", groups "must be
/// unique", and content "A page with this title already exists: A page
/// already exists with the same TITLE in this space".
const DUPLICATE_MARKERS: [&str; 3] = ["already exists", "must be unique", "same title"];

/// Errors that can occur while talking to Confluence.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required connection setting is absent or empty.
    #[error("missing configuration: {0} is not set")]
    MissingConfig(&'static str),

    /// The base URL is not an http(s) URL.
    #[error("invalid base URL '{0}': expected http:// or https://")]
    InvalidUrl(String),

    /// The service answered with a non-success status.
    #[error("HTTP {status} from {endpoint}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Endpoint path below the REST API root.
        endpoint: String,
        /// Message extracted from the response body.
        message: String,
    },

    /// The request did not complete within the configured timeout.
    #[error("request to {endpoint} timed out")]
    Timeout {
        /// Endpoint path below the REST API root.
        endpoint: String,
    },

    /// The service could not be reached at all.
    #[error("could not connect to {endpoint}: {message}")]
    Connection {
        /// Endpoint path below the REST API root.
        endpoint: String,
        /// Transport error message.
        message: String,
    },

    /// Any other transport failure.
    #[error("request to {endpoint} failed: {message}")]
    Transport {
        /// Endpoint path below the REST API root.
        endpoint: String,
        /// Transport error message.
        message: String,
        /// Whether the failure is worth one retry.
        retryable: bool,
    },

    /// A success response could not be decoded.
    #[error("invalid API response from {endpoint}: {message}")]
    InvalidResponse {
        /// Endpoint path below the REST API root.
        endpoint: String,
        /// Decoding error message.
        message: String,
    },
}

impl Error {
    /// Classify a `ureq` transport failure for `endpoint`.
    pub fn transport(endpoint: &str, err: ureq::Error) -> Self {
        let endpoint = endpoint.to_string();
        match err {
            ureq::Error::StatusCode(status) => Self::Status {
                status,
                endpoint,
                message: String::new(),
            },
            ureq::Error::Timeout(_) => Self::Timeout { endpoint },
            err @ (ureq::Error::HostNotFound | ureq::Error::ConnectionFailed) => {
                Self::Connection {
                    endpoint,
                    message: err.to_string(),
                }
            }
            ureq::Error::Io(io_err) => match io_err.kind() {
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::Timeout { endpoint },
                io::ErrorKind::ConnectionRefused
                | io::ErrorKind::NotConnected
                | io::ErrorKind::AddrNotAvailable => Self::Connection {
                    endpoint,
                    message: io_err.to_string(),
                },
                _ => Self::Transport {
                    endpoint,
                    message: io_err.to_string(),
                    retryable: true,
                },
            },
            other => Self::Transport {
                endpoint,
                message: other.to_string(),
                retryable: false,
            },
        }
    }

    /// Get the provisioning error kind for this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingConfig(_) | Self::InvalidUrl(_) | Self::Connection { .. } => {
                ErrorKind::FatalTransport
            }
            Self::Status {
                status, message, ..
            } => classify(*status, message),
            Self::Timeout { .. } => ErrorKind::Transient,
            Self::Transport { retryable, .. } => {
                if *retryable {
                    ErrorKind::Transient
                } else {
                    ErrorKind::Permanent
                }
            }
            Self::InvalidResponse { .. } => ErrorKind::Permanent,
        }
    }

    /// HTTP status code, if the service answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Get actionable advice for resolving this error.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::MissingConfig(_) => {
                "Set CONFLUENCE_URL, CONFLUENCE_EMAIL and CONFLUENCE_API_TOKEN"
            }
            Self::InvalidUrl(_) => "Use the site URL, e.g. https://your-site.atlassian.net",
            Self::Status { status: 401, .. } => "Check the account email and API token",
            Self::Status { status: 403, .. } => "The account lacks permission for this operation",
            Self::Connection { .. } => "Check the site URL and your network connection",
            Self::Timeout { .. } => "The service is slow; try again or raise timeout_secs",
            _ => "Check the error details for more information",
        }
    }
}

/// Classify an HTTP error response.
///
/// Duplicate markers in a 4xx body win over the status code because
/// Confluence reports most duplicates as a plain 400.
#[must_use]
pub fn classify(status: u16, body: &str) -> ErrorKind {
    if status == 409 || ((400..500).contains(&status) && is_duplicate(body)) {
        return ErrorKind::AlreadyExists;
    }
    match status {
        404 => ErrorKind::NotFound,
        408 | 429 | 500..=599 => ErrorKind::Transient,
        401 => ErrorKind::FatalTransport,
        _ => ErrorKind::Permanent,
    }
}

fn is_duplicate(body: &str) -> bool {
    let body = body.to_lowercase();
    DUPLICATE_MARKERS.iter().any(|marker| body.contains(marker))
}

impl From<Error> for ClientError {
    fn from(err: Error) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_conflict() {
        assert_eq!(classify(409, ""), ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_classify_duplicate_markers() {
        assert_eq!(
            classify(400, "A space with key ADMIN already exists"),
            ErrorKind::AlreadyExists
        );
        assert_eq!(
            classify(400, "Group name must be unique"),
            ErrorKind::AlreadyExists
        );
        assert_eq!(
            classify(
                400,
                "A page with this title already exists: \
                 A page already exists with the same TITLE in this space"
            ),
            ErrorKind::AlreadyExists
        );
        assert_eq!(
            classify(403, "com.atlassian: Same Title is forbidden"),
            ErrorKind::AlreadyExists
        );
    }

    #[test]
    fn test_classify_markers_ignored_on_server_errors() {
        assert_eq!(classify(500, "already exists"), ErrorKind::Transient);
    }

    #[test]
    fn test_classify_not_found() {
        assert_eq!(classify(404, "No space with key : NOPE"), ErrorKind::NotFound);
    }

    #[test]
    fn test_classify_transient() {
        for status in [408, 429, 500, 502, 503, 504] {
            assert_eq!(classify(status, ""), ErrorKind::Transient, "status {status}");
        }
    }

    #[test]
    fn test_classify_unauthorized_is_fatal() {
        assert_eq!(classify(401, "Unauthorized"), ErrorKind::FatalTransport);
    }

    #[test]
    fn test_classify_permanent() {
        assert_eq!(classify(400, "Invalid space key"), ErrorKind::Permanent);
        assert_eq!(classify(403, "Forbidden"), ErrorKind::Permanent);
        assert_eq!(classify(413, ""), ErrorKind::Permanent);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::MissingConfig("CONFLUENCE_URL").kind(), ErrorKind::FatalTransport);
        assert_eq!(
            Error::Timeout {
                endpoint: "space".into()
            }
            .kind(),
            ErrorKind::Transient
        );
        assert_eq!(
            Error::Connection {
                endpoint: "space".into(),
                message: "refused".into()
            }
            .kind(),
            ErrorKind::FatalTransport
        );
        assert_eq!(
            Error::Status {
                status: 400,
                endpoint: "space".into(),
                message: "A space with key TEAM already exists".into()
            }
            .kind(),
            ErrorKind::AlreadyExists
        );
    }

    #[test]
    fn test_transport_classification() {
        assert!(matches!(
            Error::transport("space", ureq::Error::HostNotFound),
            Error::Connection { .. }
        ));
        assert!(matches!(
            Error::transport("space", ureq::Error::ConnectionFailed),
            Error::Connection { .. }
        ));

        let timed_out = io::Error::new(io::ErrorKind::TimedOut, "timed out");
        assert_eq!(
            Error::transport("space", ureq::Error::Io(timed_out)).kind(),
            ErrorKind::Transient
        );

        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        assert_eq!(
            Error::transport("space", ureq::Error::Io(reset)).kind(),
            ErrorKind::Transient
        );
    }

    #[test]
    fn test_into_client_error() {
        let err: ClientError = Error::Status {
            status: 404,
            endpoint: "space/NOPE".into(),
            message: "No space with key : NOPE".into(),
        }
        .into();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert!(err.message.contains("space/NOPE"));
    }

    #[test]
    fn test_advice_not_empty() {
        assert!(!Error::MissingConfig("CONFLUENCE_URL").advice().is_empty());
        assert!(!Error::InvalidUrl("x".into()).advice().is_empty());
    }
}
