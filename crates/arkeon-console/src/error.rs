//! Error types for catalog transport.

use reqwest::StatusCode;
use thiserror::Error;

/// Transport-level failures talking to the acquisition service.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// The request could not be sent or the connection failed.
    #[error("catalog request failed")]
    Http {
        /// Operation identifier.
        operation: &'static str,
        /// Source transport error.
        source: reqwest::Error,
    },
    /// The service answered with a non-success status.
    #[error("catalog service rejected the request")]
    HttpStatus {
        /// Operation identifier.
        operation: &'static str,
        /// Status returned by the service.
        status: StatusCode,
        /// Flattened `detail` message from the error body.
        detail: Option<String>,
    },
    /// The response body did not match the expected shape.
    #[error("catalog response could not be decoded")]
    Decode {
        /// Operation identifier.
        operation: &'static str,
        /// Source decode error.
        source: reqwest::Error,
    },
    /// The request URL could not be built from the base URL.
    #[error("catalog request url is invalid")]
    Url {
        /// Operation identifier.
        operation: &'static str,
        /// Source parse error.
        source: url::ParseError,
    },
    /// The trace header value was rejected.
    #[error("request header is invalid")]
    Header {
        /// Source header error.
        source: reqwest::header::InvalidHeaderValue,
    },
}

impl ConsoleError {
    /// Operation identifier attached to the failure.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Http { operation, .. }
            | Self::HttpStatus { operation, .. }
            | Self::Decode { operation, .. }
            | Self::Url { operation, .. } => operation,
            Self::Header { .. } => "build_client",
        }
    }

    /// Status code for service rejections.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the service reported the target as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// Whether the service refused the input (4xx other than 404).
    #[must_use]
    pub fn is_rejected_input(&self) -> bool {
        self.status()
            .is_some_and(|status| status.is_client_error() && status != StatusCode::NOT_FOUND)
    }

    /// Operator-facing description including the service detail when present.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::HttpStatus {
                operation,
                status,
                detail: Some(detail),
            } => format!("{operation}: {status}: {detail}"),
            Self::HttpStatus {
                operation, status, ..
            } => format!("{operation}: {status}"),
            Self::Http { operation, source } | Self::Decode { operation, source } => {
                format!("{operation}: {self}: {source}")
            }
            Self::Url { operation, source } => format!("{operation}: {self}: {source}"),
            Self::Header { source } => format!("{self}: {source}"),
        }
    }
}

/// Convenience alias for catalog results.
pub type ConsoleResult<T> = Result<T, ConsoleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_expose_detail() {
        let err = ConsoleError::HttpStatus {
            operation: "create_source",
            status: StatusCode::BAD_REQUEST,
            detail: Some("Source URL already registered".into()),
        };
        assert!(err.is_rejected_input());
        assert!(!err.is_not_found());
        assert_eq!(
            err.describe(),
            "create_source: 400 Bad Request: Source URL already registered"
        );
        assert_eq!(err.to_string(), "catalog service rejected the request");
    }

    #[test]
    fn not_found_is_detected() {
        let err = ConsoleError::HttpStatus {
            operation: "delete_cookies",
            status: StatusCode::NOT_FOUND,
            detail: None,
        };
        assert!(err.is_not_found());
        assert!(!err.is_rejected_input());
        assert_eq!(err.operation(), "delete_cookies");
    }
}
