//! Error types for the Parse REST client.
//!
//! # Design
//! Application-level failures (a non-2xx status, or an `error` field in the
//! decoded body) are data, not faults: they travel inside a
//! `ResponseOutcome` with `success == false`. `ApiError` covers the cases
//! where no usable decoded body exists, plus the `Parse` variant that
//! `ResponseOutcome::into_result` produces when a caller opts into
//! `Result`-style handling.

use std::fmt;

use thiserror::Error;

/// Coarse classification of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// TCP connect, DNS or TLS handshake failed.
    Connect,
    /// The transport's timeout elapsed.
    Timeout,
    /// Anything else reported by the HTTP client.
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::Connect => write!(f, "connect"),
            TransportErrorKind::Timeout => write!(f, "timeout"),
            TransportErrorKind::Other => write!(f, "other"),
        }
    }
}

/// Errors surfaced by the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// No HTTP response exists: network, DNS, TLS or timeout failure.
    #[error("transport error ({kind}): {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
    },

    /// The response declared a JSON content type but the body did not parse.
    #[error("response body is not valid JSON: {0}")]
    Decode(String),

    /// A request payload could not be serialized into a JSON object.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The service answered with an error-shaped body or a non-2xx status.
    #[error("request failed (status {status:?}, code {code:?}): {message}")]
    Parse {
        status: Option<u16>,
        code: Option<i64>,
        message: String,
    },

    /// Missing or malformed client configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Local I/O failed, e.g. while reading a file for upload.
    #[error("I/O error: {0}")]
    Io(String),

    /// A header name or value was rejected by the transport.
    #[error("invalid header: {0}")]
    InvalidHeader(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ApiError>;

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else if err.is_builder() {
            return ApiError::InvalidHeader(err.to_string());
        } else {
            TransportErrorKind::Other
        };
        ApiError::Transport {
            kind,
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_display_includes_kind() {
        let err = ApiError::Transport {
            kind: TransportErrorKind::Connect,
            message: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "transport error (connect): connection refused");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.jpg");
        let err: ApiError = io.into();
        assert!(matches!(err, ApiError::Io(msg) if msg.contains("missing.jpg")));
    }

    #[test]
    fn json_error_converts_to_serialization() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ApiError = json_err.into();
        assert!(matches!(err, ApiError::Serialization(_)));
    }
}
