//! Error taxonomy for one-shot request handling.
//!
//! Callers usually only need [`RequestError`] and the [`RequestResult`]
//! alias; configuration loading reports [`ConfigError`] and the bundled
//! greeting server reports [`ServerError`].

use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors surfaced while executing a request task.
///
/// Connection trouble (refused sockets, rejected handshakes, protocol
/// violations, peers that hang up early) and deadline misses are separate
/// variants so callers can branch on them. [`is_timeout`](Self::is_timeout)
/// and [`is_cancelled`](Self::is_cancelled) cover the common checks.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The configured server address cannot be used to open a connection.
    #[error("invalid server address: {0}")]
    InvalidAddress(String),

    /// The connection attempt failed.
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tungstenite::Error,
    },

    /// The connection attempt did not finish within the configured bound.
    #[error("connecting to {url} timed out after {timeout:?}")]
    ConnectTimeout { url: String, timeout: Duration },

    /// Transport-level I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The peer violated the WebSocket protocol.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Any other connection failure reported by the transport.
    #[error("connection error: {0}")]
    Connection(String),

    /// The connection ended before a reply was delivered.
    #[error("connection closed before a response arrived")]
    ConnectionClosed,

    /// No reply arrived within the configured bound.
    #[error("no response within {timeout:?}")]
    ResponseTimeout { timeout: Duration },

    /// The task was cancelled and the active policy reports that as an error.
    #[error("request cancelled")]
    Cancelled,

    /// The worker thread failed outside of normal request handling.
    #[error("worker failure: {0}")]
    Worker(String),
}

impl RequestError {
    /// True for both the connect deadline and the response deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectTimeout { .. } | Self::ResponseTimeout { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Classifies a failed connection attempt against `url`.
    pub(crate) fn connect_failure(url: &str, err: tungstenite::Error) -> Self {
        match err {
            tungstenite::Error::Url(url_err) => Self::InvalidAddress(url_err.to_string()),
            tungstenite::Error::HttpFormat(http_err) => Self::InvalidAddress(http_err.to_string()),
            other => Self::Connect {
                url: url.to_string(),
                source: other,
            },
        }
    }
}

impl From<tungstenite::Error> for RequestError {
    fn from(err: tungstenite::Error) -> Self {
        match err {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                Self::ConnectionClosed
            }
            tungstenite::Error::Io(io_err) => Self::Io(io_err),
            tungstenite::Error::Protocol(violation) => Self::Protocol(violation.to_string()),
            tungstenite::Error::Url(url_err) => Self::InvalidAddress(url_err.to_string()),
            other => Self::Connection(other.to_string()),
        }
    }
}

/// Result alias for request operations.
pub type RequestResult<T> = Result<T, RequestError>;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("invalid value for {field}: got `{value}`, expected {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },
}

impl ConfigError {
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::ValidationFailed(message.into())
    }
}

/// Errors raised by the bundled greeting server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to accept a connection: {0}")]
    Accept(#[source] io::Error),

    #[error("websocket handshake failed: {0}")]
    Handshake(String),

    #[error("connection error: {0}")]
    Connection(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::tungstenite::error::{CapacityError, ProtocolError, UrlError};

    #[test]
    fn closed_connection_maps_to_connection_closed() {
        let err = RequestError::from(tungstenite::Error::ConnectionClosed);
        assert!(matches!(err, RequestError::ConnectionClosed));

        let err = RequestError::from(tungstenite::Error::AlreadyClosed);
        assert!(matches!(err, RequestError::ConnectionClosed));
    }

    #[test]
    fn io_errors_keep_their_source() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let err = RequestError::from(tungstenite::Error::Io(io_err));
        match err {
            RequestError::Io(inner) => {
                assert_eq!(inner.kind(), io::ErrorKind::ConnectionRefused)
            }
            other => panic!("expected Io, got {other:?}"),
        }
    }

    #[test]
    fn protocol_violations_map_to_protocol() {
        let err = RequestError::from(tungstenite::Error::Protocol(
            ProtocolError::ResetWithoutClosingHandshake,
        ));
        assert!(matches!(err, RequestError::Protocol(_)));
    }

    #[test]
    fn url_problems_map_to_invalid_address() {
        let err = RequestError::from(tungstenite::Error::Url(UrlError::UnsupportedUrlScheme));
        assert!(matches!(err, RequestError::InvalidAddress(_)));

        let err = RequestError::connect_failure(
            "ws://example.invalid",
            tungstenite::Error::Url(UrlError::NoHostName),
        );
        assert!(matches!(err, RequestError::InvalidAddress(_)));
    }

    #[test]
    fn other_transport_failures_map_to_connect_with_url() {
        let err = RequestError::connect_failure(
            "ws://127.0.0.1:9/hello",
            tungstenite::Error::Capacity(CapacityError::MessageTooLong {
                size: 4096,
                max_size: 1024,
            }),
        );
        match err {
            RequestError::Connect { url, .. } => assert_eq!(url, "ws://127.0.0.1:9/hello"),
            other => panic!("expected Connect, got {other:?}"),
        }
    }

    #[test]
    fn timeout_and_cancel_helpers() {
        let timeout = RequestError::ResponseTimeout {
            timeout: Duration::from_secs(2),
        };
        assert!(timeout.is_timeout());
        assert!(!timeout.is_cancelled());

        let connect_timeout = RequestError::ConnectTimeout {
            url: "ws://127.0.0.1:8025".to_string(),
            timeout: Duration::from_secs(5),
        };
        assert!(connect_timeout.is_timeout());

        assert!(RequestError::Cancelled.is_cancelled());
        assert!(!RequestError::ConnectionClosed.is_timeout());
    }
}
