//! Error types for the gateway client.

use std::time::Duration;

use clawdesk_proto::{ProtoError, RequestId};
use thiserror::Error;

/// Errors surfaced by the gateway client.
///
/// Errors are cheap to clone so a single connection-level failure can be
/// handed to every pending request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The transport could not be established, or a send was attempted while
    /// not connected.
    #[error("gateway connection failed: {0}")]
    Connection(String),

    /// No matching response arrived before the request's deadline.
    #[error("request {id} timed out after {}ms", .after.as_millis())]
    Timeout {
        /// The request that timed out.
        id: RequestId,
        /// The timeout that elapsed.
        after: Duration,
    },

    /// A frame could not be encoded, decoded or interpreted.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtoError),

    /// The gateway answered with an error frame.
    #[error("gateway error: {0}")]
    Application(String),

    /// The request was terminated by a disconnect or connection loss.
    #[error("request cancelled")]
    Cancelled,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result alias for gateway client operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_display() {
        let err = GatewayError::Connection("connection refused".to_string());
        assert_eq!(err.to_string(), "gateway connection failed: connection refused");
    }

    #[test]
    fn test_timeout_display() {
        let err = GatewayError::Timeout {
            id: RequestId::from("r9"),
            after: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "request r9 timed out after 30000ms");
    }

    #[test]
    fn test_application_error_display() {
        let err = GatewayError::Application("rate limited".to_string());
        assert_eq!(err.to_string(), "gateway error: rate limited");
    }

    #[test]
    fn test_protocol_error_conversion() {
        let err: GatewayError = ProtoError::UnknownKind("stream".into()).into();
        assert!(matches!(err, GatewayError::Protocol(_)));
        assert_eq!(err.to_string(), "protocol error: unknown frame kind: stream");
    }
}
