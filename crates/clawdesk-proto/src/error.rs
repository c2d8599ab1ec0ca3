//! Error types for the clawdesk-proto crate.

use thiserror::Error;

use crate::frame::ResponseKind;

/// Errors that can occur while encoding, decoding or interpreting frames.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtoError {
    /// Failed to encode a frame.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Failed to decode a frame.
    #[error("decoding error: {0}")]
    Decoding(String),

    /// The frame's `type` is not one this client understands.
    #[error("unknown frame kind: {0}")]
    UnknownKind(String),

    /// Missing required field.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The frame exceeds the accepted size.
    #[error("frame of {size} bytes exceeds the {limit} byte limit")]
    FrameTooLarge {
        /// Size of the rejected frame in bytes.
        size: usize,
        /// Maximum accepted size in bytes.
        limit: usize,
    },

    /// A request id is already in flight.
    #[error("duplicate request id: {0}")]
    DuplicateId(String),

    /// A response arrived with a kind the request cannot accept.
    #[error("unexpected {actual} response, expected {expected}")]
    UnexpectedKind {
        /// Kind the request expects.
        expected: ResponseKind,
        /// Kind that actually arrived.
        actual: ResponseKind,
    },

    /// Validation error.
    #[error("validation error: {0}")]
    Validation(String),
}
