//! # clawdesk-proto
//!
//! Wire protocol between the clawdesk assistant panel and the assistant gateway.
//!
//! Every frame is a single JSON object carried in one WebSocket text message:
//!
//! - [`RequestFrame`]: panel → gateway, keyed by a [`RequestId`] and an `action`
//! - [`InboundFrame`]: gateway → panel, either a response carrying the id of the
//!   request it answers, or an unsolicited event without an id
//!
//! The [`codec`] module turns frames into text and back, validating inbound
//! payloads per kind.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod error;
pub mod frame;

pub use codec::{decode, decode_request, encode, MAX_FRAME_BYTES};
pub use error::ProtoError;
pub use frame::{InboundFrame, Metadata, Request, RequestFrame, RequestId, ResponseKind};
