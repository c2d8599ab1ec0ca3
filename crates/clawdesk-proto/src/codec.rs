//! Frame codec.
//!
//! Requests are encoded straight from their serde representation. Inbound
//! frames go through a loose raw shape first so that each failure mode maps to
//! a precise [`ProtoError`] instead of a generic serde message.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ProtoError;
use crate::frame::{InboundFrame, RequestFrame, RequestId, ResponseKind};

/// Largest frame accepted from the wire (512 KiB).
pub const MAX_FRAME_BYTES: usize = 524_288;

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    metadata: Option<Value>,
}

/// Encode a request frame as a JSON text frame.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode(frame: &RequestFrame) -> Result<String, ProtoError> {
    serde_json::to_string(frame).map_err(|e| ProtoError::Encoding(e.to_string()))
}

/// Decode and validate a frame received from the gateway.
///
/// `message` and `error` frames must carry `content`; `action` frames may omit
/// it. `metadata`, when present, must be a JSON object. An empty id is treated
/// as no id at all.
///
/// # Errors
///
/// Returns an error if the frame is oversized, not JSON, has an unknown kind,
/// or fails per-kind validation.
pub fn decode(text: &str) -> Result<InboundFrame, ProtoError> {
    check_size(text)?;

    let raw: RawFrame =
        serde_json::from_str(text).map_err(|e| ProtoError::Decoding(e.to_string()))?;

    let kind_name = raw.kind.ok_or(ProtoError::MissingField("type"))?;
    let kind = ResponseKind::parse(&kind_name).ok_or(ProtoError::UnknownKind(kind_name))?;

    let content = match (kind, raw.content) {
        (_, Some(content)) => content,
        (ResponseKind::Action, None) => String::new(),
        (_, None) => return Err(ProtoError::MissingField("content")),
    };

    let metadata = match raw.metadata {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map),
        Some(other) => {
            return Err(ProtoError::Validation(format!(
                "metadata must be an object, got {}",
                json_type(&other)
            )));
        }
    };

    Ok(InboundFrame {
        id: raw.id.filter(|id| !id.is_empty()).map(RequestId::from),
        kind,
        content,
        metadata,
    })
}

/// Decode a request frame, as a gateway would.
///
/// # Errors
///
/// Returns an error if the frame is oversized or not a valid request.
pub fn decode_request(text: &str) -> Result<RequestFrame, ProtoError> {
    check_size(text)?;
    serde_json::from_str(text).map_err(|e| ProtoError::Decoding(e.to_string()))
}

fn check_size(text: &str) -> Result<(), ProtoError> {
    if text.len() > MAX_FRAME_BYTES {
        return Err(ProtoError::FrameTooLarge {
            size: text.len(),
            limit: MAX_FRAME_BYTES,
        });
    }
    Ok(())
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
