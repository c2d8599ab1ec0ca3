//! Frame definitions.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProtoError;

/// Open key-value mapping carried in `params` and `metadata`.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Correlation id pairing a request with its response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Create a request id from any string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The `n`th id handed out by a client: `r1`, `r2`, ...
    #[must_use]
    pub fn sequential(n: u64) -> Self {
        Self(format!("r{n}"))
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for RequestId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// What the panel asks the gateway to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    /// Send a chat message to the assistant.
    Chat {
        /// The user's message.
        content: String,
    },
    /// Ask for a structured snapshot of the current page.
    Snapshot,
    /// Perform an action on the current page.
    Act {
        /// Action name, e.g. `click`.
        content: String,
        /// Action arguments.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        params: Option<Metadata>,
    },
    /// Ask the host shell to load a URL.
    Navigate {
        /// Target URL.
        content: String,
    },
}

impl Request {
    /// Create a chat request.
    #[must_use]
    pub fn chat(content: impl Into<String>) -> Self {
        Self::Chat {
            content: content.into(),
        }
    }

    /// Create a snapshot request.
    #[must_use]
    pub const fn snapshot() -> Self {
        Self::Snapshot
    }

    /// Create an act request.
    #[must_use]
    pub fn act(action: impl Into<String>, params: Option<Metadata>) -> Self {
        Self::Act {
            content: action.into(),
            params,
        }
    }

    /// Create a navigate request.
    #[must_use]
    pub fn navigate(url: impl Into<String>) -> Self {
        Self::Navigate {
            content: url.into(),
        }
    }

    /// The wire name of this request's action.
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::Chat { .. } => "chat",
            Self::Snapshot => "snapshot",
            Self::Act { .. } => "act",
            Self::Navigate { .. } => "navigate",
        }
    }
}

/// A request as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFrame {
    /// Correlation id.
    pub id: RequestId,
    /// The request payload, flattened next to the id.
    #[serde(flatten)]
    pub request: Request,
}

impl RequestFrame {
    /// Create a request frame.
    #[must_use]
    pub const fn new(id: RequestId, request: Request) -> Self {
        Self { id, request }
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, ProtoError> {
        crate::codec::encode(self)
    }

    /// Deserialize from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid request frame.
    pub fn from_json(json: &str) -> Result<Self, ProtoError> {
        crate::codec::decode_request(json)
    }
}

/// Kind of a frame sent by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// Assistant text.
    Message,
    /// Acknowledgement of an action.
    Action,
    /// The gateway rejected the request.
    Error,
}

impl ResponseKind {
    /// Parse the wire name of a kind.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "message" => Some(Self::Message),
            "action" => Some(Self::Action),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// The wire name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Action => "action",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A frame sent by the gateway.
///
/// Frames with an `id` answer the request carrying that id. Frames without one
/// are unsolicited events.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InboundFrame {
    /// Correlation id of the request being answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    /// Frame kind.
    #[serde(rename = "type")]
    pub kind: ResponseKind,
    /// Text payload.
    pub content: String,
    /// Auxiliary data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl InboundFrame {
    /// Create a message response.
    #[must_use]
    pub fn message(id: impl Into<RequestId>, content: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            kind: ResponseKind::Message,
            content: content.into(),
            metadata: None,
        }
    }

    /// Create an action acknowledgement.
    #[must_use]
    pub fn action(id: impl Into<RequestId>) -> Self {
        Self {
            id: Some(id.into()),
            kind: ResponseKind::Action,
            content: String::new(),
            metadata: None,
        }
    }

    /// Create an error response.
    #[must_use]
    pub fn error(id: impl Into<RequestId>, content: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            kind: ResponseKind::Error,
            content: content.into(),
            metadata: None,
        }
    }

    /// Create an unsolicited event.
    #[must_use]
    pub fn event(kind: ResponseKind, content: impl Into<String>) -> Self {
        Self {
            id: None,
            kind,
            content: content.into(),
            metadata: None,
        }
    }

    /// Attach metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Whether this frame reports a failure.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.kind, ResponseKind::Error)
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, ProtoError> {
        serde_json::to_string(self).map_err(|e| ProtoError::Encoding(e.to_string()))
    }

    /// Deserialize and validate from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid inbound frame.
    pub fn from_json(json: &str) -> Result<Self, ProtoError> {
        crate::codec::decode(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn wire(frame: &RequestFrame) -> serde_json::Value {
        serde_json::from_str(&frame.to_json().unwrap()).unwrap()
    }

    #[test]
    fn test_sequential_ids() {
        assert_eq!(RequestId::sequential(1).as_str(), "r1");
        assert_eq!(RequestId::sequential(42).to_string(), "r42");
    }

    #[test]
    fn test_chat_request_shape() {
        let frame = RequestFrame::new("r1".into(), Request::chat("summarize this page"));
        assert_eq!(
            wire(&frame),
            json!({"id": "r1", "action": "chat", "content": "summarize this page"})
        );
    }

    #[test]
    fn test_snapshot_request_has_no_content() {
        let frame = RequestFrame::new("r7".into(), Request::snapshot());
        assert_eq!(wire(&frame), json!({"id": "r7", "action": "snapshot"}));
    }

    #[test]
    fn test_act_request_with_params() {
        let mut params = Metadata::new();
        params.insert("selector".into(), json!("#submit"));
        let frame = RequestFrame::new("b".into(), Request::act("click", Some(params)));
        assert_eq!(
            wire(&frame),
            json!({"id": "b", "action": "act", "content": "click", "params": {"selector": "#submit"}})
        );
    }

    #[test]
    fn test_act_request_omits_missing_params() {
        let frame = RequestFrame::new("b".into(), Request::act("scroll", None));
        assert_eq!(
            wire(&frame),
            json!({"id": "b", "action": "act", "content": "scroll"})
        );
    }

    #[test_case(Request::chat("hi"), "chat" ; "chat")]
    #[test_case(Request::snapshot(), "snapshot" ; "snapshot")]
    #[test_case(Request::act("click", None), "act" ; "act")]
    #[test_case(Request::navigate("https://example.com"), "navigate" ; "navigate")]
    fn test_action_name_matches_wire_tag(request: Request, expected: &str) {
        assert_eq!(request.action(), expected);
        let frame = RequestFrame::new("x".into(), request);
        assert_eq!(wire(&frame)["action"], json!(expected));
    }

    #[test]
    fn test_request_frame_from_json() {
        let frame =
            RequestFrame::from_json(r#"{"id":"r3","action":"navigate","content":"https://a.b"}"#)
                .unwrap();
        assert_eq!(frame.id.as_str(), "r3");
        assert_eq!(frame.request, Request::navigate("https://a.b"));
    }

    #[test]
    fn test_event_frame_omits_id() {
        let event = InboundFrame::event(ResponseKind::Message, "page changed");
        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"type": "message", "content": "page changed"}));
    }

    #[test]
    fn test_response_kind_parse() {
        assert_eq!(ResponseKind::parse("message"), Some(ResponseKind::Message));
        assert_eq!(ResponseKind::parse("action"), Some(ResponseKind::Action));
        assert_eq!(ResponseKind::parse("error"), Some(ResponseKind::Error));
        assert_eq!(ResponseKind::parse("Message"), None);
        assert_eq!(ResponseKind::parse(""), None);
    }

    #[test]
    fn test_is_error() {
        assert!(InboundFrame::error("r2", "rate limited").is_error());
        assert!(!InboundFrame::message("r2", "ok").is_error());
        assert!(!InboundFrame::action("r2").is_error());
    }
}
