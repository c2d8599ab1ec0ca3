//! Assistant panel state.
//!
//! [`AssistantPanel`] is the UI model behind the assistant sidebar: the chat
//! transcript, a loading flag, the last user-facing error, and the connection
//! indicator. Failures never propagate out of it; they become failed assistant
//! turns in the transcript.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::client::GatewayClient;
use crate::state::ConnectionState;
use crate::transport::{Connector, WsConnector};

/// Greeting shown after connecting.
pub const WELCOME_MESSAGE: &str = "Hi! I'm your AI assistant. I can help you navigate, \
    summarize pages, fill forms, and more. What would you like to do?";

/// Error shown when the gateway cannot be reached.
pub const CONNECT_ERROR: &str =
    "Failed to connect to AI backend. Please check if the gateway is running.";

/// Who wrote a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person using the panel.
    User,
    /// The assistant.
    Assistant,
}

/// One entry in the panel transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message id.
    pub id: Uuid,
    /// Author.
    pub role: Role,
    /// Message text.
    pub content: String,
    /// When the message was added.
    pub timestamp: DateTime<Utc>,
    /// Whether this assistant turn reports a failure.
    #[serde(default)]
    pub failed: bool,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>, failed: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            failed,
        }
    }

    /// A message from the user.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content, false)
    }

    /// A reply from the assistant.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content, false)
    }

    /// A failed assistant turn.
    #[must_use]
    pub fn failure(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content, true)
    }
}

/// UI state of the assistant panel, wrapping one gateway client.
#[derive(Debug)]
pub struct AssistantPanel<C: Connector = WsConnector> {
    client: GatewayClient<C>,
    messages: Vec<ChatMessage>,
    loading: bool,
    error: Option<String>,
}

impl<C: Connector> AssistantPanel<C> {
    /// Create an empty panel around `client`.
    #[must_use]
    pub fn new(client: GatewayClient<C>) -> Self {
        Self {
            client,
            messages: Vec::new(),
            loading: false,
            error: None,
        }
    }

    /// Connect and greet. Returns whether the connection succeeded.
    pub async fn connect(&mut self) -> bool {
        match self.client.connect().await {
            Ok(()) => {
                self.error = None;
                self.messages = vec![ChatMessage::assistant(WELCOME_MESSAGE)];
                true
            }
            Err(e) => {
                warn!(error = %e, "assistant panel failed to connect");
                self.error = Some(CONNECT_ERROR.to_string());
                false
            }
        }
    }

    /// Disconnect from the gateway.
    pub fn disconnect(&mut self) {
        self.client.disconnect();
    }

    /// Send one chat turn.
    ///
    /// Blank input is ignored. Any failure is recorded as a failed assistant
    /// turn and in [`error`](Self::error).
    pub async fn send_message(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }

        self.messages.push(ChatMessage::user(text));
        self.loading = true;
        self.error = None;

        match self.client.chat(text).await {
            Ok(reply) => self.messages.push(ChatMessage::assistant(reply)),
            Err(e) => {
                warn!(error = %e, "chat turn failed");
                let reason = e.to_string();
                self.messages.push(ChatMessage::failure(format!(
                    "Sorry, I encountered an error: {reason}"
                )));
                self.error = Some(reason);
            }
        }

        self.loading = false;
    }

    /// Empty the transcript.
    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }

    /// Set or clear the user-facing error.
    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }

    /// The transcript, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Whether a chat turn is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// The last user-facing error.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Connection indicator.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.client.state()
    }

    /// The underlying client.
    #[must_use]
    pub const fn client(&self) -> &GatewayClient<C> {
        &self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::memory::MemoryConnector;
    use clawdesk_proto::{InboundFrame, Request};
    use std::time::Duration;

    fn panel() -> (
        AssistantPanel<MemoryConnector>,
        MemoryConnector,
        tokio::sync::mpsc::UnboundedReceiver<crate::memory::MemoryPeer>,
    ) {
        let (connector, peers) = MemoryConnector::new();
        let config = ClientConfig::default().with_request_timeout(Duration::from_secs(5));
        let client = GatewayClient::with_connector(config, connector.clone()).unwrap();
        (AssistantPanel::new(client), connector, peers)
    }

    #[tokio::test]
    async fn test_connect_seeds_welcome() {
        let (mut panel, _connector, _peers) = panel();
        panel.set_error(Some("stale".into()));

        assert!(panel.connect().await);
        assert_eq!(panel.error(), None);
        assert_eq!(panel.messages().len(), 1);
        assert_eq!(panel.messages()[0].role, Role::Assistant);
        assert_eq!(panel.messages()[0].content, WELCOME_MESSAGE);
        assert!(panel.connection_state().is_connected());
    }

    #[tokio::test]
    async fn test_connect_failure_sets_error() {
        let (mut panel, connector, _peers) = panel();
        connector.set_refusing(true);

        assert!(!panel.connect().await);
        assert_eq!(panel.error(), Some(CONNECT_ERROR));
        assert!(panel.messages().is_empty());
        assert_eq!(panel.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_send_message_appends_turns() {
        let (mut panel, _connector, mut peers) = panel();
        panel.connect().await;
        let mut peer = peers.recv().await.unwrap();

        let gateway = tokio::spawn(async move {
            let request = peer.recv_request().await.unwrap();
            assert_eq!(request.request, Request::chat("summarize this page"));
            peer.reply(&InboundFrame::message(request.id, "This page is about..."))
                .await;
            peer
        });

        panel.send_message("summarize this page").await;
        let _peer = gateway.await.unwrap();

        let messages = panel.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[2].content, "This page is about...");
        assert!(!messages[2].failed);
        assert!(!panel.is_loading());
    }

    #[tokio::test]
    async fn test_blank_message_ignored() {
        let (mut panel, _connector, _peers) = panel();
        panel.connect().await;

        panel.send_message("   ").await;
        assert_eq!(panel.messages().len(), 1);
        assert_eq!(panel.client().pending_requests(), 0);
    }

    #[tokio::test]
    async fn test_gateway_error_becomes_failed_turn() {
        let (mut panel, _connector, mut peers) = panel();
        panel.connect().await;
        let mut peer = peers.recv().await.unwrap();

        let gateway = tokio::spawn(async move {
            let request = peer.recv_request().await.unwrap();
            peer.reply(&InboundFrame::error(request.id, "rate limited")).await;
            peer
        });

        panel.send_message("hello").await;
        let _peer = gateway.await.unwrap();

        let last = panel.messages().last().unwrap();
        assert!(last.failed);
        assert_eq!(last.content, "Sorry, I encountered an error: gateway error: rate limited");
        assert_eq!(panel.error(), Some("gateway error: rate limited"));
        assert!(!panel.is_loading());
    }

    #[tokio::test]
    async fn test_send_while_disconnected_fails_inline() {
        let (mut panel, _connector, _peers) = panel();

        panel.send_message("anyone there?").await;

        assert_eq!(panel.messages().len(), 2);
        assert!(panel.messages()[1].failed);
        assert!(panel.error().is_some());
    }

    #[tokio::test]
    async fn test_clear_messages() {
        let (mut panel, _connector, _peers) = panel();
        panel.connect().await;
        panel.clear_messages();
        assert!(panel.messages().is_empty());
    }

    #[test]
    fn test_chat_message_serialization() {
        let message = ChatMessage::user("hi");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], "user");
        assert_eq!(value["failed"], false);
        assert!(value["timestamp"].is_string());
    }
}
