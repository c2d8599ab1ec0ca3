//! The public gateway client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use clawdesk_proto::{
    InboundFrame, Metadata, ProtoError, Request, RequestFrame, RequestId, ResponseKind,
};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::watch;
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::connection::ConnectionManager;
use crate::dispatch::SubscriptionId;
use crate::error::{GatewayError, GatewayResult};
use crate::state::ConnectionState;
use crate::transport::{Connector, WsConnector};

/// Client for the assistant gateway.
///
/// Cheap to clone; clones share one connection, one correlation table and one
/// subscriber list. Each request suspends until its own response, its timeout
/// or a connection-level cancellation, independent of any other request.
pub struct GatewayClient<C: Connector = WsConnector> {
    manager: Arc<ConnectionManager<C>>,
    next_id: Arc<AtomicU64>,
}

impl<C: Connector> Clone for GatewayClient<C> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl GatewayClient<WsConnector> {
    /// Create a WebSocket client from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the configuration is invalid.
    pub fn new(config: ClientConfig) -> GatewayResult<Self> {
        let connector = WsConnector::new(config.connect_timeout());
        Self::with_connector(config, connector)
    }
}

impl<C: Connector> GatewayClient<C> {
    /// Create a client that dials through `connector`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the configuration is invalid.
    pub fn with_connector(config: ClientConfig, connector: C) -> GatewayResult<Self> {
        config.validate()?;
        Ok(Self {
            manager: ConnectionManager::new(config, connector),
            next_id: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Connect to the gateway. A no-op when already connected.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be established.
    pub async fn connect(&self) -> GatewayResult<()> {
        self.manager.connect().await
    }

    /// Disconnect, rejecting every pending request with
    /// [`GatewayError::Cancelled`]. Returns how many were rejected.
    pub fn disconnect(&self) -> usize {
        self.manager.disconnect()
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.manager.state()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.manager.watch_state()
    }

    /// Number of requests awaiting a response.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.manager.table().len()
    }

    /// The client's configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        self.manager.config()
    }

    /// Register a callback for frames that answer no pending request.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&InboundFrame) + Send + Sync + 'static,
    {
        self.manager.dispatcher().subscribers().subscribe(callback)
    }

    /// Remove a callback. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.manager.dispatcher().subscribers().unsubscribe(id)
    }

    /// Send a chat message and return the assistant's reply.
    ///
    /// # Errors
    ///
    /// Fails if not connected, on timeout, cancellation or a gateway error.
    pub async fn chat(&self, text: impl Into<String>) -> GatewayResult<String> {
        let frame = self.request(Request::chat(text)).await?;
        Ok(frame.content)
    }

    /// Fetch a structured snapshot of the current page.
    ///
    /// # Errors
    ///
    /// Fails if not connected, on timeout, cancellation or a gateway error.
    pub async fn snapshot(&self) -> GatewayResult<Metadata> {
        let frame = self.request(Request::snapshot()).await?;
        Ok(frame.metadata.unwrap_or_default())
    }

    /// Perform an action on the current page.
    ///
    /// Resolves once the gateway acknowledges with an `action` frame.
    ///
    /// # Errors
    ///
    /// Fails if the action name is empty, if not connected, on timeout,
    /// cancellation, a gateway error or a response of another kind.
    pub async fn act(&self, action: &str, params: Option<Metadata>) -> GatewayResult<()> {
        if action.trim().is_empty() {
            return Err(ProtoError::Validation("action name cannot be empty".to_string()).into());
        }
        let frame = self.request(Request::act(action, params)).await?;
        expect_ack(&frame)
    }

    /// Ask the host to load `url`.
    ///
    /// # Errors
    ///
    /// Fails if `url` does not parse, if not connected, on timeout,
    /// cancellation, a gateway error or a response of another kind.
    pub async fn navigate(&self, url: &str) -> GatewayResult<()> {
        Url::parse(url).map_err(|e| ProtoError::Validation(format!("invalid url '{url}': {e}")))?;
        let frame = self.request(Request::navigate(url)).await?;
        expect_ack(&frame)
    }

    async fn request(&self, request: Request) -> GatewayResult<InboundFrame> {
        // Fail fast before allocating an id or encoding anything.
        let state = self.state();
        if !state.is_connected() {
            return Err(GatewayError::Connection(format!("not connected ({state})")));
        }

        let id = RequestId::sequential(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let action = request.action();
        let text = RequestFrame::new(id.clone(), request).to_json()?;

        let timeout = self.manager.config().request_timeout();
        let (sender, reply) = self.manager.begin_request(id.clone(), timeout)?;

        debug!(request_id = %id, action, "sending request");
        match sender.try_send(text) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.manager.table().reject(
                    &id,
                    GatewayError::Connection("outbound queue full".to_string()),
                );
            }
            Err(TrySendError::Closed(_)) => {
                self.manager
                    .table()
                    .reject(&id, GatewayError::Connection("connection closed".to_string()));
            }
        }
        drop(sender);

        reply.await.map_err(|_| GatewayError::Cancelled)?
    }
}

impl<C: Connector> std::fmt::Debug for GatewayClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("manager", &self.manager)
            .finish_non_exhaustive()
    }
}

fn expect_ack(frame: &InboundFrame) -> GatewayResult<()> {
    if frame.kind == ResponseKind::Action {
        Ok(())
    } else {
        Err(ProtoError::UnexpectedKind {
            expected: ResponseKind::Action,
            actual: frame.kind,
        }
        .into())
    }
}
