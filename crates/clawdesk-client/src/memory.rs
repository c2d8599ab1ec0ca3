//! In-process connector for driving a client without a network.
//!
//! Every successful dial produces a [`MemoryPeer`] that plays the gateway's
//! side of the connection.

use std::future::Future;
use std::sync::Arc;

use clawdesk_proto::{InboundFrame, RequestFrame};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::warn;

use crate::error::{GatewayError, GatewayResult};
use crate::transport::{Connector, Transport, CHANNEL_CAPACITY};

#[derive(Debug)]
struct MemoryState {
    peers: mpsc::UnboundedSender<MemoryPeer>,
    refusing: bool,
    attempts: Vec<Instant>,
}

/// Connector that hands each new connection to a test harness.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryConnector {
    /// Create a connector and the stream of peers it accepts.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MemoryPeer>) {
        let (peers, rx) = mpsc::unbounded_channel();
        let connector = Self {
            state: Arc::new(Mutex::new(MemoryState {
                peers,
                refusing: false,
                attempts: Vec::new(),
            })),
        };
        (connector, rx)
    }

    /// Make subsequent dials fail (`true`) or succeed (`false`).
    pub fn set_refusing(&self, refusing: bool) {
        self.state.lock().refusing = refusing;
    }

    /// When each dial happened, in order.
    #[must_use]
    pub fn attempts(&self) -> Vec<Instant> {
        self.state.lock().attempts.clone()
    }

    /// Number of dials so far.
    #[must_use]
    pub fn attempt_count(&self) -> usize {
        self.state.lock().attempts.len()
    }

    fn accept(&self, endpoint: &str) -> GatewayResult<Transport> {
        let mut state = self.state.lock();
        state.attempts.push(Instant::now());

        if state.refusing {
            return Err(GatewayError::Connection(format!(
                "{endpoint}: connection refused"
            )));
        }

        let (outbound, from_client) = mpsc::channel(CHANNEL_CAPACITY);
        let (to_client, inbound) = mpsc::channel(CHANNEL_CAPACITY);
        state
            .peers
            .send(MemoryPeer {
                from_client,
                to_client,
            })
            .map_err(|_| GatewayError::Connection(format!("{endpoint}: no listener")))?;

        Ok(Transport { outbound, inbound })
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, endpoint: &str) -> impl Future<Output = GatewayResult<Transport>> + Send {
        std::future::ready(self.accept(endpoint))
    }
}

/// The gateway's end of an in-memory connection.
#[derive(Debug)]
pub struct MemoryPeer {
    from_client: mpsc::Receiver<String>,
    to_client: mpsc::Sender<String>,
}

impl MemoryPeer {
    /// Next raw frame sent by the client, or `None` once the client hung up.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    /// Next request sent by the client. Undecodable frames are skipped.
    pub async fn recv_request(&mut self) -> Option<RequestFrame> {
        while let Some(text) = self.from_client.recv().await {
            match RequestFrame::from_json(&text) {
                Ok(frame) => return Some(frame),
                Err(e) => warn!(error = %e, "peer skipping undecodable request"),
            }
        }
        None
    }

    /// Send a frame to the client. Returns `false` if the client hung up.
    pub async fn reply(&self, frame: &InboundFrame) -> bool {
        match frame.to_json() {
            Ok(text) => self.send_raw(text).await,
            Err(_) => false,
        }
    }

    /// Send arbitrary text to the client. Returns `false` if the client hung up.
    pub async fn send_raw(&self, text: impl Into<String>) -> bool {
        self.to_client.send(text.into()).await.is_ok()
    }

    /// Whether the client has dropped its end of the connection.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.to_client.is_closed()
    }

    /// Close the connection from the gateway's side.
    pub fn close(self) {}
}
