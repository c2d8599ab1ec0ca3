//! Transport abstraction and the WebSocket implementation.
//!
//! A [`Connector`] dials the gateway and hands back a [`Transport`]: a pair of
//! text channels. The inbound channel ending means the peer closed the
//! connection; dropping the outbound sender closes it from our side.

use std::future::Future;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::error::{GatewayError, GatewayResult};

/// Buffer size of the per-connection frame channels.
pub const CHANNEL_CAPACITY: usize = 32;

/// An open, message-oriented duplex connection carrying text frames.
#[derive(Debug)]
pub struct Transport {
    /// Frames to send to the gateway.
    pub outbound: mpsc::Sender<String>,
    /// Frames received from the gateway. Yields `None` once the peer closes.
    pub inbound: mpsc::Receiver<String>,
}

/// Establishes transports to the gateway.
pub trait Connector: Send + Sync + 'static {
    /// Open a transport to `endpoint`.
    fn connect(&self, endpoint: &str) -> impl Future<Output = GatewayResult<Transport>> + Send;
}

/// WebSocket connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct WsConnector {
    connect_timeout: Duration,
}

impl WsConnector {
    /// Create a connector that gives up dialing after `connect_timeout`.
    #[must_use]
    pub const fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Connector for WsConnector {
    fn connect(&self, endpoint: &str) -> impl Future<Output = GatewayResult<Transport>> + Send {
        let endpoint = endpoint.to_string();
        let connect_timeout = self.connect_timeout;

        async move {
            let (ws_stream, _) = tokio::time::timeout(connect_timeout, connect_async(endpoint.as_str()))
                .await
                .map_err(|_| {
                    GatewayError::Connection(format!(
                        "timed out after {}ms connecting to {endpoint}",
                        connect_timeout.as_millis()
                    ))
                })?
                .map_err(|e| GatewayError::Connection(format!("{endpoint}: {e}")))?;

            debug!(endpoint = %endpoint, "websocket handshake complete");

            let (mut write, mut read) = ws_stream.split();
            let (outbound, mut outbound_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
            let (inbound_tx, inbound) = mpsc::channel::<String>(CHANNEL_CAPACITY);

            // Writer: forwards outbound frames, closes the socket once every sender is gone.
            tokio::spawn(async move {
                while let Some(text) = outbound_rx.recv().await {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        warn!(error = %e, "failed to write frame");
                        break;
                    }
                }
                let _ = write.close().await;
            });

            // Reader: forwards text frames until the peer closes or the receiver is dropped.
            tokio::spawn(async move {
                while let Some(msg) = read.next().await {
                    match msg {
                        Ok(Message::Text(text)) => {
                            if inbound_tx.send(text).await.is_err() {
                                break;
                            }
                        }
                        Ok(Message::Binary(data)) => {
                            warn!(bytes = data.len(), "ignoring binary frame");
                        }
                        Ok(Message::Close(frame)) => {
                            debug!(?frame, "gateway closed the connection");
                            break;
                        }
                        Ok(_) => {}
                        Err(e) => {
                            warn!(error = %e, "websocket read failed");
                            break;
                        }
                    }
                }
            });

            Ok(Transport { outbound, inbound })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ws_connect_refused() {
        // Bind then drop a listener to get a port nobody is serving.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let connector = WsConnector::new(Duration::from_secs(5));
        let err = connector
            .connect(&format!("ws://{addr}"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Connection(_)));
    }

    #[tokio::test]
    async fn test_ws_connect_invalid_url() {
        let connector = WsConnector::new(Duration::from_secs(5));
        let err = connector.connect("not a url").await.unwrap_err();
        assert!(matches!(err, GatewayError::Connection(_)));
    }
}
