//! # clawdesk-client
//!
//! Client for the clawdesk assistant gateway.
//!
//! [`GatewayClient`] holds one duplex connection to the gateway
//! (`ws://localhost:18789` by default) and multiplexes concurrent requests over
//! it by correlation id:
//!
//! - [`CorrelationTable`] pairs each in-flight request with its continuation
//!   and deadline timer
//! - [`Dispatcher`] routes inbound frames to waiting requests and broadcasts
//!   everything else to subscribers
//! - [`ConnectionManager`] owns the transport and reconnects with exponential
//!   backoff after an unexpected close
//!
//! ## Example
//!
//! ```rust,no_run
//! use clawdesk_client::{ClientConfig, GatewayClient};
//!
//! # async fn example() -> Result<(), clawdesk_client::GatewayError> {
//! let client = GatewayClient::new(ClientConfig::default())?;
//! client.connect().await?;
//!
//! let reply = client.chat("summarize this page").await?;
//! println!("{reply}");
//!
//! client.disconnect();
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod memory;
pub mod panel;
pub mod reconnect;
pub mod state;
pub mod table;
pub mod transport;

pub use client::GatewayClient;
pub use config::{ClientConfig, DEFAULT_ENDPOINT};
pub use connection::ConnectionManager;
pub use dispatch::{Dispatcher, Routed, SubscriptionId, Subscribers};
pub use error::{GatewayError, GatewayResult};
pub use memory::{MemoryConnector, MemoryPeer};
pub use panel::{AssistantPanel, ChatMessage, Role};
pub use reconnect::{calculate_backoff, ReconnectConfig};
pub use state::ConnectionState;
pub use table::CorrelationTable;
pub use transport::{Connector, Transport, WsConnector};

pub use clawdesk_proto::{InboundFrame, Metadata, ProtoError, RequestId, ResponseKind};
