//! Connection lifecycle management.
//!
//! [`ConnectionManager`] owns the single transport of a client. It tracks the
//! [`ConnectionState`], feeds inbound frames to the [`Dispatcher`] from one
//! reader task, and recovers from unexpected closes with exponential backoff.
//!
//! Every installed transport carries an epoch. `connect`, `disconnect` and an
//! observed close each bump it, so late notifications from a superseded
//! transport or reconnection task are recognized and ignored.

use std::sync::{Arc, Weak};
use std::time::Duration;

use clawdesk_proto::RequestId;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::dispatch::Dispatcher;
use crate::error::{GatewayError, GatewayResult};
use crate::state::ConnectionState;
use crate::table::{CorrelationTable, ReplyReceiver};
use crate::transport::{Connector, Transport};

#[derive(Debug, Default)]
struct Link {
    outbound: Option<mpsc::Sender<String>>,
    epoch: u64,
    reader: Option<AbortHandle>,
    reconnect: Option<AbortHandle>,
}

enum Attempt {
    Connected,
    Failed,
    Superseded,
}

/// Owns the gateway transport and its reconnection policy.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    config: ClientConfig,
    state_tx: watch::Sender<ConnectionState>,
    link: Mutex<Link>,
    // Serializes dials so at most one transport is ever open.
    lifecycle: tokio::sync::Mutex<()>,
    table: CorrelationTable,
    dispatcher: Arc<Dispatcher>,
}

impl<C: Connector> ConnectionManager<C> {
    /// Create a disconnected manager.
    #[must_use]
    pub fn new(config: ClientConfig, connector: C) -> Arc<Self> {
        let table = CorrelationTable::new(config.max_in_flight);
        let dispatcher = Arc::new(Dispatcher::new(table.clone()));
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);

        Arc::new(Self {
            connector,
            config,
            state_tx,
            link: Mutex::new(Link::default()),
            lifecycle: tokio::sync::Mutex::new(()),
            table,
            dispatcher,
        })
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Configuration this manager was built with.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Pending requests.
    #[must_use]
    pub const fn table(&self) -> &CorrelationTable {
        &self.table
    }

    /// Inbound frame dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Open the transport.
    ///
    /// A no-op when already connected. Cancels any scheduled reconnection and
    /// resets the attempt counter.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Connection`] if the transport cannot be
    /// established, or [`GatewayError::Cancelled`] if [`disconnect`] ran while
    /// dialing.
    ///
    /// [`disconnect`]: Self::disconnect
    pub async fn connect(self: &Arc<Self>) -> GatewayResult<()> {
        let _guard = self.lifecycle.lock().await;

        let epoch = {
            let mut link = self.link.lock();
            if self.state().is_connected() {
                return Ok(());
            }
            if let Some(task) = link.reconnect.take() {
                task.abort();
            }
            link.epoch += 1;
            self.set_state(ConnectionState::Connecting);
            link.epoch
        };

        info!(endpoint = %self.config.endpoint, "connecting to gateway");
        match self.connector.connect(&self.config.endpoint).await {
            Ok(transport) => self.install(transport, epoch),
            Err(e) => {
                let link = self.link.lock();
                if link.epoch == epoch {
                    self.set_state(ConnectionState::Disconnected);
                }
                warn!(endpoint = %self.config.endpoint, error = %e, "failed to connect to gateway");
                Err(e)
            }
        }
    }

    /// Close the transport and cancel everything in flight.
    ///
    /// Every pending request is rejected with [`GatewayError::Cancelled`]
    /// before this returns. Returns the number of rejected requests.
    pub fn disconnect(&self) -> usize {
        let (outbound, reader, reconnect) = {
            let mut link = self.link.lock();
            link.epoch += 1;
            let taken = (
                link.outbound.take(),
                link.reader.take(),
                link.reconnect.take(),
            );
            self.set_state(ConnectionState::Disconnected);
            taken
        };

        drop(outbound);
        for task in [reader, reconnect].into_iter().flatten() {
            task.abort();
        }

        let rejected = self.table.reject_all(&GatewayError::Cancelled);
        info!(rejected, "disconnected from gateway");
        rejected
    }

    /// Register a request and hand back the transport to send it on.
    ///
    /// The entry is added under the link lock, so a concurrent
    /// [`disconnect`] or connection loss either sees it in its drain or makes
    /// this call fail. It never strands an entry on a dead transport.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Connection`] unless the state is Connected, or
    /// whatever [`CorrelationTable::register`] rejects.
    ///
    /// [`disconnect`]: Self::disconnect
    pub fn begin_request(
        &self,
        id: RequestId,
        timeout: Duration,
    ) -> GatewayResult<(mpsc::Sender<String>, ReplyReceiver)> {
        let link = self.link.lock();
        let outbound = match (&link.outbound, self.state()) {
            (Some(outbound), state) if state.is_connected() => outbound.clone(),
            (_, state) => return Err(GatewayError::Connection(format!("not connected ({state})"))),
        };
        let reply = self.table.register(id, timeout)?;
        Ok((outbound, reply))
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "connection state changed");
        }
    }

    fn install(self: &Arc<Self>, transport: Transport, epoch: u64) -> GatewayResult<()> {
        let mut link = self.link.lock();
        if link.epoch != epoch {
            debug!(epoch, current = link.epoch, "discarding superseded transport");
            return Err(GatewayError::Cancelled);
        }

        let Transport { outbound, inbound } = transport;
        let reader = tokio::spawn(read_loop(
            Arc::downgrade(self),
            Arc::clone(&self.dispatcher),
            inbound,
            epoch,
        ));

        link.outbound = Some(outbound);
        link.reader = Some(reader.abort_handle());
        link.reconnect = None;
        self.set_state(ConnectionState::Connected);
        info!(endpoint = %self.config.endpoint, "connected to gateway");
        Ok(())
    }

    fn on_transport_closed(self: &Arc<Self>, epoch: u64) {
        {
            let mut link = self.link.lock();
            if link.epoch != epoch || !self.state().is_connected() {
                return;
            }

            link.epoch += 1;
            link.outbound = None;
            link.reader = None;

            warn!(endpoint = %self.config.endpoint, "gateway connection lost");
            if !self.config.reconnect.should_reconnect(1) {
                self.set_state(ConnectionState::Failed);
                error!("reconnection disabled, giving up");
            } else {
                self.set_state(ConnectionState::Reconnecting { attempt: 1 });
                let task = tokio::spawn(reconnect_loop(Arc::downgrade(self), link.epoch));
                link.reconnect = Some(task.abort_handle());
            }
        }

        let rejected = self.table.reject_all(&GatewayError::Cancelled);
        if rejected > 0 {
            debug!(rejected, "cancelled requests on connection loss");
        }
    }

    /// Moves to `Reconnecting { attempt }` unless the loop was superseded.
    fn begin_attempt(&self, epoch: u64, attempt: u32) -> bool {
        let link = self.link.lock();
        if link.epoch != epoch {
            return false;
        }
        self.set_state(ConnectionState::Reconnecting { attempt });
        true
    }

    async fn try_reconnect(self: &Arc<Self>, epoch: u64, attempt: u32) -> Attempt {
        let _guard = self.lifecycle.lock().await;
        if self.link.lock().epoch != epoch {
            return Attempt::Superseded;
        }

        match self.connector.connect(&self.config.endpoint).await {
            Ok(transport) => match self.install(transport, epoch) {
                Ok(()) => {
                    info!(attempt, "reconnected to gateway");
                    Attempt::Connected
                }
                Err(_) => Attempt::Superseded,
            },
            Err(e) => {
                warn!(attempt, error = %e, "reconnection attempt failed");
                Attempt::Failed
            }
        }
    }

    fn give_up(&self, epoch: u64) {
        let mut link = self.link.lock();
        if link.epoch != epoch {
            return;
        }
        link.reconnect = None;
        self.set_state(ConnectionState::Failed);
        error!(
            attempts = self.config.reconnect.max_attempts,
            "reconnection attempts exhausted"
        );
    }
}

impl<C: Connector> Drop for ConnectionManager<C> {
    fn drop(&mut self) {
        let link = self.link.get_mut();
        for task in [link.reader.take(), link.reconnect.take()].into_iter().flatten() {
            task.abort();
        }
    }
}

impl<C: Connector> std::fmt::Debug for ConnectionManager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("endpoint", &self.config.endpoint)
            .field("state", &self.state())
            .field("pending", &self.table.len())
            .finish_non_exhaustive()
    }
}

async fn read_loop<C: Connector>(
    manager: Weak<ConnectionManager<C>>,
    dispatcher: Arc<Dispatcher>,
    mut inbound: mpsc::Receiver<String>,
    epoch: u64,
) {
    while let Some(text) = inbound.recv().await {
        debug!(bytes = text.len(), "frame received");
        dispatcher.dispatch(&text);
    }

    if let Some(manager) = manager.upgrade() {
        manager.on_transport_closed(epoch);
    }
}

async fn reconnect_loop<C: Connector>(manager: Weak<ConnectionManager<C>>, epoch: u64) {
    let Some(policy) = manager.upgrade().map(|m| m.config.reconnect.clone()) else {
        return;
    };

    for (attempt, delay) in (1..).zip(policy.schedule()) {
        match manager.upgrade() {
            Some(m) if m.begin_attempt(epoch, attempt) => {}
            _ => return,
        }

        debug!(attempt, delay_ms = delay.as_millis(), "scheduling reconnection attempt");
        tokio::time::sleep(delay).await;

        let Some(m) = manager.upgrade() else {
            return;
        };
        match m.try_reconnect(epoch, attempt).await {
            Attempt::Connected | Attempt::Superseded => return,
            Attempt::Failed => {}
        }
    }

    if let Some(m) = manager.upgrade() {
        m.give_up(epoch);
    }
}
