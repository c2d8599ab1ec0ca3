//! Inbound frame dispatch.
//!
//! Every text frame read from the transport goes through [`Dispatcher::dispatch`]:
//! responses are routed to the request waiting for them, everything else is
//! broadcast to subscribers.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use clawdesk_proto::{codec, InboundFrame};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::GatewayError;
use crate::table::CorrelationTable;

/// Callback invoked for every frame that is not a response to a pending request.
pub type Subscriber = Arc<dyn Fn(&InboundFrame) + Send + Sync>;

/// Handle returned by [`Subscribers::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// What happened to an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    /// Delivered to its pending request.
    Resolved,
    /// An error frame rejected its pending request.
    Rejected,
    /// No pending request matched; handed to subscribers.
    Broadcast {
        /// Number of subscribers that handled the frame without panicking.
        delivered: usize,
    },
    /// The frame failed to decode and was discarded.
    Dropped,
}

/// Registry of frame subscribers.
#[derive(Default)]
pub struct Subscribers {
    next_id: AtomicU64,
    entries: RwLock<Vec<(SubscriptionId, Subscriber)>>,
}

impl Subscribers {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&InboundFrame) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.write().push((id, Arc::new(callback)));
        id
    }

    /// Remove a callback. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(sub, _)| *sub != id);
        entries.len() != before
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no callback is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Deliver a frame to every subscriber, returning how many handled it.
    ///
    /// Callbacks run outside the registry lock. A panicking callback is logged
    /// and skipped.
    pub fn broadcast(&self, frame: &InboundFrame) -> usize {
        let snapshot: Vec<(SubscriptionId, Subscriber)> = self.entries.read().clone();

        let mut delivered = 0;
        for (id, callback) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| callback(frame))) {
                Ok(()) => delivered += 1,
                Err(_) => warn!(subscription = id.0, kind = %frame.kind, "subscriber panicked"),
            }
        }
        delivered
    }
}

impl std::fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers")
            .field("count", &self.len())
            .finish()
    }
}

/// Routes decoded frames to the correlation table or to subscribers.
#[derive(Debug)]
pub struct Dispatcher {
    table: CorrelationTable,
    subscribers: Subscribers,
}

impl Dispatcher {
    /// Create a dispatcher over the given table.
    #[must_use]
    pub fn new(table: CorrelationTable) -> Self {
        Self {
            table,
            subscribers: Subscribers::new(),
        }
    }

    /// The subscriber registry.
    #[must_use]
    pub const fn subscribers(&self) -> &Subscribers {
        &self.subscribers
    }

    /// Decode and route one text frame.
    pub fn dispatch(&self, text: &str) -> Routed {
        let frame = match codec::decode(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "dropping undecodable frame");
                return Routed::Dropped;
            }
        };

        self.dispatch_frame(frame)
    }

    /// Route an already decoded frame.
    pub fn dispatch_frame(&self, frame: InboundFrame) -> Routed {
        let Some(id) = frame.id.clone() else {
            return self.broadcast(&frame);
        };

        if frame.is_error() {
            let error = GatewayError::Application(frame.content.clone());
            if self.table.reject(&id, error) {
                debug!(request_id = %id, "request rejected by gateway");
                return Routed::Rejected;
            }
            return self.broadcast(&frame);
        }

        match self.table.route(&id, frame) {
            None => {
                debug!(request_id = %id, "request resolved");
                Routed::Resolved
            }
            Some(frame) => self.broadcast(&frame),
        }
    }

    fn broadcast(&self, frame: &InboundFrame) -> Routed {
        let delivered = self.subscribers.broadcast(frame);
        debug!(kind = %frame.kind, delivered, "frame broadcast");
        Routed::Broadcast { delivered }
    }
}
