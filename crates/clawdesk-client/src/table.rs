//! Correlation table for in-flight requests.
//!
//! Each pending request owns a oneshot continuation and a deadline timer. An
//! entry is claimed at most once under the table lock, whether by a response,
//! an explicit rejection or its own timer, so a late response racing the
//! deadline resolves the caller exactly once.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use clawdesk_proto::{InboundFrame, ProtoError, RequestId};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::debug;

use crate::error::{GatewayError, GatewayResult};

/// Receiving half of a pending request's continuation.
pub type ReplyReceiver = oneshot::Receiver<GatewayResult<InboundFrame>>;

type Entries = Mutex<HashMap<RequestId, PendingRequest>>;

struct PendingRequest {
    reply: oneshot::Sender<GatewayResult<InboundFrame>>,
    timeout: Duration,
    timer: AbortHandle,
}

impl PendingRequest {
    fn complete(self, result: GatewayResult<InboundFrame>) {
        self.timer.abort();
        // The caller may have stopped waiting; nothing to do then.
        let _ = self.reply.send(result);
    }
}

/// Table of requests awaiting a response, keyed by correlation id.
#[derive(Clone)]
pub struct CorrelationTable {
    entries: Arc<Entries>,
    max_in_flight: usize,
}

impl CorrelationTable {
    /// Create an empty table accepting at most `max_in_flight` entries.
    #[must_use]
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            max_in_flight,
        }
    }

    /// Register a pending request and start its deadline timer.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails if `id` is already pending or the in-flight cap is reached. The
    /// existing entries are left untouched in both cases.
    pub fn register(&self, id: RequestId, timeout: Duration) -> GatewayResult<ReplyReceiver> {
        let mut entries = self.entries.lock();

        if entries.contains_key(&id) {
            return Err(ProtoError::DuplicateId(id.to_string()).into());
        }
        if entries.len() >= self.max_in_flight {
            return Err(GatewayError::Connection(format!(
                "too many requests in flight (limit {})",
                self.max_in_flight
            )));
        }

        let (reply, rx) = oneshot::channel();
        let timer = spawn_deadline(Arc::downgrade(&self.entries), id.clone(), timeout);
        entries.insert(
            id,
            PendingRequest {
                reply,
                timeout,
                timer,
            },
        );

        Ok(rx)
    }

    /// Resolve a pending request with a response frame.
    ///
    /// Returns `false` if no request with this id is pending.
    pub fn resolve(&self, id: &RequestId, frame: InboundFrame) -> bool {
        self.route(id, frame).is_none()
    }

    /// Reject a pending request with an error.
    ///
    /// Returns `false` if no request with this id is pending.
    pub fn reject(&self, id: &RequestId, error: GatewayError) -> bool {
        match self.claim(id) {
            Some(pending) => {
                pending.complete(Err(error));
                true
            }
            None => false,
        }
    }

    /// Hand an inbound frame to the request waiting for it.
    ///
    /// Gives the frame back when nobody is waiting for `id`.
    pub fn route(&self, id: &RequestId, frame: InboundFrame) -> Option<InboundFrame> {
        match self.claim(id) {
            Some(pending) => {
                pending.complete(Ok(frame));
                None
            }
            None => Some(frame),
        }
    }

    /// Expire a request whose deadline has passed.
    ///
    /// Rejects with [`GatewayError::Timeout`] if and only if the entry is still
    /// present. Returns whether it was.
    pub fn sweep(&self, id: &RequestId) -> bool {
        expire(&self.entries, id)
    }

    /// Reject every pending request with `error`, returning how many there were.
    pub fn reject_all(&self, error: &GatewayError) -> usize {
        let drained: Vec<PendingRequest> = {
            let mut entries = self.entries.lock();
            entries.drain().map(|(_, pending)| pending).collect()
        };

        let count = drained.len();
        for pending in drained {
            pending.complete(Err(error.clone()));
        }
        count
    }

    /// Number of pending requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no request is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Whether a request with this id is pending.
    #[must_use]
    pub fn contains(&self, id: &RequestId) -> bool {
        self.entries.lock().contains_key(id)
    }

    fn claim(&self, id: &RequestId) -> Option<PendingRequest> {
        self.entries.lock().remove(id)
    }
}

impl std::fmt::Debug for CorrelationTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelationTable")
            .field("pending", &self.len())
            .field("max_in_flight", &self.max_in_flight)
            .finish()
    }
}

fn spawn_deadline(entries: Weak<Entries>, id: RequestId, timeout: Duration) -> AbortHandle {
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        if let Some(entries) = entries.upgrade() {
            expire(&entries, &id);
        }
    })
    .abort_handle()
}

fn expire(entries: &Entries, id: &RequestId) -> bool {
    let Some(pending) = entries.lock().remove(id) else {
        return false;
    };

    debug!(request_id = %id, timeout_ms = pending.timeout.as_millis(), "request timed out");
    let error = GatewayError::Timeout {
        id: id.clone(),
        after: pending.timeout,
    };
    // Aborting the running timer from inside itself is harmless.
    pending.complete(Err(error));
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(30);

    #[tokio::test(start_paused = true)]
    async fn test_resolve_delivers_frame() {
        let table = CorrelationTable::new(8);
        let rx = table.register("r1".into(), TIMEOUT).unwrap();

        assert!(table.resolve(&"r1".into(), InboundFrame::message("r1", "hello")));
        let frame = rx.await.unwrap().unwrap();
        assert_eq!(frame.content, "hello");
        assert!(table.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reject_delivers_error() {
        let table = CorrelationTable::new(8);
        let rx = table.register("r2".into(), TIMEOUT).unwrap();

        assert!(table.reject(&"r2".into(), GatewayError::Application("rate limited".into())));
        assert_eq!(
            rx.await.unwrap().unwrap_err(),
            GatewayError::Application("rate limited".into())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_miss_is_noop() {
        let table = CorrelationTable::new(8);
        let _rx = table.register("r1".into(), TIMEOUT).unwrap();

        assert!(!table.resolve(&"zz".into(), InboundFrame::message("zz", "x")));
        assert!(!table.reject(&"zz".into(), GatewayError::Cancelled));
        assert!(!table.sweep(&"zz".into()));
        assert_eq!(table.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_route_returns_frame_on_miss() {
        let table = CorrelationTable::new(8);
        let frame = InboundFrame::message("nobody", "stray");

        let returned = table.route(&"nobody".into(), frame.clone());
        assert_eq!(returned, Some(frame));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_id_rejected_without_disturbing_entry() {
        let table = CorrelationTable::new(8);
        let rx = table.register("r1".into(), TIMEOUT).unwrap();

        let err = table.register("r1".into(), TIMEOUT).unwrap_err();
        assert_eq!(err, GatewayError::Protocol(ProtoError::DuplicateId("r1".into())));

        assert!(table.resolve(&"r1".into(), InboundFrame::message("r1", "still here")));
        assert_eq!(rx.await.unwrap().unwrap().content, "still here");
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_cap() {
        let table = CorrelationTable::new(2);
        let _a = table.register("a".into(), TIMEOUT).unwrap();
        let _b = table.register("b".into(), TIMEOUT).unwrap();

        let err = table.register("c".into(), TIMEOUT).unwrap_err();
        assert!(matches!(err, GatewayError::Connection(_)));
        assert_eq!(table.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_rejects_with_timeout() {
        let table = CorrelationTable::new(8);
        let rx = table.register("r1".into(), Duration::from_millis(500)).unwrap();
        let _other = table.register("r2".into(), TIMEOUT).unwrap();

        let err = rx.await.unwrap().unwrap_err();
        assert_eq!(
            err,
            GatewayError::Timeout {
                id: "r1".into(),
                after: Duration::from_millis(500),
            }
        );
        assert!(!table.contains(&"r1".into()));
        assert_eq!(table.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolution_cancels_deadline() {
        let table = CorrelationTable::new(8);
        let rx = table.register("r1".into(), Duration::from_millis(100)).unwrap();
        assert!(table.resolve(&"r1".into(), InboundFrame::action("r1")));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_after_sweep_is_ignored() {
        let table = CorrelationTable::new(8);
        let rx = table.register("r1".into(), TIMEOUT).unwrap();

        assert!(table.sweep(&"r1".into()));
        assert!(!table.resolve(&"r1".into(), InboundFrame::message("r1", "late")));
        assert!(matches!(rx.await.unwrap(), Err(GatewayError::Timeout { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reject_all() {
        let table = CorrelationTable::new(8);
        let receivers: Vec<_> = (1..=3)
            .map(|n| table.register(RequestId::sequential(n), TIMEOUT).unwrap())
            .collect();

        assert_eq!(table.reject_all(&GatewayError::Cancelled), 3);
        assert!(table.is_empty());
        for rx in receivers {
            assert_eq!(rx.await.unwrap().unwrap_err(), GatewayError::Cancelled);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_receiver_does_not_break_resolution() {
        let table = CorrelationTable::new(8);
        drop(table.register("r1".into(), TIMEOUT).unwrap());

        assert!(table.resolve(&"r1".into(), InboundFrame::message("r1", "unheard")));
        assert!(table.is_empty());
    }
}
