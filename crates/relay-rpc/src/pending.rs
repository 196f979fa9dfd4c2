//! Pending-call registry.
//!
//! The bridge between the synchronous call surface and the asynchronous
//! broker: each in-flight call parks a oneshot sender here under its
//! correlation ID, and the reply dispatcher completes it when (if) the
//! matching reply arrives. Exactly one of completion, timeout, or
//! cancellation consumes each entry.

use dashmap::DashMap;
use relay_types::CorrelationId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

/// What the dispatcher hands back to a waiting caller.
#[derive(Debug)]
pub struct PendingReply {
    pub correlation_id: CorrelationId,
    /// Raw reply payload, still undecoded. The caller owns interpretation.
    pub payload: serde_json::Value,
}

/// One in-flight call.
struct PendingCall {
    sender: oneshot::Sender<PendingReply>,
    created_at: Instant,
    deadline: Instant,
    /// Routing key the request went out under. Logging only.
    routing_key: String,
}

/// Monotonic counters over the life of the store.
#[derive(Debug, Default)]
pub struct PendingStats {
    pub registered: AtomicU64,
    pub completed: AtomicU64,
    pub timed_out: AtomicU64,
    pub cancelled: AtomicU64,
}

/// Concurrent registry of in-flight calls keyed by correlation ID.
///
/// All operations are lock-free reads/writes on a sharded map; `register`
/// and `complete` race safely because removal is the commit point: whichever
/// side removes the entry owns the oneshot sender.
pub struct PendingCallStore {
    calls: DashMap<CorrelationId, PendingCall>,
    default_timeout: Duration,
    stats: PendingStats,
}

impl PendingCallStore {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            calls: DashMap::new(),
            default_timeout,
            stats: PendingStats::default(),
        }
    }

    /// Register a new call. Generates the correlation ID and returns it with
    /// the receiver the caller awaits on.
    pub fn register(
        &self,
        routing_key: &str,
        timeout: Option<Duration>,
    ) -> (CorrelationId, oneshot::Receiver<PendingReply>) {
        let correlation_id = CorrelationId::new();
        let (sender, receiver) = oneshot::channel();
        let now = Instant::now();
        let timeout = timeout.unwrap_or(self.default_timeout);

        self.calls.insert(
            correlation_id,
            PendingCall {
                sender,
                created_at: now,
                deadline: now + timeout,
                routing_key: routing_key.to_string(),
            },
        );
        self.stats.registered.fetch_add(1, Ordering::Relaxed);
        trace!(
            correlation_id = %correlation_id,
            routing_key = %routing_key,
            timeout_ms = timeout.as_millis() as u64,
            "Registered pending call"
        );

        (correlation_id, receiver)
    }

    /// Complete a call with a reply. Returns `false` when no call with this
    /// ID is pending, which covers unknown, duplicate, and late replies
    /// alike.
    pub fn complete(&self, correlation_id: CorrelationId, payload: serde_json::Value) -> bool {
        let Some((_, call)) = self.calls.remove(&correlation_id) else {
            return false;
        };

        let elapsed = call.created_at.elapsed();
        let reply = PendingReply {
            correlation_id,
            payload,
        };
        // A send failure means the caller already gave up and dropped the
        // receiver. The entry is gone either way.
        if call.sender.send(reply).is_ok() {
            self.stats.completed.fetch_add(1, Ordering::Relaxed);
            debug!(
                correlation_id = %correlation_id,
                routing_key = %call.routing_key,
                elapsed_ms = elapsed.as_millis() as u64,
                "Completed pending call"
            );
        }
        true
    }

    /// Remove a call whose deadline elapsed. Returns `false` when the reply
    /// won the race and the entry is already gone.
    pub fn expire(&self, correlation_id: &CorrelationId) -> bool {
        let Some((_, call)) = self.calls.remove(correlation_id) else {
            return false;
        };
        self.stats.timed_out.fetch_add(1, Ordering::Relaxed);
        warn!(
            correlation_id = %correlation_id,
            routing_key = %call.routing_key,
            waited_ms = call.created_at.elapsed().as_millis() as u64,
            "Pending call timed out"
        );
        true
    }

    /// Remove a call that will never get a reply (publish failed, connection
    /// severed). Returns `false` when the entry is already gone.
    pub fn cancel(&self, correlation_id: &CorrelationId) -> bool {
        let removed = self.calls.remove(correlation_id).is_some();
        if removed {
            self.stats.cancelled.fetch_add(1, Ordering::Relaxed);
            debug!(correlation_id = %correlation_id, "Cancelled pending call");
        }
        removed
    }

    /// Evict every call whose deadline has passed. Returns how many were
    /// evicted. Safety net for callers that vanished without cancelling.
    pub fn remove_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<CorrelationId> = self
            .calls
            .iter()
            .filter(|entry| entry.deadline <= now)
            .map(|entry| *entry.key())
            .collect();

        let mut removed = 0;
        for correlation_id in expired {
            if self.expire(&correlation_id) {
                removed += 1;
            }
        }
        removed
    }

    pub fn is_pending(&self, correlation_id: &CorrelationId) -> bool {
        self.calls.contains_key(correlation_id)
    }

    pub fn pending_count(&self) -> usize {
        self.calls.len()
    }

    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}

/// Background watchdog that periodically evicts expired calls.
///
/// Runs until the store has no other owners.
pub async fn sweeper_task(store: Arc<PendingCallStore>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        if Arc::strong_count(&store) == 1 {
            debug!("Pending-call sweeper stopping; store released");
            return;
        }
        let removed = store.remove_expired();
        if removed > 0 {
            debug!(removed, "Swept expired pending calls");
        }
    }
}
