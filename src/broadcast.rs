//! Fan-out of progress events to any number of connected listeners.
//!
//! ## Design
//!
//! Each listener owns a bounded `tokio::sync::mpsc` channel; the
//! [`Broadcaster`] keeps the sender half in a mutex-guarded registry keyed
//! by token. `publish` walks the registry under the lock and `try_send`s a
//! copy of the event to every sender — it never awaits, so a slow or
//! stalled listener can only lose its own events, never delay the pipeline
//! or other listeners. Listeners whose receiver is gone are pruned during
//! the same `publish` call; explicit [`Broadcaster::unregister`] is
//! idempotent so the connection layer and the pruning path can race freely.
//!
//! Late joiners receive only events published after they registered. There
//! is no backlog replay; per-listener ordering is the channel's FIFO order,
//! and nothing is guaranteed across listeners.

use crate::progress::ProgressEvent;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Opaque handle identifying one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken(u64);

/// Registry of connected listeners plus the fan-out itself.
///
/// All methods take `&self` and are safe to call concurrently from any mix
/// of tasks.
pub struct Broadcaster {
    next_token: AtomicU64,
    listeners: Mutex<HashMap<u64, mpsc::Sender<ProgressEvent>>>,
    buffer: usize,
}

impl Broadcaster {
    /// Create a broadcaster whose per-listener channels hold `buffer`
    /// undelivered events before further events are dropped for that
    /// listener.
    pub fn new(buffer: usize) -> Self {
        Self {
            next_token: AtomicU64::new(0),
            listeners: Mutex::new(HashMap::new()),
            buffer: buffer.max(1),
        }
    }

    /// Register a new listener.
    ///
    /// Returns the token to unregister with and the receiving half of the
    /// listener's private channel. Dropping the receiver is also a valid
    /// way to disconnect: the entry is pruned on the next `publish`.
    pub fn register(&self) -> (ListenerToken, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(self.buffer);
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let count = {
            let mut listeners = self.listeners.lock();
            listeners.insert(token, tx);
            listeners.len()
        };
        debug!(token, listeners = count, "Listener registered");
        (ListenerToken(token), rx)
    }

    /// Remove a listener. Idempotent: unknown or already-removed tokens are
    /// a no-op.
    pub fn unregister(&self, token: ListenerToken) {
        let removed = self.listeners.lock().remove(&token.0).is_some();
        if removed {
            debug!(token = token.0, "Listener unregistered");
        }
    }

    /// Deliver `event` to every registered listener, best-effort.
    ///
    /// Never blocks. A listener with a full buffer misses this event; a
    /// listener whose receiver was dropped is removed from the registry.
    pub fn publish(&self, event: ProgressEvent) {
        let mut listeners = self.listeners.lock();
        trace!(listeners = listeners.len(), event = %event.to_wire(), "Broadcasting");
        listeners.retain(|token, tx| match tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                // Stalled reader: drop this event for them, keep the entry.
                trace!(token, "Listener buffer full; event dropped");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(token, "Listener gone; pruning");
                false
            }
        });
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::JobStatus;

    fn event(step: u8) -> ProgressEvent {
        ProgressEvent::step(step, JobStatus::Downloading)
    }

    #[tokio::test]
    async fn publish_reaches_all_listeners_in_order() {
        let b = Broadcaster::new(8);
        let (_t1, mut rx1) = b.register();
        let (_t2, mut rx2) = b.register();

        b.publish(event(1));
        b.publish(event(2));

        assert_eq!(rx1.recv().await.unwrap().step, Some(1));
        assert_eq!(rx1.recv().await.unwrap().step, Some(2));
        assert_eq!(rx2.recv().await.unwrap().step, Some(1));
        assert_eq!(rx2.recv().await.unwrap().step, Some(2));
    }

    #[tokio::test]
    async fn publish_with_zero_listeners_is_a_noop() {
        let b = Broadcaster::new(8);
        b.publish(event(1));
        assert_eq!(b.listener_count(), 0);
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let b = Broadcaster::new(8);
        let (t1, _rx1) = b.register();
        let (_t2, mut rx2) = b.register();

        b.unregister(t1);
        b.unregister(t1); // second removal is a no-op

        b.publish(event(3));
        assert_eq!(rx2.recv().await.unwrap().step, Some(3));
        assert_eq!(b.listener_count(), 1);
    }

    #[tokio::test]
    async fn dropped_receiver_is_pruned_on_publish() {
        let b = Broadcaster::new(8);
        let (_t1, rx1) = b.register();
        drop(rx1);
        assert_eq!(b.listener_count(), 1);

        b.publish(event(1));
        assert_eq!(b.listener_count(), 0);
    }

    #[tokio::test]
    async fn slow_listener_loses_events_without_blocking() {
        let b = Broadcaster::new(1);
        let (_t1, mut rx1) = b.register();

        // Second and third events overflow the capacity-1 buffer and are
        // dropped for this listener; publish itself never blocks.
        b.publish(event(1));
        b.publish(event(2));
        b.publish(event(3));

        assert_eq!(rx1.recv().await.unwrap().step, Some(1));
        assert!(rx1.try_recv().is_err());
        // Still registered: a stalled reader is not a disconnect.
        assert_eq!(b.listener_count(), 1);
    }

    #[tokio::test]
    async fn late_joiner_sees_only_future_events() {
        let b = Broadcaster::new(8);
        b.publish(event(1));
        b.publish(event(2));

        let (_t, mut rx) = b.register();
        b.publish(event(3));

        assert_eq!(rx.recv().await.unwrap().step, Some(3));
        assert!(rx.try_recv().is_err());
    }
}
