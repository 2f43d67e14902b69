use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::{Mutex, mpsc};

use crate::event::{CallEvent, unix_now};
use crate::stats::{StatSnapshot, StatWindow};

// A single slot is the closest tokio gets to a rendezvous channel: an appender
// only gets ahead of a subscriber by one event.
const DELIVERY_CAPACITY: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default)]
struct LogState {
    events: Vec<CallEvent>,
    subscribers: BTreeMap<SubscriptionId, mpsc::Sender<CallEvent>>,
}

#[derive(Debug, Default)]
struct Shared {
    state: RwLock<LogState>,
    delivery: Mutex<()>,
    next_id: AtomicU64,
}

impl Shared {
    fn read(&self) -> RwLockReadGuard<'_, LogState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LogState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Delivery is synchronous: `append` returns once every subscriber registered
/// at store time has taken the event. Readers never wait on a slow subscriber.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    shared: Arc<Shared>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn append(&self, event: CallEvent) {
        let _sequence = self.shared.delivery.lock().await;

        let subscribers: Vec<(SubscriptionId, mpsc::Sender<CallEvent>)> = {
            let mut state = self.shared.write();
            state.events.push(event.clone());
            state
                .subscribers
                .iter()
                .map(|(id, tx)| (*id, tx.clone()))
                .collect()
        };

        tracing::trace!(
            consumer = %event.consumer,
            method = %event.method,
            subscribers = subscribers.len(),
            "event appended"
        );

        for (id, tx) in subscribers {
            if tx.send(event.clone()).await.is_err() {
                tracing::debug!(subscription = %id, "subscription closed before delivery");
            }
        }
    }

    pub fn subscribe(&self) -> Subscription {
        let id = SubscriptionId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(DELIVERY_CAPACITY);

        self.shared.write().subscribers.insert(id, tx);
        tracing::debug!(subscription = %id, "subscription registered");

        Subscription {
            id,
            receiver: rx,
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn list_since(&self, since: i64, to: i64) -> StatSnapshot {
        let state = self.shared.read();
        let mut seen = HashSet::new();
        let mut window = StatWindow::new(since);

        for event in state
            .events
            .iter()
            .filter(|e| e.timestamp >= since && e.timestamp <= to)
        {
            if seen.insert(event.key()) {
                window.record(event);
            }
        }

        let snapshot = window.take(unix_now());
        tracing::debug!(
            since,
            to,
            distinct = seen.len(),
            "statistics snapshot computed"
        );
        snapshot
    }

    pub fn history(&self) -> Vec<CallEvent> {
        self.shared.read().events.clone()
    }

    pub fn len(&self) -> usize {
        self.shared.read().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.read().events.is_empty()
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.read().subscribers.len()
    }
}

#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    receiver: mpsc::Receiver<CallEvent>,
    shared: Arc<Shared>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub async fn recv(&mut self) -> Option<CallEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<CallEvent> {
        self.receiver.try_recv().ok()
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut state = self.shared.write();
        state.subscribers.remove(&self.id);
        self.receiver.close();
        tracing::debug!(subscription = %self.id, "subscription removed");
    }
}
