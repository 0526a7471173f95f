//! Event emitter.
//!
//! Delivery is synchronous: `emit` returns after every matching subscriber
//! has seen the event. The subscriber list is snapshotted first, so callbacks
//! may subscribe or unsubscribe while an event is being delivered. A
//! broadcast feed mirrors every event for async listeners.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tessera_core::{DashboardEvent, EventKind};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::error;

pub type EventCallback = Arc<dyn Fn(&DashboardEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Clone)]
struct Subscriber {
    id: SubscriptionId,
    filter: Option<EventKind>,
    callback: EventCallback,
}

pub struct EventEmitter {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
    feed: broadcast::Sender<DashboardEvent>,
}

impl EventEmitter {
    pub fn new(feed_capacity: usize) -> Self {
        let (feed, _) = broadcast::channel(feed_capacity.max(1));
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            feed,
        }
    }

    /// Register `callback` for events of `filter` (all events when `None`).
    pub fn subscribe(
        &self,
        filter: Option<EventKind>,
        callback: impl Fn(&DashboardEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().push(Subscriber {
            id,
            filter,
            callback: Arc::new(callback),
        });
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn emit(&self, event: &DashboardEvent) {
        let snapshot: Vec<Subscriber> = self.subscribers.lock().clone();
        for subscriber in snapshot
            .iter()
            .filter(|s| s.filter.map_or(true, |k| k == event.kind))
        {
            let callback = &subscriber.callback;
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                error!(event = %event.kind, subscriber = subscriber.id.0, "event subscriber panicked");
            }
        }
        // no receivers is fine
        let _ = self.feed.send(event.clone());
    }

    pub fn feed(&self) -> broadcast::Receiver<DashboardEvent> {
        self.feed.subscribe()
    }

    pub fn stream(&self) -> BroadcastStream<DashboardEvent> {
        BroadcastStream::new(self.feed.subscribe())
    }
}
