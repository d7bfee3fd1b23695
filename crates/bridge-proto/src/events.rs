//! Bridge event hub with explicit subscribe/unsubscribe per topic.
//!
//! The bridge publishes on three topics.  Delivery within a topic follows
//! emission order (listeners are called synchronously from `emit`); there is
//! no ordering guarantee across topics, since the producers for different
//! topics may run on different tasks.
//!
//! `subscribe` hands back a [`Subscription`].  Calling
//! [`Subscription::unsubscribe`] (or dropping it) removes the listener.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Topic {
    Log,
    PublicUrl,
    Stopped,
}

impl Topic {
    pub const ALL: [Topic; 3] = [Topic::Log, Topic::PublicUrl, Topic::Stopped];

    /// Wire name of the topic.
    pub fn name(self) -> &'static str {
        match self {
            Topic::Log => "log",
            Topic::PublicUrl => "publicURL",
            Topic::Stopped => "stopped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    Log(String),
    PublicUrl(String),
    Stopped,
}

impl BridgeEvent {
    pub fn topic(&self) -> Topic {
        match self {
            BridgeEvent::Log(_) => Topic::Log,
            BridgeEvent::PublicUrl(_) => Topic::PublicUrl,
            BridgeEvent::Stopped => Topic::Stopped,
        }
    }
}

type Listener = Box<dyn Fn(&BridgeEvent) + Send + Sync>;

#[derive(Default)]
struct HubInner {
    next_id: u64,
    listeners: BTreeMap<(Topic, u64), Arc<Listener>>,
}

/// Cheaply cloneable publisher/subscriber registry.
#[derive(Clone, Default)]
pub struct EventHub {
    inner: Arc<Mutex<HubInner>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, topic: Topic, listener: F) -> Subscription
    where
        F: Fn(&BridgeEvent) + Send + Sync + 'static,
    {
        let mut inner = lock(&self.inner);
        inner.next_id += 1;
        let id = inner.next_id;
        let listener: Listener = Box::new(listener);
        inner.listeners.insert((topic, id), Arc::new(listener));
        Subscription {
            hub: Arc::downgrade(&self.inner),
            key: Some((topic, id)),
        }
    }

    /// Deliver `event` to every listener of its topic, in subscription order.
    pub fn emit(&self, event: BridgeEvent) {
        let topic = event.topic();
        // Snapshot so listeners may subscribe/unsubscribe without deadlocking.
        let targets: Vec<Arc<Listener>> = {
            let inner = lock(&self.inner);
            inner
                .listeners
                .range((topic, 0)..=(topic, u64::MAX))
                .map(|(_, l)| Arc::clone(l))
                .collect()
        };
        for listener in targets {
            listener(&event);
        }
    }

    pub fn listener_count(&self, topic: Topic) -> usize {
        lock(&self.inner)
            .listeners
            .range((topic, 0)..=(topic, u64::MAX))
            .count()
    }
}

fn lock(inner: &Mutex<HubInner>) -> std::sync::MutexGuard<'_, HubInner> {
    // A listener that panicked leaves the map itself intact.
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Cancellation handle for one listener.
pub struct Subscription {
    hub: Weak<Mutex<HubInner>>,
    key: Option<(Topic, u64)>,
}

impl Subscription {
    pub fn topic(&self) -> Option<Topic> {
        self.key.map(|(t, _)| t)
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let (Some(key), Some(hub)) = (self.key.take(), self.hub.upgrade()) {
            lock(&hub).listeners.remove(&key);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
