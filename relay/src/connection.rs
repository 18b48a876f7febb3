use axum::extract::ws::{Message, Utf8Bytes};
use log::*;
use std::collections::HashMap;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;
use tokio::sync::Mutex;

/// Unique identifier for a subscriber (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriberId(String);

impl SubscriberId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a frame could not be handed to a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    /// The subscriber's connection task is gone.
    Closed,
    /// The subscriber's outbound queue is full; it is not keeping up.
    Lagging,
}

/// Outbound half of one subscriber: a bounded queue drained by that
/// subscriber's connection task.
#[derive(Debug, Clone)]
pub struct SubscriberSink {
    sender: Sender<Message>,
}

impl SubscriberSink {
    pub fn new(sender: Sender<Message>) -> Self {
        Self { sender }
    }

    /// Queues a text frame without waiting.
    pub fn deliver(&self, frame: &Utf8Bytes) -> Result<(), DeliveryError> {
        self.sender
            .try_send(Message::Text(frame.clone()))
            .map_err(|err| match err {
                TrySendError::Full(_) => DeliveryError::Lagging,
                TrySendError::Closed(_) => DeliveryError::Closed,
            })
    }
}

/// Verdict returned by a [`SubscriberRegistry::for_each_live`] visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Alive,
    Dead,
}

/// The set of live subscribers.
///
/// Membership is the liveness state: a subscriber is alive exactly as long as it
/// is registered. One lock covers every insertion, removal and full iteration.
pub struct SubscriberRegistry {
    sinks: Mutex<HashMap<SubscriberId, SubscriberSink>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            sinks: Mutex::new(HashMap::new()),
        }
    }

    /// Adds a sink and returns the id it is known by.
    pub async fn register(&self, sink: SubscriberSink) -> SubscriberId {
        let subscriber_id = SubscriberId::new();
        self.sinks.lock().await.insert(subscriber_id.clone(), sink);
        subscriber_id
    }

    /// Removes a subscriber. Returns `false` if it was already gone.
    pub async fn evict(&self, subscriber_id: &SubscriberId) -> bool {
        let mut sinks = self.sinks.lock().await;
        Self::remove_locked(&mut sinks, subscriber_id)
    }

    /// Runs `visit` against every live sink while holding the registry lock and
    /// evicts, before releasing it, each sink the visitor reports as dead.
    /// Returns the evicted ids.
    pub async fn for_each_live<F>(&self, mut visit: F) -> Vec<SubscriberId>
    where
        F: FnMut(&SubscriberId, &SubscriberSink) -> Liveness,
    {
        let mut sinks = self.sinks.lock().await;

        let mut dead = Vec::new();
        for (subscriber_id, sink) in sinks.iter() {
            if visit(subscriber_id, sink) == Liveness::Dead {
                dead.push(subscriber_id.clone());
            }
        }

        for subscriber_id in &dead {
            Self::remove_locked(&mut sinks, subscriber_id);
        }

        dead
    }

    pub async fn len(&self) -> usize {
        self.sinks.lock().await.len()
    }

    #[cfg(test)]
    async fn is_empty(&self) -> bool {
        self.sinks.lock().await.is_empty()
    }

    #[cfg(test)]
    async fn contains(&self, subscriber_id: &SubscriberId) -> bool {
        self.sinks.lock().await.contains_key(subscriber_id)
    }

    // Single removal path shared by broadcast eviction and connection teardown.
    fn remove_locked(
        sinks: &mut HashMap<SubscriberId, SubscriberSink>,
        subscriber_id: &SubscriberId,
    ) -> bool {
        match sinks.remove(subscriber_id) {
            Some(_) => {
                debug!("Evicted subscriber {}", subscriber_id.as_str());
                true
            }
            None => {
                trace!(
                    "Subscriber {} was already evicted",
                    subscriber_id.as_str()
                );
                false
            }
        }
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}
