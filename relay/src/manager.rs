use crate::connection::{Liveness, SubscriberId, SubscriberRegistry, SubscriberSink};
use crate::message::OutgoingMessage;
use axum::extract::ws::Message;
use log::*;
use std::sync::Arc;
use tokio::sync::mpsc::Sender;

/// Default capacity of each subscriber's outbound queue.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 64;

/// What happened to one broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Subscribers the frame was queued for.
    pub delivered: usize,
    /// Subscribers removed because delivery failed.
    pub evicted: Vec<SubscriberId>,
}

/// Owns the subscriber registry and fans assembled messages out to it.
pub struct Manager {
    registry: Arc<SubscriberRegistry>,
    subscriber_buffer: usize,
}

impl Manager {
    pub fn new(subscriber_buffer: usize) -> Self {
        Self {
            registry: Arc::new(SubscriberRegistry::new()),
            subscriber_buffer: subscriber_buffer.max(1),
        }
    }

    /// Capacity connection handlers should give each subscriber's queue.
    pub fn subscriber_buffer(&self) -> usize {
        self.subscriber_buffer
    }

    /// Register a new connection and return its unique ID
    pub async fn register_connection(&self, sender: Sender<Message>) -> SubscriberId {
        let subscriber_id = self.registry.register(SubscriberSink::new(sender)).await;
        info!("New subscriber connected ({})", subscriber_id.as_str());
        subscriber_id
    }

    /// Unregister a connection by ID. Safe to call for an already evicted id.
    pub async fn unregister_connection(&self, subscriber_id: &SubscriberId) {
        if self.registry.evict(subscriber_id).await {
            info!("Subscriber disconnected ({})", subscriber_id.as_str());
        }
    }

    /// Serializes `message` once and queues it for every live subscriber.
    ///
    /// A subscriber whose queue is closed or full is evicted on the spot and
    /// never retried; it has to reconnect to receive later rounds.
    pub async fn broadcast(&self, message: &OutgoingMessage) -> BroadcastReport {
        let frame = match message.encode() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to serialize message for {}: {e}", message.event());
                return BroadcastReport::default();
            }
        };

        let mut delivered = 0;
        let evicted = self
            .registry
            .for_each_live(|subscriber_id, sink| match sink.deliver(&frame) {
                Ok(()) => {
                    delivered += 1;
                    Liveness::Alive
                }
                Err(e) => {
                    warn!(
                        "Failed to send message to subscriber {}: {e:?}. Evicting it.",
                        subscriber_id.as_str()
                    );
                    Liveness::Dead
                }
            })
            .await;

        BroadcastReport { delivered, evicted }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.registry.len().await
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::PartialResult;
    use events::EventId;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn message() -> OutgoingMessage {
        let mut data = PartialResult::new();
        data.insert("users_overview".to_string(), json!({"total": 1}));
        OutgoingMessage::new(EventId::new("USER_CREATED"), data)
    }

    fn text(frame: Message) -> String {
        match frame {
            Message::Text(text) => text.as_str().to_string(),
            other => panic!("expected a text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn broadcast_evicts_exactly_the_failed_subscribers() {
        let manager = Manager::new(4);
        let mut live = Vec::new();
        let mut failed = Vec::new();

        for i in 0..5 {
            let (tx, rx) = mpsc::channel(4);
            let subscriber_id = manager.register_connection(tx).await;
            if i % 2 == 0 {
                live.push((subscriber_id, rx));
            } else {
                drop(rx);
                failed.push(subscriber_id);
            }
        }

        let report = manager.broadcast(&message()).await;

        assert_eq!(report.delivered, 3);
        assert_eq!(report.evicted.len(), 2);
        for subscriber_id in &failed {
            assert!(report.evicted.contains(subscriber_id));
        }
        assert_eq!(manager.subscriber_count().await, 3);

        let expected = message().encode().unwrap().as_str().to_string();
        let expected: serde_json::Value = serde_json::from_str(&expected).unwrap();
        for (_, rx) in live.iter_mut() {
            let received: serde_json::Value =
                serde_json::from_str(&text(rx.recv().await.unwrap())).unwrap();
            assert_eq!(received["event"], expected["event"]);
            assert_eq!(received["data"], expected["data"]);
        }
    }

    #[tokio::test]
    async fn lagging_subscriber_is_evicted() {
        let manager = Manager::new(1);
        let (slow_tx, _slow_rx) = mpsc::channel(manager.subscriber_buffer());
        let slow = manager.register_connection(slow_tx).await;
        let (fast_tx, mut fast_rx) = mpsc::channel(manager.subscriber_buffer());
        manager.register_connection(fast_tx).await;

        let first = manager.broadcast(&message()).await;
        assert_eq!(first.delivered, 2);
        fast_rx.recv().await.unwrap();

        let second = manager.broadcast(&message()).await;
        assert_eq!(second.delivered, 1);
        assert_eq!(second.evicted, vec![slow]);
        assert_eq!(manager.subscriber_count().await, 1);
    }

    #[tokio::test]
    async fn late_subscriber_does_not_receive_earlier_round() {
        let manager = Manager::default();
        let (early_tx, mut early_rx) = mpsc::channel(4);
        manager.register_connection(early_tx).await;

        manager.broadcast(&message()).await;

        let (late_tx, mut late_rx) = mpsc::channel(4);
        manager.register_connection(late_tx).await;

        assert!(early_rx.try_recv().is_ok());
        assert!(late_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unregister_is_safe_after_eviction() {
        let manager = Manager::default();
        let (tx, rx) = mpsc::channel(4);
        let subscriber_id = manager.register_connection(tx).await;
        drop(rx);

        let report = manager.broadcast(&message()).await;
        assert_eq!(report.evicted, vec![subscriber_id.clone()]);

        manager.unregister_connection(&subscriber_id).await;
        assert_eq!(manager.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn broadcast_to_empty_registry_is_a_no_op() {
        let manager = Manager::default();
        let report = manager.broadcast(&message()).await;
        assert_eq!(report, BroadcastReport::default());
    }
}
