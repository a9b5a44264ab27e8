//! In-process topic bus for Fleetline.
//!
//! Named topics backed by `tokio::sync::broadcast` channels. Machines (or
//! the built-in simulator) publish telemetry on the inbound topic; the
//! pipeline subscribes there and publishes alerts on the outbound topic,
//! which the SSE surface and any number of dashboards can subscribe to.
//!
//! Delivery semantics are fire-and-forget: a publish with no subscribers
//! drops the message, and a slow subscriber that falls more than the topic
//! capacity behind loses the oldest messages (surfaced as a logged lag
//! count, never an error to the publisher). This matches QoS-0 pub/sub and
//! keeps publishers non-blocking.
//!
//! The bus is deliberately thin: the pipeline only touches it through
//! long-lived [`Publisher`] handles and [`Subscription`] receivers, so a
//! networked broker client can replace it without touching pipeline logic.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;

/// Default per-topic channel capacity.
const DEFAULT_TOPIC_CAPACITY: usize = 1024;

/// Errors that can occur on bus operations.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The topic's channel has been closed.
    ///
    /// Only possible once the owning [`TopicBus`] has been dropped; a live
    /// bus keeps every topic's sender alive.
    #[error("topic '{0}' is closed")]
    TopicClosed(String),
}

/// A process-wide pub/sub bus of named topics.
///
/// Cloning is cheap; all clones share the same topic map. Topics are created
/// lazily on first publish or subscribe.
#[derive(Clone)]
pub struct TopicBus {
    topics: Arc<RwLock<HashMap<String, broadcast::Sender<Vec<u8>>>>>,
    capacity: usize,
}

impl Default for TopicBus {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_CAPACITY)
    }
}

impl TopicBus {
    /// Creates a bus whose topics buffer up to `capacity` undelivered
    /// messages per subscriber before the subscriber starts lagging.
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Returns the sender for a topic, creating the topic if needed.
    ///
    /// Lock note: acquisitions are brief map operations that never span
    /// `.await` points, so a synchronous lock is safe here.
    fn sender(&self, topic: &str) -> broadcast::Sender<Vec<u8>> {
        if let Some(tx) = self
            .topics
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(topic)
        {
            return tx.clone();
        }

        let mut topics = self
            .topics
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Returns a long-lived publish handle for a topic.
    pub fn publisher(&self, topic: &str) -> Publisher {
        Publisher {
            topic: topic.to_string(),
            tx: self.sender(topic),
        }
    }

    /// Subscribes to a topic, receiving every message published after this
    /// call.
    pub fn subscribe(&self, topic: &str) -> Subscription {
        Subscription {
            topic: topic.to_string(),
            rx: self.sender(topic).subscribe(),
            lagged: 0,
        }
    }

    /// Publishes a single message on a topic.
    ///
    /// Convenience for one-off publishes; hot paths should hold a
    /// [`Publisher`] instead. Returns the number of subscribers that
    /// received the message.
    pub fn publish(&self, topic: &str, payload: Vec<u8>) -> usize {
        self.publisher(topic).publish(payload)
    }
}

/// A long-lived handle for publishing on one topic.
///
/// Holding a `Publisher` across publishes avoids the topic-map lookup per
/// message and is the intended shape for the alert path: one outbound
/// session owned by the alert publisher, reused for every alert.
#[derive(Clone)]
pub struct Publisher {
    topic: String,
    tx: broadcast::Sender<Vec<u8>>,
}

impl Publisher {
    /// The topic this handle publishes to.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Publishes one message, returning the number of subscribers that
    /// received it. Zero subscribers is not an error; the message is simply
    /// dropped.
    pub fn publish(&self, payload: Vec<u8>) -> usize {
        match self.tx.send(payload) {
            Ok(receivers) => receivers,
            // broadcast::send errors only when there are no receivers.
            Err(_) => 0,
        }
    }

    /// Number of current subscribers on this topic.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A subscription to one topic.
pub struct Subscription {
    topic: String,
    rx: broadcast::Receiver<Vec<u8>>,
    lagged: u64,
}

impl Subscription {
    /// The topic this subscription receives from.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Messages lost to lag over the life of this subscription.
    pub fn lagged(&self) -> u64 {
        self.lagged
    }

    /// Receives the next message.
    ///
    /// Lag is recoverable: if this subscriber fell behind, the loss is
    /// logged and counted, and the next available message is returned.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::TopicClosed`] once the bus has been dropped and
    /// no further messages can arrive.
    pub async fn recv(&mut self) -> Result<Vec<u8>, BusError> {
        loop {
            match self.rx.recv().await {
                Ok(payload) => return Ok(payload),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    self.lagged += skipped;
                    tracing::warn!(
                        topic = %self.topic,
                        skipped,
                        "subscriber lagged; oldest messages dropped"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(BusError::TopicClosed(self.topic.clone()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let bus = TopicBus::default();
        let mut sub = bus.subscribe("machines/data");

        let delivered = bus.publish("machines/data", b"{\"machine_id\":\"M1\"}".to_vec());
        assert_eq!(delivered, 1);

        let payload = sub.recv().await.expect("recv should succeed");
        assert_eq!(payload, b"{\"machine_id\":\"M1\"}");
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_dropped() {
        let bus = TopicBus::default();
        let publisher = bus.publisher("machines/alerts");

        assert_eq!(publisher.publish(b"alert".to_vec()), 0);
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn topics_are_isolated() {
        let bus = TopicBus::default();
        let mut data_sub = bus.subscribe("machines/data");
        let mut alert_sub = bus.subscribe("machines/alerts");

        bus.publish("machines/data", b"data".to_vec());
        bus.publish("machines/alerts", b"alert".to_vec());

        assert_eq!(data_sub.recv().await.expect("recv"), b"data");
        assert_eq!(alert_sub.recv().await.expect("recv"), b"alert");
    }

    #[tokio::test]
    async fn publisher_handle_survives_across_publishes() {
        let bus = TopicBus::default();
        let publisher = bus.publisher("machines/data");
        let mut sub = bus.subscribe("machines/data");

        for i in 0..3u8 {
            publisher.publish(vec![i]);
        }

        for i in 0..3u8 {
            assert_eq!(sub.recv().await.expect("recv"), vec![i]);
        }
    }

    #[tokio::test]
    async fn lagged_subscriber_skips_and_counts() {
        let bus = TopicBus::new(2);
        let mut sub = bus.subscribe("machines/data");
        let publisher = bus.publisher("machines/data");

        // Overflow the 2-slot buffer: the oldest messages are dropped.
        for i in 0..5u8 {
            publisher.publish(vec![i]);
        }

        let first = sub.recv().await.expect("recv should recover from lag");
        assert_eq!(first, vec![3]);
        assert_eq!(sub.lagged(), 3);
    }

    #[tokio::test]
    async fn recv_fails_once_bus_is_dropped() {
        let bus = TopicBus::default();
        let mut sub = bus.subscribe("machines/data");
        drop(bus);

        match sub.recv().await {
            Err(BusError::TopicClosed(topic)) => assert_eq!(topic, "machines/data"),
            other => panic!("expected TopicClosed, got {other:?}"),
        }
    }
}
