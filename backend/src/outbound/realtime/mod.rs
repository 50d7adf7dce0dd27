//! In-process topic broadcasting for websocket subscribers.
//!
//! Each topic owns a bounded `tokio::sync::broadcast` channel created on the
//! first subscription. A subscriber that falls more than the channel capacity
//! behind skips the missed frames; the message log stays the source of truth.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::trace;

use crate::domain::ports::{RealtimePublishError, RealtimePublisher, RealtimeSubscriber};

/// Default per-topic buffer.
pub const DEFAULT_TOPIC_CAPACITY: usize = 256;

/// Topic hub shared by the message pipeline and the websocket sessions.
#[derive(Debug, Clone)]
pub struct BroadcastHub {
    topics: Arc<DashMap<String, broadcast::Sender<String>>>,
    capacity: usize,
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_CAPACITY)
    }
}

impl BroadcastHub {
    /// Create a hub whose topics buffer `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to `topic`, creating it when absent.
    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<String> {
        self.topics
            .entry(topic.to_owned())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Drop `topic` once nobody listens to it any more.
    pub fn prune(&self, topic: &str) {
        self.topics
            .remove_if(topic, |_, sender| sender.receiver_count() == 0);
    }

    /// Number of live subscribers on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .get(topic)
            .map_or(0, |sender| sender.receiver_count())
    }
}

#[async_trait]
impl RealtimePublisher for BroadcastHub {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), RealtimePublishError> {
        let Some(sender) = self.topics.get(topic) else {
            trace!(%topic, "no subscribers; frame dropped");
            return Ok(());
        };
        // A send error only means every receiver is gone.
        if sender.send(payload.to_owned()).is_err() {
            trace!(%topic, "subscribers left; frame dropped");
        }
        Ok(())
    }
}

impl RealtimeSubscriber for BroadcastHub {
    fn subscribe(&self, topic: &str) -> broadcast::Receiver<String> {
        Self::subscribe(self, topic)
    }

    fn release(&self, topic: &str) {
        self.prune(topic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn subscribers_receive_published_frames() {
        let hub = BroadcastHub::default();
        let mut first = hub.subscribe("chat-room/a");
        let mut second = hub.subscribe("chat-room/a");

        hub.publish("chat-room/a", "{\"content\":\"hi\"}")
            .await
            .expect("publish");

        assert_eq!(first.recv().await.expect("frame"), "{\"content\":\"hi\"}");
        assert_eq!(second.recv().await.expect("frame"), "{\"content\":\"hi\"}");
    }

    #[rstest]
    #[tokio::test]
    async fn topics_are_isolated() {
        let hub = BroadcastHub::default();
        let mut other = hub.subscribe("chat-room/b");
        hub.publish("chat-room/a", "x").await.expect("publish");
        assert!(other.try_recv().is_err());
    }

    #[rstest]
    fn prune_removes_abandoned_topics() {
        let hub = BroadcastHub::default();
        let receiver = hub.subscribe("chat-room/c");
        hub.prune("chat-room/c");
        assert_eq!(hub.subscriber_count("chat-room/c"), 1);

        drop(receiver);
        hub.prune("chat-room/c");
        assert_eq!(hub.subscriber_count("chat-room/c"), 0);
    }
}
