//! In-process pub/sub for single-node deployments.
//!
//! Each pattern subscription owns a bounded queue. Publishing hands the
//! message to every matching subscriber with `try_send`; a full queue drops
//! the message for that subscriber (at-most-once, like the external bus).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use globset::GlobMatcher;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::errors::BusError;
use crate::pattern::compile_pattern;
use crate::{Bus, BusMessage, Subscription};

struct PatternSubscriber {
    pattern: String,
    matcher: GlobMatcher,
    tx: mpsc::Sender<BusMessage>,
}

/// In-memory pattern pub/sub bus. Cloning shares the same bus.
#[derive(Clone)]
pub struct MemoryBus {
    subscribers: Arc<Mutex<Vec<PatternSubscriber>>>,
    /// Buffer size for each subscription queue.
    capacity: usize,
}

impl MemoryBus {
    /// Create a bus whose subscriptions buffer up to `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
            capacity: capacity.max(1),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        let mut subs = self.subscribers.lock();
        subs.retain(|s| !s.tx.is_closed());
        subs.len()
    }

    /// Drop every subscription, as if the bus connection had been reset.
    ///
    /// Subscribers observe [`BusError::Connection`] on their next receive.
    pub fn sever_subscriptions(&self) {
        let dropped = std::mem::take(&mut *self.subscribers.lock());
        warn!(count = dropped.len(), "severing all bus subscriptions");
    }
}

#[async_trait]
impl Bus for MemoryBus {
    async fn publish(&self, channel: &str, payload: &str) -> Result<usize, BusError> {
        let message = BusMessage::new(channel, payload);
        let mut delivered = 0;
        let mut subs = self.subscribers.lock();
        subs.retain(|s| !s.tx.is_closed());
        for sub in subs.iter().filter(|s| s.matcher.is_match(channel)) {
            match sub.tx.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(channel, pattern = %sub.pattern, "subscriber queue full, dropping message");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
        debug!(channel, delivered, "published");
        Ok(delivered)
    }

    async fn psubscribe(&self, pattern: &str) -> Result<Box<dyn Subscription>, BusError> {
        let matcher = compile_pattern(pattern)?;
        let (tx, rx) = mpsc::channel(self.capacity);
        self.subscribers.lock().push(PatternSubscriber {
            pattern: pattern.to_owned(),
            matcher,
            tx,
        });
        debug!(pattern, "pattern subscription added");
        Ok(Box::new(MemorySubscription { rx }))
    }
}

/// Receiving half of a [`MemoryBus`] subscription.
pub struct MemorySubscription {
    rx: mpsc::Receiver<BusMessage>,
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn next_message(&mut self, wait: Duration) -> Result<Option<BusMessage>, BusError> {
        match tokio::time::timeout(wait, self.rx.recv()).await {
            Ok(Some(message)) => Ok(Some(message)),
            Ok(None) => Err(BusError::Connection("subscription closed by bus".into())),
            Err(_) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const WAIT: Duration = Duration::from_millis(200);

    #[tokio::test]
    async fn publish_reaches_matching_pattern() {
        let bus = MemoryBus::new(8);
        let mut sub = bus.psubscribe("quiz_channel:*").await.unwrap();
        assert_eq!(bus.publish("quiz_channel:q1", "hello").await.unwrap(), 1);

        let msg = sub.next_message(WAIT).await.unwrap().unwrap();
        assert_eq!(msg.channel, "quiz_channel:q1");
        assert_eq!(&*msg.payload, "hello");
    }

    #[tokio::test]
    async fn non_matching_channel_not_delivered() {
        let bus = MemoryBus::new(8);
        let mut sub = bus.psubscribe("quiz_channel:*").await.unwrap();
        assert_eq!(bus.publish("other:q1", "x").await.unwrap(), 0);
        assert!(sub.next_message(Duration::from_millis(20)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_ok() {
        let bus = MemoryBus::new(8);
        assert_eq!(bus.publish("quiz_channel:q1", "x").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn order_preserved_per_channel() {
        let bus = MemoryBus::new(8);
        let mut sub = bus.psubscribe("c:*").await.unwrap();
        for i in 0..5 {
            let _ = bus.publish("c:1", &format!("m{i}")).await.unwrap();
        }
        for i in 0..5 {
            let msg = sub.next_message(WAIT).await.unwrap().unwrap();
            assert_eq!(&*msg.payload, format!("m{i}"));
        }
    }

    #[tokio::test]
    async fn full_queue_drops_message() {
        let bus = MemoryBus::new(1);
        let mut sub = bus.psubscribe("c:*").await.unwrap();
        assert_eq!(bus.publish("c:1", "first").await.unwrap(), 1);
        assert_eq!(bus.publish("c:1", "second").await.unwrap(), 0);
        let msg = sub.next_message(WAIT).await.unwrap().unwrap();
        assert_eq!(&*msg.payload, "first");
        assert!(sub.next_message(Duration::from_millis(20)).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn receive_times_out_with_none() {
        let bus = MemoryBus::new(8);
        let mut sub = bus.psubscribe("c:*").await.unwrap();
        let got = sub.next_message(Duration::from_secs(5)).await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn severed_subscription_reports_connection_error() {
        let bus = MemoryBus::new(8);
        let mut sub = bus.psubscribe("c:*").await.unwrap();
        bus.sever_subscriptions();
        assert_matches!(sub.next_message(WAIT).await, Err(BusError::Connection(_)));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn dropped_subscription_is_pruned() {
        let bus = MemoryBus::new(8);
        let sub = bus.psubscribe("c:*").await.unwrap();
        assert_eq!(bus.subscriber_count(), 1);
        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn invalid_pattern_rejected() {
        let bus = MemoryBus::new(8);
        assert_matches!(bus.psubscribe("").await.err(), Some(BusError::Subscribe(_)));
        assert_matches!(bus.psubscribe("c:[ab").await.err(), Some(BusError::Subscribe(_)));
    }

    #[tokio::test]
    async fn character_class_pattern_routes_like_psubscribe() {
        let bus = MemoryBus::new(8);
        let mut sub = bus.psubscribe("c:[ab]*").await.unwrap();
        assert_eq!(bus.publish("c:a1", "in").await.unwrap(), 1);
        assert_eq!(bus.publish("c:x1", "out").await.unwrap(), 0);
        let msg = sub.next_message(WAIT).await.unwrap().unwrap();
        assert_eq!(msg.channel, "c:a1");
    }

    #[tokio::test]
    async fn clones_share_the_bus() {
        let bus = MemoryBus::new(8);
        let publisher = bus.clone();
        let mut sub = bus.psubscribe("c:*").await.unwrap();
        assert_eq!(publisher.publish("c:9", "shared").await.unwrap(), 1);
        assert!(sub.next_message(WAIT).await.unwrap().is_some());
    }
}
