//! # quizcast-bus
//!
//! Thin client over a publish/subscribe bus with pattern subscriptions.
//!
//! - [`Bus`]: `publish` and `psubscribe`
//! - [`Subscription`]: bounded-wait receive of the next matching message
//! - [`MemoryBus`]: in-process backend (at-most-once, no persistence)
//! - `RedisBus`: Redis backend, behind the `redis` feature
//!
//! Delivery is at-most-once. A subscription reporting
//! [`BusError::Connection`] is dead and must be replaced by a fresh
//! `psubscribe`.

#![deny(unsafe_code)]

pub mod errors;
pub mod memory;
pub mod pattern;
#[cfg(feature = "redis")]
pub mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

pub use errors::BusError;
pub use memory::MemoryBus;
#[cfg(feature = "redis")]
pub use self::redis::RedisBus;

/// One message received through a subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusMessage {
    /// Concrete channel the message was published on.
    pub channel: String,
    /// Opaque text payload.
    pub payload: Arc<str>,
}

impl BusMessage {
    /// Build a message.
    pub fn new(channel: impl Into<String>, payload: impl Into<Arc<str>>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }
}

/// A publish/subscribe bus.
#[async_trait]
pub trait Bus: Send + Sync {
    /// Publish `payload` on `channel`. Returns the number of subscribers the
    /// bus handed the message to.
    async fn publish(&self, channel: &str, payload: &str) -> Result<usize, BusError>;

    /// Subscribe to every channel matching the glob `pattern`.
    async fn psubscribe(&self, pattern: &str) -> Result<Box<dyn Subscription>, BusError>;
}

/// A live pattern subscription.
#[async_trait]
pub trait Subscription: Send {
    /// Wait at most `wait` for the next message.
    ///
    /// `Ok(None)` means the wait elapsed with nothing received.
    async fn next_message(&mut self, wait: Duration) -> Result<Option<BusMessage>, BusError>;
}

#[async_trait]
impl<B: Bus + ?Sized> Bus for Arc<B> {
    async fn publish(&self, channel: &str, payload: &str) -> Result<usize, BusError> {
        (**self).publish(channel, payload).await
    }

    async fn psubscribe(&self, pattern: &str) -> Result<Box<dyn Subscription>, BusError> {
        (**self).psubscribe(pattern).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_message_new() {
        let m = BusMessage::new("quiz_channel:q1", "{}");
        assert_eq!(m.channel, "quiz_channel:q1");
        assert_eq!(&*m.payload, "{}");
    }

    #[tokio::test]
    async fn arc_bus_delegates() {
        let bus: Arc<dyn Bus> = Arc::new(MemoryBus::new(8));
        let mut sub = bus.psubscribe("c:*").await.unwrap();
        let delivered = bus.publish("c:1", "hi").await.unwrap();
        assert_eq!(delivered, 1);
        let msg = sub.next_message(Duration::from_secs(1)).await.unwrap().unwrap();
        assert_eq!(&*msg.payload, "hi");
    }
}
