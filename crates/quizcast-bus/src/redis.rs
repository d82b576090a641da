//! Redis pub/sub backend.
//!
//! Publishing reuses one multiplexed connection, reconnecting lazily after a
//! connectivity failure. Each `psubscribe` opens a dedicated pub/sub
//! connection whose message stream becomes the [`Subscription`].

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::errors::BusError;
use crate::pattern::validate_pattern;
use crate::{Bus, BusMessage, Subscription};

/// Bus backed by a Redis server.
pub struct RedisBus {
    client: redis::Client,
    publisher: Mutex<Option<MultiplexedConnection>>,
}

impl RedisBus {
    /// Create a client for `url` (e.g. `redis://localhost:6379`). No
    /// connection is made until first use.
    pub fn open(url: &str) -> Result<Self, BusError> {
        let client = redis::Client::open(url).map_err(|e| BusError::Connection(e.to_string()))?;
        info!(url, "redis bus configured");
        Ok(Self {
            client,
            publisher: Mutex::new(None),
        })
    }

    async fn publisher(&self) -> Result<MultiplexedConnection, BusError> {
        let mut slot = self.publisher.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(classify)?;
        *slot = Some(conn.clone());
        Ok(conn)
    }
}

fn classify(err: redis::RedisError) -> BusError {
    if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
        BusError::Connection(err.to_string())
    } else {
        BusError::Publish(err.to_string())
    }
}

#[async_trait]
impl Bus for RedisBus {
    async fn publish(&self, channel: &str, payload: &str) -> Result<usize, BusError> {
        let mut conn = self.publisher().await?;
        match conn.publish::<_, _, usize>(channel, payload).await {
            Ok(n) => Ok(n),
            Err(e) => {
                let err = classify(e);
                if err.is_connectivity() {
                    *self.publisher.lock().await = None;
                }
                Err(err)
            }
        }
    }

    async fn psubscribe(&self, pattern: &str) -> Result<Box<dyn Subscription>, BusError> {
        validate_pattern(pattern)?;
        let mut pubsub = self.client.get_async_pubsub().await.map_err(|e| {
            BusError::Connection(e.to_string())
        })?;
        pubsub.psubscribe(pattern).await.map_err(|e| {
            if e.is_io_error() || e.is_connection_dropped() {
                BusError::Connection(e.to_string())
            } else {
                BusError::Subscribe(e.to_string())
            }
        })?;
        debug!(pattern, "redis pattern subscription established");
        Ok(Box::new(RedisSubscription {
            stream: Box::pin(pubsub.into_on_message()),
        }))
    }
}

/// A Redis pattern subscription.
pub struct RedisSubscription {
    stream: Pin<Box<dyn Stream<Item = redis::Msg> + Send>>,
}

#[async_trait]
impl Subscription for RedisSubscription {
    async fn next_message(&mut self, wait: Duration) -> Result<Option<BusMessage>, BusError> {
        match tokio::time::timeout(wait, self.stream.next()).await {
            Err(_) => Ok(None),
            Ok(None) => Err(BusError::Connection("redis pub/sub stream ended".into())),
            Ok(Some(msg)) => {
                let channel = msg.get_channel_name().to_owned();
                match msg.get_payload::<String>() {
                    Ok(payload) => Ok(Some(BusMessage::new(channel, payload))),
                    Err(e) => Err(BusError::Decode {
                        channel,
                        reason: e.to_string(),
                    }),
                }
            }
        }
    }
}
