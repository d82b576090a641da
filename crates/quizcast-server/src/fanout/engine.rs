//! Bus subscription → room fanout.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use metrics::counter;
use quizcast_bus::{Bus, BusMessage, Subscription};
use quizcast_core::{RoomChannel, RoomId};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::errors::FanoutError;
use crate::metrics::{
    FANOUT_DELIVERIES_TOTAL, FANOUT_IGNORED_MESSAGES_TOTAL, FANOUT_MESSAGES_TOTAL,
    FANOUT_RECOVERIES_TOTAL, FANOUT_SEND_FAILURES_TOTAL,
};
use crate::rooms::lifecycle::ConnectionManager;

/// Engine timing and logging knobs.
#[derive(Clone, Debug)]
pub struct FanoutConfig {
    /// Upper bound on a single bus receive; cancellation is checked at least
    /// this often.
    pub poll_interval: Duration,
    /// Fixed delay before each re-subscribe attempt.
    pub recovery_delay: Duration,
    /// How long one connection may apply backpressure before it is dropped.
    pub send_timeout: Duration,
    /// Log each fanout pass at info instead of debug.
    pub verbose_delivery: bool,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            recovery_delay: Duration::from_secs(1),
            send_timeout: Duration::from_secs(5),
            verbose_delivery: false,
        }
    }
}

/// Observable engine state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FanoutState {
    /// Not yet subscribed.
    Initializing,
    /// Pattern subscription established.
    Subscribed,
    /// Waiting for bus messages.
    Listening,
    /// Bus connectivity lost; waiting to re-subscribe.
    Recovering,
}

/// Outcome of delivering one bus message to its room.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    /// Room the message was addressed to.
    pub room_id: RoomId,
    /// Connections that accepted the payload.
    pub delivered: usize,
    /// Connections that failed and were disconnected.
    pub failed: usize,
}

/// Drains the bus pattern subscription into rooms.
pub struct FanoutEngine {
    bus: Arc<dyn Bus>,
    manager: Arc<ConnectionManager>,
    channel: RoomChannel,
    config: FanoutConfig,
    state: watch::Sender<FanoutState>,
}

impl FanoutEngine {
    /// Create an engine. Nothing happens until [`run`](Self::run).
    pub fn new(
        bus: Arc<dyn Bus>,
        manager: Arc<ConnectionManager>,
        channel: RoomChannel,
        config: FanoutConfig,
    ) -> Self {
        let (state, _) = watch::channel(FanoutState::Initializing);
        Self {
            bus,
            manager,
            channel,
            config,
            state,
        }
    }

    /// Current state.
    pub fn state(&self) -> FanoutState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<FanoutState> {
        self.state.subscribe()
    }

    fn set_state(&self, next: FanoutState) {
        let _ = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                trace!(from = ?*current, to = ?next, "fanout state");
                *current = next;
                true
            }
        });
    }

    /// Run until `cancel` fires or the subscription is rejected.
    #[instrument(skip_all, name = "fanout", fields(pattern = %self.channel.pattern()))]
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), FanoutError> {
        self.set_state(FanoutState::Initializing);
        let Some(mut subscription) = self.subscribe(&cancel, false).await? else {
            return Ok(());
        };

        loop {
            self.set_state(FanoutState::Listening);
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                next = subscription.next_message(self.config.poll_interval) => next,
            };

            match next {
                Ok(None) => {}
                Ok(Some(message)) => {
                    if let Some(delivery) = self.dispatch(message).await {
                        trace!(
                            room_id = %delivery.room_id,
                            delivered = delivery.delivered,
                            failed = delivery.failed,
                            "message dispatched"
                        );
                    }
                }
                Err(error) if error.is_connectivity() => {
                    warn!(%error, "bus connectivity lost, re-subscribing");
                    counter!(FANOUT_RECOVERIES_TOTAL).increment(1);
                    self.set_state(FanoutState::Recovering);
                    match self.subscribe(&cancel, true).await? {
                        Some(fresh) => subscription = fresh,
                        None => break,
                    }
                }
                Err(error) => {
                    warn!(%error, "failed to receive bus message, skipping");
                }
            }
        }

        info!("fanout engine stopped");
        Ok(())
    }

    /// Establish the pattern subscription, retrying with a fixed delay while
    /// the bus is unreachable. `Ok(None)` means cancelled.
    async fn subscribe(
        &self,
        cancel: &CancellationToken,
        mut delay_first: bool,
    ) -> Result<Option<Box<dyn Subscription>>, FanoutError> {
        let pattern = self.channel.pattern();
        loop {
            if delay_first {
                tokio::select! {
                    () = cancel.cancelled() => return Ok(None),
                    () = tokio::time::sleep(self.config.recovery_delay) => {}
                }
            }
            let result = tokio::select! {
                () = cancel.cancelled() => return Ok(None),
                result = self.bus.psubscribe(&pattern) => result,
            };
            match result {
                Ok(subscription) => {
                    info!(pattern, "bus pattern subscription established");
                    self.set_state(FanoutState::Subscribed);
                    return Ok(Some(subscription));
                }
                Err(error) if error.is_connectivity() => {
                    warn!(%error, delay = ?self.config.recovery_delay, "bus unreachable, retrying subscription");
                    self.set_state(FanoutState::Recovering);
                    delay_first = true;
                }
                Err(error) => {
                    error!(%error, pattern, "pattern subscription rejected");
                    return Err(FanoutError::Subscribe(error));
                }
            }
        }
    }

    /// Deliver one bus message to every connection in its room.
    ///
    /// Returns `None` when the channel does not name a room. Connections
    /// that fail to accept the payload are disconnected after the pass.
    pub async fn dispatch(&self, message: BusMessage) -> Option<Delivery> {
        let room_id = match self.channel.parse(&message.channel) {
            Ok(room_id) => room_id,
            Err(error) => {
                debug!(channel = %message.channel, %error, "ignoring message on unrecognised channel");
                counter!(FANOUT_IGNORED_MESSAGES_TOTAL).increment(1);
                return None;
            }
        };
        counter!(FANOUT_MESSAGES_TOTAL).increment(1);

        let targets = self.manager.registry().snapshot(&room_id);
        if targets.is_empty() {
            trace!(room_id = %room_id, "no connections in room");
            return Some(Delivery {
                room_id,
                delivered: 0,
                failed: 0,
            });
        }

        let timeout = self.config.send_timeout;
        let sends = targets.iter().map(|conn| {
            let payload = Arc::clone(&message.payload);
            async move { conn.send(payload, timeout).await }
        });
        let outcomes = join_all(sends).await;

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (conn, outcome) in targets.iter().zip(outcomes) {
            match outcome {
                Ok(()) => {
                    delivered += 1;
                    trace!(room_id = %room_id, conn_id = %conn.id, "delivered");
                }
                Err(error) => {
                    debug!(room_id = %room_id, conn_id = %conn.id, %error, "send failed, disconnecting");
                    failed.push(conn);
                }
            }
        }
        for conn in &failed {
            let _ = self.manager.disconnect(&room_id, conn);
        }

        counter!(FANOUT_DELIVERIES_TOTAL).increment(delivered as u64);
        counter!(FANOUT_SEND_FAILURES_TOTAL).increment(failed.len() as u64);
        if self.config.verbose_delivery {
            info!(room_id = %room_id, delivered, failed = failed.len(), "fanout pass complete");
        } else {
            debug!(room_id = %room_id, delivered, failed = failed.len(), "fanout pass complete");
        }

        Some(Delivery {
            room_id,
            delivered,
            failed: failed.len(),
        })
    }
}
