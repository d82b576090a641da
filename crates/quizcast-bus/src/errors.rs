//! Bus error types.

use thiserror::Error;

/// Errors reported by a bus backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// Connectivity to the bus was lost or could not be established.
    #[error("bus connection error: {0}")]
    Connection(String),
    /// The bus refused the subscription.
    #[error("subscription rejected: {0}")]
    Subscribe(String),
    /// A received message could not be decoded as text.
    #[error("undecodable message on {channel}: {reason}")]
    Decode {
        /// Channel the message arrived on.
        channel: String,
        /// Decoder error.
        reason: String,
    },
    /// A publish was rejected for a reason other than connectivity.
    #[error("publish failed: {0}")]
    Publish(String),
}

impl BusError {
    /// Whether the error means the subscription is dead and must be
    /// re-established.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}
