//! WebSocket gateway.

pub mod session;
