//! Rooms and the connections in them.

pub mod connection;
pub mod lifecycle;
pub mod registry;
