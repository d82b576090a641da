//! Fanout engine and its supervisor.

pub mod engine;
pub mod supervisor;
