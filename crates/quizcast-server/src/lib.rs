//! # quizcast-server
//!
//! Room-scoped real-time fanout over WebSockets.
//!
//! - [`rooms`]: connection handles, the sharded room registry, and the
//!   lifecycle manager that is the only path in or out of the registry
//! - [`fanout`]: the engine that drains the bus pattern subscription into
//!   rooms, and the supervisor that keeps it running
//! - [`websocket`]: per-client session (reader loop, writer task, heartbeat)
//! - [`server`]: Axum router, shared state, health and metrics endpoints
//! - [`api`]: quiz creation and event publishing routes
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod errors;
pub mod fanout;
pub mod health;
pub mod metrics;
pub mod rooms;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use fanout::engine::{FanoutConfig, FanoutEngine, FanoutState};
pub use fanout::supervisor::{ListenerOutcome, ListenerSupervisor, RestartPolicy};
pub use rooms::connection::{ClientConnection, Liveness};
pub use rooms::lifecycle::ConnectionManager;
pub use rooms::registry::RoomRegistry;
pub use server::{AppState, QuizcastServer};
pub use shutdown::ShutdownCoordinator;
