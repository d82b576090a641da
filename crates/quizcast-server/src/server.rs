//! `QuizcastServer`: Axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use quizcast_bus::Bus;
use quizcast_content::QuizGenerator;
use quizcast_core::RoomId;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::api;
use crate::config::ServerConfig;
use crate::errors::ApiError;
use crate::fanout::engine::FanoutEngine;
use crate::fanout::supervisor::ListenerSupervisor;
use crate::health::{self, HealthResponse};
use crate::rooms::lifecycle::ConnectionManager;
use crate::rooms::registry::RoomRegistry;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::session::{SessionConfig, run_ws_session};

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Connection lifecycle manager (owns the room registry).
    pub manager: Arc<ConnectionManager>,
    /// Fanout listener supervisor.
    pub supervisor: Arc<ListenerSupervisor>,
    /// Event bus used for publishing.
    pub bus: Arc<dyn Bus>,
    /// Quiz content producer.
    pub content: Arc<dyn QuizGenerator>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle for `/metrics`, if a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// The quizcast server. Build once and share by `Arc`.
pub struct QuizcastServer {
    state: AppState,
}

impl QuizcastServer {
    /// Wire up the registry, lifecycle manager, fanout engine, and
    /// supervisor. The listener is not started until
    /// [`start_listener`](Self::start_listener).
    pub fn new(config: ServerConfig, bus: Arc<dyn Bus>, content: Arc<dyn QuizGenerator>) -> Self {
        let shutdown = Arc::new(ShutdownCoordinator::new());
        let manager = Arc::new(ConnectionManager::new(Arc::new(RoomRegistry::new())));
        let engine = Arc::new(FanoutEngine::new(
            Arc::clone(&bus),
            Arc::clone(&manager),
            config.channel.clone(),
            config.fanout.clone(),
        ));
        let supervisor = Arc::new(ListenerSupervisor::new(
            engine,
            shutdown.child_token(),
            config.restart_policy,
        ));
        Self {
            state: AppState {
                manager,
                supervisor,
                bus,
                content,
                config: Arc::new(config),
                shutdown,
                start_time: Instant::now(),
                metrics: None,
            },
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.state.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(root_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/ws/{quiz_id}", get(ws_handler))
            .route("/quizzes", post(api::create_quiz))
            .route("/quizzes/{quiz_id}/players", post(api::join_quiz))
            .route("/quizzes/{quiz_id}/scores", post(api::update_score))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Start the fanout listener if it is not running.
    pub fn start_listener(&self) -> bool {
        self.state.supervisor.ensure_started()
    }

    /// Bind and serve in a background task.
    ///
    /// Returns the bound address and the serve task. The task ends once
    /// the shutdown token is cancelled and in-flight requests drain.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let bind = format!("{}:{}", self.state.config.host, self.state.config.port);
        let listener = tokio::net::TcpListener::bind(&bind).await?;
        let addr = listener.local_addr()?;
        let router = self.router();
        let token = self.state.shutdown.token();

        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, router).with_graceful_shutdown(token.cancelled_owned());
            if let Err(error) = serve.await {
                error!(%error, "http server error");
            }
        });
        info!(%addr, "quizcast server listening");
        Ok((addr, handle))
    }

    /// Stop the listener and wait for `handles` (typically the serve task).
    pub async fn stop(&self, handles: Vec<JoinHandle<()>>) {
        let timeout = self.state.config.shutdown_timeout;
        let _ = self.state.supervisor.shutdown(timeout).await;
        self.state.shutdown.graceful_shutdown(handles, timeout).await;
    }

    /// Get the connection lifecycle manager.
    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.state.manager
    }

    /// Get the room registry.
    pub fn registry(&self) -> &Arc<RoomRegistry> {
        self.state.manager.registry()
    }

    /// Get the listener supervisor.
    pub fn supervisor(&self) -> &Arc<ListenerSupervisor> {
        &self.state.supervisor
    }

    /// Get the event bus.
    pub fn bus(&self) -> &Arc<dyn Bus> {
        &self.state.bus
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.state.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }
}

/// GET /
async fn root_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "msg": "quizcast realtime API" }))
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let registry = state.manager.registry();
    Json(health::health_check(
        state.start_time,
        registry.room_ids(),
        registry.connection_count(),
        state.supervisor.state(),
        state.supervisor.is_running(),
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed",
        )
            .into_response(),
    }
}

/// GET /ws/{quiz_id}
async fn ws_handler(
    Path(quiz_id): Path<String>,
    State(state): State<AppState>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let room_id = match RoomId::parse(quiz_id) {
        Ok(room_id) => room_id,
        Err(error) => return ApiError::from(error).into_response(),
    };
    if state.shutdown.is_shutting_down() {
        return (StatusCode::SERVICE_UNAVAILABLE, "server shutting down").into_response();
    }
    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => return rejection.into_response(),
    };
    let manager = Arc::clone(&state.manager);
    let config = SessionConfig::from(state.config.as_ref());
    let shutdown = state.shutdown.token();
    upgrade
        .max_message_size(state.config.max_message_size)
        .on_upgrade(move |ws| run_ws_session(ws, room_id, manager, config, shutdown))
}
