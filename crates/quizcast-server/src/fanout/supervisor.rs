//! Keeps the fanout engine running as a background task.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use metrics::counter;
use parking_lot::Mutex;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::errors::FanoutError;
use crate::fanout::engine::{FanoutEngine, FanoutState};
use crate::metrics::FANOUT_RESTARTS_TOTAL;

/// What to do when the engine task crashes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Log the crash and stay down until `ensure_started` is called again.
    #[default]
    Never,
    /// Restart after `delay`.
    OnCrash {
        /// Pause before restarting.
        delay: Duration,
    },
}

/// How one engine run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerOutcome {
    /// Returned after its shutdown token fired.
    Stopped,
    /// Task was aborted after missing the shutdown deadline.
    Cancelled,
    /// Fatal engine error or panic.
    Crashed(String),
}

impl ListenerOutcome {
    fn from_run(result: Result<Result<(), FanoutError>, Box<dyn Any + Send>>) -> Self {
        match result {
            Ok(Ok(())) => Self::Stopped,
            Ok(Err(e)) => Self::Crashed(e.to_string()),
            Err(panic) => Self::Crashed(format!("panicked: {}", panic_message(panic.as_ref()))),
        }
    }

    fn from_join_error(error: &JoinError) -> Self {
        if error.is_cancelled() {
            Self::Cancelled
        } else {
            Self::Crashed(format!("panicked: {error}"))
        }
    }

    fn log(&self) {
        match self {
            Self::Stopped => info!("fanout listener stopped normally"),
            Self::Cancelled => info!("fanout listener cancelled"),
            Self::Crashed(reason) => error!(reason, "fanout listener crashed"),
        }
    }
}

/// Runs one [`FanoutEngine`] for the life of the process.
pub struct ListenerSupervisor {
    engine: Arc<FanoutEngine>,
    token: CancellationToken,
    policy: RestartPolicy,
    handle: Mutex<Option<JoinHandle<ListenerOutcome>>>,
}

impl ListenerSupervisor {
    /// Create a supervisor. The engine stops when `token` is cancelled.
    pub fn new(engine: Arc<FanoutEngine>, token: CancellationToken, policy: RestartPolicy) -> Self {
        Self {
            engine,
            token,
            policy,
            handle: Mutex::new(None),
        }
    }

    /// Spawn the engine unless it is already running.
    ///
    /// Returns whether a new task was started. A task that has finished
    /// (including by crashing) does not count as running.
    pub fn ensure_started(&self) -> bool {
        let mut slot = self.handle.lock();
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }
        if self.token.is_cancelled() {
            warn!("not starting fanout listener during shutdown");
            return false;
        }
        *slot = Some(tokio::spawn(supervise(
            Arc::clone(&self.engine),
            self.token.clone(),
            self.policy,
        )));
        info!(policy = ?self.policy, "fanout listener started");
        true
    }

    /// Whether the engine task is alive.
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Current engine state.
    pub fn state(&self) -> FanoutState {
        self.engine.state()
    }

    /// The supervised engine.
    pub fn engine(&self) -> &Arc<FanoutEngine> {
        &self.engine
    }

    /// Stop the engine and wait up to `timeout` for it to exit.
    ///
    /// An engine still busy at the deadline is aborted and reported as
    /// [`ListenerOutcome::Cancelled`]; nothing of it keeps running after
    /// this returns. `None` means nothing was running.
    pub async fn shutdown(&self, timeout: Duration) -> Option<ListenerOutcome> {
        self.token.cancel();
        let mut handle = self.handle.lock().take()?;
        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(Ok(outcome)) => Some(outcome),
            Ok(Err(error)) => Some(ListenerOutcome::from_join_error(&error)),
            Err(_) => {
                warn!(?timeout, "fanout listener did not stop in time, aborting");
                handle.abort();
                let outcome = match handle.await {
                    Ok(outcome) => outcome,
                    Err(error) => ListenerOutcome::from_join_error(&error),
                };
                outcome.log();
                Some(outcome)
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

/// Run the engine, restarting on crash when the policy allows.
async fn supervise(
    engine: Arc<FanoutEngine>,
    token: CancellationToken,
    policy: RestartPolicy,
) -> ListenerOutcome {
    loop {
        let run = AssertUnwindSafe(engine.run(token.clone()))
            .catch_unwind()
            .await;
        let outcome = ListenerOutcome::from_run(run);
        outcome.log();

        let RestartPolicy::OnCrash { delay } = policy else {
            return outcome;
        };
        if !matches!(outcome, ListenerOutcome::Crashed(_)) || token.is_cancelled() {
            return outcome;
        }
        warn!(?delay, "restarting fanout listener");
        tokio::select! {
            () = token.cancelled() => return outcome,
            () = tokio::time::sleep(delay) => {}
        }
        counter!(FANOUT_RESTARTS_TOTAL).increment(1);
    }
}
