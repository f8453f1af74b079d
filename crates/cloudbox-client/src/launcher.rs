//! Launcher: resolves the configured backend and runs it once.
//!
//! ```text
//! Idle ──resolve──► Running ──start resolves / shutdown──► Terminated
//!   └──────────── resolve fails ───────────────────────────┘
//! ```

use std::future::Future;

use cloudbox_core::{LaunchConfig, LaunchError, LaunchState, SessionSummary, StartupError};
use tracing::{info, warn};

use crate::registry::BackendRegistry;

/// How a launch ended when it did not fail.
#[derive(Debug)]
pub enum LaunchOutcome {
    /// The backend streamed its source to the end.
    Completed(SessionSummary),
    /// The shutdown future fired first; the backend's `start` was dropped.
    Interrupted,
}

pub struct Launcher {
    registry: BackendRegistry,
    config: LaunchConfig,
    state: LaunchState,
}

impl Launcher {
    pub fn new(registry: BackendRegistry, config: LaunchConfig) -> Self {
        Self { registry, config, state: LaunchState::Idle }
    }

    pub fn state(&self) -> LaunchState {
        self.state
    }

    pub fn config(&self) -> &LaunchConfig {
        &self.config
    }

    /// Runs the configured backend until it finishes.
    pub async fn run(&mut self) -> Result<LaunchOutcome, LaunchError> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Runs the configured backend until it finishes or `shutdown` resolves.
    ///
    /// A launcher runs at most once; calling this again after the first run
    /// fails in the start phase without touching any backend.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<LaunchOutcome, LaunchError>
    where
        F: Future<Output = ()>,
    {
        if self.state != LaunchState::Idle {
            return Err(LaunchError::start(StartupError::runtime(format!(
                "launcher already {:?}",
                self.state
            ))));
        }

        let name = self.config.backend;
        let source = &self.config.source;
        info!("Starting client: backend={} source='{}'", name, source);

        let backend = match self.registry.resolve(name) {
            Ok(backend) => backend,
            Err(e) => {
                self.state = LaunchState::Terminated;
                return Err(LaunchError::resolve(e));
            }
        };

        self.state = LaunchState::Running;
        let outcome = tokio::select! {
            result = backend.start(source) => result.map(LaunchOutcome::Completed),
            () = shutdown => {
                warn!("Shutdown requested, stopping '{}' backend", name);
                Ok(LaunchOutcome::Interrupted)
            }
        };
        self.state = LaunchState::Terminated;

        match &outcome {
            Ok(LaunchOutcome::Completed(summary)) => info!(
                "Client finished: {} frames, {} bytes (session {})",
                summary.frames, summary.bytes, summary.session_id
            ),
            Ok(LaunchOutcome::Interrupted) => info!("Client interrupted"),
            Err(e) => warn!("Backend '{}' failed: {}", name, e),
        }
        outcome.map_err(LaunchError::start)
    }
}
