use anyhow::{Context, Result};
use cloudbox_client::{BackendRegistry, LaunchOutcome, Launcher};
use cloudbox_core::{ConfigError, LaunchConfig, LaunchError, SessionSummary};
use tracing::{debug, info, warn};

/// Resolves configuration, starts the selected backend and waits for it.
///
/// # Configuration
/// Defaults to the `fast` backend streaming `frames`. Override with
/// `CLOUDBOX_BACKEND`, `CLOUDBOX_SOURCE` and `CLOUDBOX_TARGET_FPS`, or point
/// `CLOUDBOX_CONFIG` at a JSON file; individual variables win over the file.
///
/// # Flow
/// 1. Load `LaunchConfig` from the environment
/// 2. Build the registry of compiled-in backends
/// 3. Run the launcher until the stream ends or Ctrl-C arrives
/// 4. Report per-frame timings and a summary
pub async fn run() -> Result<()> {
    let config = checked_config(LaunchConfig::from_env())?;
    info!(
        "Config: backend={} source='{}' target_fps={}",
        config.backend, config.source, config.playback.target_fps
    );

    let registry = BackendRegistry::with_defaults(&config.playback);
    let mut launcher = Launcher::new(registry, config);

    let outcome = launcher
        .run_until(shutdown_signal())
        .await
        .context("Client launch failed")?;

    match outcome {
        LaunchOutcome::Completed(summary) => report(&summary),
        LaunchOutcome::Interrupted => info!("Stopped by Ctrl-C"),
    }
    Ok(())
}

/// An unknown backend name is a failed resolve, the rest is a config problem.
fn checked_config(loaded: Result<LaunchConfig, ConfigError>) -> Result<LaunchConfig> {
    match loaded {
        Ok(config) => Ok(config),
        Err(ConfigError::Backend(e)) => Err(LaunchError::resolve(e)).context("Client launch failed"),
        Err(e) => Err(e).context("Failed to load launch configuration"),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

fn report(summary: &SessionSummary) {
    for frame in &summary.statistics {
        debug!(
            "#{}: Decode took {:.3} ms, render took {:.3} ms",
            frame.index, frame.decoding_ms, frame.rendering_ms
        );
    }
    let timing = summary.timing();
    info!(
        "[{}] {} frames ({} keyframes, {} bytes) from '{}'",
        summary.backend, summary.frames, summary.keyframes, summary.bytes, summary.source
    );
    info!(
        "Decode avg {:.3} ms (max {:.3}), render avg {:.3} ms (max {:.3})",
        timing.mean_decoding_ms,
        timing.max_decoding_ms,
        timing.mean_rendering_ms,
        timing.max_rendering_ms
    );
}
