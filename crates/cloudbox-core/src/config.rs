use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::ConfigError;
use crate::types::{BackendName, SourceIdentifier};

pub const ENV_CONFIG: &str = "CLOUDBOX_CONFIG";
pub const ENV_BACKEND: &str = "CLOUDBOX_BACKEND";
pub const ENV_SOURCE: &str = "CLOUDBOX_SOURCE";
pub const ENV_TARGET_FPS: &str = "CLOUDBOX_TARGET_FPS";

/// Source streamed when nothing else is configured.
pub const DEFAULT_SOURCE: &str = "frames";

// MARK: - PlaybackConfig

/// Settings shared by every backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Frames per second to pace presentation at. `0` streams unpaced.
    #[serde(alias = "targetFPS", alias = "targetFps")]
    pub target_fps: u32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { target_fps: 0 }
    }
}

impl PlaybackConfig {
    /// Interval between presented frames in microseconds, `None` when unpaced.
    pub fn frame_interval_us(&self) -> Option<u64> {
        (self.target_fps > 0).then(|| 1_000_000 / self.target_fps as u64)
    }
}

// MARK: - LaunchConfig

/// Which backend to start, and with what.
///
/// Resolved once at startup: defaults, then an optional JSON file named by
/// `CLOUDBOX_CONFIG`, then individual `CLOUDBOX_*` variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    pub backend: BackendName,
    pub source: SourceIdentifier,
    pub playback: PlaybackConfig,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            backend: BackendName::Fast,
            source: SourceIdentifier::from(DEFAULT_SOURCE),
            playback: PlaybackConfig::default(),
        }
    }
}

impl LaunchConfig {
    pub fn new(backend: BackendName, source: impl Into<SourceIdentifier>) -> Self {
        Self { backend, source: source.into(), ..Self::default() }
    }

    /// Reads a JSON config file. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: Self = serde_json::from_str(&text).map_err(|e| ConfigError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!("Loaded config from {}: {:?}", path.display(), cfg);
        Ok(cfg)
    }

    /// Builds the config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`LaunchConfig::from_env`] with an injectable variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base = match lookup(ENV_CONFIG).filter(|p| !p.trim().is_empty()) {
            Some(path) => Self::load(PathBuf::from(path))?,
            None => Self::default(),
        };
        base.with_overrides(lookup)
    }

    /// Applies `CLOUDBOX_BACKEND`, `CLOUDBOX_SOURCE` and `CLOUDBOX_TARGET_FPS`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(name) = lookup(ENV_BACKEND) {
            self.backend = name.parse()?;
        }
        if let Some(source) = lookup(ENV_SOURCE) {
            self.source = SourceIdentifier::new(source);
        }
        if let Some(fps) = lookup(ENV_TARGET_FPS) {
            self.playback.target_fps = fps.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_TARGET_FPS.into(),
                value: fps.clone(),
            })?;
        }
        Ok(self)
    }
}
