use std::path::PathBuf;

use thiserror::Error;

use crate::types::BackendName;

/// Failures a backend (or the registry resolving it) can report.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Backend '{backend}' unavailable: {reason}")]
    BackendUnavailable { backend: BackendName, reason: String },

    #[error("Invalid source '{source_id}': {reason}")]
    InvalidSource { source_id: String, reason: String },

    #[error("Runtime failure: {reason}")]
    RuntimeFailure { reason: String },

    #[error("Unknown backend name '{name}' (expected one of: original, fast)")]
    UnknownBackendName { name: String },
}

impl StartupError {
    pub fn invalid_source(source_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSource { source_id: source_id.into(), reason: reason.into() }
    }

    pub fn runtime(reason: impl Into<String>) -> Self {
        Self::RuntimeFailure { reason: reason.into() }
    }
}

// MARK: - LaunchError

/// The launcher phase an error surfaced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchPhase {
    Resolve,
    Start,
}

impl std::fmt::Display for LaunchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolve => write!(f, "resolve"),
            Self::Start => write!(f, "start"),
        }
    }
}

#[derive(Error, Debug)]
#[error("{phase} phase failed: {error}")]
pub struct LaunchError {
    pub phase: LaunchPhase,
    #[source]
    pub error: StartupError,
}

impl LaunchError {
    pub fn resolve(error: StartupError) -> Self {
        Self { phase: LaunchPhase::Resolve, error }
    }

    pub fn start(error: StartupError) -> Self {
        Self { phase: LaunchPhase::Start, error }
    }
}

// MARK: - ConfigError

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config file {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error(transparent)]
    Backend(#[from] StartupError),
}

// MARK: - BitstreamError

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BitstreamError {
    #[error("No Annex B start code found")]
    NoStartCode,

    #[error("SPS/PPS parameter sets missing")]
    MissingParameterSets,

    #[error("AVCC buffer overflow: need {needed} bytes, {remaining} remaining")]
    BufferOverflow { needed: usize, remaining: usize },

    #[error("Truncated NAL unit: {reason}")]
    Truncated { reason: String },
}
