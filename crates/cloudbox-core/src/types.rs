use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::StartupError;

// MARK: - BackendName

/// The two interchangeable streaming-client implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendName {
    /// Plays an H.264 Annex B elementary-stream file.
    Original,
    /// Streams a directory of pre-split raw frames.
    Fast,
}

impl BackendName {
    pub const ALL: [BackendName; 2] = [BackendName::Original, BackendName::Fast];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Fast => "fast",
        }
    }
}

impl std::fmt::Display for BackendName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendName {
    type Err = StartupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "original" => Ok(Self::Original),
            "fast" => Ok(Self::Fast),
            other => Err(StartupError::UnknownBackendName { name: other.to_string() }),
        }
    }
}

// MARK: - SourceIdentifier

/// Backend-specific name of what to stream.
///
/// Opaque at this layer: a file path for `original`, a frame directory for
/// `fast`. Backends decide what is valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceIdentifier(String);

impl SourceIdentifier {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the empty string and for whitespace-only identifiers.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Fails with [`StartupError::InvalidSource`] when blank, otherwise
    /// hands back the raw identifier.
    pub fn require_non_empty(&self) -> Result<&str, StartupError> {
        if self.is_blank() {
            return Err(StartupError::InvalidSource {
                source_id: self.0.clone(),
                reason: "source identifier is empty".into(),
            });
        }
        Ok(&self.0)
    }
}

impl From<&str> for SourceIdentifier {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SourceIdentifier {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for SourceIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// MARK: - LaunchState

/// Lifecycle of one launcher invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaunchState {
    #[default]
    Idle,
    Running,
    Terminated,
}

impl std::fmt::Display for LaunchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}

// MARK: - EncodedFrame

/// One H.264 access unit in Annex B form, as read from a source.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub index: u64,
    pub data: bytes::Bytes,
    pub timestamp_us: u64,
    pub is_keyframe: bool,
}
