use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::errors::StartupError;
use crate::stats::{FrameStatistics, StatisticsSummary};
use crate::types::{BackendName, SourceIdentifier};

// MARK: - ClientBackend trait

/// A streaming-client implementation the launcher can start.
///
/// `start` owns the stream for its whole lifetime: the returned future
/// resolves only once the source is exhausted or streaming fails. Dropping
/// the future stops the stream.
///
/// Implementations:
/// - `ContainerFileBackend`: `original`, plays an H.264 elementary-stream file
/// - `RawFrameBackend`: `fast`, streams a directory of pre-split frames
/// - `UnavailableBackend`: stands in for a backend compiled out of the build
#[async_trait]
pub trait ClientBackend: Send + Sync {
    /// Registry key of this backend.
    fn name(&self) -> BackendName;

    /// Streams `source` until it ends.
    ///
    /// A blank `source` must fail with [`StartupError::InvalidSource`] before
    /// any work is done.
    async fn start(&self, source: &SourceIdentifier) -> Result<SessionSummary, StartupError>;
}

// MARK: - SessionSummary

/// What one completed `start` call streamed.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub backend: BackendName,
    pub source: SourceIdentifier,
    pub frames: u64,
    pub keyframes: u64,
    pub bytes: u64,
    pub statistics: Vec<FrameStatistics>,
}

impl SessionSummary {
    pub fn new(backend: BackendName, source: SourceIdentifier) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            backend,
            source,
            frames: 0,
            keyframes: 0,
            bytes: 0,
            statistics: Vec::new(),
        }
    }

    pub fn timing(&self) -> StatisticsSummary {
        StatisticsSummary::from_frames(&self.statistics)
    }
}
