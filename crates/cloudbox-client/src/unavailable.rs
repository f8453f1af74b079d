//! Placeholder registered for a backend whose cargo feature is disabled.

use async_trait::async_trait;
use cloudbox_core::{BackendName, ClientBackend, SessionSummary, SourceIdentifier, StartupError};
use tracing::warn;

pub struct UnavailableBackend {
    name: BackendName,
    reason: String,
}

impl UnavailableBackend {
    pub fn new(name: BackendName, reason: impl Into<String>) -> Self {
        Self { name, reason: reason.into() }
    }

    /// The placeholder used when `name` was compiled out of this build.
    pub fn not_compiled(name: BackendName) -> Self {
        Self::new(name, format!("built without the `{name}` feature"))
    }
}

#[async_trait]
impl ClientBackend for UnavailableBackend {
    fn name(&self) -> BackendName {
        self.name
    }

    async fn start(&self, source: &SourceIdentifier) -> Result<SessionSummary, StartupError> {
        source.require_non_empty()?;
        warn!("[{}] Backend unavailable: {}", self.name, self.reason);
        Err(StartupError::BackendUnavailable { backend: self.name, reason: self.reason.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn start_reports_backend_unavailable() {
        let backend = UnavailableBackend::not_compiled(BackendName::Original);
        let err = backend.start(&"hello.h264".into()).await.unwrap_err();
        assert!(matches!(err, StartupError::BackendUnavailable { backend: BackendName::Original, .. }));
        assert!(err.to_string().contains("`original` feature"));
    }

    #[tokio::test]
    async fn blank_source_still_checked_first() {
        let backend = UnavailableBackend::not_compiled(BackendName::Fast);
        let err = backend.start(&"".into()).await.unwrap_err();
        assert!(matches!(err, StartupError::InvalidSource { .. }));
    }
}
