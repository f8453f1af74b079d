//! `original` backend: plays an H.264 Annex B elementary-stream file.
//!
//! # Pipeline
//! ```text
//! file ─► AccessUnitSplitter ─► annexb_to_avcc ─► FrameSink
//!              │ SPS/PPS
//!              └──────────────► FormatDescription ─► FrameSink::configure
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use cloudbox_core::{
    BackendName, ClientBackend, PlaybackConfig, SessionSummary, SourceIdentifier, StartupError,
};
use cloudbox_h264::{
    annexb_to_avcc, has_start_code, nalu_types, AccessUnitSplitter, NaluType, DEFAULT_FRAME_INTERVAL_US,
};
use tracing::info;

use crate::session::{FrameInfo, StreamSession};
use crate::sink::{default_sink_factory, SinkFactory};

pub struct ContainerFileBackend {
    playback: PlaybackConfig,
    sink_factory: SinkFactory,
}

impl ContainerFileBackend {
    pub fn new(playback: PlaybackConfig) -> Self {
        Self { playback, sink_factory: default_sink_factory() }
    }

    pub fn with_sink_factory(mut self, sink_factory: SinkFactory) -> Self {
        self.sink_factory = sink_factory;
        self
    }
}

impl Default for ContainerFileBackend {
    fn default() -> Self {
        Self::new(PlaybackConfig::default())
    }
}

#[async_trait]
impl ClientBackend for ContainerFileBackend {
    fn name(&self) -> BackendName {
        BackendName::Original
    }

    async fn start(&self, source: &SourceIdentifier) -> Result<SessionSummary, StartupError> {
        let path = source.require_non_empty()?;

        let data = tokio::fs::read(path)
            .await
            .map_err(|e| StartupError::invalid_source(path, format!("cannot read file: {e}")))?;
        if !has_start_code(&data) {
            return Err(StartupError::invalid_source(path, "not an H.264 Annex B stream"));
        }
        info!("[original] Playing '{}' ({} bytes)", path, data.len());

        let interval_us = self.playback.frame_interval_us().unwrap_or(DEFAULT_FRAME_INTERVAL_US);
        let units = AccessUnitSplitter::new(Bytes::from(data)).with_frame_interval_us(interval_us);
        let mut session =
            StreamSession::new(self.name(), source.clone(), (self.sink_factory)(), &self.playback);

        match play_units(path, units, &mut session).await {
            Ok(()) => Ok(session.finish().await),
            Err(e) => Err(session.abort(e).await),
        }
    }
}

async fn play_units(
    path: &str,
    units: AccessUnitSplitter,
    session: &mut StreamSession,
) -> Result<(), StartupError> {
    for unit in units {
        let types = nalu_types(&unit.data);
        if types.iter().any(NaluType::is_parameter_set) {
            let at_head = !session.has_format();
            let format = session.next_format(&unit.data).map_err(|e| {
                if at_head {
                    StartupError::invalid_source(path, format!("unusable parameter sets: {e}"))
                } else {
                    StartupError::runtime(format!("frame {}: unusable parameter sets: {e}", unit.index))
                }
            })?;
            session.apply_format(format).await?;
        }
        if !session.has_format() {
            if types.iter().any(NaluType::is_vcl) {
                return Err(StartupError::invalid_source(path, "slice data before any SPS/PPS"));
            }
            continue;
        }
        session
            .present(FrameInfo::of(&unit), || annexb_to_avcc(&unit.data))
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::testing::{annexb, RecordingSink, IDR, PPS, PPS_ALT, P_SLICE, SPS, SPS_L40};

    fn stream_file(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".h264").tempfile().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    fn source_of(file: &tempfile::NamedTempFile) -> SourceIdentifier {
        SourceIdentifier::new(file.path().to_string_lossy().to_string())
    }

    #[tokio::test]
    async fn plays_every_access_unit() {
        let file = stream_file(&annexb(&[SPS, PPS, IDR, P_SLICE, P_SLICE, SPS, PPS, IDR]));
        let (factory, record) = RecordingSink::factory();
        let backend = ContainerFileBackend::default().with_sink_factory(factory);

        let summary = backend.start(&source_of(&file)).await.unwrap();

        assert_eq!(summary.backend, BackendName::Original);
        assert_eq!(summary.frames, 4);
        assert_eq!(summary.keyframes, 2);
        assert_eq!(summary.statistics.len(), 4);

        let record = record.lock().unwrap();
        // identical parameter sets the second time round
        assert_eq!(record.configured, 1);
        assert_eq!(record.codecs, vec!["avc1.64001f".to_string()]);
        assert_eq!(record.samples.len(), 4);
        assert_eq!(&record.samples[0].data[4..], IDR);
        assert!(record.finished);
    }

    #[tokio::test]
    async fn empty_source_is_rejected_without_side_effects() {
        let (factory, record) = RecordingSink::factory();
        let backend = ContainerFileBackend::default().with_sink_factory(factory);

        let err = backend.start(&SourceIdentifier::from("")).await.unwrap_err();
        assert!(matches!(err, StartupError::InvalidSource { .. }));
        assert_eq!(record.lock().unwrap().configured, 0);
        assert!(!record.lock().unwrap().finished);
    }

    #[tokio::test]
    async fn missing_file_is_invalid_source() {
        let backend = ContainerFileBackend::default();
        let err = backend.start(&"/nonexistent/hello.h264".into()).await.unwrap_err();
        assert!(matches!(err, StartupError::InvalidSource { ref source_id, .. } if source_id == "/nonexistent/hello.h264"));
    }

    #[tokio::test]
    async fn non_annexb_file_is_invalid_source() {
        let file = stream_file(b"RIFF....AVI LIST");
        let err = ContainerFileBackend::default().start(&source_of(&file)).await.unwrap_err();
        assert!(err.to_string().contains("not an H.264 Annex B stream"));
    }

    #[tokio::test]
    async fn slices_before_parameter_sets_are_rejected() {
        let file = stream_file(&annexb(&[P_SLICE, SPS, PPS, IDR]));
        let err = ContainerFileBackend::default().start(&source_of(&file)).await.unwrap_err();
        assert!(matches!(err, StartupError::InvalidSource { .. }));
    }

    #[tokio::test]
    async fn sink_failure_is_a_runtime_failure() {
        let file = stream_file(&annexb(&[SPS, PPS, IDR, P_SLICE]));
        let (factory, record) = RecordingSink::failing_factory(Some(1));
        let backend = ContainerFileBackend::default().with_sink_factory(factory);

        let err = backend.start(&source_of(&file)).await.unwrap_err();
        assert!(matches!(err, StartupError::RuntimeFailure { .. }));
        let record = record.lock().unwrap();
        assert_eq!(record.samples.len(), 1);
        assert!(record.finished);
    }

    #[tokio::test]
    async fn changed_sps_reconfigures_sink() {
        let file = stream_file(&annexb(&[SPS, PPS, IDR, P_SLICE, SPS_L40, PPS, IDR]));
        let (factory, record) = RecordingSink::factory();
        let backend = ContainerFileBackend::default().with_sink_factory(factory);

        let summary = backend.start(&source_of(&file)).await.unwrap();
        assert_eq!(summary.frames, 3);
        let record = record.lock().unwrap();
        assert_eq!(record.configured, 2);
        assert_eq!(record.codecs, vec!["avc1.64001f".to_string(), "avc1.640028".to_string()]);
    }

    #[tokio::test]
    async fn pps_only_change_reconfigures_sink() {
        let file = stream_file(&annexb(&[SPS, PPS, IDR, P_SLICE, PPS_ALT, IDR]));
        let (factory, record) = RecordingSink::factory();
        let backend = ContainerFileBackend::default().with_sink_factory(factory);

        let summary = backend.start(&source_of(&file)).await.unwrap();
        assert_eq!(summary.frames, 3);
        let record = record.lock().unwrap();
        assert_eq!(record.configured, 2);
        assert_eq!(record.codecs, vec!["avc1.64001f".to_string(); 2]);
        // the new PPS goes to configure, not into the slice sample
        assert_eq!(record.samples[2].nalus().unwrap(), vec![IDR]);
    }

    #[tokio::test]
    async fn sps_without_pps_at_file_start_is_invalid_source() {
        let file = stream_file(&annexb(&[SPS, IDR, P_SLICE]));
        let (factory, record) = RecordingSink::factory();
        let err = ContainerFileBackend::default()
            .with_sink_factory(factory)
            .start(&source_of(&file))
            .await
            .unwrap_err();
        assert!(matches!(err, StartupError::InvalidSource { .. }));
        assert_eq!(record.lock().unwrap().configured, 0);
    }
}
