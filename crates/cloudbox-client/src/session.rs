//! Shared per-`start` state: sink, stream format, pacing and statistics.

use std::time::Duration;

use bytes::Bytes;
use cloudbox_core::{
    BackendName, BitstreamError, EncodedFrame, PlaybackConfig, PlayerStatistics, SessionSummary,
    SourceIdentifier, StartupError,
};
use cloudbox_h264::{AvccSample, FormatDescription, ParameterSets};
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::sink::FrameSink;

/// Identity of one frame handed to [`StreamSession::present`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameInfo {
    pub index: u64,
    pub timestamp_us: u64,
    pub is_keyframe: bool,
    pub encoded_len: usize,
}

impl FrameInfo {
    pub fn of(frame: &EncodedFrame) -> Self {
        Self {
            index: frame.index,
            timestamp_us: frame.timestamp_us,
            is_keyframe: frame.is_keyframe,
            encoded_len: frame.data.len(),
        }
    }
}

pub(crate) struct StreamSession {
    summary: SessionSummary,
    stats: PlayerStatistics,
    sink: Box<dyn FrameSink>,
    format: Option<FormatDescription>,
    pacer: Option<Interval>,
}

impl StreamSession {
    pub fn new(
        backend: BackendName,
        source: SourceIdentifier,
        sink: Box<dyn FrameSink>,
        playback: &PlaybackConfig,
    ) -> Self {
        let pacer = playback.frame_interval_us().map(|us| {
            let mut pacer = interval(Duration::from_micros(us));
            pacer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            pacer
        });
        let summary = SessionSummary::new(backend, source);
        info!("[{}] Session {} opened for '{}'", backend, summary.session_id, summary.source);
        Self { summary, stats: PlayerStatistics::new(), sink, format: None, pacer }
    }

    pub fn has_format(&self) -> bool {
        self.format.is_some()
    }

    /// The format in effect after `annexb`. A unit carrying only an SPS or
    /// only a PPS is merged with the current parameter sets.
    pub fn next_format(&self, annexb: &[u8]) -> Result<FormatDescription, BitstreamError> {
        let current = self.format.as_ref().map(|f| &f.parameter_sets);
        FormatDescription::from_parameter_sets(ParameterSets::update(current, annexb)?)
    }

    /// Reconfigures the sink if `format` differs from the current one.
    pub async fn apply_format(&mut self, format: FormatDescription) -> Result<(), StartupError> {
        if self.format.as_ref() == Some(&format) {
            return Ok(());
        }
        if self.format.is_some() {
            info!("[{}] Parameter sets changed: {}", self.summary.backend, format.codec_string());
        }
        self.sink.configure(&format).await?;
        self.format = Some(format);
        Ok(())
    }

    /// [`next_format`](Self::next_format) then [`apply_format`](Self::apply_format),
    /// with unusable parameter sets reported as a runtime failure.
    pub async fn update_format(&mut self, annexb: &[u8]) -> Result<(), StartupError> {
        let format = self
            .next_format(annexb)
            .map_err(|e| StartupError::runtime(format!("unusable parameter sets: {e}")))?;
        self.apply_format(format).await
    }

    /// Converts one frame with `convert` (timed as decoding) and hands it to
    /// the sink (timed as rendering). Frames that convert to nothing, such as
    /// parameter-set-only units, are skipped.
    pub async fn present<F>(&mut self, info: FrameInfo, convert: F) -> Result<(), StartupError>
    where
        F: FnOnce() -> Result<Bytes, BitstreamError>,
    {
        if self.format.is_none() {
            return Err(StartupError::runtime(format!(
                "frame {} arrived before SPS/PPS",
                info.index
            )));
        }
        if let Some(pacer) = self.pacer.as_mut() {
            pacer.tick().await;
        }

        self.stats.begin_frame();
        self.stats.begin_decoding();
        let converted = convert();
        self.stats.end_decoding();
        let data = match converted {
            Ok(data) => data,
            Err(e) => {
                self.stats.abandon_frame();
                return Err(StartupError::runtime(format!("frame {}: {e}", info.index)));
            }
        };
        if data.is_empty() {
            debug!("[{}] Frame {} carries no slice data, skipped", self.summary.backend, info.index);
            self.stats.abandon_frame();
            return Ok(());
        }

        let sample = AvccSample {
            index: info.index,
            data,
            timestamp_us: info.timestamp_us,
            is_keyframe: info.is_keyframe,
        };
        self.stats.begin_rendering();
        let presented = self.sink.present(&sample).await;
        self.stats.end_rendering();
        if let Err(e) = presented {
            self.stats.abandon_frame();
            return Err(e);
        }
        self.stats.end_frame();

        self.summary.frames += 1;
        self.summary.bytes += info.encoded_len as u64;
        if info.is_keyframe {
            self.summary.keyframes += 1;
        }
        Ok(())
    }

    /// Flushes the sink and returns the session totals.
    pub async fn finish(mut self) -> SessionSummary {
        self.sink.finish().await;
        self.summary.statistics = self.stats.into_frame_statistics();
        let timing = self.summary.timing();
        info!(
            "[{}] Session {} complete: frames={} keyframes={} bytes={} decode={:.3}ms render={:.3}ms (mean)",
            self.summary.backend,
            self.summary.session_id,
            self.summary.frames,
            self.summary.keyframes,
            self.summary.bytes,
            timing.mean_decoding_ms,
            timing.mean_rendering_ms
        );
        self.summary
    }

    /// Flushes the sink after a failed stream and hands `error` back.
    pub async fn abort(mut self, error: StartupError) -> StartupError {
        warn!(
            "[{}] Session {} aborted after {} frames: {}",
            self.summary.backend, self.summary.session_id, self.summary.frames, error
        );
        self.sink.finish().await;
        error
    }
}
