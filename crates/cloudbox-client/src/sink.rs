use std::sync::Arc;

use async_trait::async_trait;
use cloudbox_core::StartupError;
use cloudbox_h264::{AvccSample, FormatDescription};
use tracing::{debug, info};

// MARK: - FrameSink trait

/// Where converted samples go: the decoder/renderer seam of a backend.
///
/// A sink is created per `start` call and always sees `configure` before
/// the first `present`. `configure` is called again whenever the stream's
/// parameter sets change.
#[async_trait]
pub trait FrameSink: Send {
    async fn configure(&mut self, format: &FormatDescription) -> Result<(), StartupError>;

    async fn present(&mut self, sample: &AvccSample) -> Result<(), StartupError>;

    /// Called once when the session ends, after the last frame or a failure.
    async fn finish(&mut self) {}
}

/// Creates one fresh sink per streaming session.
pub type SinkFactory = Arc<dyn Fn() -> Box<dyn FrameSink> + Send + Sync>;

pub fn default_sink_factory() -> SinkFactory {
    Arc::new(|| Box::new(LoggingSink::new()) as Box<dyn FrameSink>)
}

// MARK: - LoggingSink

/// Accepts every sample and reports progress through `tracing`.
#[derive(Debug, Default)]
pub struct LoggingSink {
    codec: Option<String>,
    frames: u64,
    bytes: u64,
}

impl LoggingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[async_trait]
impl FrameSink for LoggingSink {
    async fn configure(&mut self, format: &FormatDescription) -> Result<(), StartupError> {
        let codec = format.codec_string();
        info!(
            "Stream format: {} (SPS {} bytes, PPS {} bytes)",
            codec,
            format.parameter_sets.sps.len(),
            format.parameter_sets.pps.len()
        );
        self.codec = Some(codec);
        Ok(())
    }

    async fn present(&mut self, sample: &AvccSample) -> Result<(), StartupError> {
        if self.codec.is_none() {
            return Err(StartupError::runtime("sample presented before stream format"));
        }
        self.frames += 1;
        self.bytes += sample.data.len() as u64;
        if self.frames == 1 {
            info!("First frame presented ({} bytes keyframe={})", sample.data.len(), sample.is_keyframe);
        }
        if self.frames % 300 == 0 {
            info!("Presented {} frames ({} bytes)", self.frames, self.bytes);
        }
        debug!("Frame #{} pts={}us {} bytes", sample.index, sample.timestamp_us, sample.data.len());
        Ok(())
    }

    async fn finish(&mut self) {
        info!("Sink finished: {} frames, {} bytes", self.frames, self.bytes);
    }
}
