//! `fast` backend: streams a directory of pre-split frames.
//!
//! Every regular file in the directory is one access unit in Annex B form.
//! Files are ordered by the number in their name (`frame_2.h264` before
//! `frame_10.h264`), falling back to the name itself.
//!
//! Single-NAL slice frames behind a 4-byte start code skip the general
//! converter: the start code is overwritten with the NAL length in the buffer
//! the file was read into. Frames carrying an SPS or PPS update the stream
//! format and go through the converter, which leaves the parameter sets out.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::BytesMut;
use cloudbox_core::{
    BackendName, ClientBackend, PlaybackConfig, SessionSummary, SourceIdentifier, StartupError,
};
use cloudbox_h264::{
    annexb_to_avcc, is_single_nalu, nalu_types, rewrite_single_nalu_in_place, NaluType,
    DEFAULT_FRAME_INTERVAL_US,
};
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use crate::session::{FrameInfo, StreamSession};
use crate::sink::{default_sink_factory, SinkFactory};

pub struct RawFrameBackend {
    playback: PlaybackConfig,
    sink_factory: SinkFactory,
}

impl RawFrameBackend {
    pub fn new(playback: PlaybackConfig) -> Self {
        Self { playback, sink_factory: default_sink_factory() }
    }

    pub fn with_sink_factory(mut self, sink_factory: SinkFactory) -> Self {
        self.sink_factory = sink_factory;
        self
    }
}

impl Default for RawFrameBackend {
    fn default() -> Self {
        Self::new(PlaybackConfig::default())
    }
}

#[async_trait]
impl ClientBackend for RawFrameBackend {
    fn name(&self) -> BackendName {
        BackendName::Fast
    }

    async fn start(&self, source: &SourceIdentifier) -> Result<SessionSummary, StartupError> {
        let dir = source.require_non_empty()?;

        let meta = tokio::fs::metadata(dir)
            .await
            .map_err(|e| StartupError::invalid_source(dir, format!("cannot open frame directory: {e}")))?;
        if !meta.is_dir() {
            return Err(StartupError::invalid_source(dir, "not a directory"));
        }
        let frames = list_frames(Path::new(dir))
            .await
            .map_err(|e| StartupError::invalid_source(dir, format!("cannot list frames: {e}")))?;
        if frames.is_empty() {
            return Err(StartupError::invalid_source(dir, "no frames"));
        }
        info!("[fast] Streaming {} frames from '{}'", frames.len(), dir);

        let interval_us = self.playback.frame_interval_us().unwrap_or(DEFAULT_FRAME_INTERVAL_US);
        let mut session =
            StreamSession::new(self.name(), source.clone(), (self.sink_factory)(), &self.playback);

        match stream_frames(&frames, interval_us, &mut session).await {
            Ok(()) => Ok(session.finish().await),
            Err(e) => Err(session.abort(e).await),
        }
    }
}

async fn stream_frames(
    frames: &[PathBuf],
    interval_us: u64,
    session: &mut StreamSession,
) -> Result<(), StartupError> {
    for (index, path) in frames.iter().enumerate() {
        let index = index as u64;
        let buf = read_frame(path).await.map_err(|e| {
            StartupError::runtime(format!("cannot read frame {}: {e}", path.display()))
        })?;

        let types = nalu_types(&buf);
        let carries_parameter_sets = types.iter().any(NaluType::is_parameter_set);
        if carries_parameter_sets {
            session.update_format(&buf).await?;
        }
        let info = FrameInfo {
            index,
            timestamp_us: index * interval_us,
            is_keyframe: types.contains(&NaluType::Idr),
            encoded_len: buf.len(),
        };

        if !carries_parameter_sets && is_single_nalu(&buf) {
            session.present(info, move || rewrite_single_nalu_in_place(buf)).await?;
        } else {
            debug!("[fast] Frame {} has {} NAL units, converting", index, types.len());
            session.present(info, || annexb_to_avcc(&buf)).await?;
        }
    }
    Ok(())
}

/// Regular, non-hidden files of `dir` in playback order.
async fn list_frames(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut frames = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let path = entry.path();
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(true, |n| n.starts_with('.'));
        if !hidden {
            frames.push(path);
        }
    }
    frames.sort_by_cached_key(|path| frame_sort_key(path));
    Ok(frames)
}

/// `(has no number, number, name)` so numbered frames come first, in numeric order.
fn frame_sort_key(path: &Path) -> (bool, u64, String) {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let digits: String = stem.chars().filter(|c| c.is_ascii_digit()).collect();
    let number = digits.parse::<u64>().ok();
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
    (number.is_none(), number.unwrap_or(0), name)
}

async fn read_frame(path: &Path) -> std::io::Result<BytesMut> {
    let mut file = tokio::fs::File::open(path).await?;
    let len = file.metadata().await?.len() as usize;
    let mut buf = BytesMut::with_capacity(len);
    while file.read_buf(&mut buf).await? > 0 {}
    Ok(buf)
}
