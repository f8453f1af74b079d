//! Per-frame decode/render timing.
//!
//! A backend brackets each frame with `begin_frame`/`end_frame` and the two
//! work phases inside it with the matching `begin_*`/`end_*` pair. Frames
//! that never reach `end_frame` are discarded.

use std::time::Instant;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameStatistics {
    pub index: u64,
    pub decoding_ms: f64,
    pub rendering_ms: f64,
}

#[derive(Debug, Default)]
pub struct PlayerStatistics {
    frames: Vec<FrameStatistics>,
    next_index: u64,
    current: Option<FrameStatistics>,
    mark: Option<Instant>,
}

impl PlayerStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_frame(&mut self) {
        self.current = Some(FrameStatistics {
            index: self.next_index,
            decoding_ms: 0.0,
            rendering_ms: 0.0,
        });
        self.next_index += 1;
    }

    pub fn begin_decoding(&mut self) {
        self.mark = Some(Instant::now());
    }

    pub fn end_decoding(&mut self) {
        let elapsed = self.take_elapsed_ms();
        if let Some(frame) = self.current.as_mut() {
            frame.decoding_ms += elapsed;
        }
    }

    pub fn begin_rendering(&mut self) {
        self.mark = Some(Instant::now());
    }

    pub fn end_rendering(&mut self) {
        let elapsed = self.take_elapsed_ms();
        if let Some(frame) = self.current.as_mut() {
            frame.rendering_ms += elapsed;
        }
    }

    /// Commits the frame opened by the last `begin_frame`.
    pub fn end_frame(&mut self) {
        if let Some(frame) = self.current.take() {
            self.frames.push(frame);
        }
    }

    /// Discards the open frame and gives its index back.
    pub fn abandon_frame(&mut self) {
        if self.current.take().is_some() {
            self.next_index -= 1;
        }
        self.mark = None;
    }

    pub fn frame_statistics(&self) -> &[FrameStatistics] {
        &self.frames
    }

    pub fn into_frame_statistics(self) -> Vec<FrameStatistics> {
        self.frames
    }

    pub fn summary(&self) -> StatisticsSummary {
        StatisticsSummary::from_frames(&self.frames)
    }

    fn take_elapsed_ms(&mut self) -> f64 {
        self.mark
            .take()
            .map(|start| start.elapsed().as_secs_f64() * 1_000.0)
            .unwrap_or(0.0)
    }
}

// ── Summary ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatisticsSummary {
    pub frames: usize,
    pub mean_decoding_ms: f64,
    pub mean_rendering_ms: f64,
    pub max_decoding_ms: f64,
    pub max_rendering_ms: f64,
}

impl StatisticsSummary {
    pub fn from_frames(frames: &[FrameStatistics]) -> Self {
        if frames.is_empty() {
            return Self::default();
        }
        let n = frames.len() as f64;
        let (sum_dec, sum_ren, max_dec, max_ren) = frames.iter().fold(
            (0.0_f64, 0.0_f64, 0.0_f64, 0.0_f64),
            |(sd, sr, md, mr), f| {
                (sd + f.decoding_ms, sr + f.rendering_ms, md.max(f.decoding_ms), mr.max(f.rendering_ms))
            },
        );
        Self {
            frames: frames.len(),
            mean_decoding_ms: sum_dec / n,
            mean_rendering_ms: sum_ren / n,
            max_decoding_ms: max_dec,
            max_rendering_ms: max_ren,
        }
    }
}
