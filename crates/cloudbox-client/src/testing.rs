//! Test doubles shared by the backend, registry and launcher tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cloudbox_core::{BackendName, ClientBackend, SessionSummary, SourceIdentifier, StartupError};
use cloudbox_h264::{AvccSample, FormatDescription};

use crate::sink::{FrameSink, SinkFactory};

pub const SPS: &[u8] = &[0x67, 0x64, 0x00, 0x1F, 0xAC, 0xD9, 0x40, 0x50, 0x05, 0xBB, 0x01, 0x10];
pub const PPS: &[u8] = &[0x68, 0xEB, 0xE3, 0xCB, 0x22, 0xC0];
/// Same profile as [`SPS`], level 4.0.
pub const SPS_L40: &[u8] = &[0x67, 0x64, 0x00, 0x28, 0xAC, 0xD9, 0x40, 0x78, 0x02, 0x27, 0xE5, 0xC0];
pub const PPS_ALT: &[u8] = &[0x68, 0xEE, 0x3C, 0x80];
pub const IDR: &[u8] = &[0x65, 0x88, 0x84, 0x00, 0x33, 0xFF];
pub const P_SLICE: &[u8] = &[0x41, 0x9A, 0x21, 0x6C];

pub fn annexb(nalus: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for nalu in nalus {
        out.extend_from_slice(&[0, 0, 0, 1]);
        out.extend_from_slice(nalu);
    }
    out
}

// ── RecordingSink ──────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct SinkRecord {
    pub configured: usize,
    pub codecs: Vec<String>,
    pub samples: Vec<AvccSample>,
    pub finished: bool,
}

pub type SharedRecord = Arc<Mutex<SinkRecord>>;

pub struct RecordingSink {
    record: SharedRecord,
    fail_at: Option<u64>,
}

impl RecordingSink {
    pub fn new() -> (Self, SharedRecord) {
        let record = SharedRecord::default();
        (Self { record: Arc::clone(&record), fail_at: None }, record)
    }

    /// A factory whose sinks all write into one shared record.
    pub fn factory() -> (SinkFactory, SharedRecord) {
        Self::failing_factory(None)
    }

    /// Like [`RecordingSink::factory`], with sinks rejecting the sample at `fail_at`.
    pub fn failing_factory(fail_at: Option<u64>) -> (SinkFactory, SharedRecord) {
        let record = SharedRecord::default();
        let shared = Arc::clone(&record);
        let factory: SinkFactory = Arc::new(move || {
            Box::new(RecordingSink { record: Arc::clone(&shared), fail_at }) as Box<dyn FrameSink>
        });
        (factory, record)
    }
}

#[async_trait]
impl FrameSink for RecordingSink {
    async fn configure(&mut self, format: &FormatDescription) -> Result<(), StartupError> {
        let mut record = self.record.lock().unwrap();
        record.configured += 1;
        record.codecs.push(format.codec_string());
        Ok(())
    }

    async fn present(&mut self, sample: &AvccSample) -> Result<(), StartupError> {
        if self.fail_at == Some(sample.index) {
            return Err(StartupError::runtime(format!("sink rejected frame {}", sample.index)));
        }
        self.record.lock().unwrap().samples.push(sample.clone());
        Ok(())
    }

    async fn finish(&mut self) {
        self.record.lock().unwrap().finished = true;
    }
}

// ── StubBackend ────────────────────────────────────────────────────────────────

/// Backend that records every `start` argument instead of streaming.
pub struct StubBackend {
    name: BackendName,
    calls: Arc<Mutex<Vec<String>>>,
    fail_with_runtime: bool,
}

impl StubBackend {
    pub fn new(name: BackendName) -> (Self, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (Self { name, calls: Arc::clone(&calls), fail_with_runtime: false }, calls)
    }

    pub fn failing(name: BackendName) -> (Self, Arc<Mutex<Vec<String>>>) {
        let (mut stub, calls) = Self::new(name);
        stub.fail_with_runtime = true;
        (stub, calls)
    }
}

#[async_trait]
impl ClientBackend for StubBackend {
    fn name(&self) -> BackendName {
        self.name
    }

    async fn start(&self, source: &SourceIdentifier) -> Result<SessionSummary, StartupError> {
        self.calls.lock().unwrap().push(source.as_str().to_string());
        source.require_non_empty()?;
        if self.fail_with_runtime {
            return Err(StartupError::runtime("stub stream failed"));
        }
        Ok(SessionSummary::new(self.name, source.clone()))
    }
}
