//! Shared fixtures: WAV writers and in-memory collaborators.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use musaix_analyzer::callback::{CallbackError, CallbackPayload, ResultSink};
use musaix_analyzer::config::AnalysisConfig;
use musaix_analyzer::embedding::{Embedder, EmbeddingError};
use musaix_analyzer::storage::{ObjectStore, StorageError};
use musaix_analyzer::{Analyzer, Worker};
use serde_json::Value;

pub const DIMENSIONS: usize = 1536;

/// Mono 16-bit WAV with a 1.5 kHz click every `60 / bpm` seconds.
pub fn write_click_wav(path: &Path, sample_rate: u32, seconds: f32, bpm: f32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();

    let n = (sample_rate as f32 * seconds) as usize;
    let interval = (60.0 / bpm * sample_rate as f32) as usize;
    let click_len = sample_rate as usize / 50;
    for i in 0..n {
        let offset = i % interval;
        let value = if offset < click_len {
            let t = offset as f32 / sample_rate as f32;
            0.8 * (-t * 200.0).exp() * (2.0 * std::f32::consts::PI * 1500.0 * t).sin()
        } else {
            0.0
        };
        writer.write_sample((value * i16::MAX as f32) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

/// Stereo 16-bit WAV of a quiet 220 Hz tone.
pub fn write_stereo_tone_wav(path: &Path, sample_rate: u32, seconds: f32) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let n = (sample_rate as f32 * seconds) as usize;
    for i in 0..n {
        let t = i as f32 / sample_rate as f32;
        let value = (0.3 * (2.0 * std::f32::consts::PI * 220.0 * t).sin() * i16::MAX as f32) as i16;
        writer.write_sample(value).unwrap();
        writer.write_sample(value).unwrap();
    }
    writer.finalize().unwrap();
}

pub fn wav_bytes(sample_rate: u32, seconds: f32, bpm: f32) -> Vec<u8> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fixture.wav");
    write_click_wav(&path, sample_rate, seconds, bpm);
    std::fs::read(&path).unwrap()
}

/// Returns a constant vector and records every text it was asked to embed.
#[derive(Clone, Default)]
pub struct FakeEmbedder {
    pub texts: Arc<Mutex<Vec<String>>>,
}

impl Embedder for FakeEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.texts.lock().unwrap().push(text.to_string());
        Ok(vec![0.01; DIMENSIONS])
    }
}

pub struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Status { status: 429, body: "rate limited".into() })
    }
}

/// In-memory bucket; unknown paths answer 404.
#[derive(Clone, Default)]
pub struct FakeStore {
    pub objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    pub downloads: Arc<AtomicUsize>,
}

impl FakeStore {
    pub fn with_object(self, path: &str, bytes: Vec<u8>) -> Self {
        self.objects.lock().unwrap().insert(path.to_string(), bytes);
        self
    }

    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

impl ObjectStore for FakeStore {
    fn download(&self, storage_path: &str, dest: &mut dyn Write) -> Result<u64, StorageError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let objects = self.objects.lock().unwrap();
        let bytes = objects.get(storage_path).ok_or(StorageError::Status(404))?;
        dest.write_all(bytes)?;
        Ok(bytes.len() as u64)
    }
}

/// Records delivered payloads as JSON; optionally fails every delivery.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub delivered: Arc<Mutex<Vec<Value>>>,
    pub fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn payloads(&self) -> Vec<Value> {
        self.delivered.lock().unwrap().clone()
    }
}

impl ResultSink for RecordingSink {
    fn deliver(&self, payload: &CallbackPayload<'_>) -> Result<(), CallbackError> {
        self.delivered
            .lock()
            .unwrap()
            .push(serde_json::to_value(payload).unwrap());
        if self.fail {
            return Err(CallbackError::Status(502));
        }
        Ok(())
    }
}

pub fn analyzer(embedder: impl Embedder + 'static) -> Analyzer {
    Analyzer::new(AnalysisConfig::default(), Box::new(embedder))
}

pub fn worker(store: FakeStore, sink: RecordingSink, scratch: &Path) -> Worker {
    Worker::new(analyzer(FakeEmbedder::default()), Box::new(store), Box::new(sink))
        .with_scratch_dir(scratch)
}

pub fn dir_is_empty(path: &Path) -> bool {
    std::fs::read_dir(path).unwrap().next().is_none()
}
