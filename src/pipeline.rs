//! Feature extraction → summary → embedding, with a tagged result.
//!
//! [`Analyzer::analyze`] never fails: any error along the way is folded into
//! an [`AnalysisResult::Failed`] carrying an [`ErrorCode`], so callers branch
//! on `processing_status` instead of handling errors.

use serde::Serialize;
use std::path::Path;
use thiserror::Error;

use crate::audio::{self, FeatureSet};
use crate::config::AnalysisConfig;
use crate::embedding::{Embedder, EmbeddingError};
use crate::summary::SummaryStats;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Completed,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    DecodeFailed,
    EmptySignal,
    InvalidFormat,
    FeatureExtractionFailed,
    EmbeddingFailed,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "processing_status", rename_all = "lowercase")]
pub enum AnalysisResult {
    Completed(Box<AnalysisReport>),
    Failed(AnalysisFailure),
}

#[derive(Clone, Debug, Serialize)]
pub struct AnalysisReport {
    #[serde(flatten)]
    pub features: FeatureSet,
    pub beat_count: usize,
    pub embedding: Vec<f32>,
    pub metadata: ReportMetadata,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReportMetadata {
    pub sample_rate: u32,
    pub channels: usize,
    /// Seconds actually analyzed, after the duration cap
    pub duration: f64,
    pub summary: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct AnalysisFailure {
    pub error: String,
    pub error_code: ErrorCode,
    pub metadata: FailureMetadata,
}

#[derive(Clone, Debug, Serialize)]
pub struct FailureMetadata {
    pub error_details: String,
}

impl AnalysisResult {
    pub fn failed(code: ErrorCode, message: impl Into<String>) -> Self {
        let error = message.into();
        AnalysisResult::Failed(AnalysisFailure {
            metadata: FailureMetadata { error_details: error.clone() },
            error,
            error_code: code,
        })
    }

    pub fn status(&self) -> ProcessingStatus {
        match self {
            AnalysisResult::Completed(_) => ProcessingStatus::Completed,
            AnalysisResult::Failed(_) => ProcessingStatus::Failed,
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Failed to decode audio: {0}")]
    Decode(String),
    #[error("Decoded audio contains no samples")]
    EmptySignal,
    #[error("Feature extraction failed: {0}")]
    Features(String),
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

impl AnalysisError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AnalysisError::Decode(_) => ErrorCode::DecodeFailed,
            AnalysisError::EmptySignal => ErrorCode::EmptySignal,
            AnalysisError::Features(_) => ErrorCode::FeatureExtractionFailed,
            AnalysisError::Embedding(_) => ErrorCode::EmbeddingFailed,
        }
    }
}

pub struct Analyzer {
    config: AnalysisConfig,
    embedder: Box<dyn Embedder>,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig, embedder: Box<dyn Embedder>) -> Self {
        Self { config, embedder }
    }

    pub fn analyze(&self, path: &Path) -> AnalysisResult {
        match self.run(path) {
            Ok(report) => AnalysisResult::Completed(Box::new(report)),
            Err(err) => {
                log::error!("Error during audio analysis of {}: {}", path.display(), err);
                AnalysisResult::failed(err.code(), err.to_string())
            }
        }
    }

    /// Cheap pre-check that decodes only the first second. A file passing
    /// this may still fail full analysis further in.
    pub fn validate(&self, path: &Path) -> bool {
        validate_audio(path, self.config.validate_duration_secs)
    }

    fn run(&self, path: &Path) -> Result<AnalysisReport, AnalysisError> {
        let signal = audio::decode_audio(path, Some(self.config.max_duration_secs))
            .map_err(|e| AnalysisError::Decode(format!("{:#}", e)))?;
        if signal.samples.is_empty() {
            return Err(AnalysisError::EmptySignal);
        }
        let duration = signal.duration();

        let features = audio::extract_features(&signal)
            .map_err(|e| AnalysisError::Features(format!("{:#}", e)))?;

        let summary = SummaryStats::from_features(&features, duration).render();
        log::info!("Summary: {}", summary);

        let embedding = self.embedder.embed(&summary)?;

        Ok(AnalysisReport {
            beat_count: features.beat_times.len(),
            features,
            embedding,
            metadata: ReportMetadata {
                sample_rate: signal.sample_rate,
                channels: signal.channels,
                duration,
                summary,
            },
        })
    }
}

/// True when the first `probe_secs` of `path` decode to at least one sample.
pub fn validate_audio(path: &Path, probe_secs: f64) -> bool {
    match audio::decode_audio(path, Some(probe_secs)) {
        Ok(signal) if !signal.samples.is_empty() => true,
        Ok(_) => {
            log::warn!("Invalid audio file {}: no samples decoded", path.display());
            false
        }
        Err(err) => {
            log::warn!("Invalid audio file {}: {:#}", path.display(), err);
            false
        }
    }
}
