use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::callback::{CallbackPayload, ResultSink};
use crate::error::{WorkerError, WorkerResult};
use crate::pipeline::{AnalysisResult, Analyzer, ErrorCode, ProcessingStatus};
use crate::storage::ObjectStore;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawJob {
    storage_path: Option<String>,
    analysis_id: Option<String>,
}

/// A single analysis job: where the audio lives and who asked for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobRequest {
    pub storage_path: String,
    pub analysis_id: String,
}

impl JobRequest {
    pub fn parse(body: &[u8]) -> WorkerResult<Self> {
        if body.is_empty() {
            return Err(WorkerError::BadRequest("Empty request body".into()));
        }
        let raw: RawJob = serde_json::from_slice(body)
            .map_err(|_| WorkerError::BadRequest("Invalid JSON in request body".into()))?;

        match (raw.storage_path, raw.analysis_id) {
            (Some(storage_path), Some(analysis_id))
                if !storage_path.is_empty() && !analysis_id.is_empty() =>
            {
                Ok(Self { storage_path, analysis_id })
            }
            _ => Err(WorkerError::BadRequest("Missing storagePath or analysisId".into())),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    pub success: bool,
    pub analysis_id: String,
    pub status: ProcessingStatus,
}

pub struct Worker {
    analyzer: Analyzer,
    store: Box<dyn ObjectStore>,
    sink: Box<dyn ResultSink>,
    scratch_dir: Option<PathBuf>,
    default_suffix: String,
}

impl Worker {
    pub fn new(analyzer: Analyzer, store: Box<dyn ObjectStore>, sink: Box<dyn ResultSink>) -> Self {
        Self {
            analyzer,
            store,
            sink,
            scratch_dir: None,
            default_suffix: ".mp3".to_string(),
        }
    }

    /// Directory for downloaded audio; the system temp dir when unset.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn with_default_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.default_suffix = suffix.into();
        self
    }

    /// Download, analyze and report one job.
    ///
    /// The downloaded file is removed when this returns, on every path.
    /// Callback delivery problems are logged and do not change the outcome.
    pub fn process(&self, job: JobRequest) -> WorkerResult<JobResponse> {
        log::info!("Job {}: fetching {}", job.analysis_id, job.storage_path);

        let mut scratch = self.scratch_file(&job.storage_path)?;
        let bytes = self.store.download(&job.storage_path, scratch.as_file_mut())?;
        scratch.as_file_mut().flush()?;
        log::info!("Job {}: downloaded {} bytes", job.analysis_id, bytes);

        let results = if self.analyzer.validate(scratch.path()) {
            self.analyzer.analyze(scratch.path())
        } else {
            AnalysisResult::failed(ErrorCode::InvalidFormat, "Invalid audio file format")
        };
        let status = results.status();
        log::info!("Job {}: analysis {:?}", job.analysis_id, status);

        let payload = CallbackPayload {
            analysis_id: &job.analysis_id,
            results: &results,
        };
        if let Err(err) = self.sink.deliver(&payload) {
            log::warn!("Job {}: failed to post callback: {}", job.analysis_id, err);
        }

        Ok(JobResponse {
            success: true,
            analysis_id: job.analysis_id,
            status,
        })
    }

    fn scratch_file(&self, storage_path: &str) -> std::io::Result<tempfile::NamedTempFile> {
        let suffix = suffix_for(storage_path).unwrap_or_else(|| self.default_suffix.clone());
        let mut builder = tempfile::Builder::new();
        builder.prefix("musaix-").suffix(&suffix);
        match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
    }
}

/// Extension of the storage object, dot included, used as a decoder hint.
fn suffix_for(storage_path: &str) -> Option<String> {
    Path::new(storage_path)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bad_request_message(body: &[u8]) -> String {
        match JobRequest::parse(body) {
            Err(WorkerError::BadRequest(msg)) => msg,
            other => panic!("expected bad request, got {:?}", other),
        }
    }

    #[test]
    fn parses_complete_job() {
        let job = JobRequest::parse(br#"{"storagePath":"a.mp3","analysisId":"id-1"}"#).unwrap();
        assert_eq!(job.storage_path, "a.mp3");
        assert_eq!(job.analysis_id, "id-1");
    }

    #[test]
    fn rejects_malformed_jobs() {
        assert_eq!(bad_request_message(b""), "Empty request body");
        assert_eq!(bad_request_message(b"{not json"), "Invalid JSON in request body");
        assert_eq!(
            bad_request_message(br#"{"storagePath":"a.mp3"}"#),
            "Missing storagePath or analysisId"
        );
        assert_eq!(
            bad_request_message(br#"{"storagePath":"","analysisId":"id-1"}"#),
            "Missing storagePath or analysisId"
        );
        assert_eq!(
            bad_request_message(br#"{"storagePath":"a.mp3","analysisId":null}"#),
            "Missing storagePath or analysisId"
        );
    }

    #[test]
    fn non_string_fields_are_invalid_json() {
        assert_eq!(
            bad_request_message(br#"{"storagePath":1,"analysisId":"id-1"}"#),
            "Invalid JSON in request body"
        );
    }

    #[test]
    fn suffix_follows_storage_extension() {
        assert_eq!(suffix_for("user/track.WAV"), Some(".wav".to_string()));
        assert_eq!(suffix_for("user/track"), None);
        assert_eq!(suffix_for("user/track.m p3"), None);
    }

    #[test]
    fn response_shape() {
        let value = serde_json::to_value(JobResponse {
            success: true,
            analysis_id: "id-1".into(),
            status: ProcessingStatus::Completed,
        })
        .unwrap();
        assert_eq!(value, serde_json::json!({"success": true, "analysisId": "id-1", "status": "completed"}));
    }
}
