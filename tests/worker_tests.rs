mod common;

use common::{dir_is_empty, wav_bytes, worker, FakeStore, RecordingSink, DIMENSIONS};
use musaix_analyzer::{JobRequest, ProcessingStatus, WorkerError};

fn job(storage_path: &str, analysis_id: &str) -> JobRequest {
    JobRequest {
        storage_path: storage_path.to_string(),
        analysis_id: analysis_id.to_string(),
    }
}

#[test]
fn completed_job_posts_callback_and_cleans_up() {
    let scratch = tempfile::tempdir().unwrap();
    let store = FakeStore::default().with_object("user-1/song.wav", wav_bytes(16000, 4.0, 120.0));
    let sink = RecordingSink::default();

    let response = worker(store.clone(), sink.clone(), scratch.path())
        .process(job("user-1/song.wav", "analysis-1"))
        .unwrap();

    assert!(response.success);
    assert_eq!(response.analysis_id, "analysis-1");
    assert_eq!(response.status, ProcessingStatus::Completed);
    assert_eq!(store.download_count(), 1);

    let payloads = sink.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0]["analysisId"], "analysis-1");
    let results = &payloads[0]["results"];
    assert_eq!(results["processing_status"], "completed");
    assert_eq!(results["embedding"].as_array().unwrap().len(), DIMENSIONS);
    assert_eq!(results["metadata"]["sample_rate"], 16000);

    assert!(dir_is_empty(scratch.path()));
}

#[test]
fn missing_object_aborts_without_callback() {
    let scratch = tempfile::tempdir().unwrap();
    let store = FakeStore::default();
    let sink = RecordingSink::default();

    let err = worker(store.clone(), sink.clone(), scratch.path())
        .process(job("user-1/gone.mp3", "analysis-2"))
        .unwrap_err();

    assert!(matches!(err, WorkerError::Storage(_)));
    assert_eq!(err.to_string(), "Failed to download audio file: 404");
    assert_eq!(err.status().as_u16(), 500);
    assert!(sink.payloads().is_empty());
    assert!(dir_is_empty(scratch.path()));
}

#[test]
fn invalid_audio_reports_invalid_format() {
    let scratch = tempfile::tempdir().unwrap();
    let store = FakeStore::default().with_object("user-1/fake.mp3", b"<html>not audio</html>".to_vec());
    let sink = RecordingSink::default();

    let response = worker(store, sink.clone(), scratch.path())
        .process(job("user-1/fake.mp3", "analysis-3"))
        .unwrap();

    assert!(response.success);
    assert_eq!(response.status, ProcessingStatus::Failed);

    let payloads = sink.payloads();
    assert_eq!(payloads.len(), 1);
    let results = &payloads[0]["results"];
    assert_eq!(results["processing_status"], "failed");
    assert_eq!(results["error"], "Invalid audio file format");
    assert_eq!(results["error_code"], "INVALID_FORMAT");
    assert!(dir_is_empty(scratch.path()));
}

#[test]
fn callback_failure_does_not_fail_the_job() {
    let scratch = tempfile::tempdir().unwrap();
    let store = FakeStore::default().with_object("a.wav", wav_bytes(16000, 2.0, 100.0));
    let sink = RecordingSink::failing();

    let response = worker(store, sink.clone(), scratch.path())
        .process(job("a.wav", "analysis-4"))
        .unwrap();

    assert!(response.success);
    assert_eq!(response.status, ProcessingStatus::Completed);
    assert_eq!(sink.payloads().len(), 1);
    assert!(dir_is_empty(scratch.path()));
}

#[test]
fn malformed_request_is_rejected_before_any_work() {
    let err = JobRequest::parse(br#"{"storagePath":"a.wav"}"#).unwrap_err();
    assert!(matches!(err, WorkerError::BadRequest(_)));
    assert_eq!(err.status().as_u16(), 400);
    assert_eq!(err.to_string(), "Missing storagePath or analysisId");
}
