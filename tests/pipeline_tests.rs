mod common;

use common::{analyzer, write_click_wav, write_stereo_tone_wav, FailingEmbedder, FakeEmbedder, DIMENSIONS};
use musaix_analyzer::pipeline::validate_audio;
use musaix_analyzer::{AnalysisResult, ErrorCode, ProcessingStatus};

#[test]
fn click_track_completes_with_all_features() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clicks.wav");
    write_click_wav(&path, 22050, 8.0, 120.0);

    let embedder = FakeEmbedder::default();
    let result = analyzer(embedder.clone()).analyze(&path);
    assert_eq!(result.status(), ProcessingStatus::Completed);

    let AnalysisResult::Completed(report) = &result else {
        panic!("expected completed result");
    };
    let expected_frames = 1 + (22050 * 8) / 512;
    assert_eq!(report.features.num_frames(), expected_frames);
    assert_eq!(report.features.mfcc.len(), 20);
    assert_eq!(report.features.chroma.len(), 12);
    assert!(report.features.mfcc.iter().all(|row| row.len() == expected_frames));
    assert!(report.features.chroma.iter().all(|row| row.len() == expected_frames));
    let spectral = &report.features.spectral_features;
    for series in [&spectral.centroid, &spectral.bandwidth, &spectral.rolloff, &spectral.zcr, &spectral.rms] {
        assert_eq!(series.len(), expected_frames);
    }

    assert!((report.features.tempo - 120.0).abs() < 6.0, "tempo {}", report.features.tempo);
    assert_eq!(report.beat_count, report.features.beat_times.len());
    assert_eq!(report.embedding.len(), DIMENSIONS);
    assert_eq!(report.metadata.sample_rate, 22050);
    assert_eq!(report.metadata.channels, 1);
    assert!((report.metadata.duration - 8.0).abs() < 1e-6);

    // The embedded text is exactly the summary reported back
    let texts = embedder.texts.lock().unwrap();
    assert_eq!(texts.len(), 1);
    assert_eq!(texts[0], report.metadata.summary);
    assert!(report.metadata.summary.contains("BPM"));
}

#[test]
fn completed_result_serializes_flat() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    write_stereo_tone_wav(&path, 16000, 2.0);

    let value = serde_json::to_value(analyzer(FakeEmbedder::default()).analyze(&path)).unwrap();
    assert_eq!(value["processing_status"], "completed");
    assert!(value["tempo"].is_number());
    assert_eq!(value["mfccs"].as_array().unwrap().len(), 20);
    assert_eq!(value["chroma_vector"].as_array().unwrap().len(), 12);
    assert_eq!(value["embedding"].as_array().unwrap().len(), DIMENSIONS);
    assert_eq!(value["metadata"]["channels"], 2);
    assert!(value.get("error").is_none());
}

#[test]
fn long_input_is_capped_at_five_minutes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("long.wav");
    write_click_wav(&path, 4000, 301.0, 100.0);

    let result = analyzer(FakeEmbedder::default()).analyze(&path);
    let AnalysisResult::Completed(report) = result else {
        panic!("expected completed result");
    };
    assert_eq!(report.metadata.duration, 300.0);
    assert_eq!(report.features.num_frames(), 1 + (4000 * 300) / 512);
}

#[test]
fn undecodable_file_fails_with_message() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.mp3");
    std::fs::write(&path, b"these are not audio bytes at all").unwrap();

    let result = analyzer(FakeEmbedder::default()).analyze(&path);
    assert_eq!(result.status(), ProcessingStatus::Failed);

    let AnalysisResult::Failed(failure) = result else {
        panic!("expected failed result");
    };
    assert_eq!(failure.error_code, ErrorCode::DecodeFailed);
    assert!(!failure.error.is_empty());
    assert_eq!(failure.metadata.error_details, failure.error);
}

#[test]
fn embedding_failure_is_reported_as_failed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clicks.wav");
    write_click_wav(&path, 16000, 2.0, 120.0);

    let result = analyzer(FailingEmbedder).analyze(&path);
    let AnalysisResult::Failed(failure) = result else {
        panic!("expected failed result");
    };
    assert_eq!(failure.error_code, ErrorCode::EmbeddingFailed);
    assert!(failure.error.contains("429"), "error: {}", failure.error);
}

#[test]
fn validate_accepts_audio_and_rejects_text() {
    let dir = tempfile::tempdir().unwrap();
    let audio = dir.path().join("clicks.wav");
    write_click_wav(&audio, 16000, 2.0, 120.0);
    let text = dir.path().join("readme.wav");
    std::fs::write(&text, b"plain text").unwrap();

    assert!(validate_audio(&audio, 1.0));
    assert!(!validate_audio(&text, 1.0));
    assert!(!validate_audio(&dir.path().join("missing.wav"), 1.0));

    // Repeated checks on the same file agree
    let analyzer = analyzer(FakeEmbedder::default());
    assert_eq!(analyzer.validate(&audio), analyzer.validate(&audio));
    assert_eq!(analyzer.validate(&text), analyzer.validate(&text));
}
