use anyhow::{ensure, Result};

use super::beat;
use super::decode::AudioSignal;
use super::features::{self, FeatureSet, SpectralFeatures};
use super::stft::{FrameGrid, Spectrogram, FRAME_SIZE, HOP_SIZE};

/// Extract every descriptor of `signal` on one shared frame grid.
pub fn extract_features(signal: &AudioSignal) -> Result<FeatureSet> {
    ensure!(signal.sample_rate > 0, "Invalid sample rate: {}", signal.sample_rate);
    ensure!(!signal.samples.is_empty(), "Audio signal contains no samples");

    let samples = &signal.samples;
    let sr = signal.sample_rate;

    let grid = FrameGrid::new(samples, FRAME_SIZE, HOP_SIZE);
    log::debug!("Pass 1: STFT ({} frames)...", grid.num_frames);
    let spec = Spectrogram::compute(&grid, sr);

    log::debug!("Pass 2: Spectral and time-domain features...");
    let centroid = features::spectral_centroid(&spec);
    let bandwidth = features::spectral_bandwidth(&spec, &centroid);
    let rolloff = features::spectral_rolloff(&spec, features::ROLLOFF_PERCENT);
    let zcr = features::zero_crossing_rate(&grid);
    let rms = features::rms_energy(&grid);
    let chroma = features::chroma(&spec);

    log::debug!("Pass 3: Mel cepstrum and beat tracking...");
    let mel_db = features::mel_spectrogram_db(&spec, features::N_MELS);
    let mfcc = features::mfcc(&mel_db, features::N_MFCC);

    let envelope = beat::onset_envelope(&mel_db);
    let frame_rate = sr as f32 / HOP_SIZE as f32;
    let track = beat::track_beats(&envelope, frame_rate);
    let beat_times = track.beat_times(sr, HOP_SIZE);

    let set = FeatureSet {
        tempo: track.tempo,
        beat_times,
        mfcc,
        chroma,
        spectral_features: SpectralFeatures {
            centroid,
            bandwidth,
            rolloff,
            zcr,
            rms,
        },
    };
    check_frame_counts(&set, grid.num_frames)?;

    log::info!(
        "Features: frames={}, tempo={:.1} BPM, beats={}",
        grid.num_frames,
        set.tempo,
        set.beat_times.len()
    );

    Ok(set)
}

fn check_frame_counts(set: &FeatureSet, expected: usize) -> Result<()> {
    let sf = &set.spectral_features;
    let sequences = [
        ("centroid", sf.centroid.len()),
        ("bandwidth", sf.bandwidth.len()),
        ("rolloff", sf.rolloff.len()),
        ("zcr", sf.zcr.len()),
        ("rms", sf.rms.len()),
    ];
    for (name, len) in sequences {
        ensure!(len == expected, "{} has {} frames, expected {}", name, len, expected);
    }
    for row in set.mfcc.iter().chain(&set.chroma) {
        ensure!(row.len() == expected, "feature row has {} frames, expected {}", row.len(), expected);
    }
    Ok(())
}
