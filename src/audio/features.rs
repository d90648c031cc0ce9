use serde::Serialize;

use super::stft::{FrameGrid, Spectrogram};

pub const N_MFCC: usize = 20;
pub const N_MELS: usize = 128;
pub const N_CHROMA: usize = 12;
pub const ROLLOFF_PERCENT: f32 = 0.85;
/// Dynamic range kept when converting mel power to decibels.
pub const TOP_DB: f32 = 80.0;

const AMIN: f32 = 1e-10;
/// C1, lowest pitch folded into chroma.
const CHROMA_MIN_HZ: f32 = 32.703;

/// Descriptors extracted from one signal. Per-frame sequences all share the
/// frame count of the analysis grid.
#[derive(Clone, Debug, Serialize)]
pub struct FeatureSet {
    /// Tempo estimate (BPM)
    pub tempo: f32,
    /// Beat positions in seconds, strictly increasing
    pub beat_times: Vec<f32>,
    /// `N_MFCC` rows, one column per frame
    #[serde(rename = "mfccs")]
    pub mfcc: Vec<Vec<f32>>,
    /// `N_CHROMA` rows (C..B), one column per frame
    #[serde(rename = "chroma_vector")]
    pub chroma: Vec<Vec<f32>>,
    pub spectral_features: SpectralFeatures,
}

#[derive(Clone, Debug, Serialize)]
pub struct SpectralFeatures {
    /// Spectral centroid (Hz)
    pub centroid: Vec<f32>,
    /// Spectral bandwidth (Hz)
    pub bandwidth: Vec<f32>,
    /// Spectral rolloff (Hz)
    pub rolloff: Vec<f32>,
    /// Zero-crossing rate (crossings per sample)
    pub zcr: Vec<f32>,
    /// RMS energy (linear)
    pub rms: Vec<f32>,
}

impl FeatureSet {
    pub fn num_frames(&self) -> usize {
        self.spectral_features.rms.len()
    }
}

pub fn spectral_centroid(spec: &Spectrogram) -> Vec<f32> {
    let freqs = spec.bin_frequencies();
    spec.magnitudes
        .iter()
        .map(|frame| frame_centroid(frame, &freqs))
        .collect()
}

fn frame_centroid(frame: &[f32], freqs: &[f32]) -> f32 {
    let total: f32 = frame.iter().sum();
    if total <= AMIN {
        return 0.0;
    }
    frame.iter().zip(freqs).map(|(&m, &f)| m * f).sum::<f32>() / total
}

/// Second-order spectral spread around each frame's centroid.
pub fn spectral_bandwidth(spec: &Spectrogram, centroid: &[f32]) -> Vec<f32> {
    let freqs = spec.bin_frequencies();
    spec.magnitudes
        .iter()
        .zip(centroid)
        .map(|(frame, &c)| {
            let total: f32 = frame.iter().sum();
            if total <= AMIN {
                return 0.0;
            }
            frame
                .iter()
                .zip(&freqs)
                .map(|(&m, &f)| (m / total) * (f - c) * (f - c))
                .sum::<f32>()
                .sqrt()
        })
        .collect()
}

pub fn spectral_rolloff(spec: &Spectrogram, percent: f32) -> Vec<f32> {
    let freqs = spec.bin_frequencies();
    spec.magnitudes
        .iter()
        .map(|frame| {
            let total: f32 = frame.iter().sum();
            if total <= AMIN {
                return 0.0;
            }
            let threshold = percent * total;
            let mut cumulative = 0.0f32;
            for (&m, &f) in frame.iter().zip(&freqs) {
                cumulative += m;
                if cumulative >= threshold {
                    return f;
                }
            }
            freqs[freqs.len() - 1]
        })
        .collect()
}

/// Fraction of adjacent sample pairs per frame whose sign differs.
pub fn zero_crossing_rate(grid: &FrameGrid) -> Vec<f32> {
    grid.frames()
        .map(|frame| {
            let crossings = frame
                .windows(2)
                .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
                .count();
            crossings as f32 / frame.len() as f32
        })
        .collect()
}

pub fn rms_energy(grid: &FrameGrid) -> Vec<f32> {
    grid.frames()
        .map(|frame| (frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32).sqrt())
        .collect()
}

/// Fold the power spectrum onto 12 pitch classes, max-normalized per frame.
pub fn chroma(spec: &Spectrogram) -> Vec<Vec<f32>> {
    let pitch_classes: Vec<Option<usize>> = spec
        .bin_frequencies()
        .iter()
        .map(|&f| pitch_class(f))
        .collect();

    let n = spec.num_frames();
    let mut rows = vec![vec![0.0f32; n]; N_CHROMA];

    for (t, power) in spec.power_frames().enumerate() {
        let mut bins = [0.0f32; N_CHROMA];
        for (p, pc) in power.iter().zip(&pitch_classes) {
            if let Some(pc) = pc {
                bins[*pc] += p;
            }
        }
        let peak = bins.iter().copied().fold(0.0f32, f32::max);
        if peak > AMIN {
            for (row, value) in rows.iter_mut().zip(bins) {
                row[t] = value / peak;
            }
        }
    }

    rows
}

/// Nearest equal-tempered pitch class for `hz`, with C = 0 and A = 9.
pub fn pitch_class(hz: f32) -> Option<usize> {
    if hz < CHROMA_MIN_HZ {
        return None;
    }
    let midi = 69.0 + 12.0 * (hz / 440.0).log2();
    Some((midi.round() as i64).rem_euclid(N_CHROMA as i64) as usize)
}

/// Triangular mel filter stored as a run of weights starting at `start_bin`.
pub struct MelFilter {
    start_bin: usize,
    weights: Vec<f32>,
}

pub struct MelFilterbank {
    filters: Vec<MelFilter>,
}

impl MelFilterbank {
    pub fn new(n_bands: usize, frame_size: usize, sample_rate: u32) -> Self {
        let n_bins = frame_size / 2 + 1;
        let sr = sample_rate as f32;
        let mel_max = hz_to_mel(sr / 2.0);

        let n_points = n_bands + 2;
        let bin_points: Vec<f32> = (0..n_points)
            .map(|i| mel_max * i as f32 / (n_points - 1) as f32)
            .map(|m| mel_to_hz(m) * frame_size as f32 / sr)
            .collect();

        let filters = (0..n_bands)
            .map(|band| {
                let left = bin_points[band];
                let center = bin_points[band + 1];
                let right = bin_points[band + 2];

                let start_bin = (left.ceil() as usize).min(n_bins);
                let end_bin = ((right.floor() as usize) + 1).min(n_bins);
                let weights = (start_bin..end_bin)
                    .map(|bin| {
                        let bin_f = bin as f32;
                        if bin_f <= center && center > left {
                            (bin_f - left) / (center - left)
                        } else if bin_f > center && right > center {
                            (right - bin_f) / (right - center)
                        } else {
                            0.0
                        }
                    })
                    .map(|w| w.max(0.0))
                    .collect();

                MelFilter { start_bin, weights }
            })
            .collect();

        Self { filters }
    }

    pub fn apply(&self, power: &[f32]) -> Vec<f32> {
        self.filters
            .iter()
            .map(|filter| {
                filter
                    .weights
                    .iter()
                    .zip(&power[filter.start_bin..])
                    .map(|(w, p)| w * p)
                    .sum()
            })
            .collect()
    }
}

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0_f32.powf(mel / 2595.0) - 1.0)
}

/// Mel power spectrogram in decibels, frame-major, floored at `TOP_DB` below
/// its global peak.
pub fn mel_spectrogram_db(spec: &Spectrogram, n_mels: usize) -> Vec<Vec<f32>> {
    let bank = MelFilterbank::new(n_mels, spec.frame_size, spec.sample_rate);

    let mut frames: Vec<Vec<f32>> = spec
        .power_frames()
        .map(|power| {
            bank.apply(&power)
                .into_iter()
                .map(|e| 10.0 * e.max(AMIN).log10())
                .collect()
        })
        .collect();

    let peak = frames
        .iter()
        .flatten()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);
    let floor = peak - TOP_DB;
    for value in frames.iter_mut().flatten() {
        *value = value.max(floor);
    }

    frames
}

/// Orthonormal DCT-II of each mel frame, keeping the first `n_mfcc`
/// coefficients. Returns coefficient-major rows.
pub fn mfcc(mel_db: &[Vec<f32>], n_mfcc: usize) -> Vec<Vec<f32>> {
    let n_frames = mel_db.len();
    let n_mels = mel_db.first().map_or(0, |f| f.len());
    let mut rows = vec![vec![0.0f32; n_frames]; n_mfcc];
    if n_mels == 0 {
        return rows;
    }

    let basis = dct_basis(n_mfcc, n_mels);
    for (t, frame) in mel_db.iter().enumerate() {
        for (row, coeffs) in rows.iter_mut().zip(&basis) {
            row[t] = coeffs.iter().zip(frame).map(|(c, x)| c * x).sum();
        }
    }

    rows
}

fn dct_basis(n_out: usize, n_in: usize) -> Vec<Vec<f32>> {
    let n = n_in as f32;
    (0..n_out)
        .map(|k| {
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            (0..n_in)
                .map(|i| {
                    scale * (std::f32::consts::PI / n * (i as f32 + 0.5) * k as f32).cos()
                })
                .collect()
        })
        .collect()
}

pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}
