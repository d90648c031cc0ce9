//! Tempo estimation and beat tracking over an onset-strength envelope.
//!
//! The onset envelope is the half-wave rectified frame-to-frame increase of a
//! log-mel spectrogram, averaged across bands. Tempo comes from its
//! autocorrelation weighted by a log-normal prior; beats come from a dynamic
//! programming pass that rewards onsets while penalizing spacing that deviates
//! from the tempo period.

const MIN_BPM: f32 = 30.0;
const MAX_BPM: f32 = 300.0;
const PRIOR_BPM: f32 = 120.0;
/// Width of the tempo prior in octaves.
const PRIOR_OCTAVES: f32 = 1.0;
const TIGHTNESS: f32 = 100.0;

#[derive(Clone, Debug, Default)]
pub struct BeatTrack {
    pub tempo: f32,
    /// Beat positions as frame indices, strictly increasing
    pub beat_frames: Vec<usize>,
}

impl BeatTrack {
    pub fn beat_times(&self, sample_rate: u32, hop_size: usize) -> Vec<f32> {
        self.beat_frames
            .iter()
            .map(|&f| (f * hop_size) as f32 / sample_rate as f32)
            .collect()
    }
}

/// Onset strength per frame from a frame-major dB mel spectrogram.
pub fn onset_envelope(mel_db: &[Vec<f32>]) -> Vec<f32> {
    let mut envelope = vec![0.0f32; mel_db.len()];
    for t in 1..mel_db.len() {
        let bands = mel_db[t].len().max(1);
        let rise: f32 = mel_db[t]
            .iter()
            .zip(&mel_db[t - 1])
            .map(|(cur, prev)| (cur - prev).max(0.0))
            .sum();
        envelope[t] = rise / bands as f32;
    }
    envelope
}

pub fn track_beats(envelope: &[f32], frame_rate: f32) -> BeatTrack {
    if envelope.iter().all(|&v| v <= 0.0) || frame_rate <= 0.0 {
        return BeatTrack::default();
    }

    let tempo = estimate_tempo(envelope, frame_rate);
    if tempo <= 0.0 {
        return BeatTrack::default();
    }

    let beat_frames = dynamic_beats(envelope, frame_rate, tempo);
    BeatTrack { tempo, beat_frames }
}

/// Tempo in BPM maximizing prior-weighted autocorrelation of the envelope.
pub fn estimate_tempo(envelope: &[f32], frame_rate: f32) -> f32 {
    let n = envelope.len();
    let mean = envelope.iter().sum::<f32>() / n.max(1) as f32;
    let centered: Vec<f32> = envelope.iter().map(|v| v - mean).collect();

    let min_lag = ((60.0 * frame_rate / MAX_BPM).floor() as usize).max(1);
    let max_lag = ((60.0 * frame_rate / MIN_BPM).ceil() as usize).min(n.saturating_sub(1));
    if min_lag >= max_lag {
        return 0.0;
    }

    let autocorr = |lag: usize| -> f32 {
        if lag == 0 || lag >= n {
            return 0.0;
        }
        centered[..n - lag]
            .iter()
            .zip(&centered[lag..])
            .map(|(a, b)| a * b)
            .sum::<f32>()
            .max(0.0)
    };
    let weight = |lag: f32| -> f32 {
        let bpm = 60.0 * frame_rate / lag;
        let octaves = (bpm / PRIOR_BPM).log2() / PRIOR_OCTAVES;
        (-0.5 * octaves * octaves).exp()
    };

    // Onsets rarely fall on an integer number of frames apart, so each lag
    // collects its immediate neighbours as well.
    let raw: Vec<f32> = (min_lag - 1..=max_lag + 1).map(autocorr).collect();
    let scores: Vec<f32> = (min_lag..=max_lag)
        .map(|lag| {
            let i = lag - min_lag + 1;
            (raw[i - 1] + raw[i] + raw[i + 1]) * weight(lag as f32)
        })
        .collect();

    let Some((best, &best_score)) = scores
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
    else {
        return 0.0;
    };
    if best_score <= 0.0 {
        return 0.0;
    }

    // Parabolic refinement around the winning lag
    let mut lag = (min_lag + best) as f32;
    if best > 0 && best + 1 < scores.len() {
        let (a, b, c) = (scores[best - 1], scores[best], scores[best + 1]);
        let denom = a - 2.0 * b + c;
        if denom.abs() > f32::EPSILON {
            lag += (0.5 * (a - c) / denom).clamp(-0.5, 0.5);
        }
    }

    60.0 * frame_rate / lag
}

fn dynamic_beats(envelope: &[f32], frame_rate: f32, tempo: f32) -> Vec<usize> {
    let n = envelope.len();
    let period = 60.0 * frame_rate / tempo;

    let local = local_score(envelope, period);

    let mut cumulative = vec![0.0f32; n];
    let mut backlink: Vec<Option<usize>> = vec![None; n];
    let far = (2.0 * period).round() as usize;
    let near = ((period / 2.0).round() as usize).max(1);

    for t in 0..n {
        let mut best: Option<(usize, f32)> = None;
        if t >= near {
            let lo = t.saturating_sub(far);
            for prev in lo..=t - near {
                let interval = (t - prev) as f32 / period;
                let penalty = -TIGHTNESS * interval.ln().powi(2);
                let score = cumulative[prev] + penalty;
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((prev, score));
                }
            }
        }

        match best {
            Some((prev, score)) if score > 0.0 => {
                cumulative[t] = local[t] + score;
                backlink[t] = Some(prev);
            }
            _ => cumulative[t] = local[t],
        }
    }

    let Some(last) = last_beat(&cumulative) else {
        return Vec::new();
    };

    let mut beats = vec![last];
    let mut cursor = last;
    while let Some(prev) = backlink[cursor] {
        beats.push(prev);
        cursor = prev;
    }
    beats.reverse();

    trim_weak_beats(beats, &local)
}

/// Std-normalized envelope smoothed with a Gaussian one period wide.
fn local_score(envelope: &[f32], period: f32) -> Vec<f32> {
    let n = envelope.len();
    let mean = envelope.iter().sum::<f32>() / n as f32;
    let var = envelope.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / (n.max(2) - 1) as f32;
    let std = var.sqrt().max(1e-10);

    let half = period.round() as isize;
    let kernel: Vec<f32> = (-half..=half)
        .map(|i| (-0.5 * (i as f32 * 32.0 / period).powi(2)).exp())
        .collect();

    (0..n as isize)
        .map(|t| {
            kernel
                .iter()
                .enumerate()
                .filter_map(|(k, w)| {
                    let idx = t + k as isize - half;
                    (idx >= 0 && (idx as usize) < n).then(|| w * envelope[idx as usize] / std)
                })
                .sum()
        })
        .collect()
}

/// Last local maximum of the cumulative score that reaches half the median
/// local-maximum score.
fn last_beat(cumulative: &[f32]) -> Option<usize> {
    let n = cumulative.len();
    let maxima: Vec<usize> = (0..n)
        .filter(|&t| {
            let left = t == 0 || cumulative[t] > cumulative[t - 1];
            let right = t + 1 == n || cumulative[t] >= cumulative[t + 1];
            left && right
        })
        .collect();

    if maxima.is_empty() {
        return cumulative
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(t, _)| t);
    }

    let mut values: Vec<f32> = maxima.iter().map(|&t| cumulative[t]).collect();
    values.sort_by(|a, b| a.total_cmp(b));
    let median = values[values.len() / 2];

    maxima.iter().rev().copied().find(|&t| cumulative[t] >= 0.5 * median)
}

fn trim_weak_beats(beats: Vec<usize>, local: &[f32]) -> Vec<usize> {
    if beats.is_empty() {
        return beats;
    }
    let strengths: Vec<f32> = beats.iter().map(|&b| local[b]).collect();
    let rms = (strengths.iter().map(|s| s * s).sum::<f32>() / strengths.len() as f32).sqrt();
    let threshold = 0.5 * rms;

    let first = strengths.iter().position(|&s| s > threshold);
    let last = strengths.iter().rposition(|&s| s > threshold);
    match (first, last) {
        (Some(first), Some(last)) => beats[first..=last].to_vec(),
        _ => Vec::new(),
    }
}
