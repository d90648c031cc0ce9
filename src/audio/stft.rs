use rustfft::{num_complex::Complex, FftPlanner};

pub const FRAME_SIZE: usize = 2048;
pub const HOP_SIZE: usize = 512;

/// Number of centered frames produced for a signal of `num_samples`.
pub fn frame_count(num_samples: usize, hop_size: usize) -> usize {
    1 + num_samples / hop_size
}

/// Centered framing over a signal zero-padded by half a frame on each side.
///
/// Every framed feature reads its windows from the same grid so that all
/// per-frame sequences of one analysis share a length.
pub struct FrameGrid {
    padded: Vec<f32>,
    pub frame_size: usize,
    pub hop_size: usize,
    pub num_frames: usize,
}

impl FrameGrid {
    pub fn new(samples: &[f32], frame_size: usize, hop_size: usize) -> Self {
        let pad = frame_size / 2;
        let mut padded = vec![0.0f32; samples.len() + 2 * pad];
        padded[pad..pad + samples.len()].copy_from_slice(samples);

        Self {
            padded,
            frame_size,
            hop_size,
            num_frames: frame_count(samples.len(), hop_size),
        }
    }

    pub fn frame(&self, index: usize) -> &[f32] {
        let start = index * self.hop_size;
        &self.padded[start..start + self.frame_size]
    }

    pub fn frames(&self) -> impl Iterator<Item = &[f32]> + '_ {
        (0..self.num_frames).map(move |i| self.frame(i))
    }
}

/// Magnitude spectrogram, one `frame_size / 2 + 1` bin vector per frame.
pub struct Spectrogram {
    pub magnitudes: Vec<Vec<f32>>,
    pub sample_rate: u32,
    pub frame_size: usize,
}

impl Spectrogram {
    pub fn compute(grid: &FrameGrid, sample_rate: u32) -> Self {
        let n = grid.frame_size;
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n);
        let hann = hann_window(n);
        let num_bins = n / 2 + 1;

        let mut buffer = vec![Complex::new(0.0f32, 0.0); n];
        let magnitudes = grid
            .frames()
            .map(|frame| {
                for (slot, (&s, &w)) in buffer.iter_mut().zip(frame.iter().zip(hann.iter())) {
                    *slot = Complex::new(s * w, 0.0);
                }
                fft.process(&mut buffer);
                buffer[..num_bins].iter().map(|c| c.norm()).collect()
            })
            .collect();

        Self {
            magnitudes,
            sample_rate,
            frame_size: n,
        }
    }

    pub fn num_frames(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn num_bins(&self) -> usize {
        self.frame_size / 2 + 1
    }

    /// Center frequency of every bin in Hz.
    pub fn bin_frequencies(&self) -> Vec<f32> {
        let resolution = self.sample_rate as f32 / self.frame_size as f32;
        (0..self.num_bins()).map(|k| k as f32 * resolution).collect()
    }

    pub fn power_frames(&self) -> impl Iterator<Item = Vec<f32>> + '_ {
        self.magnitudes
            .iter()
            .map(|frame| frame.iter().map(|m| m * m).collect())
    }
}

/// Periodic Hann window, as used for STFT analysis.
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / size as f32).cos()))
        .collect()
}
