use crate::audio::features::{mean, FeatureSet};

/// Aggregate statistics rendered into the text that gets embedded.
#[derive(Clone, Debug, PartialEq)]
pub struct SummaryStats {
    pub tempo: f32,
    pub centroid: f32,
    pub bandwidth: f32,
    pub rolloff: f32,
    pub zcr: f32,
    pub rms: f32,
    pub beat_count: usize,
    pub duration: f64,
}

impl SummaryStats {
    pub fn from_features(features: &FeatureSet, duration: f64) -> Self {
        let sf = &features.spectral_features;
        Self {
            tempo: features.tempo,
            centroid: mean(&sf.centroid),
            bandwidth: mean(&sf.bandwidth),
            rolloff: mean(&sf.rolloff),
            zcr: mean(&sf.zcr),
            rms: mean(&sf.rms),
            beat_count: features.beat_times.len(),
            duration,
        }
    }

    /// Hz and BPM values carry two decimals, ratios four.
    pub fn render(&self) -> String {
        format!(
            "An audio track with a tempo of {:.2} BPM. \
             The average spectral centroid is {:.2} Hz, indicating its brightness. \
             The average spectral bandwidth is {:.2} Hz. \
             The spectral rolloff averages {:.2} Hz. \
             The zero crossing rate is {:.4}, and the RMS energy is {:.4}. \
             The track has {} detected beats over {:.1} seconds. \
             Primary tonal characteristics are captured by its chroma features showing \
             harmonic content distribution across the chromatic scale.",
            self.tempo,
            self.centroid,
            self.bandwidth,
            self.rolloff,
            self.zcr,
            self.rms,
            self.beat_count,
            self.duration,
        )
    }
}
