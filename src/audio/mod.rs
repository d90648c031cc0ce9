pub mod analysis;
pub mod beat;
pub mod decode;
pub mod features;
pub mod stft;

pub use analysis::extract_features;
pub use decode::{decode_audio, AudioSignal};
pub use features::{FeatureSet, SpectralFeatures};
