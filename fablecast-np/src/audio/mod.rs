//! Audio processing: segment type, resampling, mixing, concatenation, and
//! WAV encoding.

pub mod concat;
pub mod encoder;
pub mod mixer;
pub mod resampler;
pub mod types;

pub use types::AudioSegment;
