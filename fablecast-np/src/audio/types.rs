//! Audio segment type
//!
//! An [`AudioSegment`] is a discrete span of decoded samples with a known
//! sample rate and channel count. Segments are immutable: every pipeline
//! transformation (mixing, concatenation, resampling) produces a new segment
//! rather than mutating in place.

use crate::error::{Error, Result};
use std::io::Cursor;

/// Decoded audio: interleaved f32 samples plus format description
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSegment {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl AudioSegment {
    /// Create a segment from interleaved samples.
    ///
    /// Fails if the sample count is not a whole number of frames, or the
    /// format fields are zero.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self> {
        if sample_rate == 0 || channels == 0 {
            return Err(Error::Mix(format!(
                "invalid segment format: {}Hz, {} channels",
                sample_rate, channels
            )));
        }
        if samples.len() % channels as usize != 0 {
            return Err(Error::Mix(format!(
                "sample count {} is not a whole number of {}-channel frames",
                samples.len(),
                channels
            )));
        }
        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// A segment of pure silence
    pub fn silence(duration_seconds: f64, sample_rate: u32, channels: u16) -> Result<Self> {
        let frames = (duration_seconds * sample_rate as f64).round() as usize;
        Self::new(vec![0.0; frames * channels as usize], sample_rate, channels)
    }

    /// Decode a WAV byte buffer into a segment.
    ///
    /// Accepts PCM16/24/32 and float32 payloads; everything is normalized to
    /// f32 in [-1, 1].
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self> {
        let reader = hound::WavReader::new(Cursor::new(bytes))
            .map_err(|e| Error::Mix(format!("unreadable WAV data: {}", e)))?;
        let spec = reader.spec();

        let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Float, 32) => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::Mix(format!("corrupt float WAV payload: {}", e)))?,
            (hound::SampleFormat::Int, 16) => reader
                .into_samples::<i16>()
                .map(|s| s.map(|v| v as f32 / 32768.0))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::Mix(format!("corrupt PCM16 WAV payload: {}", e)))?,
            (hound::SampleFormat::Int, bits @ (24 | 32)) => {
                let scale = (1i64 << (bits - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| Error::Mix(format!("corrupt PCM{} WAV payload: {}", bits, e)))?
            }
            (format, bits) => {
                return Err(Error::Mix(format!(
                    "unsupported WAV sample format: {:?}/{} bits",
                    format, bits
                )));
            }
        };

        if samples.is_empty() {
            return Err(Error::Mix("WAV payload contains no samples".to_string()));
        }

        Self::new(samples, spec.sample_rate, spec.channels)
    }

    /// Interleaved samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Consume the segment, returning its samples
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count (1 = mono, 2 = stereo)
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of sample frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Duration in seconds
    ///
    /// Always positive and finite for a constructible segment with at least
    /// one frame; a zero-duration segment is a pipeline defect and is
    /// rejected by the concatenator and encoder.
    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// True when the segment holds no frames
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
