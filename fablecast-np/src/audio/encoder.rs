//! WAV encoding
//!
//! Serializes a segment into a self-describing WAV container. hound writes
//! the header (format tag, channel count, sample rate, byte rate, block
//! alignment, bit depth) and patches the exact data-length fields on
//! finalize, so the declared sizes always match the payload byte count.
//!
//! Float samples are clamped to [-1, 1] and scaled to the full signed 16-bit
//! range with asymmetric positive/negative factors (32767 positive, 32768
//! negative) to avoid a one-unit bias.

use crate::audio::types::AudioSegment;
use crate::error::{Error, Result};
use std::io::Cursor;

/// Convert one float sample to PCM16: clamp first, then scale asymmetrically.
pub fn sample_to_pcm16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    if clamped >= 0.0 {
        (clamped * 32767.0).round() as i16
    } else {
        (clamped * 32768.0).round() as i16
    }
}

/// Inverse of [`sample_to_pcm16`], for decode paths and tests.
pub fn pcm16_to_sample(value: i16) -> f32 {
    if value >= 0 {
        value as f32 / 32767.0
    } else {
        value as f32 / 32768.0
    }
}

/// Encode a segment as a PCM16 WAV byte buffer.
pub fn encode_wav(segment: &AudioSegment) -> Result<Vec<u8>> {
    if segment.is_empty() {
        return Err(Error::Encoding(
            "cannot encode a zero-length segment".to_string(),
        ));
    }

    let spec = hound::WavSpec {
        channels: segment.channels(),
        sample_rate: segment.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| Error::Encoding(format!("failed to start WAV container: {}", e)))?;

        for &sample in segment.samples() {
            writer
                .write_sample(sample_to_pcm16(sample))
                .map_err(|e| Error::Encoding(format!("failed to write sample: {}", e)))?;
        }

        // finalize patches the RIFF/data length fields to the payload size
        writer
            .finalize()
            .map_err(|e| Error::Encoding(format!("failed to finalize WAV container: {}", e)))?;
    }

    Ok(cursor.into_inner())
}
