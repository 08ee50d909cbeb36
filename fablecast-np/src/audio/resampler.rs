//! Sample-rate conversion using rubato
//!
//! The mixer aligns the background track to the narration's native sample
//! rate before summing; nothing in the pipeline normalizes to a global rate.

use crate::audio::types::AudioSegment;
use crate::error::{Error, Result};
use rubato::{FastFixedIn, Resampler as RubatoResampler};
use tracing::debug;

/// Resample a segment to `target_rate`, preserving channel count.
///
/// Returns the input unchanged (cloned samples) when the rates already match.
pub fn resample_to(segment: &AudioSegment, target_rate: u32) -> Result<AudioSegment> {
    let input_rate = segment.sample_rate();
    if input_rate == target_rate {
        return AudioSegment::new(segment.samples().to_vec(), input_rate, segment.channels());
    }

    let channels = segment.channels();
    debug!(
        "Resampling from {}Hz to {}Hz ({} channels)",
        input_rate, target_rate, channels
    );

    // rubato expects planar (per-channel) input
    let planar_input = deinterleave(segment.samples(), channels);
    let input_frames = planar_input[0].len();

    let mut resampler = FastFixedIn::<f32>::new(
        target_rate as f64 / input_rate as f64,
        1.0, // fixed ratio, no runtime changes
        rubato::PolynomialDegree::Septic,
        input_frames,
        channels as usize,
    )
    .map_err(|e| Error::Mix(format!("failed to create resampler: {}", e)))?;

    let planar_output = resampler
        .process(&planar_input, None)
        .map_err(|e| Error::Mix(format!("resampling failed: {}", e)))?;

    AudioSegment::new(interleave(planar_output), target_rate, channels)
}

/// Convert interleaved samples to planar format.
///
/// Input:  [L, R, L, R, ...]
/// Output: [[L, L, ...], [R, R, ...]]
fn deinterleave(samples: &[f32], channels: u16) -> Vec<Vec<f32>> {
    let num_channels = channels as usize;
    let num_frames = samples.len() / num_channels;

    let mut planar = vec![Vec::with_capacity(num_frames); num_channels];
    for frame_idx in 0..num_frames {
        for ch_idx in 0..num_channels {
            planar[ch_idx].push(samples[frame_idx * num_channels + ch_idx]);
        }
    }
    planar
}

/// Convert planar samples back to interleaved format.
fn interleave(planar: Vec<Vec<f32>>) -> Vec<f32> {
    if planar.is_empty() {
        return Vec::new();
    }

    let num_channels = planar.len();
    let num_frames = planar[0].len();
    let mut interleaved = Vec::with_capacity(num_frames * num_channels);

    for frame_idx in 0..num_frames {
        for channel in planar.iter().take(num_channels) {
            interleaved.push(channel[frame_idx]);
        }
    }
    interleaved
}
