//! Segment concatenation
//!
//! Joins an ordered sequence of mixed paragraph segments into one continuous
//! segment, inserting a fixed silence gap between consecutive segments.
//! Pure scheduling: segment *i* starts at
//! `sum(frames[0..i]) + i * gap_frames`, and the combined buffer length is
//! exactly `sum(frames) + (n-1) * gap_frames`.

use crate::audio::types::AudioSegment;
use crate::error::{Error, Result};
use tracing::debug;

/// Concatenate segments in order with `gap_seconds` of silence between
/// consecutive segments (none before the first or after the last).
///
/// All segments must share a sample rate and channel count; this stage does
/// not resample. A zero-length segment is a defect and fails the call.
pub fn concatenate(segments: &[AudioSegment], gap_seconds: f64) -> Result<AudioSegment> {
    if segments.is_empty() {
        return Err(Error::Encoding(
            "cannot concatenate zero segments".to_string(),
        ));
    }
    if gap_seconds < 0.0 || !gap_seconds.is_finite() {
        return Err(Error::Encoding(format!(
            "invalid gap duration: {}",
            gap_seconds
        )));
    }

    let rate = segments[0].sample_rate();
    let channels = segments[0].channels();

    for (i, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            return Err(Error::Encoding(format!("segment {} has zero length", i)));
        }
        if segment.sample_rate() != rate {
            return Err(Error::Encoding(format!(
                "segment {} sample rate {}Hz does not match {}Hz",
                i,
                segment.sample_rate(),
                rate
            )));
        }
        if segment.channels() != channels {
            return Err(Error::Encoding(format!(
                "segment {} has {} channels, expected {}",
                i,
                segment.channels(),
                channels
            )));
        }
    }

    let ch = channels as usize;
    let gap_frames = (gap_seconds * rate as f64).round() as usize;
    let total_frames: usize = segments.iter().map(|s| s.frames()).sum::<usize>()
        + gap_frames * (segments.len() - 1);

    debug!(
        segments = segments.len(),
        gap_frames, total_frames, "concatenating segments"
    );

    let mut combined = vec![0.0f32; total_frames * ch];
    let mut write_frame = 0usize;

    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            write_frame += gap_frames; // silence gap is already zeroed
        }
        let start = write_frame * ch;
        combined[start..start + segment.samples().len()].copy_from_slice(segment.samples());
        write_frame += segment.frames();
    }

    AudioSegment::new(combined, rate, channels)
}
