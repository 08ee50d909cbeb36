//! Narration/background mixer
//!
//! Lays an instrumental track under a narration segment. The narration is
//! the authority: the mixed output always has the narration's duration,
//! sample rate, and channel count. The background is resampled,
//! channel-aligned, looped or trimmed to fit, shaped by fade envelopes,
//! attenuated, and summed in. Narration samples are never attenuated.
//!
//! Samples that exceed [-1, 1] after summing are hard-clipped; wraparound
//! distortion is a defect.

use crate::audio::resampler::resample_to;
use crate::audio::types::AudioSegment;
use crate::error::{Error, Result};
use fablecast_common::{FadeCurve, MixConfig};
use tracing::debug;

/// Mix a background track under a narration segment.
///
/// The result is a new segment whose duration equals the narration's
/// duration exactly. A background shorter than the narration is looped
/// (with an equal-power crossfade of `crossfade_seconds` across the loop
/// seam); a longer one is trimmed.
///
/// The narration also dictates the output channel count: a stereo
/// background under a mono narration is downmixed, not the narration
/// upmixed. When a track is unavailable the pipeline emits the bare
/// narration segment, and mixed and narration-only paragraphs must share
/// a format to be concatenated.
pub fn mix(
    narration: &AudioSegment,
    background: &AudioSegment,
    config: &MixConfig,
) -> Result<AudioSegment> {
    if narration.is_empty() {
        return Err(Error::Mix("narration segment is empty".to_string()));
    }
    if background.is_empty() {
        return Err(Error::Mix("background segment is empty".to_string()));
    }

    let config = config.sanitized();
    let rate = narration.sample_rate();
    let channels = narration.channels();
    let frames = narration.frames();

    // Align the background's format to the narration's
    let background = resample_to(background, rate)?;
    let background = align_channels(&background, channels)?;

    debug!(
        narration_frames = frames,
        background_frames = background.frames(),
        volume = config.background_volume,
        "mixing background under narration"
    );

    // Lay the background out over exactly the narration's frame count
    let crossfade_frames = (config.crossfade_seconds as f64 * rate as f64).round() as usize;
    let bed = looped_background(&background, frames, crossfade_frames);

    // Fade windows never overlap: each is capped at half the narration
    let fade_in_frames =
        ((config.fade_in_seconds as f64 * rate as f64).round() as usize).min(frames / 2);
    let fade_out_frames =
        ((config.fade_out_seconds as f64 * rate as f64).round() as usize).min(frames / 2);

    let ch = channels as usize;
    let narration_samples = narration.samples();
    let mut mixed = Vec::with_capacity(frames * ch);

    for frame_idx in 0..frames {
        let envelope = envelope_gain(
            frame_idx,
            frames,
            fade_in_frames,
            fade_out_frames,
            config.fade_curve,
        );
        let gain = envelope * config.background_volume;

        for ch_idx in 0..ch {
            let sample_idx = frame_idx * ch + ch_idx;
            let sum = narration_samples[sample_idx] + bed[sample_idx] * gain;
            mixed.push(sum.clamp(-1.0, 1.0));
        }
    }

    AudioSegment::new(mixed, rate, channels)
}

/// Background envelope gain for one frame (fade-in, unity, fade-out)
fn envelope_gain(
    frame_idx: usize,
    total_frames: usize,
    fade_in_frames: usize,
    fade_out_frames: usize,
    curve: FadeCurve,
) -> f32 {
    let mut gain = 1.0;

    if fade_in_frames > 0 && frame_idx < fade_in_frames {
        gain *= curve.fade_in_gain(frame_idx as f32 / fade_in_frames as f32);
    }

    if fade_out_frames > 0 {
        let fade_out_start = total_frames - fade_out_frames;
        if frame_idx >= fade_out_start {
            let position = (frame_idx - fade_out_start) as f32 / fade_out_frames as f32;
            gain *= curve.fade_out_gain(position);
        }
    }

    gain
}

/// Duplicate a mono background into stereo, or average a stereo one to mono,
/// so its channel count matches the narration's.
fn align_channels(segment: &AudioSegment, target_channels: u16) -> Result<AudioSegment> {
    if segment.channels() == target_channels {
        return AudioSegment::new(
            segment.samples().to_vec(),
            segment.sample_rate(),
            target_channels,
        );
    }

    let samples = segment.samples();
    let converted: Vec<f32> = match (segment.channels(), target_channels) {
        (1, 2) => samples.iter().flat_map(|&s| [s, s]).collect(),
        (2, 1) => samples
            .chunks_exact(2)
            .map(|frame| (frame[0] + frame[1]) / 2.0)
            .collect(),
        (from, to) => {
            return Err(Error::Mix(format!(
                "unsupported channel conversion: {} -> {}",
                from, to
            )));
        }
    };

    AudioSegment::new(converted, segment.sample_rate(), target_channels)
}

/// Produce exactly `frames` frames of background: trimmed when the track is
/// long enough, looped otherwise.
///
/// When looping with a nonzero crossfade, the last `crossfade_frames` of the
/// track overlap the next pass's head with an equal-power blend so the seam
/// is not audible. With a zero crossfade this is plain modulo looping.
fn looped_background(
    background: &AudioSegment,
    frames: usize,
    crossfade_frames: usize,
) -> Vec<f32> {
    let ch = background.channels() as usize;
    let bg_frames = background.frames();
    let samples = background.samples();

    if bg_frames >= frames {
        return samples[..frames * ch].to_vec();
    }

    // Loop seam crossfade only makes sense when the track is comfortably
    // longer than the window
    let crossfade = if crossfade_frames * 2 < bg_frames {
        crossfade_frames
    } else {
        0
    };
    let loop_len = bg_frames - crossfade;

    let mut out = Vec::with_capacity(frames * ch);
    for frame_idx in 0..frames {
        let cycle = frame_idx / loop_len;
        let pos = frame_idx % loop_len;

        if crossfade > 0 && cycle > 0 && pos < crossfade {
            // Blend the previous pass's tail with this pass's head
            let t = pos as f32 / crossfade as f32;
            let tail_gain = FadeCurve::EqualPower.fade_out_gain(t);
            let head_gain = FadeCurve::EqualPower.fade_in_gain(t);
            for ch_idx in 0..ch {
                let tail = samples[(loop_len + pos) * ch + ch_idx];
                let head = samples[pos * ch + ch_idx];
                out.push(tail * tail_gain + head * head_gain);
            }
        } else {
            out.extend_from_slice(&samples[pos * ch..(pos + 1) * ch]);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant_segment(value: f32, frames: usize, rate: u32, channels: u16) -> AudioSegment {
        AudioSegment::new(vec![value; frames * channels as usize], rate, channels).unwrap()
    }

    fn no_fade_config(volume: f32) -> MixConfig {
        MixConfig {
            background_volume: volume,
            fade_in_seconds: 0.0,
            fade_out_seconds: 0.0,
            crossfade_seconds: 0.0,
            fade_curve: FadeCurve::Linear,
        }
    }

    #[test]
    fn test_mixed_duration_equals_narration() {
        let narration = constant_segment(0.5, 44100, 44100, 2); // 1s
        let short_bg = constant_segment(0.1, 11025, 44100, 2); // 0.25s
        let long_bg = constant_segment(0.1, 88200, 44100, 2); // 2s

        for bg in [&short_bg, &long_bg] {
            let mixed = mix(&narration, bg, &no_fade_config(0.5)).unwrap();
            assert_eq!(mixed.frames(), narration.frames());
            assert_eq!(mixed.sample_rate(), narration.sample_rate());
            assert_eq!(mixed.channels(), narration.channels());
        }
    }

    #[test]
    fn test_zero_volume_is_narration_identity() {
        let narration = constant_segment(0.37, 4410, 44100, 2);
        let background = constant_segment(0.9, 4410, 44100, 2);

        let mixed = mix(&narration, &background, &no_fade_config(0.0)).unwrap();
        assert_eq!(mixed.samples(), narration.samples());
    }

    #[test]
    fn test_narration_never_attenuated() {
        let narration = constant_segment(0.5, 1000, 44100, 1);
        let background = constant_segment(0.2, 1000, 44100, 1);

        let mixed = mix(&narration, &background, &no_fade_config(1.0)).unwrap();
        // Every mixed sample contains the full-strength narration
        assert!(mixed.samples().iter().all(|&s| s >= 0.5));
    }

    #[test]
    fn test_hard_clip_not_wrap() {
        let narration = constant_segment(0.9, 100, 44100, 1);
        let background = constant_segment(0.9, 100, 44100, 1);

        let mixed = mix(&narration, &background, &no_fade_config(1.0)).unwrap();
        // 0.9 + 0.9 clips to 1.0, never a negative wraparound
        assert!(mixed.samples().iter().all(|&s| (s - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_mono_background_under_stereo_narration() {
        let narration = constant_segment(0.5, 100, 44100, 2);
        let background = constant_segment(0.4, 100, 44100, 1);

        let mixed = mix(&narration, &background, &no_fade_config(1.0)).unwrap();
        assert_eq!(mixed.channels(), 2);
        // Mono background duplicated into both channels
        assert!((mixed.samples()[0] - 0.9).abs() < 1e-6);
        assert!((mixed.samples()[1] - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_fade_in_ramps_background_only() {
        let narration = constant_segment(0.0, 44100, 44100, 1);
        let background = constant_segment(1.0, 44100, 44100, 1);
        let config = MixConfig {
            background_volume: 1.0,
            fade_in_seconds: 0.5,
            fade_out_seconds: 0.0,
            crossfade_seconds: 0.0,
            fade_curve: FadeCurve::Linear,
        };

        let mixed = mix(&narration, &background, &config).unwrap();
        let samples = mixed.samples();
        // Start of fade: near silence; end of fade window: full background
        assert!(samples[0].abs() < 1e-6);
        assert!(samples[11025] > 0.4 && samples[11025] < 0.6); // ~50% in
        assert!((samples[30000] - 1.0).abs() < 1e-6); // past the window
    }

    #[test]
    fn test_fade_out_reaches_silence() {
        let narration = constant_segment(0.0, 44100, 44100, 1);
        let background = constant_segment(1.0, 44100, 44100, 1);
        let config = MixConfig {
            background_volume: 1.0,
            fade_in_seconds: 0.0,
            fade_out_seconds: 0.5,
            crossfade_seconds: 0.0,
            fade_curve: FadeCurve::Linear,
        };

        let mixed = mix(&narration, &background, &config).unwrap();
        let samples = mixed.samples();
        assert!((samples[0] - 1.0).abs() < 1e-6);
        assert!(samples[44099].abs() < 1e-3);
    }

    #[test]
    fn test_short_background_loops() {
        let narration = constant_segment(0.0, 1000, 44100, 1);
        // Background ramp so looping is observable
        let bg_samples: Vec<f32> = (0..100).map(|i| i as f32 / 100.0).collect();
        let background = AudioSegment::new(bg_samples, 44100, 1).unwrap();

        let mixed = mix(&narration, &background, &no_fade_config(1.0)).unwrap();
        assert_eq!(mixed.frames(), 1000);
        // Second pass repeats the first (no crossfade configured)
        assert!((mixed.samples()[150] - mixed.samples()[50]).abs() < 1e-6);
    }

    #[test]
    fn test_empty_inputs_rejected() {
        let narration = constant_segment(0.5, 100, 44100, 1);
        let empty = AudioSegment::new(Vec::new(), 44100, 1).unwrap();

        assert!(mix(&empty, &narration, &no_fade_config(0.5)).is_err());
        assert!(mix(&narration, &empty, &no_fade_config(0.5)).is_err());
    }

    #[test]
    fn test_background_resampled_to_narration_rate() {
        let narration = constant_segment(0.5, 44100, 44100, 1);
        let background = constant_segment(0.2, 22050, 22050, 1); // 1s at 22.05k

        let mixed = mix(&narration, &background, &no_fade_config(1.0)).unwrap();
        assert_eq!(mixed.sample_rate(), 44100);
        assert_eq!(mixed.frames(), 44100);
    }
}
