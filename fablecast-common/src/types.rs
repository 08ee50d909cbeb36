//! Core narration data types
//!
//! These types flow through the whole pipeline: paragraphs extracted from the
//! source text, classifier-derived metadata, the mix configuration value
//! object, and the result handed back to the caller.

use crate::fade_curves::FadeCurve;
use serde::{Deserialize, Serialize};

/// One paragraph of source text, immutable once extracted
///
/// Ordering is significant: `index` is the paragraph's position in the
/// original text and must be preserved end-to-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphUnit {
    /// Zero-based position in the source text
    pub index: usize,
    /// Paragraph text as extracted (not re-normalized)
    pub text: String,
}

impl ParagraphUnit {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }
}

/// Classifier-derived emotional metadata for one paragraph
///
/// Every field is always present: when the classifier omits or mangles a
/// field the defaults apply (`mood="neutral"`, `genre="general"`,
/// `intensity=5`). Intensity is clamped to 1..=10.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParagraphMetadata {
    /// Emotional mood driving music selection (e.g. "tense", "joyful")
    pub mood: String,
    /// Narrative genre (e.g. "adventure", "romance")
    pub genre: String,
    /// Emotional intensity from 1 (subdued) to 10 (overwhelming)
    pub intensity: u8,
    /// Optional pacing hint (e.g. "slow", "driving")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tempo: Option<String>,
}

impl ParagraphMetadata {
    /// Build metadata from possibly-missing classifier fields, applying
    /// defaults and clamping so no field is ever absent or out of range.
    pub fn from_parts(
        mood: Option<String>,
        genre: Option<String>,
        intensity: Option<i64>,
        tempo: Option<String>,
    ) -> Self {
        let mood = mood.filter(|m| !m.trim().is_empty());
        let genre = genre.filter(|g| !g.trim().is_empty());
        Self {
            mood: mood.unwrap_or_else(|| "neutral".to_string()),
            genre: genre.unwrap_or_else(|| "general".to_string()),
            intensity: intensity
                .map(|i| i.clamp(1, 10) as u8)
                .unwrap_or(DEFAULT_INTENSITY),
            tempo,
        }
    }
}

impl Default for ParagraphMetadata {
    fn default() -> Self {
        Self {
            mood: "neutral".to_string(),
            genre: "general".to_string(),
            intensity: DEFAULT_INTENSITY,
            tempo: None,
        }
    }
}

const DEFAULT_INTENSITY: u8 = 5;

/// Mixing configuration value object
///
/// Controls how the background track sits under the narration. Narration
/// itself is never attenuated; all of these apply to the background only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixConfig {
    /// Background gain, 0.0 (silent) to 1.0 (unity)
    pub background_volume: f32,
    /// Background fade-in window at the start of the narration
    pub fade_in_seconds: f32,
    /// Background fade-out window at the end of the narration
    pub fade_out_seconds: f32,
    /// Crossfade window used when the background track loops to cover a
    /// narration longer than itself
    pub crossfade_seconds: f32,
    /// Envelope shape for the fade windows
    pub fade_curve: FadeCurve,
}

impl MixConfig {
    /// Clamp all fields into their valid ranges
    pub fn sanitized(self) -> Self {
        Self {
            background_volume: self.background_volume.clamp(0.0, 1.0),
            fade_in_seconds: self.fade_in_seconds.max(0.0),
            fade_out_seconds: self.fade_out_seconds.max(0.0),
            crossfade_seconds: self.crossfade_seconds.max(0.0),
            fade_curve: self.fade_curve,
        }
    }
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            background_volume: 0.2,
            fade_in_seconds: 2.0,
            fade_out_seconds: 3.0,
            crossfade_seconds: 1.0,
            fade_curve: FadeCurve::Linear,
        }
    }
}

/// One episode produced from a long text (episode mode)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeRecord {
    /// Episode number within the chapter, starting at 1
    pub index: usize,
    /// Durable URL of the episode's concatenated track
    pub url: String,
    /// Index of the first paragraph in this episode
    pub first_paragraph: usize,
    /// Index of the last paragraph in this episode (inclusive)
    pub last_paragraph: usize,
    /// Episode track duration in seconds
    pub duration_seconds: f64,
}

/// Final pipeline output; the only artifact that outlives a job
///
/// Invariants: `metadata.len()` always equals the paragraph count, and
/// `paragraph_urls.len()` equals it too whenever per-paragraph output was
/// requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrationResult {
    /// Durable URL per paragraph segment (empty when not requested)
    pub paragraph_urls: Vec<String>,
    /// Durable URL of the full concatenated track, when one was produced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    /// Metadata per paragraph, in paragraph order
    pub metadata: Vec<ParagraphMetadata>,
    /// Episode records (episode mode only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub episodes: Vec<EpisodeRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_defaults_applied() {
        let meta = ParagraphMetadata::from_parts(None, None, None, None);
        assert_eq!(meta.mood, "neutral");
        assert_eq!(meta.genre, "general");
        assert_eq!(meta.intensity, 5);
        assert!(meta.tempo.is_none());
    }

    #[test]
    fn test_metadata_blank_fields_treated_as_missing() {
        let meta =
            ParagraphMetadata::from_parts(Some("  ".to_string()), Some(String::new()), None, None);
        assert_eq!(meta.mood, "neutral");
        assert_eq!(meta.genre, "general");
    }

    #[test]
    fn test_metadata_intensity_clamped() {
        assert_eq!(
            ParagraphMetadata::from_parts(None, None, Some(0), None).intensity,
            1
        );
        assert_eq!(
            ParagraphMetadata::from_parts(None, None, Some(42), None).intensity,
            10
        );
        assert_eq!(
            ParagraphMetadata::from_parts(None, None, Some(-3), None).intensity,
            1
        );
        assert_eq!(
            ParagraphMetadata::from_parts(None, None, Some(7), None).intensity,
            7
        );
    }

    #[test]
    fn test_mix_config_sanitized() {
        let cfg = MixConfig {
            background_volume: 1.7,
            fade_in_seconds: -2.0,
            fade_out_seconds: 3.0,
            crossfade_seconds: -0.5,
            fade_curve: FadeCurve::Linear,
        }
        .sanitized();

        assert_eq!(cfg.background_volume, 1.0);
        assert_eq!(cfg.fade_in_seconds, 0.0);
        assert_eq!(cfg.fade_out_seconds, 3.0);
        assert_eq!(cfg.crossfade_seconds, 0.0);
    }

    #[test]
    fn test_mix_config_defaults() {
        let cfg = MixConfig::default();
        assert!((cfg.background_volume - 0.2).abs() < 1e-6);
        assert_eq!(cfg.fade_curve, FadeCurve::Linear);
    }
}
