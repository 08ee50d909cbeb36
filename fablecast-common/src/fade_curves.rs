//! Fade curve implementations for background-music envelopes
//!
//! The mixer ramps the background track in at the start of a paragraph and
//! out at the end so music never cuts in or out abruptly under narration.
//! Each curve maps a normalized position through the fade window to a gain
//! multiplier.

use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;

/// Fade curve types for background-music envelopes
///
/// Each curve has a different perceptual quality:
/// - Linear: constant rate of change (the default; what narration jobs use
///   unless a request overrides it)
/// - Exponential: slow start, fast finish
/// - Logarithmic: fast start, slow finish
/// - SCurve: smooth acceleration and deceleration
/// - EqualPower: constant perceived loudness, useful for loop-seam crossfades
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    /// v(t) = t
    Linear,

    /// v(t) = t²
    Exponential,

    /// v(t) = sqrt(t) in, (1-t)² out
    Logarithmic,

    /// v(t) = 0.5 × (1 - cos(π × t))
    SCurve,

    /// v(t) = sin(t × π/2)
    EqualPower,
}

impl FadeCurve {
    /// Gain multiplier at `position` through a fade-in window
    ///
    /// # Arguments
    /// * `position` - Normalized position through the fade (0.0 to 1.0)
    ///
    /// # Returns
    /// Gain to apply to the sample (0.0 = silence, 1.0 = full volume)
    pub fn fade_in_gain(&self, position: f32) -> f32 {
        let t = position.clamp(0.0, 1.0);

        match self {
            FadeCurve::Linear => t,
            FadeCurve::Exponential => t * t,
            // Inverted quadratic so the fade-in mirrors the fade-out shape
            FadeCurve::Logarithmic => t.sqrt(),
            FadeCurve::SCurve => 0.5 * (1.0 - (std::f32::consts::PI * t).cos()),
            FadeCurve::EqualPower => (t * FRAC_PI_2).sin(),
        }
    }

    /// Gain multiplier at `position` through a fade-out window
    ///
    /// # Arguments
    /// * `position` - Normalized position through the fade (0.0 to 1.0)
    ///
    /// # Returns
    /// Gain to apply to the sample (1.0 at the start of the window, 0.0 at
    /// the end)
    pub fn fade_out_gain(&self, position: f32) -> f32 {
        let t = position.clamp(0.0, 1.0);

        match self {
            FadeCurve::Linear => 1.0 - t,
            FadeCurve::Exponential => {
                let inv = 1.0 - t;
                inv * inv
            }
            FadeCurve::Logarithmic => {
                let inv = 1.0 - t;
                inv * inv
            }
            FadeCurve::SCurve => 0.5 * (1.0 + (std::f32::consts::PI * t).cos()),
            FadeCurve::EqualPower => (t * FRAC_PI_2).cos(),
        }
    }

    /// Parse a curve from its request-option string
    ///
    /// Accepts the canonical snake_case names plus common aliases
    /// (`cosine`, `s-curve`, `equalpower`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "linear" => Some(FadeCurve::Linear),
            "exponential" => Some(FadeCurve::Exponential),
            "logarithmic" => Some(FadeCurve::Logarithmic),
            "cosine" | "scurve" | "s-curve" | "s_curve" => Some(FadeCurve::SCurve),
            "equal_power" | "equalpower" => Some(FadeCurve::EqualPower),
            _ => None,
        }
    }

    /// Canonical request-option string
    pub fn as_str(&self) -> &'static str {
        match self {
            FadeCurve::Linear => "linear",
            FadeCurve::Exponential => "exponential",
            FadeCurve::Logarithmic => "logarithmic",
            FadeCurve::SCurve => "s_curve",
            FadeCurve::EqualPower => "equal_power",
        }
    }

    /// All available fade curve variants
    pub fn all_variants() -> &'static [FadeCurve] {
        &[
            FadeCurve::Linear,
            FadeCurve::Exponential,
            FadeCurve::Logarithmic,
            FadeCurve::SCurve,
            FadeCurve::EqualPower,
        ]
    }
}

impl Default for FadeCurve {
    /// Narration envelopes default to linear ramps
    fn default() -> Self {
        FadeCurve::Linear
    }
}

impl std::fmt::Display for FadeCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
