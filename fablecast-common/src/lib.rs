//! # Fablecast Common Library
//!
//! Shared code for the Fablecast narration producer:
//! - Error types
//! - Narration data types (paragraphs, metadata, mix configuration)
//! - Fade curve definitions and calculations
//! - Configuration loading

pub mod config;
pub mod error;
pub mod fade_curves;
pub mod types;

pub use error::{Error, Result};
pub use fade_curves::FadeCurve;
pub use types::{EpisodeRecord, MixConfig, NarrationResult, ParagraphMetadata, ParagraphUnit};
