//! Fablecast Narration Producer
//!
//! Turns raw book text into finished narration audio: per-paragraph mood
//! classification, speech synthesis, mood-matched background music, mixing
//! with fade envelopes, gap-scheduled concatenation into one WAV, and
//! upload to durable storage.

pub mod api;
pub mod audio;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod text;

pub use error::{Error, Result};
