//! External provider clients and their trait seams
//!
//! The orchestrator only sees these traits; the HTTP clients here are the
//! production implementations. Tests supply in-process fakes.

pub mod classifier;
pub mod music;
pub mod synthesizer;

use crate::audio::AudioSegment;
use crate::error::Result;
use fablecast_common::{ParagraphMetadata, ParagraphUnit};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Derives per-paragraph emotional metadata in one batch call
#[async_trait::async_trait]
pub trait MoodClassifier: Send + Sync {
    /// Classify a batch of paragraphs, returning exactly one record per
    /// input in the same order. Missing or malformed classifier fields are
    /// replaced with defaults; only an unusable response fails the batch.
    async fn classify(&self, paragraphs: &[ParagraphUnit]) -> Result<Vec<ParagraphMetadata>>;
}

/// Turns paragraph text into a narration audio segment
#[async_trait::async_trait]
pub trait SpeechProvider: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioSegment>;
}

/// Selects an instrumental track for a mood/intensity pair
#[async_trait::async_trait]
pub trait MusicSource: Send + Sync {
    /// The returned track's length is independent of any narration; the
    /// mixer aligns them.
    async fn fetch_track(&self, mood: &str, intensity: u8) -> Result<AudioSegment>;
}

/// Minimum-interval rate limiter shared by the provider clients
pub(crate) struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub(crate) fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    pub(crate) async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_timing() {
        let limiter = RateLimiter::new(100);

        let start = Instant::now();
        limiter.wait().await; // first request is immediate
        let first_elapsed = start.elapsed();

        limiter.wait().await; // second waits ~100ms
        let second_elapsed = start.elapsed();

        assert!(first_elapsed.as_millis() < 50);
        assert!(second_elapsed.as_millis() >= 100);
    }
}
