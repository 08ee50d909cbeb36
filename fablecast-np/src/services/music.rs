//! Background music selection
//!
//! Maps classifier moods into a fixed set of catalog buckets, folds the
//! 1..=10 intensity scale into three tiers, and fetches a matching
//! instrumental track from the music catalog. Track length is independent
//! of narration length; the mixer aligns them.

use crate::audio::AudioSegment;
use crate::config::MusicConfig;
use crate::error::{Error, Result};
use crate::services::{MusicSource, RateLimiter};
use tracing::{debug, info};

const MUSIC_RATE_LIMIT_MS: u64 = 250;

/// Catalog mood buckets
///
/// The classifier emits free-form moods; the catalog is organized into a
/// small fixed set, so unknown moods land in `ambient`.
pub fn mood_bucket(mood: &str) -> &'static str {
    match mood.trim().to_lowercase().as_str() {
        "joyful" | "happy" | "cheerful" | "excited" | "triumphant" | "hopeful" => "uplifting",
        "tense" | "anxious" | "suspenseful" | "nervous" | "ominous" | "fearful" => "tense",
        "sad" | "somber" | "melancholy" | "mournful" | "grieving" | "wistful" => "somber",
        "angry" | "furious" | "violent" | "fierce" => "dramatic",
        "calm" | "peaceful" | "serene" | "tranquil" | "gentle" => "calm",
        "romantic" | "tender" | "loving" | "warm" => "romantic",
        "mysterious" | "eerie" | "strange" | "uncanny" | "curious" => "mysterious",
        _ => "ambient",
    }
}

/// Fold intensity 1..=10 into the catalog's three energy tiers
pub fn intensity_tier(intensity: u8) -> &'static str {
    match intensity {
        0..=3 => "soft",
        4..=7 => "medium",
        _ => "intense",
    }
}

/// Music catalog HTTP client
pub struct MusicCatalog {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    rate_limiter: RateLimiter,
}

impl MusicCatalog {
    pub fn new(config: &MusicConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::MusicUnavailable(format!("failed to build client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            rate_limiter: RateLimiter::new(MUSIC_RATE_LIMIT_MS),
        })
    }
}

#[async_trait::async_trait]
impl MusicSource for MusicCatalog {
    async fn fetch_track(&self, mood: &str, intensity: u8) -> Result<AudioSegment> {
        self.rate_limiter.wait().await;

        let bucket = mood_bucket(mood);
        let tier = intensity_tier(intensity);
        let url = format!(
            "{}/tracks/select?bucket={}&tier={}",
            self.base_url, bucket, tier
        );

        debug!(mood = %mood, bucket = %bucket, tier = %tier, "fetching background track");

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| Error::MusicUnavailable(format!("catalog request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::MusicUnavailable(format!(
                "no track in bucket '{}' tier '{}'",
                bucket, tier
            )));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::MusicUnavailable(format!(
                "catalog returned {}: {}",
                status, text
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::MusicUnavailable(format!("failed to read track body: {}", e)))?;

        let segment = AudioSegment::from_wav_bytes(&bytes)
            .map_err(|e| Error::MusicUnavailable(format!("undecodable track audio: {}", e)))?;

        info!(
            bucket = %bucket,
            tier = %tier,
            duration_seconds = segment.duration_seconds(),
            "background track selected"
        );
        Ok(segment)
    }
}
