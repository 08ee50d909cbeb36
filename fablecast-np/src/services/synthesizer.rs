//! Speech synthesis client
//!
//! One network call per paragraph against the provider's speech endpoint.
//! The narration-style instruction is a fixed storyteller persona constant,
//! not user input: it must be identical across every paragraph of a job so
//! the voice stays tonally consistent.

use crate::audio::AudioSegment;
use crate::config::SynthesisConfig;
use crate::error::{Error, Result};
use crate::services::{RateLimiter, SpeechProvider};
use serde_json::json;
use tracing::{debug, info};

const SYNTHESIS_RATE_LIMIT_MS: u64 = 200;

/// Fixed storyteller persona for every narration
pub const STORYTELLER_INSTRUCTIONS: &str = "Narrate like a warm, seasoned storyteller reading \
aloud to a listener. Keep a measured, unhurried pace. Pause briefly at commas and fully at \
sentence ends. Let the emotional color of the text come through without overacting.";

/// HTTP client for the speech-synthesis provider
pub struct SpeechSynthesizer {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    rate_limiter: RateLimiter,
}

impl SpeechSynthesizer {
    pub fn new(config: &SynthesisConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Synthesis(format!("failed to build client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            rate_limiter: RateLimiter::new(SYNTHESIS_RATE_LIMIT_MS),
        })
    }
}

#[async_trait::async_trait]
impl SpeechProvider for SpeechSynthesizer {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioSegment> {
        if text.trim().is_empty() {
            return Err(Error::Synthesis("cannot synthesize empty text".to_string()));
        }

        self.rate_limiter.wait().await;

        let url = format!("{}/v1/audio/speech", self.base_url);
        debug!(voice = %voice, chars = text.len(), "requesting speech synthesis");

        let body = json!({
            "model": self.model,
            "input": text,
            "voice": voice,
            "instructions": STORYTELLER_INSTRUCTIONS,
            "response_format": "wav",
        });

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Synthesis(format!("synthesis request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Synthesis(format!(
                "provider returned {}: {}",
                status, text
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Synthesis(format!("failed to read audio body: {}", e)))?;

        let segment = AudioSegment::from_wav_bytes(&bytes)
            .map_err(|e| Error::Synthesis(format!("provider sent undecodable audio: {}", e)))?;

        info!(
            duration_seconds = segment.duration_seconds(),
            sample_rate = segment.sample_rate(),
            "paragraph synthesized"
        );
        Ok(segment)
    }
}
