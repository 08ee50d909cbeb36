//! Mood/genre/intensity classification
//!
//! Sends the whole paragraph batch to a chat-completions style endpoint in
//! one call (per-paragraph calls would multiply classifier latency by the
//! paragraph count) and parses the JSON array it returns. The contract:
//! never fewer records than inputs, defaults for any missing field, and a
//! `Classification` error only when the call itself fails or the output is
//! unparsable. Downstream music selection needs a mood for every paragraph,
//! so partial metadata is not acceptable.

use crate::config::ClassifierConfig;
use crate::error::{Error, Result};
use crate::services::{MoodClassifier, RateLimiter};
use fablecast_common::{ParagraphMetadata, ParagraphUnit};
use serde_json::{json, Value};
use tracing::{debug, info};

const CLASSIFIER_RATE_LIMIT_MS: u64 = 250;

const CLASSIFIER_SYSTEM_PROMPT: &str = "You are a literary mood analyst. For each numbered \
paragraph, produce one JSON object with fields: mood (one word, e.g. tense, joyful, somber, \
peaceful, mysterious), genre (one word, e.g. adventure, romance, horror, general), intensity \
(integer 1-10), and tempo (optional, one word). Respond with ONLY a JSON array, one object per \
paragraph, in paragraph order.";

/// Chat-completions classifier client
pub struct ChatClassifier {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    rate_limiter: RateLimiter,
}

impl ChatClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Classification(format!("failed to build client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            rate_limiter: RateLimiter::new(CLASSIFIER_RATE_LIMIT_MS),
        })
    }

    fn batch_prompt(paragraphs: &[ParagraphUnit]) -> String {
        let mut prompt = String::new();
        for unit in paragraphs {
            prompt.push_str(&format!("[{}] {}\n\n", unit.index, unit.text));
        }
        prompt
    }
}

#[async_trait::async_trait]
impl MoodClassifier for ChatClassifier {
    async fn classify(&self, paragraphs: &[ParagraphUnit]) -> Result<Vec<ParagraphMetadata>> {
        if paragraphs.is_empty() {
            return Ok(Vec::new());
        }

        self.rate_limiter.wait().await;

        let url = format!("{}/v1/chat/completions", self.base_url);
        debug!(count = paragraphs.len(), "classifying paragraph batch");

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": CLASSIFIER_SYSTEM_PROMPT },
                { "role": "user", "content": Self::batch_prompt(paragraphs) },
            ],
            "temperature": 0.3,
        });

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Classification(format!("classifier request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Classification(format!(
                "classifier returned {}: {}",
                status, text
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| Error::Classification(format!("invalid classifier response: {}", e)))?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                Error::Classification("classifier response missing content".to_string())
            })?;

        let records = parse_metadata_batch(content, paragraphs.len())?;

        info!(
            paragraphs = paragraphs.len(),
            "paragraph batch classified"
        );
        Ok(records)
    }
}

/// Parse the classifier's JSON array into exactly `expected` records.
///
/// Tolerates markdown code fences around the array and missing fields within
/// records (defaults apply, and short arrays are padded with defaults). An
/// output that is not a JSON array at all fails the batch.
pub fn parse_metadata_batch(content: &str, expected: usize) -> Result<Vec<ParagraphMetadata>> {
    let stripped = strip_code_fences(content);

    let parsed: Value = serde_json::from_str(stripped).map_err(|e| {
        Error::Classification(format!("classifier output is not valid JSON: {}", e))
    })?;

    let array = parsed
        .as_array()
        .ok_or_else(|| Error::Classification("classifier output is not a JSON array".to_string()))?;

    let mut records: Vec<ParagraphMetadata> = array
        .iter()
        .take(expected)
        .map(|item| {
            ParagraphMetadata::from_parts(
                item["mood"].as_str().map(str::to_string),
                item["genre"].as_str().map(str::to_string),
                item["intensity"].as_i64(),
                item["tempo"].as_str().map(str::to_string),
            )
        })
        .collect();

    // Never return fewer records than inputs
    while records.len() < expected {
        records.push(ParagraphMetadata::default());
    }

    Ok(records)
}

fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}
