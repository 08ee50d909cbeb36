//! Durable artifact storage
//!
//! Finished WAV artifacts are PUT into an object store and addressed by a
//! deterministic key layout. The returned URLs must be durable: they
//! outlive the producing request and are handed to downstream consumers.

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use std::time::Duration;
use tracing::{debug, info, warn};

const UPLOAD_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF_BASE_MS: u64 = 250;

/// Writes an artifact and returns its durable public URL
#[async_trait::async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;
}

/// Object-store HTTP client (PUT {base_url}/{key})
pub struct HttpArtifactStore {
    http_client: reqwest::Client,
    base_url: String,
    public_base_url: String,
    api_key: String,
}

impl HttpArtifactStore {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::Config("storage base_url is not set".to_string()));
        }
        let public_base_url = if config.public_base_url.is_empty() {
            base_url.clone()
        } else {
            config.public_base_url.trim_end_matches('/').to_string()
        };

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Upload(format!("failed to build client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
            public_base_url,
            api_key: config.api_key.clone(),
        })
    }

    async fn put_once(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let url = format!("{}/{}", self.base_url, key);
        let response = self
            .http_client
            .put(&url)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| Error::Upload(format!("upload request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Upload(format!(
                "store returned {} for key '{}': {}",
                status, key, text
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ArtifactStore for HttpArtifactStore {
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let size = bytes.len();
        self.put_once(key, bytes, content_type).await?;
        let url = format!("{}/{}", self.public_base_url, key);
        validate_durable_url(&url)?;
        info!(key = %key, bytes = size, "artifact uploaded");
        Ok(url)
    }
}

/// Upload an artifact, retrying transient failures with exponential backoff.
///
/// Makes up to `UPLOAD_ATTEMPTS` attempts, sleeping 250ms, 500ms, ... between
/// them, and surfaces the last error once attempts are exhausted.
pub async fn upload_with_retry(
    store: &dyn ArtifactStore,
    key: &str,
    bytes: Vec<u8>,
    content_type: &str,
) -> Result<String> {
    let mut last_error = Error::Upload("no upload attempt made".to_string());

    for attempt in 1..=UPLOAD_ATTEMPTS {
        match store.upload(key, bytes.clone(), content_type).await {
            Ok(url) => return Ok(url),
            Err(e) => {
                warn!(key = %key, attempt, error = %e, "upload attempt failed");
                last_error = e;
                if attempt < UPLOAD_ATTEMPTS {
                    let backoff =
                        Duration::from_millis(RETRY_BACKOFF_BASE_MS * 2u64.pow(attempt - 1));
                    debug!(key = %key, "retrying upload in {:?}", backoff);
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    Err(last_error)
}

/// Reject URLs that cannot outlive the producing process.
///
/// Blob and data URLs are bound to an in-memory session, and loopback hosts
/// are unreachable for any downstream consumer.
pub fn validate_durable_url(url: &str) -> Result<()> {
    if url.starts_with("blob:") || url.starts_with("data:") {
        return Err(Error::Upload(format!(
            "ephemeral URL is not durable: {}",
            url
        )));
    }

    let rest = url
        .strip_prefix("https://")
        .ok_or_else(|| Error::Upload(format!("artifact URL must be https: {}", url)))?;

    let host = rest.split(['/', ':', '?']).next().unwrap_or("");
    if host.is_empty() {
        return Err(Error::Upload(format!("artifact URL has no host: {}", url)));
    }
    if host == "localhost" || host == "127.0.0.1" || host == "[::1]" {
        return Err(Error::Upload(format!(
            "loopback host is not durable: {}",
            url
        )));
    }

    Ok(())
}

fn timestamp() -> String {
    chrono::Utc::now().format("%Y%m%dT%H%M%S%3f").to_string()
}

/// Key for one paragraph's mixed narration
pub fn paragraph_key(book_id: &str, index: usize) -> String {
    format!(
        "audio-narrations/books/{}/paragraphs/{}_{}.wav",
        book_id,
        index,
        timestamp()
    )
}

/// Key for the full stitched narration of a text
pub fn full_key(book_id: &str) -> String {
    format!("audio-narrations/books/{}/full/{}.wav", book_id, timestamp())
}

/// Key for one episode of a chapter
pub fn episode_key(book_id: &str, chapter_id: &str, episode_number: usize) -> String {
    format!(
        "audio-narrations/books/{}/chapters/{}/episodes/{}_{}.wav",
        book_id,
        chapter_id,
        episode_number,
        timestamp()
    )
}
