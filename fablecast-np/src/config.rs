//! Service configuration
//!
//! Provider endpoints, credentials, and pipeline tunables. Values come from
//! the TOML config file with environment-variable overrides for secrets;
//! the listen port comes from the CLI (see `main.rs`).

use crate::error::{Error, Result};
use fablecast_common::config::load_config_table;
use serde::Deserialize;
use std::time::Duration;

/// Default synthesis voice (fixed storyteller persona voice)
pub const DEFAULT_VOICE: &str = "onyx";

/// Default background music gain under narration
pub const DEFAULT_BACKGROUND_VOLUME: f32 = 0.2;

/// Single-narration and per-paragraph mode timing defaults (musical fades)
pub const NARRATION_FADE_IN_SECONDS: f32 = 2.0;
pub const NARRATION_FADE_OUT_SECONDS: f32 = 3.0;
pub const NARRATION_CROSSFADE_SECONDS: f32 = 1.0;
pub const NARRATION_PARAGRAPH_SILENCE_SECONDS: f64 = 1.0;

/// Episode mode timing defaults: continuous playback, no fades, no gaps
pub const EPISODE_FADE_SECONDS: f32 = 0.0;
pub const EPISODE_PARAGRAPH_SILENCE_SECONDS: f64 = 0.0;

fn default_worker_limit() -> usize {
    4
}

fn default_synthesis_timeout() -> u64 {
    60
}

fn default_client_timeout() -> u64 {
    30
}

fn default_speech_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_speech_model() -> String {
    "gpt-4o-mini-tts".to_string()
}

/// Speech-synthesis provider settings
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default = "default_speech_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_speech_model")]
    pub model: String,
    /// Synthesis can be slow for long paragraphs
    #[serde(default = "default_synthesis_timeout")]
    pub timeout_seconds: u64,
}

impl SynthesisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            base_url: default_speech_url(),
            api_key: String::new(),
            model: default_speech_model(),
            timeout_seconds: default_synthesis_timeout(),
        }
    }
}

/// Mood classifier settings (chat-completions style endpoint)
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_speech_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_client_timeout")]
    pub timeout_seconds: u64,
}

impl ClassifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: default_speech_url(),
            api_key: String::new(),
            model: default_model(),
            timeout_seconds: default_client_timeout(),
        }
    }
}

/// Background-music catalog settings
#[derive(Debug, Clone, Deserialize)]
pub struct MusicConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_client_timeout")]
    pub timeout_seconds: u64,
}

impl MusicConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            timeout_seconds: default_client_timeout(),
        }
    }
}

/// Durable artifact storage settings
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Upload endpoint base (PUT {base_url}/{key})
    #[serde(default)]
    pub base_url: String,
    /// Public base for returned URLs; defaults to `base_url`
    #[serde(default)]
    pub public_base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_client_timeout")]
    pub timeout_seconds: u64,
}

impl StorageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            public_base_url: String::new(),
            api_key: String::new(),
            timeout_seconds: default_client_timeout(),
        }
    }
}

/// Full narration-producer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NpConfig {
    /// Maximum paragraphs in flight at once (provider rate-limit guard)
    #[serde(default = "default_worker_limit")]
    pub worker_limit: usize,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub music: MusicConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for NpConfig {
    fn default() -> Self {
        Self {
            worker_limit: default_worker_limit(),
            synthesis: SynthesisConfig::default(),
            classifier: ClassifierConfig::default(),
            music: MusicConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl NpConfig {
    /// Load configuration: explicit file path, else the platform config
    /// file, else compiled defaults; then apply environment overrides.
    pub fn load(config_path: Option<&std::path::Path>) -> Result<Self> {
        let mut config: NpConfig = match config_path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                toml::from_str(&content)
                    .map_err(|e| Error::Config(format!("invalid config file: {}", e)))?
            }
            None => match load_config_table() {
                Some(table) => table
                    .try_into()
                    .map_err(|e| Error::Config(format!("invalid config file: {}", e)))?,
                None => NpConfig::default(),
            },
        };

        config.apply_env_overrides();

        if config.worker_limit == 0 {
            return Err(Error::Config("worker_limit must be at least 1".to_string()));
        }

        Ok(config)
    }

    /// Secrets and endpoints may be supplied via environment variables,
    /// which take precedence over the config file.
    fn apply_env_overrides(&mut self) {
        override_from_env(&mut self.synthesis.api_key, "FABLECAST_SPEECH_API_KEY");
        override_from_env(&mut self.synthesis.base_url, "FABLECAST_SPEECH_BASE_URL");
        override_from_env(&mut self.classifier.api_key, "FABLECAST_CLASSIFIER_API_KEY");
        override_from_env(
            &mut self.classifier.base_url,
            "FABLECAST_CLASSIFIER_BASE_URL",
        );
        override_from_env(&mut self.music.api_key, "FABLECAST_MUSIC_API_KEY");
        override_from_env(&mut self.music.base_url, "FABLECAST_MUSIC_BASE_URL");
        override_from_env(&mut self.storage.api_key, "FABLECAST_STORAGE_API_KEY");
        override_from_env(&mut self.storage.base_url, "FABLECAST_STORAGE_BASE_URL");
        override_from_env(
            &mut self.storage.public_base_url,
            "FABLECAST_STORAGE_PUBLIC_BASE_URL",
        );
    }

}

fn override_from_env(target: &mut String, var: &str) {
    if let Ok(value) = std::env::var(var) {
        if !value.is_empty() {
            *target = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NpConfig::default();
        assert_eq!(config.worker_limit, 4);
        assert!(config.synthesis.api_key.is_empty());

        let parsed: NpConfig = toml::from_str("").unwrap();
        assert_eq!(parsed.worker_limit, 4);
        assert_eq!(parsed.synthesis.timeout_seconds, 60);
        assert_eq!(parsed.classifier.timeout_seconds, 30);
    }

    #[test]
    fn test_parse_full_file() {
        let toml_text = r#"
            worker_limit = 2

            [synthesis]
            base_url = "https://speech.example.com"
            api_key = "sk-test"
            model = "tts-large"
            timeout_seconds = 90

            [music]
            base_url = "https://music.example.com"

            [storage]
            base_url = "https://store.example.com"
            public_base_url = "https://cdn.example.com"
        "#;

        let config: NpConfig = toml::from_str(toml_text).unwrap();
        assert_eq!(config.worker_limit, 2);
        assert_eq!(config.synthesis.base_url, "https://speech.example.com");
        assert_eq!(config.synthesis.model, "tts-large");
        assert_eq!(config.synthesis.timeout_seconds, 90);
        assert_eq!(config.music.base_url, "https://music.example.com");
        assert_eq!(config.storage.public_base_url, "https://cdn.example.com");
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("FABLECAST_SPEECH_API_KEY", "sk-from-env");
        let mut config: NpConfig = toml::from_str("").unwrap();
        config.apply_env_overrides();
        std::env::remove_var("FABLECAST_SPEECH_API_KEY");

        assert_eq!(config.synthesis.api_key, "sk-from-env");
    }
}
