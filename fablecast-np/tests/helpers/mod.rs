//! Shared in-process fakes for the provider traits.
#![allow(dead_code)]

use async_trait::async_trait;
use fablecast_common::{ParagraphMetadata, ParagraphUnit};
use fablecast_np::audio::AudioSegment;
use fablecast_np::error::{Error, Result};
use fablecast_np::pipeline::Orchestrator;
use fablecast_np::services::{MoodClassifier, MusicSource, SpeechProvider};
use fablecast_np::storage::ArtifactStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TEST_SAMPLE_RATE: u32 = 1000;

/// Mono segment of constant amplitude, the unit of fake audio.
pub fn constant_segment(amplitude: f32, duration_seconds: f64) -> AudioSegment {
    let frames = (duration_seconds * TEST_SAMPLE_RATE as f64).round() as usize;
    AudioSegment::new(vec![amplitude; frames], TEST_SAMPLE_RATE, 1).unwrap()
}

/// Classifier assigning a deterministic mood by paragraph index.
pub struct FakeClassifier {
    fail: bool,
    pub calls: AtomicUsize,
}

impl FakeClassifier {
    pub fn ok() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MoodClassifier for FakeClassifier {
    async fn classify(&self, paragraphs: &[ParagraphUnit]) -> Result<Vec<ParagraphMetadata>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Classification("classifier offline".to_string()));
        }
        Ok(paragraphs
            .iter()
            .map(|p| ParagraphMetadata {
                mood: if p.index % 2 == 0 { "tense" } else { "calm" }.to_string(),
                genre: "adventure".to_string(),
                intensity: 5,
                tempo: None,
            })
            .collect())
    }
}

/// What the fake synthesizer does for one known text.
#[derive(Clone)]
pub struct Utterance {
    pub delay_ms: u64,
    pub duration_seconds: f64,
    pub amplitude: f32,
    pub fail: bool,
}

impl Default for Utterance {
    fn default() -> Self {
        Self {
            delay_ms: 0,
            duration_seconds: 0.1,
            amplitude: 0.5,
            fail: false,
        }
    }
}

/// Synthesizer returning constant-amplitude segments per a text-keyed plan.
///
/// `calls` counts invocations, `completed` counts successful returns; their
/// difference shows work that failed or was cancelled mid-flight.
pub struct FakeSpeech {
    plan: Mutex<HashMap<String, Utterance>>,
    pub calls: AtomicUsize,
    pub completed: AtomicUsize,
}

impl FakeSpeech {
    pub fn new() -> Self {
        Self {
            plan: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, text: &str, utterance: Utterance) {
        self.plan
            .lock()
            .unwrap()
            .insert(text.to_string(), utterance);
    }
}

#[async_trait]
impl SpeechProvider for FakeSpeech {
    async fn synthesize(&self, text: &str, _voice: &str) -> Result<AudioSegment> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let utterance = self
            .plan
            .lock()
            .unwrap()
            .get(text)
            .cloned()
            .unwrap_or_default();

        if utterance.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(utterance.delay_ms)).await;
        }
        if utterance.fail {
            return Err(Error::Synthesis(format!("provider rejected '{}'", text)));
        }

        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(constant_segment(
            utterance.amplitude,
            utterance.duration_seconds,
        ))
    }
}

pub enum MusicMode {
    Track {
        amplitude: f32,
        duration_seconds: f64,
    },
    Unavailable,
}

pub struct FakeMusic {
    mode: MusicMode,
    pub calls: AtomicUsize,
}

impl FakeMusic {
    pub fn track(amplitude: f32, duration_seconds: f64) -> Self {
        Self {
            mode: MusicMode::Track {
                amplitude,
                duration_seconds,
            },
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            mode: MusicMode::Unavailable,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MusicSource for FakeMusic {
    async fn fetch_track(&self, _mood: &str, _intensity: u8) -> Result<AudioSegment> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            MusicMode::Track {
                amplitude,
                duration_seconds,
            } => Ok(constant_segment(amplitude, duration_seconds)),
            MusicMode::Unavailable => {
                Err(Error::MusicUnavailable("no track for bucket".to_string()))
            }
        }
    }
}

/// Store recording every upload and returning URLs under a fixed base.
///
/// `flaky(n)` makes the first `n` upload attempts fail with a transient
/// error; `attempts` counts every attempt, failed or not.
pub struct FakeStore {
    base_url: String,
    remaining_failures: AtomicUsize,
    pub attempts: AtomicUsize,
    pub uploads: Mutex<Vec<(String, Vec<u8>)>>,
}

impl FakeStore {
    pub fn durable() -> Self {
        Self {
            base_url: "https://cdn.example.com".to_string(),
            remaining_failures: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
            uploads: Mutex::new(Vec::new()),
        }
    }

    /// Returns session-bound URLs the pipeline must refuse to hand out.
    pub fn ephemeral() -> Self {
        Self {
            base_url: "blob:https://app.example.com".to_string(),
            remaining_failures: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
            uploads: Mutex::new(Vec::new()),
        }
    }

    /// Durable store whose first `failures` attempts return an upload error.
    pub fn flaky(failures: usize) -> Self {
        Self {
            base_url: "https://cdn.example.com".to_string(),
            remaining_failures: AtomicUsize::new(failures),
            attempts: AtomicUsize::new(0),
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn uploaded_keys(&self) -> Vec<String> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn bytes_for(&self, key_fragment: &str) -> Option<Vec<u8>> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .find(|(key, _)| key.contains(key_fragment))
            .map(|(_, bytes)| bytes.clone())
    }
}

#[async_trait]
impl ArtifactStore for FakeStore {
    async fn upload(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(Error::Upload("store returned 503".to_string()));
        }
        self.uploads
            .lock()
            .unwrap()
            .push((key.to_string(), bytes));
        Ok(format!("{}/{}", self.base_url, key))
    }
}

pub fn orchestrator(
    classifier: Arc<FakeClassifier>,
    speech: Arc<FakeSpeech>,
    music: Arc<FakeMusic>,
    store: Arc<FakeStore>,
    worker_limit: usize,
) -> Orchestrator {
    Orchestrator::new(classifier, speech, music, store, worker_limit)
}
