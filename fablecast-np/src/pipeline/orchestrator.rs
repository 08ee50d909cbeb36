//! Pipeline orchestrator
//!
//! Drives one narration job through its state machine: classify all
//! paragraphs in one batch, then produce each paragraph (synthesis and
//! music fetch concurrently, then mix), then concatenate in paragraph
//! order, then upload.
//!
//! Paragraph production runs with bounded concurrency (`worker_limit`
//! semaphore permits). Results land in an index-addressed slot vector, so
//! completion order never affects output order. Any paragraph failure
//! cancels its in-flight siblings and fails the whole job; the sole
//! degradation path is a music fetch failure, which falls back to
//! narration-only output for that paragraph.
//!
//! Scratch storage is a per-job `TempDir` owned by `run`; it is removed on
//! every exit path, including early failure.

use super::job::{JobMode, JobStage, NarrationJob, PipelineEvent};
use crate::audio::{concat, encoder, mixer, AudioSegment};
use crate::error::{Error, Result};
use crate::services::{MoodClassifier, MusicSource, SpeechProvider};
use crate::storage::{self, validate_durable_url, ArtifactStore};
use fablecast_common::{EpisodeRecord, MixConfig, NarrationResult, ParagraphMetadata};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub struct Orchestrator {
    classifier: Arc<dyn MoodClassifier>,
    speech: Arc<dyn SpeechProvider>,
    music: Arc<dyn MusicSource>,
    store: Arc<dyn ArtifactStore>,
    worker_limit: usize,
    event_tx: Option<mpsc::Sender<PipelineEvent>>,
}

impl Orchestrator {
    pub fn new(
        classifier: Arc<dyn MoodClassifier>,
        speech: Arc<dyn SpeechProvider>,
        music: Arc<dyn MusicSource>,
        store: Arc<dyn ArtifactStore>,
        worker_limit: usize,
    ) -> Self {
        Self {
            classifier,
            speech,
            music,
            store,
            worker_limit: worker_limit.max(1),
            event_tx: None,
        }
    }

    /// Attach a progress event channel.
    pub fn with_events(mut self, event_tx: mpsc::Sender<PipelineEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    async fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.event_tx {
            // A full or closed channel never stalls the pipeline.
            let _ = tx.try_send(event);
        }
    }

    async fn stage(&self, job_id: Uuid, stage: JobStage) {
        info!(job_id = %job_id, stage = %stage, "job stage");
        self.emit(PipelineEvent::StageChanged { job_id, stage }).await;
    }

    /// Execute one job to completion.
    pub async fn run(&self, job: NarrationJob) -> Result<NarrationResult> {
        let job_id = job.id;
        info!(
            job_id = %job_id,
            book_id = %job.book_id,
            mode = ?job.mode,
            paragraphs = job.paragraphs.len(),
            "narration job started"
        );
        self.emit(PipelineEvent::JobStarted {
            job_id,
            paragraph_count: job.paragraphs.len(),
        })
        .await;

        match self.execute(job).await {
            Ok(result) => {
                info!(job_id = %job_id, "narration job completed");
                self.stage(job_id, JobStage::Completed).await;
                self.emit(PipelineEvent::JobCompleted { job_id }).await;
                Ok(result)
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "narration job failed");
                self.stage(job_id, JobStage::Failed).await;
                self.emit(PipelineEvent::JobFailed {
                    job_id,
                    message: e.to_string(),
                })
                .await;
                Err(e)
            }
        }
    }

    async fn execute(&self, job: NarrationJob) -> Result<NarrationResult> {
        if job.paragraphs.is_empty() {
            return Err(Error::Validation(
                "job contains no paragraphs".to_string(),
            ));
        }

        // Scratch space for intermediate segments, removed on drop.
        let scratch = TempDir::new()?;

        let metadata = self.classify(&job).await?;
        let paths = self.produce_paragraphs(&job, &metadata, scratch.path()).await?;
        self.finalize(&job, metadata, &paths).await
    }

    /// One batch classifier call covering every paragraph. A classifier
    /// failure is job-global: no paragraph work has started yet, so the job
    /// fails before any provider call is wasted.
    async fn classify(&self, job: &NarrationJob) -> Result<Vec<ParagraphMetadata>> {
        let metadata = self.classifier.classify(&job.paragraphs).await?;
        if metadata.len() != job.paragraphs.len() {
            return Err(Error::Classification(format!(
                "expected {} metadata records, classifier returned {}",
                job.paragraphs.len(),
                metadata.len()
            )));
        }
        self.stage(job.id, JobStage::MetadataExtracted).await;
        Ok(metadata)
    }

    /// Produce every paragraph's mixed segment under the worker limit.
    ///
    /// Returns scratch file paths in paragraph order regardless of task
    /// completion order.
    async fn produce_paragraphs(
        &self,
        job: &NarrationJob,
        metadata: &[ParagraphMetadata],
        scratch: &Path,
    ) -> Result<Vec<PathBuf>> {
        self.stage(job.id, JobStage::Synthesizing).await;

        let semaphore = Arc::new(Semaphore::new(self.worker_limit));
        let cancel = CancellationToken::new();
        let mut tasks: JoinSet<(usize, Result<PathBuf>)> = JoinSet::new();

        for (slot, (paragraph, meta)) in job.paragraphs.iter().zip(metadata).enumerate() {
            let work = ParagraphWork {
                job_id: job.id,
                slot,
                text: paragraph.text.clone(),
                voice: job.options.voice.clone(),
                mood: meta.mood.clone(),
                intensity: meta.intensity,
                mix: job.options.mix,
                scratch_path: scratch.join(format!("paragraph_{}.wav", slot)),
                speech: Arc::clone(&self.speech),
                music: Arc::clone(&self.music),
                event_tx: self.event_tx.clone(),
            };
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();

            tasks.spawn(async move {
                let slot = work.slot;
                let result = tokio::select! {
                    _ = cancel.cancelled() => {
                        Err(Error::Cancelled("a sibling stage failed".to_string()))
                    }
                    result = produce_paragraph(work, semaphore) => result,
                };
                (slot, result)
            });
        }

        let mut slots: Vec<Option<PathBuf>> = vec![None; job.paragraphs.len()];
        let mut failure: Option<Error> = None;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, Ok(path))) => {
                    slots[slot] = Some(path);
                    self.emit(PipelineEvent::ParagraphCompleted {
                        job_id: job.id,
                        paragraph_index: slot,
                    })
                    .await;
                }
                Ok((slot, Err(e))) => {
                    debug!(job_id = %job.id, paragraph_index = slot, error = %e, "paragraph failed");
                    cancel.cancel();
                    record_failure(&mut failure, e);
                }
                Err(join_error) => {
                    cancel.cancel();
                    record_failure(
                        &mut failure,
                        Error::Internal(format!("paragraph task panicked: {}", join_error)),
                    );
                }
            }
        }

        if let Some(e) = failure {
            return Err(e);
        }

        slots
            .into_iter()
            .map(|slot| {
                slot.ok_or_else(|| Error::Internal("paragraph slot left empty".to_string()))
            })
            .collect()
    }

    /// Concatenate, encode, and upload per the job's mode.
    async fn finalize(
        &self,
        job: &NarrationJob,
        metadata: Vec<ParagraphMetadata>,
        paths: &[PathBuf],
    ) -> Result<NarrationResult> {
        self.stage(job.id, JobStage::Concatenating).await;

        let mut segments = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = tokio::fs::read(path).await?;
            segments.push(AudioSegment::from_wav_bytes(&bytes)?);
        }

        let mut paragraph_urls = Vec::new();
        let mut final_url = None;
        let mut episodes = Vec::new();

        match job.mode {
            JobMode::Narration => {
                let bytes = stitch(
                    segments,
                    job.options.paragraph_silence_seconds,
                    job.options.narration_delay_seconds,
                )
                .await?
                .0;

                self.stage(job.id, JobStage::Uploading).await;
                let key = storage::full_key(&job.book_id);
                final_url = Some(self.upload(&key, bytes).await?);
            }
            JobMode::Paragraph => {
                self.stage(job.id, JobStage::Uploading).await;
                paragraph_urls = self.upload_paragraphs(job, paths).await?;
            }
            JobMode::Episode => {
                let spans = job.episode_spans();
                let mut episode_artifacts = Vec::with_capacity(spans.len());
                for (i, &(first, last)) in spans.iter().enumerate() {
                    let slice: Vec<AudioSegment> = segments[first..=last].to_vec();
                    let (bytes, duration_seconds) = stitch(
                        slice,
                        job.options.paragraph_silence_seconds,
                        job.options.narration_delay_seconds,
                    )
                    .await?;
                    episode_artifacts.push((i, first, last, bytes, duration_seconds));
                }

                self.stage(job.id, JobStage::Uploading).await;
                paragraph_urls = self.upload_paragraphs(job, paths).await?;

                let chapter = job.chapter_id.as_deref().unwrap_or("main");
                for (i, first, last, bytes, duration_seconds) in episode_artifacts {
                    let number = job.episode_number + i;
                    let key = storage::episode_key(&job.book_id, chapter, number);
                    let url = self.upload(&key, bytes).await?;
                    episodes.push(EpisodeRecord {
                        index: number,
                        url,
                        first_paragraph: first,
                        last_paragraph: last,
                        duration_seconds,
                    });
                }
            }
        }

        Ok(NarrationResult {
            paragraph_urls,
            final_url,
            metadata,
            episodes,
        })
    }

    async fn upload_paragraphs(
        &self,
        job: &NarrationJob,
        paths: &[PathBuf],
    ) -> Result<Vec<String>> {
        let mut urls = Vec::with_capacity(paths.len());
        for (paragraph, path) in job.paragraphs.iter().zip(paths) {
            let bytes = tokio::fs::read(path).await?;
            let key = storage::paragraph_key(&job.book_id, paragraph.index);
            urls.push(self.upload(&key, bytes).await?);
        }
        Ok(urls)
    }

    async fn upload(&self, key: &str, bytes: Vec<u8>) -> Result<String> {
        let url = storage::upload_with_retry(self.store.as_ref(), key, bytes, "audio/wav").await?;
        // Callers must never receive an ephemeral URL.
        validate_durable_url(&url)?;
        Ok(url)
    }
}

/// Everything one paragraph task needs, moved into the task.
struct ParagraphWork {
    job_id: Uuid,
    slot: usize,
    text: String,
    voice: String,
    mood: String,
    intensity: u8,
    mix: MixConfig,
    scratch_path: PathBuf,
    speech: Arc<dyn SpeechProvider>,
    music: Arc<dyn MusicSource>,
    event_tx: Option<mpsc::Sender<PipelineEvent>>,
}

impl ParagraphWork {
    fn emit_stage(&self, stage: JobStage) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.try_send(PipelineEvent::ParagraphStage {
                job_id: self.job_id,
                paragraph_index: self.slot,
                stage,
            });
        }
    }
}

/// Synthesis and music fetch run concurrently; mixing waits for both.
async fn produce_paragraph(work: ParagraphWork, semaphore: Arc<Semaphore>) -> Result<PathBuf> {
    let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|_| Error::Internal("worker pool closed".to_string()))?;

    debug!(
        job_id = %work.job_id,
        paragraph_index = work.slot,
        mood = %work.mood,
        "producing paragraph"
    );
    work.emit_stage(JobStage::Synthesizing);
    work.emit_stage(JobStage::MusicFetching);

    let (narration, background) = tokio::join!(
        work.speech.synthesize(&work.text, &work.voice),
        fetch_background(work.music.as_ref(), &work.mood, work.intensity, work.slot),
    );
    let narration = narration?;

    work.emit_stage(JobStage::Mixing);
    let mix_config = work.mix;
    let bytes = tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
        let mixed = match background {
            Some(bed) => mixer::mix(&narration, &bed, &mix_config)?,
            None => narration,
        };
        encoder::encode_wav(&mixed)
    })
    .await
    .map_err(|e| Error::Internal(format!("mix task panicked: {}", e)))??;

    tokio::fs::write(&work.scratch_path, &bytes).await?;
    Ok(work.scratch_path)
}

/// Music failure never fails the paragraph: log and narrate without a bed.
async fn fetch_background(
    music: &dyn MusicSource,
    mood: &str,
    intensity: u8,
    paragraph_index: usize,
) -> Option<AudioSegment> {
    match music.fetch_track(mood, intensity).await {
        Ok(track) => Some(track),
        Err(e) => {
            warn!(
                paragraph_index,
                mood = %mood,
                error = %e,
                "background music unavailable, narrating without a bed"
            );
            None
        }
    }
}

/// Concatenate in order with the paragraph gap, prepend the narration
/// delay, and encode. CPU-bound, so it runs off the async workers.
async fn stitch(
    segments: Vec<AudioSegment>,
    gap_seconds: f64,
    delay_seconds: f64,
) -> Result<(Vec<u8>, f64)> {
    tokio::task::spawn_blocking(move || -> Result<(Vec<u8>, f64)> {
        let mut track = concat::concatenate(&segments, gap_seconds)?;
        if delay_seconds > 0.0 {
            let lead =
                AudioSegment::silence(delay_seconds, track.sample_rate(), track.channels())?;
            track = concat::concatenate(&[lead, track], 0.0)?;
        }
        let duration = track.duration_seconds();
        let bytes = encoder::encode_wav(&track)?;
        Ok((bytes, duration))
    })
    .await
    .map_err(|e| Error::Internal(format!("concatenation task panicked: {}", e)))?
}

/// Keep the first substantive error; cancellation errors from siblings are
/// noise once a real failure is recorded.
fn record_failure(failure: &mut Option<Error>, e: Error) {
    match failure {
        None => *failure = Some(e),
        Some(Error::Cancelled(_)) if !matches!(e, Error::Cancelled(_)) => *failure = Some(e),
        Some(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_failure_prefers_substantive_error() {
        let mut failure = None;
        record_failure(&mut failure, Error::Cancelled("sibling".to_string()));
        record_failure(&mut failure, Error::Synthesis("provider 500".to_string()));
        record_failure(&mut failure, Error::Cancelled("another".to_string()));
        assert!(matches!(failure, Some(Error::Synthesis(_))));
    }

    #[test]
    fn test_record_failure_keeps_first_substantive_error() {
        let mut failure = None;
        record_failure(&mut failure, Error::Synthesis("first".to_string()));
        record_failure(&mut failure, Error::Upload("second".to_string()));
        match failure {
            Some(Error::Synthesis(message)) => assert_eq!(message, "first"),
            other => panic!("unexpected failure: {:?}", other),
        }
    }
}
