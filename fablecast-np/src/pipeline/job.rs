//! Narration job definitions
//!
//! A job is created per request, lives for one pipeline execution, and is
//! never persisted. If the process restarts the job is lost and must be
//! resubmitted.

use crate::config::{
    DEFAULT_BACKGROUND_VOLUME, DEFAULT_VOICE, EPISODE_FADE_SECONDS,
    EPISODE_PARAGRAPH_SILENCE_SECONDS, NARRATION_CROSSFADE_SECONDS, NARRATION_FADE_IN_SECONDS,
    NARRATION_FADE_OUT_SECONDS, NARRATION_PARAGRAPH_SILENCE_SECONDS,
};
use crate::error::{Error, Result};
use crate::text::split_paragraphs;
use fablecast_common::{FadeCurve, MixConfig, ParagraphUnit};
use uuid::Uuid;

/// Job lifecycle states
///
/// `Synthesizing` and `MusicFetching` run concurrently for each paragraph;
/// both must complete before that paragraph's `Mixing` begins. `Failed` is
/// reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Created,
    MetadataExtracted,
    Synthesizing,
    MusicFetching,
    Mixing,
    Concatenating,
    Uploading,
    Completed,
    Failed,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Created => "created",
            JobStage::MetadataExtracted => "metadata_extracted",
            JobStage::Synthesizing => "synthesizing",
            JobStage::MusicFetching => "music_fetching",
            JobStage::Mixing => "mixing",
            JobStage::Concatenating => "concatenating",
            JobStage::Uploading => "uploading",
            JobStage::Completed => "completed",
            JobStage::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Progress events emitted over an optional mpsc channel
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    JobStarted {
        job_id: Uuid,
        paragraph_count: usize,
    },
    StageChanged {
        job_id: Uuid,
        stage: JobStage,
    },
    ParagraphStage {
        job_id: Uuid,
        paragraph_index: usize,
        stage: JobStage,
    },
    ParagraphCompleted {
        job_id: Uuid,
        paragraph_index: usize,
    },
    JobCompleted {
        job_id: Uuid,
    },
    JobFailed {
        job_id: Uuid,
        message: String,
    },
}

/// What the job produces and returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobMode {
    /// One stitched track; only the final URL is returned
    Narration,
    /// One paragraph's mixed segment plus its metadata
    Paragraph,
    /// Paragraphs partitioned into episodes, each uploaded separately
    Episode,
}

/// Per-request tunables resolved from the API options
#[derive(Debug, Clone)]
pub struct JobOptions {
    pub voice: String,
    pub mix: MixConfig,
    /// Silence inserted between consecutive paragraphs
    pub paragraph_silence_seconds: f64,
    /// Leading silence before the first paragraph
    pub narration_delay_seconds: f64,
    /// Paragraph indices that start a new episode (episode mode only)
    pub episode_breaks: Vec<usize>,
}

impl JobOptions {
    /// Musical defaults for single-narration and per-paragraph jobs
    pub fn narration_defaults() -> Self {
        Self {
            voice: DEFAULT_VOICE.to_string(),
            mix: MixConfig {
                background_volume: DEFAULT_BACKGROUND_VOLUME,
                fade_in_seconds: NARRATION_FADE_IN_SECONDS,
                fade_out_seconds: NARRATION_FADE_OUT_SECONDS,
                crossfade_seconds: NARRATION_CROSSFADE_SECONDS,
                fade_curve: FadeCurve::default(),
            },
            paragraph_silence_seconds: NARRATION_PARAGRAPH_SILENCE_SECONDS,
            narration_delay_seconds: 0.0,
            episode_breaks: Vec::new(),
        }
    }

    /// Episode defaults: continuous playback, no fades, no gaps
    pub fn episode_defaults() -> Self {
        Self {
            voice: DEFAULT_VOICE.to_string(),
            mix: MixConfig {
                background_volume: DEFAULT_BACKGROUND_VOLUME,
                fade_in_seconds: EPISODE_FADE_SECONDS,
                fade_out_seconds: EPISODE_FADE_SECONDS,
                crossfade_seconds: EPISODE_FADE_SECONDS,
                fade_curve: FadeCurve::default(),
            },
            paragraph_silence_seconds: EPISODE_PARAGRAPH_SILENCE_SECONDS,
            narration_delay_seconds: 0.0,
            episode_breaks: Vec::new(),
        }
    }
}

/// One request's worth of pipeline work
#[derive(Debug, Clone)]
pub struct NarrationJob {
    pub id: Uuid,
    pub book_id: String,
    pub chapter_id: Option<String>,
    /// Number assigned to the first episode (episode mode)
    pub episode_number: usize,
    pub mode: JobMode,
    pub paragraphs: Vec<ParagraphUnit>,
    pub options: JobOptions,
}

impl NarrationJob {
    /// Full-text job: split into paragraphs, stitch into one track.
    pub fn narration(book_id: &str, text: &str, options: JobOptions) -> Result<Self> {
        let paragraphs = split_paragraphs(text);
        if paragraphs.is_empty() {
            return Err(Error::Validation(
                "text contains no narratable paragraphs".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            book_id: book_id.to_string(),
            chapter_id: None,
            episode_number: 1,
            mode: JobMode::Narration,
            paragraphs,
            options,
        })
    }

    /// Single-paragraph job: the text is one unit; no splitting.
    pub fn paragraph(
        book_id: &str,
        text: &str,
        paragraph_index: usize,
        options: JobOptions,
    ) -> Result<Self> {
        if text.trim().is_empty() {
            return Err(Error::Validation("paragraph text is empty".to_string()));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            book_id: book_id.to_string(),
            chapter_id: None,
            episode_number: 1,
            mode: JobMode::Paragraph,
            paragraphs: vec![ParagraphUnit::new(paragraph_index, text.trim())],
            options,
        })
    }

    /// Episode job: split into paragraphs, partition by `episode_breaks`.
    pub fn episode(
        book_id: &str,
        chapter_id: Option<&str>,
        episode_number: usize,
        text: &str,
        options: JobOptions,
    ) -> Result<Self> {
        let paragraphs = split_paragraphs(text);
        if paragraphs.is_empty() {
            return Err(Error::Validation(
                "text contains no narratable paragraphs".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            book_id: book_id.to_string(),
            chapter_id: chapter_id.map(|s| s.to_string()),
            episode_number: episode_number.max(1),
            mode: JobMode::Episode,
            paragraphs,
            options,
        })
    }

    /// Episode boundaries as inclusive paragraph-index ranges.
    ///
    /// Break indices mark the first paragraph of a new episode. Out-of-range
    /// and duplicate breaks are dropped; no breaks means one episode.
    pub fn episode_spans(&self) -> Vec<(usize, usize)> {
        let count = self.paragraphs.len();
        let mut breaks: Vec<usize> = self
            .options
            .episode_breaks
            .iter()
            .copied()
            .filter(|&b| b > 0 && b < count)
            .collect();
        breaks.sort_unstable();
        breaks.dedup();

        let mut spans = Vec::with_capacity(breaks.len() + 1);
        let mut start = 0;
        for b in breaks {
            spans.push((start, b - 1));
            start = b;
        }
        spans.push((start, count - 1));
        spans
    }
}
