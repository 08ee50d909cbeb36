//! Narration request handlers
//!
//! Required fields are `Option`s so that a missing field surfaces as a 400
//! validation error rather than a body-deserialization rejection.

use crate::api::AppState;
use crate::error::{ApiResult, Error};
use crate::pipeline::{JobOptions, NarrationJob};
use axum::{extract::State, response::Json};
use fablecast_common::{EpisodeRecord, FadeCurve, ParagraphMetadata};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Mix and timing overrides accepted by every narration endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationOptions {
    pub voice: Option<String>,
    pub background_music_volume: Option<f32>,
    pub fade_in_duration: Option<f32>,
    pub fade_out_duration: Option<f32>,
    pub crossfade_duration: Option<f32>,
    pub fade_curve: Option<String>,
    /// Seconds of leading silence before the first paragraph
    pub narration_delay: Option<f64>,
    /// Seconds of silence between consecutive paragraphs
    pub paragraph_silence: Option<f64>,
    /// Paragraph indices that start a new episode
    pub episode_breaks: Option<Vec<usize>>,
}

impl NarrationOptions {
    /// Layer the request's overrides on the mode's defaults.
    fn apply_to(&self, mut options: JobOptions) -> Result<JobOptions, Error> {
        if let Some(voice) = &self.voice {
            if voice.trim().is_empty() {
                return Err(Error::Validation("voice must not be blank".to_string()));
            }
            options.voice = voice.trim().to_string();
        }
        if let Some(volume) = self.background_music_volume {
            options.mix.background_volume = volume;
        }
        if let Some(seconds) = self.fade_in_duration {
            options.mix.fade_in_seconds = seconds;
        }
        if let Some(seconds) = self.fade_out_duration {
            options.mix.fade_out_seconds = seconds;
        }
        if let Some(seconds) = self.crossfade_duration {
            options.mix.crossfade_seconds = seconds;
        }
        if let Some(curve) = &self.fade_curve {
            options.mix.fade_curve = FadeCurve::parse(curve).ok_or_else(|| {
                Error::Validation(format!("unknown fade curve '{}'", curve))
            })?;
        }
        if let Some(seconds) = self.narration_delay {
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(Error::Validation(
                    "narrationDelay must be a non-negative number".to_string(),
                ));
            }
            options.narration_delay_seconds = seconds;
        }
        if let Some(seconds) = self.paragraph_silence {
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(Error::Validation(
                    "paragraphSilence must be a non-negative number".to_string(),
                ));
            }
            options.paragraph_silence_seconds = seconds;
        }
        if let Some(breaks) = &self.episode_breaks {
            options.episode_breaks = breaks.clone();
        }
        options.mix = options.mix.sanitized();
        Ok(options)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationRequest {
    pub text: Option<String>,
    pub book_id: Option<String>,
    #[serde(default)]
    pub options: NarrationOptions,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphRequest {
    pub text: Option<String>,
    pub book_id: Option<String>,
    pub paragraph_index: Option<usize>,
    #[serde(default)]
    pub options: NarrationOptions,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRequest {
    pub text: Option<String>,
    pub book_id: Option<String>,
    pub chapter_id: Option<String>,
    pub episode_number: Option<usize>,
    #[serde(default)]
    pub options: NarrationOptions,
}

#[derive(Debug, Serialize)]
pub struct NarrationResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ParagraphResponse {
    pub url: String,
    pub metadata: ParagraphMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeResponse {
    pub paragraph_urls: Vec<String>,
    pub episodes: Vec<EpisodeRecord>,
}

fn required<'a>(field: Option<&'a String>, name: &str) -> Result<&'a str, Error> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value.as_str()),
        _ => Err(Error::Validation(format!("'{}' is required", name))),
    }
}

/// POST /api/v1/narration
///
/// Narrate the full text as one stitched track and return its durable URL.
pub async fn create_narration(
    State(state): State<AppState>,
    Json(request): Json<NarrationRequest>,
) -> ApiResult<Json<NarrationResponse>> {
    let text = required(request.text.as_ref(), "text")?;
    let book_id = required(request.book_id.as_ref(), "bookId")?;
    let options = request.options.apply_to(JobOptions::narration_defaults())?;

    info!(book_id = %book_id, "narration requested");
    let job = NarrationJob::narration(book_id, text, options)?;
    let result = state.orchestrator.run(job).await?;

    let url = result
        .final_url
        .ok_or_else(|| Error::Internal("pipeline returned no final URL".to_string()))?;
    Ok(Json(NarrationResponse { url }))
}

/// POST /api/v1/narration/paragraph
///
/// Narrate one paragraph and return its URL with the derived metadata.
pub async fn create_paragraph(
    State(state): State<AppState>,
    Json(request): Json<ParagraphRequest>,
) -> ApiResult<Json<ParagraphResponse>> {
    let text = required(request.text.as_ref(), "text")?;
    let book_id = required(request.book_id.as_ref(), "bookId")?;
    let options = request.options.apply_to(JobOptions::narration_defaults())?;

    info!(book_id = %book_id, "paragraph narration requested");
    let job = NarrationJob::paragraph(
        book_id,
        text,
        request.paragraph_index.unwrap_or(0),
        options,
    )?;
    let mut result = state.orchestrator.run(job).await?;

    if result.paragraph_urls.is_empty() || result.metadata.is_empty() {
        return Err(Error::Internal("pipeline returned no paragraph artifact".to_string()).into());
    }
    Ok(Json(ParagraphResponse {
        url: result.paragraph_urls.remove(0),
        metadata: result.metadata.remove(0),
    }))
}

/// POST /api/v1/narration/episode
///
/// Narrate a chapter's text partitioned into episodes.
pub async fn create_episode(
    State(state): State<AppState>,
    Json(request): Json<EpisodeRequest>,
) -> ApiResult<Json<EpisodeResponse>> {
    let text = required(request.text.as_ref(), "text")?;
    let book_id = required(request.book_id.as_ref(), "bookId")?;
    let options = request.options.apply_to(JobOptions::episode_defaults())?;

    info!(book_id = %book_id, chapter_id = ?request.chapter_id, "episode narration requested");
    let job = NarrationJob::episode(
        book_id,
        request.chapter_id.as_deref(),
        request.episode_number.unwrap_or(1),
        text,
        options,
    )?;
    let result = state.orchestrator.run(job).await?;

    Ok(Json(EpisodeResponse {
        paragraph_urls: result.paragraph_urls,
        episodes: result.episodes,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_field_validation() {
        assert!(required(None, "text").is_err());
        assert!(required(Some(&"  ".to_string()), "text").is_err());
        assert_eq!(required(Some(&"hello".to_string()), "text").unwrap(), "hello");
    }

    #[test]
    fn test_options_override_defaults() {
        let options: NarrationOptions = serde_json::from_str(
            r#"{
                "voice": "sage",
                "backgroundMusicVolume": 0.5,
                "fadeInDuration": 0.0,
                "paragraphSilence": 2.5,
                "episodeBreaks": [3, 6]
            }"#,
        )
        .unwrap();

        let resolved = options.apply_to(JobOptions::narration_defaults()).unwrap();
        assert_eq!(resolved.voice, "sage");
        assert_eq!(resolved.mix.background_volume, 0.5);
        assert_eq!(resolved.mix.fade_in_seconds, 0.0);
        assert_eq!(resolved.mix.fade_out_seconds, 3.0); // default kept
        assert_eq!(resolved.paragraph_silence_seconds, 2.5);
        assert_eq!(resolved.episode_breaks, vec![3, 6]);
    }

    #[test]
    fn test_options_sanitize_out_of_range_volume() {
        let options = NarrationOptions {
            background_music_volume: Some(1.8),
            ..NarrationOptions::default()
        };
        let resolved = options.apply_to(JobOptions::narration_defaults()).unwrap();
        assert_eq!(resolved.mix.background_volume, 1.0);
    }

    #[test]
    fn test_invalid_options_rejected() {
        let bad_curve = NarrationOptions {
            fade_curve: Some("triangle".to_string()),
            ..NarrationOptions::default()
        };
        assert!(bad_curve.apply_to(JobOptions::narration_defaults()).is_err());

        let bad_delay = NarrationOptions {
            narration_delay: Some(-1.0),
            ..NarrationOptions::default()
        };
        assert!(bad_delay.apply_to(JobOptions::narration_defaults()).is_err());
    }
}
