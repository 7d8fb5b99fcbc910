// Wire shapes of the REST endpoints not covered by openai_dive, plus the
// conversions into the crate's own types.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use types::{Transcript, TranscriptSegment};

use crate::AiError;

#[derive(Debug, Serialize)]
pub struct SpeechBody<'a> {
    pub model: &'a str,
    pub input: &'a str,
    pub voice: &'a str,
    pub response_format: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ImageBody<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub n: u8,
    pub size: &'a str,
    // gpt-image models always return base64 and reject the parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    text: String,

    #[serde(default)]
    language: Option<String>,

    #[serde(default)]
    duration: Option<f64>,

    #[serde(default)]
    segments: Vec<VerboseSegment>,
}

#[derive(Debug, Deserialize)]
struct VerboseSegment {
    start: f64,
    end: f64,
    text: String,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    b64_json: Option<String>,

    #[serde(default)]
    revised_prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Parses a `verbose_json` transcription body.
pub fn parse_transcription(body: &str) -> Result<Transcript, AiError> {
    let verbose: VerboseTranscription = serde_json::from_str(body)?;

    let segments = verbose
        .segments
        .into_iter()
        .map(|segment| TranscriptSegment {
            start: segment.start,
            end: segment.end.max(segment.start),
            text: segment.text.trim().to_string(),
        })
        .filter(|segment| !segment.text.is_empty())
        .collect();

    Ok(Transcript {
        text: verbose.text.trim().to_string(),
        language: verbose.language,
        duration: verbose.duration,
        segments,
    })
}

/// Decodes the first image of an images/generations body.
pub fn parse_image(body: &str) -> Result<Vec<u8>, AiError> {
    let response: ImagesResponse = serde_json::from_str(body)?;

    let image = response
        .data
        .into_iter()
        .next()
        .ok_or(AiError::EmptyResponse("no image returned"))?;

    if let Some(revised_prompt) = &image.revised_prompt {
        tracing::debug!("image prompt revised to: {}", revised_prompt);
    }

    let encoded = image
        .b64_json
        .ok_or(AiError::EmptyResponse("image has no b64_json data"))?;

    Ok(STANDARD.decode(encoded)?)
}

/// Best-effort extraction of the human readable message from an error body.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body).map_or_else(
        |_| body.trim().to_string(),
        |envelope| envelope.error.message,
    )
}
