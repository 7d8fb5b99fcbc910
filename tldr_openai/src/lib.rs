//! Clients for the hosted AI APIs the pipeline calls.
//!
//! The pipeline only talks to [`AiProvider`]; [`OpenAiProvider`] is the
//! production implementation. With the `fake` feature, [`fake::FakeProvider`]
//! answers from memory so dependent crates can test without a network.

#[cfg(any(test, feature = "fake"))]
pub mod fake;
mod openai;
mod responses;

pub use openai::{OpenAiProvider, OpenAiSettings};

use async_trait::async_trait;
use thiserror::Error;
use types::{SpeechVoice, Transcript};

/// Longest text the speech endpoint accepts in one request.
pub const MAX_SPEECH_INPUT_CHARS: usize = 4096;

/// Largest upload the transcription endpoint accepts.
pub const MAX_TRANSCRIPTION_BYTES: usize = 25 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum AiError {
    #[error("API key is not a valid header value")]
    InvalidApiKey,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Chat completion failed: {0}")]
    Chat(String),
    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("API returned no usable content: {0}")]
    EmptyResponse(&'static str),
    #[error("Failed to parse API response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
    #[error("Failed to decode image data: {0}")]
    ImageDecode(#[from] base64::DecodeError),
    #[error("Speech input is {0} characters, the limit is {MAX_SPEECH_INPUT_CHARS}")]
    SpeechInputTooLong(usize),
    #[error("Audio is {0} bytes, the transcription limit is {MAX_TRANSCRIPTION_BYTES}")]
    AudioTooLarge(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Overrides the provider's default system prompt.
    pub system: Option<String>,
    pub prompt: String,
    /// Ask the model for a single JSON object.
    pub json: bool,
}

impl CompletionRequest {
    #[must_use]
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            json: false,
        }
    }

    #[must_use]
    pub fn json(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            prompt: prompt.into(),
            json: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
    pub voice: SpeechVoice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioInput {
    /// Used by the API to sniff the format, so the extension matters.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub prompt: String,
    /// `WIDTHxHEIGHT`; the provider default when `None`.
    pub size: Option<String>,
}

/// The four hosted capabilities a pipeline run needs.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Chat completion; returns the assistant's text.
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<String, AiError>;

    /// Text to speech; returns WAV bytes.
    async fn synthesize_speech(
        &self,
        request: &SpeechRequest,
    ) -> Result<Vec<u8>, AiError>;

    /// Speech to text with segment timestamps.
    async fn transcribe(&self, audio: &AudioInput) -> Result<Transcript, AiError>;

    /// Image generation; returns PNG bytes.
    async fn generate_image(
        &self,
        request: &ImageRequest,
    ) -> Result<Vec<u8>, AiError>;

    /// Provider name for logs (e.g. "openai").
    fn provider_name(&self) -> &'static str;
}
