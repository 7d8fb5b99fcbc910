use async_trait::async_trait;
use openai_dive::v1::{
    api::Client,
    resources::chat::{
        ChatCompletionParameters, ChatCompletionResponseFormat, ChatMessage,
        ChatMessageContent,
    },
};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use std::path::Path;
use tracing::instrument;
use types::Transcript;

use crate::{
    AiError, AiProvider, AudioInput, CompletionRequest, ImageRequest,
    MAX_SPEECH_INPUT_CHARS, MAX_TRANSCRIPTION_BYTES, SpeechRequest,
    responses::{self, ImageBody, SpeechBody},
};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiSettings {
    pub chat_model: String,
    pub system_prompt: String,
    pub temperature: f32,
    pub tts_model: String,
    pub transcription_model: String,
    pub image_model: String,
    pub image_size: String,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            chat_model: "gpt-4o-mini".to_string(),
            system_prompt: "You are a helpful assistant".to_string(),
            temperature: 0.7,
            tts_model: "tts-1".to_string(),
            transcription_model: "whisper-1".to_string(),
            image_model: "dall-e-3".to_string(),
            image_size: "1792x1024".to_string(),
        }
    }
}

/// `OpenAI` backed provider.
///
/// Chat goes through `openai_dive`; speech, transcription and images are
/// plain REST calls on a `reqwest` client carrying the bearer token.
pub struct OpenAiProvider {
    chat_client: Client,
    http_client: reqwest::Client,
    settings: OpenAiSettings,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl OpenAiProvider {
    /// # Errors
    /// If the key cannot be sent as a header or the HTTP client cannot be
    /// built.
    pub fn new(api_key: &str, settings: OpenAiSettings) -> Result<Self, AiError> {
        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| AiError::InvalidApiKey)?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            chat_client: Client::new(api_key.to_string()),
            http_client,
            settings,
        })
    }

    fn endpoint(path: &str) -> String {
        format!("{OPENAI_API_BASE}/{path}")
    }

    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, AiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await?;
        tracing::error!("OpenAI API error {}: {}", status, body);

        Err(AiError::Api {
            status: status.as_u16(),
            message: responses::error_message(&body),
        })
    }
}

fn audio_mime_type(file_name: &str) -> &'static str {
    match Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("mp3" | "mpga" | "mpeg") => "audio/mpeg",
        Some("m4a" | "mp4") => "audio/mp4",
        Some("ogg" | "oga") => "audio/ogg",
        Some("flac") => "audio/flac",
        Some("webm") => "audio/webm",
        _ => "audio/wav",
    }
}

fn completion_text(message: &ChatMessage) -> Option<String> {
    match message {
        ChatMessage::Assistant {
            content: Some(ChatMessageContent::Text(text)),
            ..
        } => Some(text.trim().to_string()),
        _ => None,
    }
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    #[instrument(skip_all, fields(model = %self.settings.chat_model, json = request.json))]
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<String, AiError> {
        let system = request
            .system
            .clone()
            .unwrap_or_else(|| self.settings.system_prompt.clone());

        let parameters = ChatCompletionParameters {
            model: self.settings.chat_model.clone(),
            temperature: Some(self.settings.temperature),
            response_format: request
                .json
                .then_some(ChatCompletionResponseFormat::JsonObject),
            messages: vec![
                ChatMessage::System {
                    name: None,
                    content: ChatMessageContent::Text(system),
                },
                ChatMessage::User {
                    name: None,
                    content: ChatMessageContent::Text(request.prompt.clone()),
                },
            ],
            ..Default::default()
        };

        let response = self
            .chat_client
            .chat()
            .create(parameters)
            .await
            .map_err(|e| {
                tracing::error!("Failed to complete chat: {:?}", e);
                AiError::Chat(format!("{e:?}"))
            })?;

        let choice = response
            .choices
            .first()
            .ok_or(AiError::EmptyResponse("no choices returned"))?;

        if let Some(reason) = &choice.finish_reason {
            tracing::debug!("Finish reason: {:?}", reason);
        }

        completion_text(&choice.message)
            .filter(|text| !text.is_empty())
            .ok_or(AiError::EmptyResponse("assistant message has no text"))
    }

    #[instrument(skip_all, fields(model = %self.settings.tts_model, voice = %request.voice))]
    async fn synthesize_speech(
        &self,
        request: &SpeechRequest,
    ) -> Result<Vec<u8>, AiError> {
        let length = request.text.chars().count();
        if length > MAX_SPEECH_INPUT_CHARS {
            return Err(AiError::SpeechInputTooLong(length));
        }

        let response = self
            .http_client
            .post(Self::endpoint("audio/speech"))
            .json(&SpeechBody {
                model: &self.settings.tts_model,
                input: &request.text,
                voice: request.voice.as_str(),
                response_format: "wav",
            })
            .send()
            .await?;

        let bytes = Self::ensure_success(response).await?.bytes().await?;
        if bytes.is_empty() {
            return Err(AiError::EmptyResponse("speech audio is empty"));
        }

        tracing::info!("Synthesized {} bytes of speech", bytes.len());
        Ok(bytes.to_vec())
    }

    #[instrument(skip_all, fields(model = %self.settings.transcription_model, file = %audio.file_name))]
    async fn transcribe(&self, audio: &AudioInput) -> Result<Transcript, AiError> {
        if audio.bytes.len() > MAX_TRANSCRIPTION_BYTES {
            return Err(AiError::AudioTooLarge(audio.bytes.len()));
        }

        let part = reqwest::multipart::Part::bytes(audio.bytes.clone())
            .file_name(audio.file_name.clone())
            .mime_str(audio_mime_type(&audio.file_name))?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.settings.transcription_model.clone())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment");

        let response = self
            .http_client
            .post(Self::endpoint("audio/transcriptions"))
            .multipart(form)
            .send()
            .await?;

        let body = Self::ensure_success(response).await?.text().await?;
        let transcript = responses::parse_transcription(&body)?;

        tracing::info!(
            "Transcribed {} segments",
            transcript.segments.len()
        );
        Ok(transcript)
    }

    #[instrument(skip_all, fields(model = %self.settings.image_model))]
    async fn generate_image(
        &self,
        request: &ImageRequest,
    ) -> Result<Vec<u8>, AiError> {
        let model = self.settings.image_model.as_str();
        let size = request
            .size
            .as_deref()
            .unwrap_or(&self.settings.image_size);

        let response = self
            .http_client
            .post(Self::endpoint("images/generations"))
            .json(&ImageBody {
                model,
                prompt: &request.prompt,
                n: 1,
                size,
                response_format: model
                    .starts_with("dall-e")
                    .then_some("b64_json"),
            })
            .send()
            .await?;

        let body = Self::ensure_success(response).await?.text().await?;
        responses::parse_image(&body)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
