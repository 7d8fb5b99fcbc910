use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use redact::Secret;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Secrets file read when `STUDIO_SECRETS_FILE` is not set.
pub const DEFAULT_SECRETS_FILE: &str = "secrets.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Figment(#[from] Box<figment::Error>),
    #[error("OpenAI API key not found, add openai_api_key to {0} or set OPENAI_API_KEY")]
    MissingApiKey(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Failed to create application context: {0}")]
    Context(#[from] Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct StudioConfig {
    #[serde(default)]
    pub openai_api_key: Option<Secret<String>>,

    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: PathBuf,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_tts_model")]
    pub tts_model: String,

    #[serde(default = "default_voice")]
    pub default_voice: String,

    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,

    #[serde(default = "default_image_model")]
    pub image_model: String,

    #[serde(default = "default_image_size")]
    pub image_size: String,

    #[serde(default = "default_image_style")]
    pub image_style: String,

    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    #[serde(default = "default_video_width")]
    pub video_width: u32,

    #[serde(default = "default_video_height")]
    pub video_height: u32,

    #[serde(default = "default_transition_seconds")]
    pub transition_seconds: f64,

    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,

    #[serde(default)]
    pub log_json: bool,
}

fn default_workspace_dir() -> PathBuf {
    PathBuf::from("studio_output")
}

fn default_listen_addr() -> String {
    "127.0.0.1:3030".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_system_prompt() -> String {
    "You are a helpful assistant".to_string()
}

const fn default_temperature() -> f32 {
    0.7
}

fn default_tts_model() -> String {
    "tts-1".to_string()
}

fn default_voice() -> String {
    "alloy".to_string()
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

fn default_image_model() -> String {
    "dall-e-3".to_string()
}

fn default_image_size() -> String {
    "1792x1024".to_string()
}

fn default_image_style() -> String {
    "cinematic digital illustration, vivid colors, no text".to_string()
}

const fn default_frame_rate() -> u32 {
    30
}

const fn default_video_width() -> u32 {
    1920
}

const fn default_video_height() -> u32 {
    1080
}

const fn default_transition_seconds() -> f64 {
    0.5
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

impl StudioConfig {
    /// The API key, if one was configured and is not blank.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.openai_api_key
            .as_ref()
            .map(|key| key.expose_secret().trim())
            .filter(|key| !key.is_empty())
    }

    fn validate(&self, secrets_file: &str) -> Result<(), ConfigError> {
        if self.api_key().is_none() {
            return Err(ConfigError::MissingApiKey(secrets_file.to_string()));
        }

        if self.frame_rate == 0 {
            return Err(ConfigError::Invalid(
                "frame_rate must be greater than zero".to_string(),
            ));
        }

        // libx264 with yuv420p needs even dimensions
        if self.video_width == 0
            || self.video_height == 0
            || self.video_width % 2 != 0
            || self.video_height % 2 != 0
        {
            return Err(ConfigError::Invalid(format!(
                "video size must be even and non-zero, got {}x{}",
                self.video_width, self.video_height
            )));
        }

        if !self.transition_seconds.is_finite() || self.transition_seconds < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "transition_seconds must not be negative, got {}",
                self.transition_seconds
            )));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Invalid(format!(
                "temperature must be between 0 and 2, got {}",
                self.temperature
            )));
        }

        Ok(())
    }
}

/// Load the studio configuration.
///
/// Values come from the TOML secrets file (`secrets.toml`, or the path in
/// `STUDIO_SECRETS_FILE`) and are then overridden by raw environment
/// variables, so `OPENAI_API_KEY` maps to `openai_api_key`.
///
/// # Errors
/// If the configuration cannot be extracted, if no API key is configured,
/// or if a value is out of range.
pub fn load_config() -> Result<StudioConfig, ConfigError> {
    let secrets_file = std::env::var("STUDIO_SECRETS_FILE")
        .unwrap_or_else(|_| DEFAULT_SECRETS_FILE.to_string());

    let figment = Figment::new()
        .merge(Toml::file(&secrets_file))
        .merge(Env::raw());

    let config: StudioConfig = figment.extract().map_err(Box::new)?;

    config.validate(&secrets_file)?;

    Ok(config)
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` controls the level filter; `json` switches to one JSON object
/// per line.
pub fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            // this needs to be set to remove duplicated information in the log.
            .with_current_span(false)
            .with_ansi(false)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

pub trait ContextProvider: Sized {
    fn new(
        config: StudioConfig,
    ) -> impl Future<Output = Result<Self, ConfigError>>;
}

/// Initialize the application context from configuration.
///
/// Loads the configuration, installs tracing as the configuration asks,
/// and hands the configuration to the context constructor.
///
/// # Errors
/// If the configuration cannot be loaded or the context cannot be built.
pub async fn create_app_context<A>() -> Result<A, ConfigError>
where
    A: ContextProvider,
{
    let config = load_config()?;

    init_tracing(config.log_json);

    tracing::info!(
        workspace_dir = %config.workspace_dir.display(),
        chat_model = %config.chat_model,
        "configuration loaded"
    );

    A::new(config).await
}
