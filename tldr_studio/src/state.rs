use std::sync::Arc;

use tldr_app::{ConfigError, ContextProvider, StudioConfig};
use tldr_ffmpeg::slideshow::RenderSettings;
use tldr_openai::{OpenAiProvider, OpenAiSettings};
use tldr_pipeline::{ArtifactStore, Pipeline, PipelineSettings};
use tokio::sync::{Mutex, OwnedMutexGuard};
use types::SpeechVoice;

use crate::error::StudioError;

#[derive(Debug, Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,

    // held for the whole of a stage so two stages never write at once
    stage_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            stage_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Claims the stage slot, or fails right away if a stage is running.
    ///
    /// # Errors
    /// `Busy` while another request holds the slot.
    pub fn begin_stage(&self) -> Result<OwnedMutexGuard<()>, StudioError> {
        self.stage_lock
            .clone()
            .try_lock_owned()
            .map_err(|_| StudioError::Busy)
    }
}

/// Everything `main` needs: the router state and where to listen.
#[derive(Debug, Clone)]
pub struct StudioContext {
    pub state: AppState,
    pub listen_addr: String,
}

impl ContextProvider for StudioContext {
    async fn new(config: StudioConfig) -> Result<Self, ConfigError> {
        let api_key = config.api_key().ok_or_else(|| {
            ConfigError::MissingApiKey(tldr_app::DEFAULT_SECRETS_FILE.to_string())
        })?;

        let default_voice: SpeechVoice =
            config.default_voice.parse().map_err(ConfigError::Invalid)?;

        let provider = OpenAiProvider::new(
            api_key,
            OpenAiSettings {
                chat_model: config.chat_model.clone(),
                system_prompt: config.system_prompt.clone(),
                temperature: config.temperature,
                tts_model: config.tts_model.clone(),
                transcription_model: config.transcription_model.clone(),
                image_model: config.image_model.clone(),
                image_size: config.image_size.clone(),
            },
        )
        .map_err(|e| ConfigError::Context(Box::new(e)))?;

        let store = ArtifactStore::new(&config.workspace_dir);
        store
            .ensure()
            .await
            .map_err(|e| ConfigError::Context(Box::new(e)))?;

        let settings = PipelineSettings {
            default_voice,
            image_style: config.image_style.clone(),
            image_size: Some(config.image_size.clone()),
            ffprobe_path: config.ffprobe_path.clone(),
            render: RenderSettings {
                ffmpeg_path: config.ffmpeg_path.clone(),
                frame_rate: config.frame_rate,
                resolution: (config.video_width, config.video_height),
                transition: config.transition_seconds,
            },
        };

        Ok(Self {
            state: AppState::new(Pipeline::new(
                Arc::new(provider),
                store,
                settings,
            )),
            listen_addr: config.listen_addr,
        })
    }
}
