//! The TL;DR Studios production pipeline.
//!
//! Every stage reads its inputs from the [`ArtifactStore`] and writes its
//! output back, so a run can be resumed or re-entered at any stage.

mod error;
mod ideation;
mod narration;
pub mod prompts;
mod publishing;
mod snapshot;
pub mod speech;
pub mod store;
pub mod storyboard;
mod visuals;

pub use error::PipelineError;
pub use snapshot::RunSnapshot;
pub use store::ArtifactStore;

use std::sync::Arc;
use tldr_ffmpeg::slideshow::RenderSettings;
use tldr_openai::AiProvider;
use types::{RunStatus, SpeechVoice};

/// Upper bound for the scene count a caller may ask for.
pub const MAX_SCENES: usize = 40;

pub const DEFAULT_MAX_SCENES: usize = 12;

/// Ideas requested per ideation call.
pub const IDEA_COUNT: usize = 5;

/// Longest script a caller may ask for, in minutes.
pub const MAX_SCRIPT_MINUTES: f32 = 30.0;

/// Voiceovers smaller than this hold no usable speech.
pub const MIN_AUDIO_SIZE_BYTES: usize = 1024;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub default_voice: SpeechVoice,

    /// Appended to every image prompt so scenes share one look.
    pub image_style: String,

    /// `WIDTHxHEIGHT` passed to the image model.
    pub image_size: Option<String>,

    pub ffprobe_path: String,

    pub render: RenderSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            default_voice: SpeechVoice::default(),
            image_style: String::new(),
            image_size: None,
            ffprobe_path: "ffprobe".to_string(),
            render: RenderSettings::default(),
        }
    }
}

pub struct Pipeline {
    provider: Arc<dyn AiProvider>,
    store: ArtifactStore,
    settings: PipelineSettings,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("provider", &self.provider.provider_name())
            .field("store", &self.store)
            .field("settings", &self.settings)
            .finish()
    }
}

impl Pipeline {
    pub fn new(
        provider: Arc<dyn AiProvider>,
        store: ArtifactStore,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            provider,
            store,
            settings,
        }
    }

    #[must_use]
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    #[must_use]
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Which artifacts of the current run exist.
    pub async fn status(&self) -> RunStatus {
        self.store.status().await
    }

    /// Deletes every artifact and starts a fresh run.
    ///
    /// # Errors
    /// If the workspace cannot be cleared.
    pub async fn reset(&self) -> Result<(), PipelineError> {
        tracing::info!("resetting workspace {}", self.store.root().display());
        Ok(self.store.reset().await?)
    }
}
