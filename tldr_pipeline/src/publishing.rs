// Metadata, thumbnail and the final render.

use std::path::PathBuf;

use serde::Deserialize;
use tldr_ffmpeg::{
    run::run_command,
    slideshow::{Slide, build_ffmpeg_command},
};
use tldr_openai::{CompletionRequest, ImageRequest};
use types::{Artifact, Storyboard, VideoMetadata};

use crate::{
    Pipeline, PipelineError,
    prompts::{self, extract_json},
    store::RENDER_PREFIX,
};

// Lenient form of `VideoMetadata`; missing fields are filled in or
// rejected after parsing.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MetadataReply {
    title: String,
    description: String,
    tags: Vec<String>,
    thumbnail_prompt: String,
}

impl Pipeline {
    /// Writes the title, description, tags and thumbnail prompt for the
    /// current script.
    ///
    /// # Errors
    /// `MissingArtifact` without a script, `ModelOutput` if the reply has no
    /// title.
    #[tracing::instrument(skip(self))]
    pub async fn generate_metadata(&self) -> Result<VideoMetadata, PipelineError> {
        let script = self.store.read_text(Artifact::Script).await?;

        let request = CompletionRequest::json(
            prompts::JSON_SYSTEM,
            prompts::metadata_prompt(&script),
        );
        let reply = self.provider.complete(&request).await?;
        let metadata = parse_metadata(&reply)?;

        tracing::info!("metadata title: {}", metadata.title);
        self.store.write_json(Artifact::Metadata, &metadata).await?;
        Ok(metadata)
    }

    /// Renders the thumbnail from the metadata's thumbnail prompt.
    ///
    /// # Errors
    /// `MissingArtifact` without metadata, plus provider and storage
    /// failures.
    #[tracing::instrument(skip(self))]
    pub async fn generate_thumbnail(&self) -> Result<PathBuf, PipelineError> {
        let metadata: VideoMetadata =
            self.store.read_json(Artifact::Metadata).await?;

        let request = ImageRequest {
            prompt: prompts::image_prompt(
                &metadata.thumbnail_prompt,
                &self.settings.image_style,
            ),
            size: self.settings.image_size.clone(),
        };
        let png = self.provider.generate_image(&request).await?;

        Ok(self
            .store
            .write_bytes(Artifact::Thumbnail.file_name(), &png)
            .await?)
    }

    /// Renders the storyboard images over the voiceover into `video.mp4`.
    ///
    /// Each scene's image stays on screen for the scene's duration. When
    /// the voiceover runs past the storyboard, the last image is held until
    /// the audio ends.
    ///
    /// # Errors
    /// `MissingArtifact` when the storyboard, voiceover or any scene image
    /// is missing, plus ffmpeg failures.
    #[tracing::instrument(skip(self))]
    pub async fn assemble_video(&self) -> Result<PathBuf, PipelineError> {
        let storyboard: Storyboard =
            self.store.read_json(Artifact::Storyboard).await?;
        let audio = self
            .store
            .voiceover_path()
            .await
            .ok_or(PipelineError::MissingArtifact(Artifact::Voiceover))?;

        let mut slides = Vec::with_capacity(storyboard.scenes.len());
        for scene in &storyboard.scenes {
            let image = scene
                .image_file
                .as_deref()
                .map(|file| self.store.resolve(file))
                .ok_or(PipelineError::MissingArtifact(Artifact::Images))?;
            if !tokio::fs::try_exists(&image).await.unwrap_or(false) {
                return Err(PipelineError::MissingArtifact(Artifact::Images));
            }
            slides.push(Slide {
                image,
                duration: scene.duration(),
            });
        }
        if slides.is_empty() {
            return Err(PipelineError::MissingArtifact(Artifact::Images));
        }

        if let Some(audio_duration) = self.probe_duration(&audio).await {
            extend_last_slide(&mut slides, audio_duration);
        }

        self.store.ensure().await?;
        let scratch = tempfile::Builder::new()
            .prefix(RENDER_PREFIX)
            .tempdir_in(self.store.root())?;
        let output = scratch.path().join(Artifact::Video.file_name());

        let command = build_ffmpeg_command(
            &slides,
            &audio,
            &output,
            &self.settings.render,
        )?;
        tracing::info!("rendering {} slides", slides.len());
        run_command(command).await?;

        let video = self
            .store
            .persist_file(&output, Artifact::Video.file_name())
            .await?;
        tracing::info!("video written to {}", video.display());
        Ok(video)
    }
}

fn parse_metadata(reply: &str) -> Result<VideoMetadata, PipelineError> {
    let reply: MetadataReply = serde_json::from_str(extract_json(reply))
        .map_err(|e| {
            PipelineError::ModelOutput(format!("metadata is not valid JSON: {e}"))
        })?;

    let title = reply.title.trim().to_string();
    if title.is_empty() {
        return Err(PipelineError::ModelOutput(
            "the metadata has no title".to_string(),
        ));
    }

    let mut tags: Vec<String> = Vec::with_capacity(reply.tags.len());
    for tag in &reply.tags {
        let tag = tag.trim().trim_start_matches('#').trim().to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    let thumbnail_prompt = match reply.thumbnail_prompt.trim() {
        "" => title.clone(),
        prompt => prompt.to_string(),
    };

    Ok(VideoMetadata {
        title,
        description: reply.description.trim().to_string(),
        tags,
        thumbnail_prompt,
    })
}

fn extend_last_slide(slides: &mut [Slide], audio_duration: f64) {
    let covered: f64 = slides.iter().map(|slide| slide.duration).sum();
    if audio_duration <= covered {
        return;
    }
    if let Some(last) = slides.last_mut() {
        last.duration += audio_duration - covered;
    }
}
