use tldr_openai::{CompletionRequest, ImageRequest};
use types::{Artifact, Storyboard, Transcript};

use crate::{
    MAX_SCENES, Pipeline, PipelineError, prompts, store::ArtifactStore,
    storyboard::parse_storyboard,
};

impl Pipeline {
    /// Splits the transcript into at most `max_scenes` illustrated scenes
    /// covering the whole voiceover.
    ///
    /// # Errors
    /// `InvalidInput` for a scene count outside `1..=MAX_SCENES` or a
    /// transcript with no speech, `ModelOutput` for an unusable reply.
    #[tracing::instrument(skip(self))]
    pub async fn plan_storyboard(
        &self,
        max_scenes: usize,
    ) -> Result<Storyboard, PipelineError> {
        if !(1..=MAX_SCENES).contains(&max_scenes) {
            return Err(PipelineError::InvalidInput(format!(
                "the scene count must be between 1 and {MAX_SCENES}"
            )));
        }

        let transcript: Transcript =
            self.store.read_json(Artifact::Transcript).await?;
        let end_time = transcript.end_time();
        if transcript.text.trim().is_empty() || end_time <= 0.0 {
            return Err(PipelineError::InvalidInput(
                "the transcript has no speech, record a longer voiceover"
                    .to_string(),
            ));
        }

        let request = CompletionRequest::json(
            prompts::JSON_SYSTEM,
            prompts::storyboard_prompt(&transcript, max_scenes),
        );
        let reply = self.provider.complete(&request).await?;
        let storyboard = parse_storyboard(&reply, end_time, max_scenes)?;

        tracing::info!(
            "planned {} scenes over {:.2}s",
            storyboard.scenes.len(),
            end_time
        );
        self.store
            .write_json(Artifact::Storyboard, &storyboard)
            .await?;
        Ok(storyboard)
    }

    /// Generates one image per scene, in scene order.
    ///
    /// The storyboard is rewritten after every image so a failure part way
    /// leaves the finished scenes recorded.
    ///
    /// # Errors
    /// `MissingArtifact` without a storyboard, plus provider and storage
    /// failures.
    #[tracing::instrument(skip(self))]
    pub async fn generate_images(&self) -> Result<Storyboard, PipelineError> {
        let mut storyboard: Storyboard =
            self.store.read_json(Artifact::Storyboard).await?;
        if storyboard.scenes.is_empty() {
            return Err(PipelineError::MissingArtifact(Artifact::Storyboard));
        }

        let total = storyboard.scenes.len();
        for i in 0..total {
            let scene = &storyboard.scenes[i];
            tracing::info!("generating image {}/{}", i + 1, total);

            let request = ImageRequest {
                prompt: prompts::image_prompt(
                    &scene.image_prompt,
                    &self.settings.image_style,
                ),
                size: self.settings.image_size.clone(),
            };
            let png = self.provider.generate_image(&request).await?;

            let file_name = ArtifactStore::image_file_name(scene.index);
            self.store.write_bytes(&file_name, &png).await?;

            storyboard.scenes[i].image_file = Some(file_name);
            self.store
                .write_json(Artifact::Storyboard, &storyboard)
                .await?;
        }

        Ok(storyboard)
    }
}
