use std::path::Path;

use tldr_ffmpeg::{
    audio_concat::build_concat_command, probe, run::run_command,
    transcode::build_speech_mp3_command,
};
use tldr_openai::{
    AudioInput, MAX_SPEECH_INPUT_CHARS, MAX_TRANSCRIPTION_BYTES, SpeechRequest,
};
use types::{Artifact, SpeechVoice, Transcript};

use crate::{
    MIN_AUDIO_SIZE_BYTES, Pipeline, PipelineError, speech::split_for_speech,
};

impl Pipeline {
    /// Reads the script aloud with `voice` (the configured default when
    /// `None`) and stores the result as `voiceover.wav`.
    ///
    /// Scripts over the speech input limit are synthesized piecewise and
    /// joined with ffmpeg.
    ///
    /// # Errors
    /// `MissingArtifact` without a script, `InvalidInput` for a blank one,
    /// plus provider, ffmpeg and storage failures.
    #[tracing::instrument(skip(self))]
    pub async fn synthesize_voiceover(
        &self,
        voice: Option<SpeechVoice>,
    ) -> Result<(), PipelineError> {
        let script = self.store.read_text(Artifact::Script).await?;
        let voice = voice.unwrap_or(self.settings.default_voice);

        let chunks = split_for_speech(&script, MAX_SPEECH_INPUT_CHARS);
        if chunks.is_empty() {
            return Err(PipelineError::InvalidInput(
                "the script is empty, nothing to read aloud".to_string(),
            ));
        }
        tracing::info!(
            "synthesizing {} chunk(s) with voice {}",
            chunks.len(),
            voice
        );

        let mut parts = Vec::with_capacity(chunks.len());
        for text in chunks {
            let request = SpeechRequest { text, voice };
            parts.push(self.provider.synthesize_speech(&request).await?);
        }

        let audio = if parts.len() == 1 {
            parts.remove(0)
        } else {
            self.join_audio(&parts).await?
        };

        self.store.write_voiceover("wav", &audio).await?;
        Ok(())
    }

    // Concatenates WAV parts in a scratch directory and returns the result.
    async fn join_audio(&self, parts: &[Vec<u8>]) -> Result<Vec<u8>, PipelineError> {
        let scratch = tempfile::tempdir()?;

        let mut inputs = Vec::with_capacity(parts.len());
        for (i, bytes) in parts.iter().enumerate() {
            let path = scratch.path().join(format!("part_{i:03}.wav"));
            tokio::fs::write(&path, bytes).await?;
            inputs.push(path);
        }

        let output = scratch.path().join("joined.wav");
        let command = build_concat_command(
            &self.settings.render.ffmpeg_path,
            &inputs,
            &output,
        )?;
        run_command(command).await?;

        Ok(tokio::fs::read(&output).await?)
    }

    /// Replaces the voiceover with a user-supplied recording.
    ///
    /// Recordings are sent for transcription as uploaded, so anything over
    /// the transcription limit is refused here.
    ///
    /// # Errors
    /// `InvalidInput` for an empty upload or an unsupported file type,
    /// `AudioTooLarge` above the transcription limit.
    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn save_uploaded_audio(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<(), PipelineError> {
        if bytes.is_empty() {
            return Err(PipelineError::InvalidInput(
                "the uploaded audio file is empty".to_string(),
            ));
        }
        if bytes.len() > MAX_TRANSCRIPTION_BYTES {
            return Err(PipelineError::AudioTooLarge {
                size: bytes.len(),
                limit: MAX_TRANSCRIPTION_BYTES,
            });
        }

        let extension = Path::new(file_name)
            .extension()
            .and_then(|extension| extension.to_str())
            .ok_or_else(|| {
                PipelineError::InvalidInput(format!(
                    "cannot tell the audio type of {file_name:?}"
                ))
            })?;

        self.store.write_voiceover(extension, bytes).await?;
        tracing::info!("stored uploaded voiceover");
        Ok(())
    }

    /// Transcribes the voiceover into timed segments.
    ///
    /// A voiceover under [`MIN_AUDIO_SIZE_BYTES`] holds no speech and is
    /// stored as an empty transcript instead of being sent. One over the
    /// transcription limit (a long synthesized WAV) is sent as a compressed
    /// MP3 copy.
    ///
    /// # Errors
    /// `MissingArtifact` without a voiceover, `AudioTooLarge` when even the
    /// compressed copy is over the limit, plus provider, ffmpeg and storage
    /// failures.
    #[tracing::instrument(skip(self))]
    pub async fn transcribe_voiceover(&self) -> Result<Transcript, PipelineError> {
        let path = self
            .store
            .voiceover_path()
            .await
            .ok_or(PipelineError::MissingArtifact(Artifact::Voiceover))?;
        let bytes = tokio::fs::read(&path).await?;

        let transcript = if bytes.len() < MIN_AUDIO_SIZE_BYTES {
            tracing::warn!(
                "voiceover is only {} bytes, storing an empty transcript",
                bytes.len()
            );
            Transcript::default()
        } else {
            let audio = if bytes.len() > MAX_TRANSCRIPTION_BYTES {
                self.compress_for_transcription(&path).await?
            } else {
                let file_name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_default();
                AudioInput { file_name, bytes }
            };
            if audio.bytes.len() > MAX_TRANSCRIPTION_BYTES {
                return Err(PipelineError::AudioTooLarge {
                    size: audio.bytes.len(),
                    limit: MAX_TRANSCRIPTION_BYTES,
                });
            }

            let mut transcript = self.provider.transcribe(&audio).await?;

            if transcript.duration.is_none() {
                transcript.duration = self.probe_duration(&path).await;
            }
            transcript
        };

        tracing::info!(
            "transcript has {} segments over {:.2}s",
            transcript.segments.len(),
            transcript.end_time()
        );
        self.store
            .write_json(Artifact::Transcript, &transcript)
            .await?;
        Ok(transcript)
    }

    // Writes a mono 16 kHz MP3 of the voiceover to a scratch directory.
    async fn compress_for_transcription(
        &self,
        path: &Path,
    ) -> Result<AudioInput, PipelineError> {
        let scratch = tempfile::tempdir()?;
        let output = scratch.path().join("voiceover.mp3");
        tracing::info!(
            "voiceover is over the transcription limit, compressing {}",
            path.display()
        );

        run_command(build_speech_mp3_command(
            &self.settings.render.ffmpeg_path,
            path,
            &output,
        ))
        .await?;

        Ok(AudioInput {
            file_name: "voiceover.mp3".to_string(),
            bytes: tokio::fs::read(&output).await?,
        })
    }

    /// Media duration in seconds, or `None` when ffprobe is unavailable or
    /// cannot read the file.
    pub(crate) async fn probe_duration(&self, path: &Path) -> Option<f64> {
        match probe::get_media_duration(&self.settings.ffprobe_path, path).await {
            Ok(duration) => Some(duration.as_secs_f64()),
            Err(e) => {
                tracing::warn!("could not probe {}: {}", path.display(), e);
                None
            }
        }
    }
}
