use thiserror::Error;
use tldr_ffmpeg::FfmpegError;
use tldr_openai::AiError;
use types::Artifact;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No {0} yet, run the previous step first")]
    MissingArtifact(Artifact),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Audio is {size} bytes, the limit is {limit}")]
    AudioTooLarge { size: usize, limit: usize },
    #[error("AI provider request failed: {0}")]
    Ai(#[from] AiError),
    #[error("Video tooling failed: {0}")]
    Ffmpeg(#[from] FfmpegError),
    #[error("The model returned unusable output: {0}")]
    ModelOutput(String),
    #[error("Failed to read or write the workspace: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode or decode an artifact: {0}")]
    Json(#[from] serde_json::Error),
}
