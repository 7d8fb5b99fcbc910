use axum::http::StatusCode;
use thiserror::Error;
use tldr_pipeline::PipelineError;

#[derive(Error, Debug)]
pub enum StudioError {
    #[error("Another step is still running, wait for it to finish")]
    Busy,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("The upload is over the {0} byte limit")]
    UploadTooLarge(usize),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl StudioError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Busy => StatusCode::CONFLICT,
            Self::InvalidInput(_)
            | Self::Pipeline(PipelineError::InvalidInput(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::UploadTooLarge(_)
            | Self::Pipeline(PipelineError::AudioTooLarge { .. }) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            Self::Pipeline(PipelineError::MissingArtifact(_)) => {
                StatusCode::PRECONDITION_FAILED
            }
            Self::Pipeline(
                PipelineError::Ai(_)
                | PipelineError::Ffmpeg(_)
                | PipelineError::ModelOutput(_),
            ) => StatusCode::BAD_GATEWAY,
            Self::Pipeline(PipelineError::Io(_) | PipelineError::Json(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
