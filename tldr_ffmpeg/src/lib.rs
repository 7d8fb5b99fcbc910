pub mod audio_concat;
pub mod probe;
pub mod run;
pub mod slideshow;
pub mod transcode;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FfmpegError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} exited with status {status}: {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("Failed to parse ffprobe output: {0}")]
    ProbeOutput(String),
    #[error("Nothing to render: {0}")]
    EmptyInput(&'static str),
}
