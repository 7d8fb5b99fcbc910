use std::process::Stdio;

use tokio::process::Command;

use crate::FfmpegError;

/// How much of stderr to keep in an error; ffmpeg prints the actual
/// failure reason last.
const STDERR_TAIL_BYTES: usize = 2000;

/// Runs a prepared ffmpeg/ffprobe command to completion.
///
/// # Errors
/// If the process cannot be spawned or exits unsuccessfully. The error
/// carries the tail of stderr.
pub async fn run_command(mut command: Command) -> Result<(), FfmpegError> {
    let program = program_name(&command);

    tracing::debug!(
        "running {} {}",
        program,
        command
            .as_std()
            .get_args()
            .map(|arg| arg.to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join(" ")
    );

    let output = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| FfmpegError::Spawn {
            program: program.clone(),
            source,
        })?;

    if !output.status.success() {
        let stderr = stderr_tail(&output.stderr);
        tracing::error!(
            "{} failed with status: {}",
            program,
            output.status.code().unwrap_or(-1)
        );
        return Err(FfmpegError::Failed {
            program,
            status: output.status,
            stderr,
        });
    }

    Ok(())
}

pub(crate) fn program_name(command: &Command) -> String {
    command.as_std().get_program().to_string_lossy().to_string()
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.len() <= STDERR_TAIL_BYTES {
        return text.to_string();
    }

    let mut start = text.len() - STDERR_TAIL_BYTES;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}
