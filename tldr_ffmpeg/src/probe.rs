use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::{run::program_name, FfmpegError};

pub fn build_probe_command(ffprobe_path: &str, path: &Path) -> Command {
    let mut cmd = Command::new(ffprobe_path);
    cmd.arg("-v")
        .arg("error")
        .arg("-show_entries")
        .arg("format=duration")
        .arg("-of")
        .arg("default=noprint_wrappers=1:nokey=1")
        .arg(path);
    cmd
}

/// Reads the container duration of an audio or video file.
///
/// # Errors
/// If ffprobe cannot be run, fails, or prints something that is not a
/// non-negative number of seconds.
pub async fn get_media_duration(
    ffprobe_path: &str,
    path: &Path,
) -> Result<Duration, FfmpegError> {
    let mut command = build_probe_command(ffprobe_path, path);
    let program = program_name(&command);

    let output = command
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|source| FfmpegError::Spawn {
            program: program.clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(FfmpegError::Failed {
            program,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    parse_duration(&String::from_utf8_lossy(&output.stdout))
}

fn parse_duration(output: &str) -> Result<Duration, FfmpegError> {
    let seconds = output
        .trim()
        .parse::<f64>()
        .map_err(|e| FfmpegError::ProbeOutput(format!("{output:?}: {e}")))?;

    Duration::try_from_secs_f64(seconds)
        .map_err(|e| FfmpegError::ProbeOutput(format!("{seconds}: {e}")))
}
