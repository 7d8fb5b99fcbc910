use std::path::Path;

use tokio::process::Command;

use crate::FfmpegError;

/// Builds a command joining audio files end to end into one 16-bit WAV.
///
/// Used when a voiceover had to be synthesized in several pieces.
///
/// # Errors
/// If `inputs` is empty.
pub fn build_concat_command<P: AsRef<Path>>(
    ffmpeg_path: &str,
    inputs: &[P],
    output_file: &Path,
) -> Result<Command, FfmpegError> {
    if inputs.is_empty() {
        return Err(FfmpegError::EmptyInput("no audio chunks to join"));
    }

    let mut cmd = Command::new(ffmpeg_path);
    cmd.arg("-hide_banner").arg("-y");

    for input in inputs {
        cmd.arg("-i").arg(input.as_ref());
    }

    let streams = (0..inputs.len())
        .map(|i| format!("[{i}:a]"))
        .collect::<String>();

    cmd.arg("-filter_complex").arg(format!(
        "{streams}concat=n={count}:v=0:a=1[amain]",
        count = inputs.len()
    ));

    cmd.arg("-map")
        .arg("[amain]")
        .arg("-acodec")
        .arg("pcm_s16le")
        .arg("-f")
        .arg("wav")
        .arg(output_file);

    Ok(cmd)
}
