use std::path::Path;

use tokio::process::Command;

/// Bitrate of the compressed copy sent for transcription. At 64 kbit/s an
/// hour of speech stays under the 25 MB upload limit.
pub const SPEECH_BITRATE: &str = "64k";

/// Builds a command re-encoding any audio file as a mono MP3 small enough
/// to upload for transcription.
pub fn build_speech_mp3_command(
    ffmpeg_path: &str,
    input_file: &Path,
    output_file: &Path,
) -> Command {
    let mut cmd = Command::new(ffmpeg_path);
    cmd.arg("-hide_banner")
        .arg("-y")
        .arg("-i")
        .arg(input_file)
        .arg("-vn")
        .arg("-ac")
        .arg("1")
        .arg("-ar")
        .arg("16000")
        .arg("-acodec")
        .arg("libmp3lame")
        .arg("-b:a")
        .arg(SPEECH_BITRATE)
        .arg("-f")
        .arg("mp3")
        .arg(output_file);
    cmd
}
