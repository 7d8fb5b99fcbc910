use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::FfmpegError;

/// Shortest time a slide is allowed to stay on screen.
pub const MIN_SLIDE_SECONDS: f64 = 0.1;

/// One still image and how long it stays on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    pub image: PathBuf,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub ffmpeg_path: String,
    pub frame_rate: u32,
    pub resolution: (u32, u32),
    /// Crossfade length between slides in seconds; zero means hard cuts.
    pub transition: f64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            frame_rate: 30,
            resolution: (1920, 1080),
            transition: 0.0,
        }
    }
}

// ffmpeg happily accepts "2.5" but the default f64 formatting can produce
// "0.30000000000000004", which is noisy in logs and tests.
fn format_seconds(seconds: f64) -> String {
    let formatted = format!("{seconds:.3}");
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

fn slide_duration(slide: &Slide) -> f64 {
    slide.duration.max(MIN_SLIDE_SECONDS)
}

/// A crossfade can never be longer than the shorter of the two slides it
/// joins, otherwise xfade eats the whole slide.
fn effective_transition(slides: &[Slide], settings: &RenderSettings) -> f64 {
    if slides.len() < 2 || settings.transition <= 0.0 {
        return 0.0;
    }

    let shortest = slides
        .iter()
        .map(slide_duration)
        .fold(f64::INFINITY, f64::min);

    settings.transition.min(shortest / 2.0)
}

fn create_complex_filter(filter_steps: &[String]) -> String {
    filter_steps.join(";")
}

fn scale_slide(index: usize, settings: &RenderSettings) -> String {
    let (width, height) = settings.resolution;
    format!(
        "[{index}:v]scale=w={width}:h={height}:force_original_aspect_ratio=decrease,pad={width}:{height}:(ow-iw)/2:(oh-ih)/2:color=black,setsar=1,fps=fps={frame_rate},format=yuv420p[v{index}]",
        frame_rate = settings.frame_rate,
    )
}

fn concat_slides(count: usize) -> String {
    let streams = (0..count).map(|i| format!("[v{i}]")).collect::<String>();
    format!("{streams}concat=n={count}:v=1:a=0[vmain]")
}

fn crossfade_slides(slides: &[Slide], transition: f64) -> Vec<String> {
    let mut parts = Vec::new();
    let mut offset = 0.0;
    let mut previous = "v0".to_string();

    for i in 1..slides.len() {
        offset += slide_duration(&slides[i - 1]);
        let output = if i == slides.len() - 1 {
            "vmain".to_string()
        } else {
            format!("x{i}")
        };
        parts.push(format!(
            "[{previous}][v{i}]xfade=transition=fade:duration={duration}:offset={offset}[{output}]",
            duration = format_seconds(transition),
            offset = format_seconds(offset),
        ));
        previous = output;
    }

    parts
}

fn slides_to_filter_complex(
    slides: &[Slide],
    settings: &RenderSettings,
) -> String {
    let mut filter_steps = Vec::new();
    // 1) normalize every still to the output frame
    for i in 0..slides.len() {
        filter_steps.push(scale_slide(i, settings));
    }
    // 2) join them into the main track
    let transition = effective_transition(slides, settings);
    if transition > 0.0 {
        filter_steps.extend(crossfade_slides(slides, transition));
    } else {
        filter_steps.push(concat_slides(slides.len()));
    }
    create_complex_filter(&filter_steps)
}

/// Builds the ffmpeg command that turns scene images plus the voiceover
/// into the final MP4.
///
/// Every image is looped for its slide duration. With a crossfade, all but
/// the last slide are extended by the crossfade length so the overlaps do
/// not shorten the video relative to the audio.
///
/// # Errors
/// If there are no slides.
pub fn build_ffmpeg_command(
    slides: &[Slide],
    audio_file: &Path,
    output_file: &Path,
    settings: &RenderSettings,
) -> Result<Command, FfmpegError> {
    if slides.is_empty() {
        return Err(FfmpegError::EmptyInput("no slides to render"));
    }

    let transition = effective_transition(slides, settings);
    let mut cmd = Command::new(&settings.ffmpeg_path);
    cmd.arg("-hide_banner").arg("-y");

    for (i, slide) in slides.iter().enumerate() {
        let mut input_length = slide_duration(slide);
        if i < slides.len() - 1 {
            input_length += transition;
        }
        cmd.arg("-loop")
            .arg("1")
            .arg("-framerate")
            .arg(settings.frame_rate.to_string())
            .arg("-t")
            .arg(format_seconds(input_length))
            .arg("-i")
            .arg(&slide.image);
    }

    cmd.arg("-i").arg(audio_file);

    cmd.arg("-filter_complex")
        .arg(slides_to_filter_complex(slides, settings));

    cmd.arg("-map")
        .arg("[vmain]")
        .arg("-map")
        .arg(format!("{}:a:0", slides.len()));
    cmd.arg("-c:v")
        .arg("libx264")
        .arg("-preset")
        .arg("medium")
        .arg("-crf")
        .arg("20");
    cmd.arg("-pix_fmt").arg("yuv420p");
    cmd.arg("-c:a").arg("aac").arg("-b:a").arg("192k");
    cmd.arg("-shortest");
    cmd.arg("-movflags").arg("+faststart");
    cmd.arg("-f").arg("mp4");
    cmd.arg(output_file);

    Ok(cmd)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn args(cmd: &Command) -> String {
        cmd.as_std()
            .get_args()
            .map(|x| x.to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn slide(name: &str, duration: f64) -> Slide {
        Slide {
            image: PathBuf::from(name),
            duration,
        }
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(3.0), "3");
        assert_eq!(format_seconds(2.5), "2.5");
        assert_eq!(format_seconds(0.1 + 0.2), "0.3");
        assert_eq!(format_seconds(0.0), "0");
        assert_eq!(format_seconds(10.0), "10");
    }

    #[test]
    fn test_build_ffmpeg_command_hard_cuts() {
        let slides = vec![slide("images/scene_000.png", 2.5), slide("images/scene_001.png", 4.0)];
        let settings = RenderSettings {
            resolution: (1280, 720),
            ..RenderSettings::default()
        };

        let cmd = build_ffmpeg_command(
            &slides,
            Path::new("voiceover.wav"),
            Path::new("video.mp4"),
            &settings,
        )
        .unwrap();

        assert_eq!(
            args(&cmd),
            "-hide_banner -y -loop 1 -framerate 30 -t 2.5 -i images/scene_000.png -loop 1 -framerate 30 -t 4 -i images/scene_001.png -i voiceover.wav -filter_complex [0:v]scale=w=1280:h=720:force_original_aspect_ratio=decrease,pad=1280:720:(ow-iw)/2:(oh-ih)/2:color=black,setsar=1,fps=fps=30,format=yuv420p[v0];[1:v]scale=w=1280:h=720:force_original_aspect_ratio=decrease,pad=1280:720:(ow-iw)/2:(oh-ih)/2:color=black,setsar=1,fps=fps=30,format=yuv420p[v1];[v0][v1]concat=n=2:v=1:a=0[vmain] -map [vmain] -map 2:a:0 -c:v libx264 -preset medium -crf 20 -pix_fmt yuv420p -c:a aac -b:a 192k -shortest -movflags +faststart -f mp4 video.mp4"
        );
    }

    #[test]
    fn test_crossfade_offsets_follow_slide_durations() {
        let slides = vec![slide("a.png", 2.0), slide("b.png", 3.0), slide("c.png", 4.0)];

        assert_eq!(
            crossfade_slides(&slides, 0.5),
            vec![
                "[v0][v1]xfade=transition=fade:duration=0.5:offset=2[x1]"
                    .to_string(),
                "[x1][v2]xfade=transition=fade:duration=0.5:offset=5[vmain]"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn test_crossfade_extends_all_but_last_input() {
        let slides = vec![slide("a.png", 2.0), slide("b.png", 3.0)];
        let settings = RenderSettings {
            transition: 0.5,
            ..RenderSettings::default()
        };

        let cmd = build_ffmpeg_command(
            &slides,
            Path::new("voiceover.wav"),
            Path::new("video.mp4"),
            &settings,
        )
        .unwrap();
        let args = args(&cmd);

        assert!(args.contains("-t 2.5 -i a.png"));
        assert!(args.contains("-t 3 -i b.png"));
        assert!(args.contains("xfade=transition=fade:duration=0.5:offset=2[vmain]"));
        assert!(!args.contains("concat="));
    }

    #[test]
    fn test_transition_is_capped_by_shortest_slide() {
        let slides = vec![slide("a.png", 0.4), slide("b.png", 3.0)];
        let settings = RenderSettings {
            transition: 1.0,
            ..RenderSettings::default()
        };
        assert!((effective_transition(&slides, &settings) - 0.2).abs() < 1e-9);

        let single = vec![slide("a.png", 3.0)];
        assert!(effective_transition(&single, &settings).abs() < f64::EPSILON);
    }

    #[test]
    fn test_tiny_slides_get_minimum_duration() {
        let slides = vec![slide("a.png", 0.0)];
        let cmd = build_ffmpeg_command(
            &slides,
            Path::new("voiceover.wav"),
            Path::new("video.mp4"),
            &RenderSettings::default(),
        )
        .unwrap();
        assert!(args(&cmd).contains("-t 0.1 -i a.png"));
    }

    #[test]
    fn test_empty_slides_rejected() {
        assert!(matches!(
            build_ffmpeg_command(
                &[],
                Path::new("voiceover.wav"),
                Path::new("video.mp4"),
                &RenderSettings::default(),
            ),
            Err(FfmpegError::EmptyInput(_))
        ));
    }
}
