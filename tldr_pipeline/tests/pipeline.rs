use std::sync::Arc;

use pretty_assertions::assert_eq;
use tldr_openai::MAX_TRANSCRIPTION_BYTES;
use tldr_openai::fake::{Call, FAKE_PNG, FakeProvider, silent_wav};
use tldr_pipeline::{
    ArtifactStore, MIN_AUDIO_SIZE_BYTES, Pipeline, PipelineError,
    PipelineSettings,
};
use tldr_ffmpeg::slideshow::RenderSettings;
use types::{
    Artifact, ScriptBrief, SpeechVoice, Storyboard, Transcript,
    TranscriptSegment,
};

const IDEAS_REPLY: &str = r#"{"ideas": ["1. Why the sea is salty", "2. How tides work"]}"#;

const SCRIPT_REPLY: &str = "Ever wondered why the sea moves? The moon pulls on it. \
     Twice a day the water rises and falls.";

const STORYBOARD_REPLY: &str = r#"```json
{"scenes": [
  {"start": 0.0, "end": 2.5, "narration": "Ever wondered why the sea moves?", "image_prompt": "Waves on a beach at dusk"},
  {"start": 2.5, "end": 4.0, "narration": "The moon pulls on it.", "image_prompt": "The moon over the ocean"}
]}
```"#;

const METADATA_REPLY: &str = r#"{"title": "How Tides Work", "description": "The moon and the sea.",
    "tags": ["tides", "moon"], "thumbnail_prompt": "A giant moon over a wave"}"#;

fn transcript() -> Transcript {
    Transcript {
        text: SCRIPT_REPLY.to_string(),
        language: Some("english".to_string()),
        duration: Some(5.0),
        segments: vec![
            TranscriptSegment {
                start: 0.0,
                end: 2.4,
                text: "Ever wondered why the sea moves?".to_string(),
            },
            TranscriptSegment {
                start: 2.4,
                end: 4.8,
                text: "The moon pulls on it.".to_string(),
            },
        ],
    }
}

fn brief() -> ScriptBrief {
    ScriptBrief {
        topic: "How tides work".to_string(),
        audience: Some("kids".to_string()),
        tone: None,
        minutes: 1.0,
    }
}

fn pipeline(
    fake: FakeProvider,
) -> (tempfile::TempDir, Arc<FakeProvider>, Pipeline) {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(fake);
    let settings = PipelineSettings {
        image_style: "watercolor".to_string(),
        image_size: Some("1024x1024".to_string()),
        ..PipelineSettings::default()
    };
    let pipeline = Pipeline::new(
        fake.clone(),
        ArtifactStore::new(dir.path().join("studio_output")),
        settings,
    );
    (dir, fake, pipeline)
}

#[tokio::test]
async fn test_every_stage_writes_its_artifact() {
    let (_dir, fake, pipeline) = pipeline(
        FakeProvider::new()
            .with_completions([IDEAS_REPLY, SCRIPT_REPLY, STORYBOARD_REPLY, METADATA_REPLY])
            .with_transcript(transcript()),
    );

    let ideas = pipeline.generate_ideas("oceans").await.unwrap();
    assert_eq!(ideas.ideas, vec!["Why the sea is salty", "How tides work"]);
    assert!(pipeline.status().await.has(Artifact::Ideas));

    let script = pipeline.generate_script(brief()).await.unwrap();
    assert_eq!(script, SCRIPT_REPLY);

    pipeline
        .synthesize_voiceover(Some(SpeechVoice::Nova))
        .await
        .unwrap();
    assert_eq!(
        tokio::fs::read(pipeline.store().path(Artifact::Voiceover))
            .await
            .unwrap(),
        silent_wav(16_000)
    );

    let transcript = pipeline.transcribe_voiceover().await.unwrap();
    assert_eq!(transcript.segments.len(), 2);

    let storyboard = pipeline.plan_storyboard(6).await.unwrap();
    assert_eq!(storyboard.scenes.len(), 2);
    assert!((storyboard.scenes[1].end - 5.0).abs() < 1e-9);

    let storyboard = pipeline.generate_images().await.unwrap();
    for scene in &storyboard.scenes {
        let file = scene.image_file.as_deref().unwrap();
        assert_eq!(
            tokio::fs::read(pipeline.store().resolve(file)).await.unwrap(),
            FAKE_PNG
        );
    }

    let metadata = pipeline.generate_metadata().await.unwrap();
    assert_eq!(metadata.title, "How Tides Work");

    pipeline.generate_thumbnail().await.unwrap();

    let status = pipeline.status().await;
    for artifact in Artifact::ALL {
        assert_eq!(
            status.has(artifact),
            artifact != Artifact::Video,
            "{artifact}"
        );
    }
    assert_eq!(status.next_missing(), Some(Artifact::Video));

    let calls = fake.calls();
    assert_eq!(calls.len(), 9);
    assert!(calls.contains(&Call::Transcribe {
        file_name: "voiceover.wav".to_string(),
        size: silent_wav(16_000).len(),
    }));
    let Call::Image(first_image) = &calls[5] else {
        panic!("expected an image call, got {:?}", calls[5]);
    };
    assert_eq!(
        first_image.prompt,
        "Waves on a beach at dusk. Style: watercolor."
    );
    assert_eq!(first_image.size.as_deref(), Some("1024x1024"));
}

#[tokio::test]
async fn test_snapshot_reflects_the_run() {
    let (_dir, _fake, pipeline) =
        pipeline(FakeProvider::new().with_completions([SCRIPT_REPLY]));

    let empty = pipeline.snapshot().await;
    assert_eq!(empty.script, None);
    assert_eq!(empty.brief, None);

    pipeline.generate_script(brief()).await.unwrap();

    let snapshot = pipeline.snapshot().await;
    assert_eq!(snapshot.script.as_deref(), Some(SCRIPT_REPLY));
    assert_eq!(snapshot.brief, Some(brief()));
    assert!(snapshot.status.has(Artifact::Script));
    assert_eq!(snapshot.storyboard, None);
}

#[tokio::test]
async fn test_stages_report_missing_inputs() {
    let (_dir, _fake, pipeline) = pipeline(FakeProvider::new());

    assert!(matches!(
        pipeline.synthesize_voiceover(None).await,
        Err(PipelineError::MissingArtifact(Artifact::Script))
    ));
    assert!(matches!(
        pipeline.transcribe_voiceover().await,
        Err(PipelineError::MissingArtifact(Artifact::Voiceover))
    ));
    assert!(matches!(
        pipeline.plan_storyboard(4).await,
        Err(PipelineError::MissingArtifact(Artifact::Transcript))
    ));
    assert!(matches!(
        pipeline.generate_images().await,
        Err(PipelineError::MissingArtifact(Artifact::Storyboard))
    ));
    assert!(matches!(
        pipeline.generate_thumbnail().await,
        Err(PipelineError::MissingArtifact(Artifact::Metadata))
    ));
    assert!(matches!(
        pipeline.assemble_video().await,
        Err(PipelineError::MissingArtifact(Artifact::Storyboard))
    ));
}

#[tokio::test]
async fn test_invalid_input_is_rejected_before_calling_the_provider() {
    let (_dir, fake, pipeline) = pipeline(FakeProvider::new());

    assert!(matches!(
        pipeline.generate_ideas("   ").await,
        Err(PipelineError::InvalidInput(_))
    ));
    assert!(matches!(
        pipeline
            .generate_script(ScriptBrief {
                topic: String::new(),
                ..brief()
            })
            .await,
        Err(PipelineError::InvalidInput(_))
    ));
    assert!(matches!(
        pipeline.save_script(" \n ").await,
        Err(PipelineError::InvalidInput(_))
    ));
    assert!(matches!(
        pipeline.plan_storyboard(0).await,
        Err(PipelineError::InvalidInput(_))
    ));
    assert!(matches!(
        pipeline.save_uploaded_audio("voice", b"abc").await,
        Err(PipelineError::InvalidInput(_))
    ));
    assert!(matches!(
        pipeline.save_uploaded_audio("voice.mp3", b"").await,
        Err(PipelineError::InvalidInput(_))
    ));

    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_edited_script_is_read_aloud() {
    let (_dir, fake, pipeline) = pipeline(FakeProvider::new());

    pipeline
        .save_script("Line one.\r\nLine two.\r\n")
        .await
        .unwrap();
    assert_eq!(
        pipeline.store().read_text(Artifact::Script).await.unwrap(),
        "Line one.\nLine two."
    );

    pipeline.synthesize_voiceover(None).await.unwrap();

    let calls = fake.calls();
    assert_eq!(calls.len(), 1);
    let Call::Speech(request) = &calls[0] else {
        panic!("expected a speech call, got {:?}", calls[0]);
    };
    assert_eq!(request.voice, SpeechVoice::Alloy);
    assert_eq!(request.text, "Line one. Line two.");
}

#[tokio::test]
async fn test_tiny_upload_gives_empty_transcript() {
    let (_dir, fake, pipeline) = pipeline(FakeProvider::new());

    let tiny = vec![0_u8; MIN_AUDIO_SIZE_BYTES - 1];
    pipeline
        .save_uploaded_audio("take 2.MP3", &tiny)
        .await
        .unwrap();
    assert_eq!(
        pipeline.store().voiceover_path().await,
        Some(pipeline.store().root().join("voiceover.mp3"))
    );

    let transcript = pipeline.transcribe_voiceover().await.unwrap();
    assert_eq!(transcript, Transcript::default());
    assert!(fake.calls().is_empty());

    // nothing to storyboard without speech
    assert!(matches!(
        pipeline.plan_storyboard(4).await,
        Err(PipelineError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_upload_over_transcription_limit_is_refused() {
    let (_dir, fake, pipeline) = pipeline(FakeProvider::new());

    let too_big = vec![0_u8; MAX_TRANSCRIPTION_BYTES + 1];
    assert!(matches!(
        pipeline.save_uploaded_audio("long take.wav", &too_big).await,
        Err(PipelineError::AudioTooLarge { size, limit })
            if size == MAX_TRANSCRIPTION_BYTES + 1 && limit == MAX_TRANSCRIPTION_BYTES
    ));
    assert_eq!(pipeline.store().voiceover_path().await, None);
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_oversized_voiceover_is_compressed_before_transcription() {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(FakeProvider::new().with_transcript(transcript()));
    let pipeline = Pipeline::new(
        fake.clone(),
        ArtifactStore::new(dir.path().join("studio_output")),
        PipelineSettings {
            render: RenderSettings {
                ffmpeg_path: "no-such-ffmpeg-binary".to_string(),
                ..RenderSettings::default()
            },
            ..PipelineSettings::default()
        },
    );
    // a synthesized voiceover over ten minutes long
    pipeline
        .store()
        .write_voiceover("wav", &vec![0_u8; MAX_TRANSCRIPTION_BYTES + 1])
        .await
        .unwrap();

    // the compression step runs instead of uploading the raw file
    assert!(matches!(
        pipeline.transcribe_voiceover().await,
        Err(PipelineError::Ffmpeg(_))
    ));
    assert!(fake.calls().is_empty());
    assert!(!pipeline.status().await.has(Artifact::Transcript));
}

#[tokio::test]
async fn test_failed_image_keeps_the_finished_scenes() {
    let (_dir, _fake, pipeline) = pipeline(
        FakeProvider::new()
            .with_completions([STORYBOARD_REPLY])
            .with_transcript(transcript())
            .with_image_failure_after(1),
    );
    pipeline
        .store()
        .write_voiceover("wav", &silent_wav(16_000))
        .await
        .unwrap();
    pipeline.transcribe_voiceover().await.unwrap();
    pipeline.plan_storyboard(4).await.unwrap();

    assert!(matches!(
        pipeline.generate_images().await,
        Err(PipelineError::Ai(_))
    ));

    let storyboard: Storyboard = pipeline
        .store()
        .read_json(Artifact::Storyboard)
        .await
        .unwrap();
    assert_eq!(
        storyboard.scenes[0].image_file.as_deref(),
        Some("images/scene_000.png")
    );
    assert_eq!(storyboard.scenes[1].image_file, None);
    assert!(
        pipeline
            .store()
            .resolve("images/scene_000.png")
            .exists()
    );

    let status = pipeline.status().await;
    assert!(status.has(Artifact::Storyboard));
    assert!(!status.has(Artifact::Images));
}

#[tokio::test]
async fn test_assemble_requires_every_scene_image() {
    let (_dir, _fake, pipeline) = pipeline(
        FakeProvider::new()
            .with_completions([STORYBOARD_REPLY])
            .with_transcript(transcript()),
    );
    pipeline.store().ensure().await.unwrap();
    pipeline
        .store()
        .write_voiceover("wav", &silent_wav(16_000))
        .await
        .unwrap();
    pipeline.transcribe_voiceover().await.unwrap();
    pipeline.plan_storyboard(4).await.unwrap();

    assert!(matches!(
        pipeline.assemble_video().await,
        Err(PipelineError::MissingArtifact(Artifact::Images))
    ));
}

#[tokio::test]
async fn test_reset_removes_the_run() {
    let (_dir, _fake, pipeline) =
        pipeline(FakeProvider::new().with_completions([SCRIPT_REPLY]));
    pipeline.generate_script(brief()).await.unwrap();

    pipeline.reset().await.unwrap();

    assert_eq!(pipeline.status().await.next_missing(), Some(Artifact::Script));
    assert!(pipeline.store().root().is_dir());
}

async fn solid_png(path: &std::path::Path) {
    let status = tokio::process::Command::new("ffmpeg")
        .args(["-hide_banner", "-y", "-f", "lavfi", "-i"])
        .arg("color=c=navy:s=320x180")
        .args(["-frames:v", "1"])
        .arg(path)
        .status()
        .await
        .unwrap();
    assert!(status.success());
}

#[tokio::test]
#[ignore = "needs ffmpeg and ffprobe on PATH"]
async fn test_long_script_is_synthesized_in_chunks_and_joined() {
    let (_dir, fake, pipeline) = pipeline(FakeProvider::new());
    let script = "A sentence that keeps going. ".repeat(300);
    pipeline.save_script(&script).await.unwrap();

    pipeline.synthesize_voiceover(None).await.unwrap();

    let speech_calls = fake
        .calls()
        .into_iter()
        .filter(|call| matches!(call, Call::Speech(_)))
        .count();
    assert_eq!(speech_calls, 3);

    let joined = tokio::fs::read(pipeline.store().path(Artifact::Voiceover))
        .await
        .unwrap();
    assert!(joined.len() > silent_wav(16_000).len() * 2);
}

#[tokio::test]
#[ignore = "needs ffmpeg and ffprobe on PATH"]
async fn test_assemble_video_renders_mp4() {
    let (_dir, _fake, pipeline) = pipeline(
        FakeProvider::new()
            .with_completions([STORYBOARD_REPLY])
            .with_transcript(transcript()),
    );
    pipeline
        .store()
        .write_voiceover("wav", &silent_wav(16_000))
        .await
        .unwrap();
    pipeline.transcribe_voiceover().await.unwrap();
    pipeline.plan_storyboard(4).await.unwrap();
    let storyboard: Storyboard = pipeline.generate_images().await.unwrap();

    // fake images are not decodable, swap in real ones
    for scene in &storyboard.scenes {
        let file = scene.image_file.as_deref().unwrap();
        solid_png(&pipeline.store().resolve(file)).await;
    }

    let video = pipeline.assemble_video().await.unwrap();

    assert_eq!(video, pipeline.store().path(Artifact::Video));
    assert!(pipeline.status().await.has(Artifact::Video));
}

#[tokio::test]
#[ignore = "needs ffmpeg and ffprobe on PATH"]
async fn test_ten_minute_voiceover_is_transcribed() {
    let (_dir, fake, pipeline) =
        pipeline(FakeProvider::new().with_transcript(transcript()));
    pipeline.store().ensure().await.unwrap();

    // the same format the speech endpoint returns: 24 kHz 16-bit mono
    let status = tokio::process::Command::new("ffmpeg")
        .args(["-hide_banner", "-y", "-f", "lavfi", "-i"])
        .arg("sine=frequency=220:sample_rate=24000")
        .args(["-t", "600", "-ac", "1", "-acodec", "pcm_s16le"])
        .arg(pipeline.store().root().join("voiceover.wav"))
        .status()
        .await
        .unwrap();
    assert!(status.success());

    pipeline.transcribe_voiceover().await.unwrap();

    let calls = fake.calls();
    let [Call::Transcribe { file_name, size }] = calls.as_slice() else {
        panic!("expected one transcription call, got {calls:?}");
    };
    assert_eq!(file_name, "voiceover.mp3");
    assert!(*size < MAX_TRANSCRIPTION_BYTES, "{size}");
    assert!(pipeline.status().await.has(Artifact::Transcript));
}
