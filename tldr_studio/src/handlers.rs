use axum::{
    Json,
    body::Bytes,
    extract::{Form, Multipart, State, multipart::MultipartError},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;
use tldr_pipeline::DEFAULT_MAX_SCENES;
use tracing::instrument;
use types::{ScriptBrief, SpeechVoice};

use crate::{MAX_UPLOAD_BYTES, error::StudioError, state::AppState, views};

#[derive(Debug, Deserialize)]
pub struct IdeasForm {
    #[serde(default)]
    pub niche: String,
}

#[derive(Debug, Deserialize)]
pub struct ScriptForm {
    #[serde(default)]
    pub topic: String,

    #[serde(default)]
    pub audience: String,

    #[serde(default)]
    pub tone: String,

    // kept as text so a bad number re-renders the page instead of
    // failing in the extractor
    #[serde(default)]
    pub minutes: String,
}

#[derive(Debug, Deserialize)]
pub struct ScriptEditForm {
    #[serde(default)]
    pub script: String,
}

#[derive(Debug, Deserialize)]
pub struct VoiceForm {
    #[serde(default)]
    pub voice: String,
}

#[derive(Debug, Deserialize)]
pub struct StoryboardForm {
    #[serde(default)]
    pub max_scenes: String,
}

pub async fn index_handler(State(state): State<AppState>) -> Response {
    render(&state, StatusCode::OK, None).await
}

pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        Json(json!({ "status": "ok" })),
    )
}

#[instrument(skip(state))]
pub async fn ideas_handler(
    State(state): State<AppState>,
    Form(form): Form<IdeasForm>,
) -> Response {
    let result = async {
        let _stage = state.begin_stage()?;
        state.pipeline.generate_ideas(&form.niche).await?;
        Ok::<(), StudioError>(())
    }
    .await;

    respond(&state, result).await
}

#[instrument(skip(state))]
pub async fn script_handler(
    State(state): State<AppState>,
    Form(form): Form<ScriptForm>,
) -> Response {
    let result = async {
        let brief = ScriptBrief {
            topic: form.topic,
            audience: non_blank(&form.audience),
            tone: non_blank(&form.tone),
            minutes: parse_minutes(&form.minutes)?,
        };

        let _stage = state.begin_stage()?;
        state.pipeline.generate_script(brief).await?;
        Ok::<(), StudioError>(())
    }
    .await;

    respond(&state, result).await
}

#[instrument(skip(state, form))]
pub async fn script_edit_handler(
    State(state): State<AppState>,
    Form(form): Form<ScriptEditForm>,
) -> Response {
    let result = async {
        let _stage = state.begin_stage()?;
        state.pipeline.save_script(&form.script).await?;
        Ok::<(), StudioError>(())
    }
    .await;

    respond(&state, result).await
}

#[instrument(skip(state))]
pub async fn voiceover_handler(
    State(state): State<AppState>,
    Form(form): Form<VoiceForm>,
) -> Response {
    let result = async {
        let voice = parse_voice(&form.voice)?;

        let _stage = state.begin_stage()?;
        state.pipeline.synthesize_voiceover(voice).await?;
        Ok::<(), StudioError>(())
    }
    .await;

    respond(&state, result).await
}

#[instrument(skip(state, multipart))]
pub async fn upload_voiceover_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Response {
    let result = async {
        let (file_name, bytes) = read_audio_field(&mut multipart).await?;
        tracing::info!("received {} ({} bytes)", file_name, bytes.len());

        let _stage = state.begin_stage()?;
        state
            .pipeline
            .save_uploaded_audio(&file_name, &bytes)
            .await?;
        Ok::<(), StudioError>(())
    }
    .await;

    respond(&state, result).await
}

#[instrument(skip(state))]
pub async fn transcript_handler(State(state): State<AppState>) -> Response {
    let result = async {
        let _stage = state.begin_stage()?;
        state.pipeline.transcribe_voiceover().await?;
        Ok::<(), StudioError>(())
    }
    .await;

    respond(&state, result).await
}

#[instrument(skip(state))]
pub async fn storyboard_handler(
    State(state): State<AppState>,
    Form(form): Form<StoryboardForm>,
) -> Response {
    let result = async {
        let max_scenes = parse_max_scenes(&form.max_scenes)?;

        let _stage = state.begin_stage()?;
        state.pipeline.plan_storyboard(max_scenes).await?;
        Ok::<(), StudioError>(())
    }
    .await;

    respond(&state, result).await
}

#[instrument(skip(state))]
pub async fn images_handler(State(state): State<AppState>) -> Response {
    let result = async {
        let _stage = state.begin_stage()?;
        state.pipeline.generate_images().await?;
        Ok::<(), StudioError>(())
    }
    .await;

    respond(&state, result).await
}

#[instrument(skip(state))]
pub async fn metadata_handler(State(state): State<AppState>) -> Response {
    let result = async {
        let _stage = state.begin_stage()?;
        state.pipeline.generate_metadata().await?;
        Ok::<(), StudioError>(())
    }
    .await;

    respond(&state, result).await
}

#[instrument(skip(state))]
pub async fn thumbnail_handler(State(state): State<AppState>) -> Response {
    let result = async {
        let _stage = state.begin_stage()?;
        state.pipeline.generate_thumbnail().await?;
        Ok::<(), StudioError>(())
    }
    .await;

    respond(&state, result).await
}

#[instrument(skip(state))]
pub async fn video_handler(State(state): State<AppState>) -> Response {
    let result = async {
        let _stage = state.begin_stage()?;
        state.pipeline.assemble_video().await?;
        Ok::<(), StudioError>(())
    }
    .await;

    respond(&state, result).await
}

#[instrument(skip(state))]
pub async fn reset_handler(State(state): State<AppState>) -> Response {
    let result = async {
        let _stage = state.begin_stage()?;
        state.pipeline.reset().await?;
        Ok::<(), StudioError>(())
    }
    .await;

    respond(&state, result).await
}

async fn render(
    state: &AppState,
    status: StatusCode,
    error: Option<&str>,
) -> Response {
    let snapshot = state.pipeline.snapshot().await;
    let html = views::page(
        &snapshot,
        state.pipeline.settings().default_voice,
        error,
    );
    (status, Html(html)).into_response()
}

// Successful steps go back to the page; failures show it with the error.
async fn respond(state: &AppState, result: Result<(), StudioError>) -> Response {
    match result {
        Ok(()) => Redirect::to("/").into_response(),
        Err(e) => {
            let status = e.status();
            if status.is_server_error() {
                tracing::error!("step failed: {}", e);
            } else {
                tracing::warn!("step rejected: {}", e);
            }
            render(state, status, Some(&e.to_string())).await
        }
    }
}

async fn read_audio_field(
    multipart: &mut Multipart,
) -> Result<(String, Bytes), StudioError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(upload_error)?
    {
        if field.name() != Some("audio") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(upload_error)?;
        return Ok((file_name, bytes));
    }

    Err(StudioError::InvalidInput(
        "choose an audio file to upload".to_string(),
    ))
}

fn upload_error(error: MultipartError) -> StudioError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        StudioError::UploadTooLarge(MAX_UPLOAD_BYTES)
    } else {
        StudioError::InvalidInput(error.body_text())
    }
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_minutes(value: &str) -> Result<f32, StudioError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(1.0);
    }
    value.parse().map_err(|_| {
        StudioError::InvalidInput(format!("{value:?} is not a number of minutes"))
    })
}

fn parse_voice(value: &str) -> Result<Option<SpeechVoice>, StudioError> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    value.parse().map(Some).map_err(StudioError::InvalidInput)
}

fn parse_max_scenes(value: &str) -> Result<usize, StudioError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(DEFAULT_MAX_SCENES);
    }
    value.parse().map_err(|_| {
        StudioError::InvalidInput(format!("{value:?} is not a scene count"))
    })
}
