//! Web form front end for the TL;DR Studios pipeline.

pub mod error;
pub mod handlers;
pub mod state;
pub mod views;

use axum::{
    Json, Router,
    body::Body,
    extract::DefaultBodyLimit,
    http::{Request, StatusCode, header},
    routing::{get, post},
};
use serde_json::json;
use tldr_openai::MAX_TRANSCRIPTION_BYTES;
use tower_http::{
    compression::{
        CompressionLayer,
        predicate::{DefaultPredicate, NotForContentType, Predicate},
    },
    services::ServeDir,
    trace::TraceLayer,
};

pub use error::StudioError;
pub use state::{AppState, StudioContext};

/// Request body limit for the voiceover upload: the largest recording
/// that can still be transcribed, plus room for the multipart framing.
/// Recordings over the transcription limit are refused by the pipeline.
pub const MAX_UPLOAD_BYTES: usize = MAX_TRANSCRIPTION_BYTES + 64 * 1024;

pub fn router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http().on_request(
        |request: &Request<Body>, _: &tracing::Span| {
            tracing::info!(
                "received request: {method} {uri}",
                method = request.method(),
                uri = request.uri()
            );
        },
    );

    // media is already compressed, and compressing it breaks range requests
    let compression_layer = CompressionLayer::new()
        .gzip(true)
        .deflate(true)
        .compress_when(
            DefaultPredicate::new()
                .and(NotForContentType::new("audio/"))
                .and(NotForContentType::new("video/")),
        );

    let artifacts = ServeDir::new(state.pipeline.store().root());

    Router::new()
        .route("/", get(handlers::index_handler))
        .route("/health", get(handlers::health_handler))
        .route("/steps/ideas", post(handlers::ideas_handler))
        .route("/steps/script", post(handlers::script_handler))
        .route("/steps/script/edit", post(handlers::script_edit_handler))
        .route("/steps/voiceover", post(handlers::voiceover_handler))
        .route(
            "/steps/voiceover/upload",
            post(handlers::upload_voiceover_handler)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/steps/transcript", post(handlers::transcript_handler))
        .route("/steps/storyboard", post(handlers::storyboard_handler))
        .route("/steps/images", post(handlers::images_handler))
        .route("/steps/metadata", post(handlers::metadata_handler))
        .route("/steps/thumbnail", post(handlers::thumbnail_handler))
        .route("/steps/video", post(handlers::video_handler))
        .route("/reset", post(handlers::reset_handler))
        .nest_service("/artifacts", artifacts)
        .fallback(|| async {
            (
                StatusCode::NOT_FOUND,
                [(header::CONTENT_TYPE, "application/json")],
                Json(json!({
                    "message": "not found",
                })),
            )
        })
        .layer(trace_layer)
        .layer(compression_layer)
        .with_state(state)
}
