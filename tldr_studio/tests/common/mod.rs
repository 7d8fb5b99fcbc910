//! Shared helpers for the studio router tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use tldr_openai::fake::FakeProvider;
use tldr_pipeline::{ArtifactStore, Pipeline, PipelineSettings};
use tldr_studio::AppState;
use tower::ServiceExt;

/// A router over a fresh temporary workspace, plus the pieces tests poke at.
pub struct TestStudio {
    pub app: Router,
    pub state: AppState,
    pub fake: Arc<FakeProvider>,
    _workspace: tempfile::TempDir,
}

pub fn build_test_app(fake: FakeProvider) -> TestStudio {
    let workspace = tempfile::tempdir().unwrap();
    let fake = Arc::new(fake);
    let pipeline = Pipeline::new(
        fake.clone(),
        ArtifactStore::new(workspace.path()),
        PipelineSettings::default(),
    );
    let state = AppState::new(pipeline);

    TestStudio {
        app: tldr_studio::router(state.clone()),
        state,
        fake,
        _workspace: workspace,
    }
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    app.clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_form(app: &Router, uri: &str, form: &str) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn post_file(
    app: &Router,
    uri: &str,
    field: &str,
    file_name: &str,
    bytes: &[u8],
) -> Response<Body> {
    let boundary = "studio-test-boundary";
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    app.clone()
        .oneshot(
            Request::post(uri)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}
