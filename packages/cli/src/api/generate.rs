// ABOUTME: Render endpoints that look up code and run it through the sandbox orchestrator
// ABOUTME: Streams the video back on success and returns full diagnostics on failure

use super::prompts::PromptRequest;
use super::AppState;
use crate::error::{ApiResult, AppError};
use animbox_dataset::PromptEntry;
use animbox_sandbox::{ExecutionOutcome, SourceUnit};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use tracing::info;

pub async fn generate_video(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let request = PromptRequest::from_body(&body)?;
    let entry = state
        .dataset
        .lookup(request.query())
        .cloned()
        .ok_or_else(|| AppError::not_found("No matching code found in database"))?;

    render_entry(&state, entry).await
}

pub async fn generate_random_video(State(state): State<AppState>) -> ApiResult<Response> {
    let entry = state
        .dataset
        .lookup(None)
        .cloned()
        .ok_or_else(|| AppError::not_found("No code found in database"))?;

    render_entry(&state, entry).await
}

async fn render_entry(state: &AppState, entry: PromptEntry) -> ApiResult<Response> {
    info!(
        "Rendering prompt {:?} via {}",
        entry.prompt,
        state.orchestrator.provider_name()
    );

    let mut outcome = state
        .orchestrator
        .execute(&SourceUnit::new(entry.code.as_str()))
        .await;

    match outcome.artifact.take() {
        Some(artifact) => {
            info!("Rendered {} ({} bytes)", artifact.path, artifact.len());
            Ok(video_response(artifact.content))
        }
        None => Err(AppError::RenderFailed {
            details: failure_details(&entry, &outcome, state.config.surface_provisioning_logs),
        }),
    }
}

/// Download name stamped with the local render time
pub fn download_name() -> String {
    format!(
        "manim_animation_{}.mp4",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    )
}

fn video_response(content: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "video/mp4".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", download_name()),
            ),
        ],
        content,
    )
        .into_response()
}

fn failure_details(
    entry: &PromptEntry,
    outcome: &ExecutionOutcome,
    include_provisioning: bool,
) -> HashMap<String, String> {
    let mut details = HashMap::from([
        ("prompt".to_string(), entry.prompt.clone()),
        ("code".to_string(), entry.code.clone()),
        ("stdout".to_string(), outcome.stdout.clone()),
        ("stderr".to_string(), outcome.stderr.clone()),
    ]);

    if include_provisioning {
        if let Some(report) = &outcome.provisioning {
            details.insert("provisioning".to_string(), report.summary());
        }
    }

    details
}
