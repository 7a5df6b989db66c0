// ABOUTME: Dataset endpoints that never touch a sandbox
// ABOUTME: Lists prompts and returns the stored code for a prompt query

use super::AppState;
use crate::error::{ApiResult, AppError};
use axum::{
    body::Bytes,
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct PromptsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct PromptsResponse {
    pub count: usize,
    pub prompts: Vec<String>,
}

/// Body shared by `/code` and `/generate`; the body itself is optional
#[derive(Debug, Default, Deserialize)]
pub struct PromptRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

impl PromptRequest {
    /// Parse an optional JSON body. Empty bodies mean "no prompt".
    pub fn from_body(body: &Bytes) -> ApiResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| AppError::validation(format!("Invalid JSON body: {}", e)))
    }

    /// Prompt text to search for; blank prompts select at random
    pub fn query(&self) -> Option<&str> {
        self.prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

#[derive(Debug, Serialize)]
pub struct CodeResponse {
    pub code: String,
    pub prompt: String,
}

pub async fn list_prompts(
    State(state): State<AppState>,
    Query(query): Query<PromptsQuery>,
) -> Json<PromptsResponse> {
    let prompts = state.dataset.list_prompts(query.limit);
    Json(PromptsResponse {
        count: prompts.len(),
        prompts,
    })
}

pub async fn get_code(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<CodeResponse>> {
    let request = PromptRequest::from_body(&body)?;

    let entry = state
        .dataset
        .lookup(request.query())
        .ok_or_else(|| AppError::not_found("No matching code found"))?;

    Ok(Json(CodeResponse {
        code: entry.code.clone(),
        prompt: entry.prompt.clone(),
    }))
}
