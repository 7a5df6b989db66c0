use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Main application error type that all handlers should return
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// Dataset lookup found nothing; the render pipeline never ran
    #[error("Not found: {0}")]
    NotFound(String),

    /// The pipeline ran but produced no artifact
    #[error("Render failed")]
    RenderFailed { details: HashMap<String, String> },

}

/// Structured error response format for API consistency
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: ErrorDetail,
    request_id: String,
}

/// Error detail structure with machine-readable codes
#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<HashMap<String, String>>,
}

impl AppError {
    /// Convert AppError to appropriate HTTP status code and error code
    fn to_status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::RenderFailed { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "RENDER_FAILED"),
        }
    }

    /// Get user-friendly error message (sanitized for external consumption)
    fn to_user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => format!("Validation failed: {}", msg),
            AppError::NotFound(msg) => msg.clone(),
            AppError::RenderFailed { .. } => "Failed to generate video".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = Uuid::new_v4().to_string();
        let (status_code, error_code) = self.to_status_and_code();
        let user_message = self.to_user_message();

        match &self {
            AppError::RenderFailed { details } => {
                warn!(
                    request_id = %request_id,
                    prompt = details.get("prompt").map(String::as_str).unwrap_or(""),
                    "Render produced no artifact"
                );
            }
            _ => {
                // Lookup misses and bad requests are expected outcomes
                info!(
                    request_id = %request_id,
                    error_code = %error_code,
                    error = %self,
                    "API error response"
                );
            }
        }

        let details = match self {
            AppError::RenderFailed { details } => Some(details),
            _ => None,
        };

        let body = ErrorResponse {
            success: false,
            error: ErrorDetail {
                code: error_code.to_string(),
                message: user_message,
                details,
            },
            request_id,
        };

        (status_code, Json(body)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, AppError>;

/// Helper functions for common error scenarios
impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    #[test]
    fn test_not_found_error() {
        let error = AppError::not_found("No matching code found in database");
        let (status, code) = error.to_status_and_code();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(code, "NOT_FOUND");
        assert_eq!(error.to_user_message(), "No matching code found in database");
    }

    #[test]
    fn test_render_failure_message_hides_details() {
        let details = HashMap::from([("stderr".to_string(), "E2B_API_KEY=e2b_123".to_string())]);
        let error = AppError::RenderFailed { details };
        let (status, code) = error.to_status_and_code();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, "RENDER_FAILED");
        assert_eq!(error.to_user_message(), "Failed to generate video");
    }

    #[test]
    fn test_validation_error() {
        let error = AppError::validation("Invalid JSON body");
        let (status, code) = error.to_status_and_code();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "VALIDATION_ERROR");
        assert_eq!(error.to_user_message(), "Validation failed: Invalid JSON body");
    }

    #[tokio::test]
    async fn test_render_failure_carries_details() {
        let details = HashMap::from([
            ("prompt".to_string(), "circle".to_string()),
            ("stderr".to_string(), "SyntaxError".to_string()),
        ]);
        let response = AppError::RenderFailed { details }.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "RENDER_FAILED");
        assert_eq!(json["error"]["details"]["stderr"], "SyntaxError");
        assert!(json["request_id"].is_string());
    }
}
