use axum::Json;
use serde_json::{json, Value};

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().timestamp(),
        "version": env!("CARGO_PKG_VERSION"),
        "service": "animbox"
    }))
}

pub async fn api_info() -> Json<Value> {
    Json(json!({
        "service": "Animbox Video Generator",
        "description": "Render Manim animations from a prompt dataset in isolated sandboxes",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/prompts": "GET - List available prompts",
            "/code": "POST - Get the code for a prompt without rendering",
            "/generate": "POST - Generate video from prompt or get random",
            "/generate/random": "GET - Generate random video",
            "/api/health": "GET - Service health"
        }
    }))
}
